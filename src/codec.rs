//! Per-file encryption, decryption, and header-only inspection of encrypted-side blobs.
//!
//! Compress, encrypt, then swap into place via write-to-temp-then-rename; a standalone codec
//! either direction of a sync can call.
//!
//! # Blob layout
//!
//! ```text
//! [ nonce record   ] length-prefixed random bytes, used to derive the header/body IV seeds
//! [ header record  ] length-prefixed AES-256-CBC ciphertext of a bincode StoredHeader
//! [ body ciphertext] AES-256-CBC(Zstd(plaintext)), to EOF
//! ```
//!
//! The nonce is stored unencrypted; only the derived key needs to stay secret, and keeping the
//! nonce in the clear is what lets two blobs encrypted with the same key use distinct IVs.
use crate::{
    encoder::{hmac::*, openssl::*, zstd::*},
    fs_util::*,
    prelude::*,
    secure_vec::*,
    util::*,
};
use filetime::{set_file_mtime, FileTime};
use serde::{Deserialize, Serialize};
use std::{
    fs::{create_dir_all, metadata},
    path::{Path, PathBuf},
    time::SystemTime,
};

const NONCE_LEN: usize = 16;

/// Kind of entry an encrypted blob stands in for. Distinct from `FSEntry`'s full variant set:
/// nothing that reaches disk as an actual blob is ever `Removed` or `Purged`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum EncrEntryType {
    File,
    Directory,
}

/// Metadata recovered by decrypting only the header of an encrypted blob.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EncrHeader {
    pub file_name: PathBuf,
    pub entry_type: EncrEntryType,
    pub last_write_time_utc: SystemTime,
    pub length: u64,
}

/// What actually sits behind the header record: the header plus an authentication tag computed
/// over the plaintext content, so `decrypt_file` can detect tampering or a wrong key before
/// trusting the recovered bytes.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct StoredHeader {
    header: EncrHeader,
    content_hmac: CryptoSecureBytes,
}

/// Inputs to `encrypt_file` that aren't recoverable from the source path alone.
pub struct EncryptOptions {
    /// Decrypted-side relative path to embed in the header; this is what round-trips back out of
    /// `decrypt_header` and `decrypt_file`, not necessarily `decr_path`'s own basename.
    pub stored_file_name: PathBuf,
    pub entry_type: EncrEntryType,
}

fn domain_seed(nonce: &CryptoSecureBytes, tag: &[u8]) -> CryptoSecureBytes {
    let mut buf = nonce.unsecure().to_vec();
    buf.extend_from_slice(tag);
    sha512!(&buf.into())
}

/// Reads the nonce and header records off `src`, leaving the cursor positioned at the start of
/// the body ciphertext. Shared by `decrypt_header` (which stops here) and `decrypt_file` (which
/// needs the nonce back too, to derive the body's IV seed).
fn read_stored_header<R>(src: &mut R, derived_key: &DerivedKey) -> HelixResult<(CryptoSecureBytes, StoredHeader)>
where
    R: std::io::Read,
{
    let key_hash = &derived_key.0;

    let nonce_bytes: Vec<u8> = helix_unwrap_opt!(read_record(src)?);
    let nonce = CryptoSecureBytes(nonce_bytes.into());
    let header_iv_seed = domain_seed(&nonce, b"header");

    let header_ct: Vec<u8> = helix_unwrap_opt!(read_record(src)?);
    let header_bytes = compose_encoders!(
        &header_ct[..],
        Aes256CbcDec => (key_hash, Some(&header_iv_seed))
    )
    .and_then(|mut c| c.as_vec().map_err(HelixErr::from))
    .map_err(|err| HelixErr::HeaderDecryptFailed(format!("{}", err)))?;

    let stored_header =
        deserialize(&header_bytes).map_err(|_| HelixErr::HeaderDecryptFailed("malformed header record".to_string()))?;

    Ok((nonce, stored_header))
}

/// Reads and decrypts only the fixed-format header block of `encr_path`, leaving the (possibly
/// large) body ciphertext untouched. This is what lets the classifier inspect encrypted-side
/// state cheaply.
pub fn decrypt_header<P>(encr_path: P, derived_key: &DerivedKey) -> HelixResult<EncrHeader>
where
    P: AsRef<Path>,
{
    let mut src = fopen_r(encr_path.as_ref())?;
    Ok(read_stored_header(&mut src, derived_key)?.1.header)
}

/// Encrypts `decr_path` into `encr_path`: Zstd-compresses then AES-256-CBC-encrypts the content,
/// stores an HMAC-SHA512 tag of the plaintext alongside the header, and swaps the result into
/// place via write-to-temp-then-rename.
pub fn encrypt_file<P1, P2>(decr_path: P1, encr_path: P2, derived_key: &DerivedKey, options: EncryptOptions) -> HelixResult<EncrHeader>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let decr_path = decr_path.as_ref();
    let encr_path = encr_path.as_ref();
    let key_hash = &derived_key.0;

    let length = match options.entry_type {
        EncrEntryType::File => metadata(decr_path)?.len(),
        EncrEntryType::Directory => 0,
    };
    let last_write_time_utc = modified(decr_path)?;

    let header = EncrHeader {
        file_name: options.stored_file_name,
        entry_type: options.entry_type,
        last_write_time_utc,
        length,
    };

    let content_hmac = match options.entry_type {
        EncrEntryType::File => {
            let mut hmac = HmacEncoder::new(fopen_r(decr_path)?, (key_hash, None))?;
            hmac.read_all_to(&mut std::io::sink())?;
            hmac.get_result().unwrap()
        }
        EncrEntryType::Directory => CryptoSecureBytes(Vec::new().into()),
    };

    let nonce = rng!(NONCE_LEN);
    let header_iv_seed = domain_seed(&nonce, b"header");
    let body_iv_seed = domain_seed(&nonce, b"body");

    let stored_header = StoredHeader {
        header: header.clone(),
        content_hmac,
    };
    let header_ct = compose_encoders!(
        &serialize(&stored_header)?[..],
        Aes256CbcEnc => (key_hash, Some(&header_iv_seed))
    )?
    .as_vec()?;

    let out_dir = encr_path.parent().unwrap_or_else(|| Path::new("."));
    create_dir_all(out_dir)?;
    let mut tmp = tmpfile!(out_dir)?;
    {
        let file = tmp.as_file_mut();
        write_record(file, &nonce.unsecure().to_vec())?;
        write_record(file, &header_ct)?;

        if let EncrEntryType::File = options.entry_type {
            compose_encoders!(
                fopen_r(decr_path)?,
                ZstdEncoder => None,
                Aes256CbcEnc => (key_hash, Some(&body_iv_seed))
            )?
            .read_all_to(file)?;
        }
        file.sync_all()?;
    }
    tmp.persist(encr_path).map_err(|err| HelixErr::Other(format!("{}", err)))?;

    Ok(header)
}

/// Reverse of `encrypt_file`. Verifies the stored HMAC tag against the recovered plaintext before
/// trusting it, raising `AuthenticationFail` on mismatch (wrong passphrase or a tampered blob).
pub fn decrypt_file<P1, P2>(encr_path: P1, decr_path: P2, derived_key: &DerivedKey) -> HelixResult<EncrHeader>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let encr_path = encr_path.as_ref();
    let decr_path = decr_path.as_ref();
    let key_hash = &derived_key.0;

    let mut src = fopen_r(encr_path)?;
    let nonce_bytes: Vec<u8> = helix_unwrap_opt!(read_record(&mut src)?);
    let nonce = CryptoSecureBytes(nonce_bytes.into());
    let header_iv_seed = domain_seed(&nonce, b"header");
    let body_iv_seed = domain_seed(&nonce, b"body");

    let header_ct: Vec<u8> = helix_unwrap_opt!(read_record(&mut src)?);
    let header_bytes = compose_encoders!(
        &header_ct[..],
        Aes256CbcDec => (key_hash, Some(&header_iv_seed))
    )
    .and_then(|mut c| c.as_vec().map_err(HelixErr::from))
    .map_err(|err| HelixErr::HeaderDecryptFailed(format!("{}", err)))?;
    let stored_header: StoredHeader =
        deserialize(&header_bytes).map_err(|_| HelixErr::HeaderDecryptFailed("malformed header record".to_string()))?;

    match stored_header.header.entry_type {
        EncrEntryType::Directory => {
            create_dir_all(decr_path)?;
        }
        EncrEntryType::File => {
            if let Some(parent) = decr_path.parent() {
                create_dir_all(parent)?;
            }

            let body = compose_encoders!(
                src,
                Aes256CbcDec => (key_hash, Some(&body_iv_seed)),
                ZstdDecoder => None
            )?;
            let mut hmac = HmacEncoder::new(body, (key_hash, None))?;

            let out_dir = decr_path.parent().unwrap_or_else(|| Path::new("."));
            let mut tmp = tmpfile!(out_dir)?;
            hmac.read_all_to(tmp.as_file_mut())?;
            tmp.as_file_mut().sync_all()?;

            if hmac.get_result().unwrap() != stored_header.content_hmac {
                helix_err!(AuthenticationFail)?;
            }

            tmp.persist(decr_path).map_err(|err| HelixErr::Other(format!("{}", err)))?;
        }
    }

    set_file_mtime(decr_path, FileTime::from_system_time(stored_header.header.last_write_time_utc))?;

    Ok(stored_header.header)
}
