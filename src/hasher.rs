pub use crate::encoder::text::*;
use crate::{prelude::*, secure_vec::*, util::*};
use ring::{digest, pbkdf2};
use std::{
    io::{self, Read},
    num::NonZeroU32,
};

/// One-shot SHA-512 digest of `input`, wrapped back up as `CryptoSecureBytes` so the result can
/// be handled with the same care as its input.
pub fn sha512_bytes(input: &SecureBytes) -> CryptoSecureBytes {
    let digest = digest::digest(&digest::SHA512, input.unsecure());
    CryptoSecureBytes(digest.as_ref().to_vec().into())
}

/// Lets `sha512!`/`scrypt!`/`pbkdf2!` accept either a bare `SecureBytes` or a `CryptoSecureBytes`,
/// by reference or by value, without the caller having to peel off the newtype first.
pub trait AsUnsecureBytes {
    fn as_unsecure_bytes(&self) -> &[u8];
}

impl AsUnsecureBytes for SecureBytes {
    fn as_unsecure_bytes(&self) -> &[u8] {
        self.unsecure()
    }
}

impl AsUnsecureBytes for CryptoSecureBytes {
    fn as_unsecure_bytes(&self) -> &[u8] {
        self.unsecure()
    }
}

impl<T> AsUnsecureBytes for &T
where
    T: AsUnsecureBytes + ?Sized,
{
    fn as_unsecure_bytes(&self) -> &[u8] {
        (*self).as_unsecure_bytes()
    }
}

/// Compute a SHA-512 digest of `key`.
///
/// # Examples
///
/// ```
/// let hash = sha512!(&secure_bytes);
/// ```
macro_rules! sha512 {
    ( $key:expr ) => {
        crate::hasher::sha512_bytes($key)
    };
}

/// Derive `output_len` bytes from `key` and `salt` using `scrypt`, with the given
/// `scrypt::ScryptParams`.
macro_rules! scrypt {
    ( $key:expr, $salt:expr, $params:expr, $output_len:expr ) => {
        crate::hasher::scrypt_hash($key, $salt, $params, $output_len)
    };
}

/// Derive a hash from `key` and `salt` using `ring`'s pbkdf2 implementation, running `num_iter`
/// iterations of `alg`.
macro_rules! pbkdf2 {
    ( $alg:expr, $num_iter:expr, $key:expr, $salt:expr ) => {
        crate::hasher::pbkdf2_bytes($alg, $num_iter, $key, $salt)
    };
}

/// Time how long `$body` takes to run.
///
/// # Returns
///
/// A tuple of the value that `$body` evaluates to, and how long it took to run.
macro_rules! time {
    ( $body:expr ) => {{
        let start = crate::hasher::start_timer();
        let result = $body;
        (result, crate::hasher::end_timer(&start))
    }};
}

#[inline]
pub fn start_timer() -> std::time::Instant {
    std::time::Instant::now()
}

#[inline]
pub fn end_timer(start: &std::time::Instant) -> std::time::Duration {
    start.elapsed()
}

/// Scale a raw count expressed in `base_unit` (`"B"`, `"files"`, ...) to a human-friendly unit,
/// using binary prefixes for byte counts and decimal ones otherwise.
pub fn adjust_value(value: f64, base_unit: &str) -> (f64, String) {
    if base_unit != "B" {
        return (value, base_unit.to_string());
    }

    const PREFIXES: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = value;
    let mut idx = 0;
    while value.abs() >= 1024.0 && idx + 1 < PREFIXES.len() {
        value /= 1024.0;
        idx += 1;
    }
    (value, PREFIXES[idx].to_string())
}

/// Derive `output_len` bytes from `key` and `salt` using `scrypt`.
pub fn scrypt_hash<K, S>(key: K, salt: S, params: scrypt::ScryptParams, output_len: usize) -> HelixResult<CryptoSecureBytes>
where
    K: AsUnsecureBytes,
    S: AsUnsecureBytes,
{
    let mut out = vec![0u8; output_len];
    scrypt::scrypt(key.as_unsecure_bytes(), salt.as_unsecure_bytes(), &params, &mut out)
        .map_err(|err| HelixErr::Other(format!("scrypt failed: {}", err)))?;
    Ok(CryptoSecureBytes(out.into()))
}

/// Derive a key from `key` and `salt` using `ring`'s pbkdf2, running `num_iter` iterations of
/// `alg`. Infallible: `ring::pbkdf2::derive` cannot fail for the algorithms we expose.
pub fn pbkdf2_bytes<K, S>(alg: pbkdf2::Algorithm, num_iter: u32, key: K, salt: S) -> CryptoSecureBytes
where
    K: AsUnsecureBytes,
    S: AsUnsecureBytes,
{
    let mut buffer = [0u8; digest::SHA512_OUTPUT_LEN];
    pbkdf2::derive(
        alg,
        NonZeroU32::new(num_iter).expect("num_iter must be nonzero"),
        salt.as_unsecure_bytes(),
        key.as_unsecure_bytes(),
        &mut buffer[..],
    );
    CryptoSecureBytes(Vec::from(&buffer[..]).into())
}

pub const PBKDF2_NUM_ITER_DEFAULT: u32 = 1 << 17; // default number of iterations for pbkdf2, 2^17 = 131,072
pub const PBKDF2_SALT_DEFAULT: [u8; 16] = [0; 16]; // default salt to use for pbkdf2
pub static PBKDF2_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA512; // default hash algorithm to use for pbkdf2
const PBKDF2_OUTPUT_LEN: usize = digest::SHA512_OUTPUT_LEN; // number of bytes that pbkdf2 should output

// static assertions about the consts above
const_assert!(PBKDF2_NUM_ITER_DEFAULT == 131072);
const_assert!(PBKDF2_OUTPUT_LEN == 64);
const_assert!(PBKDF2_SALT_DEFAULT.len() == 16);

/// Hash key with default configs using `pbkdf2`.
///
/// Configs used are:
///
/// 1. `PBKDF2_NUM_ITER_DEFAULT` number of iterations
/// 1. `PBKDF2_SALT_DEFAULT` as the salt
///
/// # Parameters
///
/// 1. `key`: the input bytes to hash
///
/// # Returns
///
/// 64-byte hash of the input key as `Vec<u8>`
macro_rules! hash {
    ( $num_iter:expr, $key:expr ) => {
        crate::hasher::hash_custom($key, None, Some($num_iter))
    };
    ( $num_iter:expr, $key:expr, $salt:expr ) => {
        crate::hasher::hash_custom($key, Some($salt), Some($num_iter))
    };
}

/// Hash key with default configs using `pbkdf2`, except with 1 iteration.
///
/// Configs used are:
///
/// 1. 1 number of iteration
/// 1. `PBKDF2_SALT_DEFAULT` as the salt
///
/// # Parameters
///
/// 1. `key`: the input bytes to hash
///
/// # Returns
///
/// 64-byte hash of the input key as `Vec<u8>`
macro_rules! hash1 {
    ( $key:expr ) => {
        crate::hasher::hash_custom($key, None, Some(1))
    };
    ( $key:expr, $salt:expr ) => {
        crate::hasher::hash_custom($key, Some($salt), Some(1))
    };
}

/// Hash key with custom configs using `pbkdf2`.
///
/// Configs used are:
///
/// # Parameters
///
/// 1. `key`: the input bytes to hash
/// 1. `opt_salt`: if provided, it will be hashed with this function with 1 iteration and
///    PBKDF2_SALT_DEFAULT and the first 16 bytes are used. PBKDF2_SALT_DEFAULT is used otherwise.
/// 1. `opt_num_iter`: number of PBKDF2 iterations; `PBKDF2_NUM_ITER_DEFAULT` is used if `None`
///
/// # Returns
///
/// 64-byte hash of the input key.
pub fn hash_custom(key: &[u8], opt_salt: Option<&[u8]>, opt_num_iter: Option<u32>) -> Vec<u8> {
    // default to PBKDF2_NUM__ITER_DEFAULT
    let num_iter = opt_num_iter.unwrap_or(PBKDF2_NUM_ITER_DEFAULT);
    if num_iter == 0 {
        panic!("opt_num_iter cannot be 0");
    }

    // if salt is provided, hash it again asd use the first 16 bytes
    // else use the default hash
    let salt: Vec<u8> = match opt_salt {
        Some(s) if s.len() < 16 => hash_custom(s, None, Some(1)).into_iter().take(16).collect(),
        Some(s) => Vec::from(&s[..16]),
        None => Vec::from(&PBKDF2_SALT_DEFAULT[..]),
    };

    // required by pbkdf2
    debug_assert_eq!(16, salt.len());

    let mut buffer = [0u8; PBKDF2_OUTPUT_LEN];
    pbkdf2::derive(
        PBKDF2_ALGORITHM,
        NonZeroU32::new(num_iter).unwrap(),
        &salt[..],
        key,
        &mut buffer[..],
    );

    Vec::from(&buffer[..])
}

/// Calculate a SHA512 checksum of the input.
pub fn sha512_read<R>(file: &mut R) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut context = digest::Context::new(&digest::SHA512);

    loop {
        match file.read(&mut buffer)? {
            0 => {
                let digest = context.finish();
                break Ok(Vec::from(digest.as_ref()));
            }
            bytes_read => context.update(&buffer[..bytes_read]),
        }
    }
}
