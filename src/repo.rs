//! Ties the two `FSOverlay`s, the sync log, and the name encoder together into a single opened
//! directory pair, and orchestrates the pipeline (three-way matcher, classifier, dependency
//! sorter, executor) over it. A `DirectoryPair` is acquired whole (`init`/`open`) and released
//! whole; there is no partially-open state.
use crate::{
    executor::{self, SyncResult},
    fs_util::*,
    nameenc::NameEncoder,
    overlay::{FSOverlay, GetEntriesMode},
    prelude::*,
    presync::{self, PreSync},
    primitives::CaseSensitivity,
    secure_vec::*,
    sorter,
    specs::prelude::*,
    synclog::SyncLog,
    util::*,
};
use serde::{Deserialize, Serialize};
use std::{
    convert::TryFrom,
    path::{Path, PathBuf},
};

/// Bumped if `DirectoryHeader`'s on-disk layout ever changes incompatibly.
pub const FILE_VERSION: u32 = 1;

/// Random identifier written into both sides of a pair at `init` time. `open` rejects a pair
/// whose two sides disagree on this with `DirectoryIdMismatch`, which is what catches "pointed
/// the tool at the wrong encrypted directory" before anything gets overwritten.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DirectoryId(pub CryptoSecureBytes);

impl DirectoryId {
    fn generate() -> Self {
        Self(rng!(DEFAULT_SALT_LEN))
    }
}

/// Reserved header persisted at the encrypted side's root, `ENCR_HEADER_FNAME`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DirectoryHeader {
    pub directory_id: DirectoryId,
    pub file_version: u32,
    pub key_deriv_spec: KeyDerivSpec,
    pub cipher_spec: CipherSpec,
    pub authenticator_spec: AuthenticatorSpec,
    pub compressor_spec: CompressorSpec,
    /// Lets `open` confirm a supplied passphrase is correct without ever persisting the real
    /// derived key: `rehash_spec` derives a second, unrelated hash from it, and `rehash` is that
    /// hash's expected value.
    pub rehash_spec: RehashSpec,
    pub rehash: RehashedKey,
}

/// Reserved marker persisted at the decrypted side, `DECR_RESERVED_DIRNAME/DECR_ID_FNAME`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DecrMarker {
    pub directory_id: DirectoryId,
}

fn encr_header_path(encr_root: &Path) -> PathBuf {
    encr_root.join(ENCR_HEADER_FNAME)
}

fn decr_marker_path(decr_root: &Path) -> PathBuf {
    decr_root.join(DECR_RESERVED_DIRNAME).join(DECR_ID_FNAME)
}

fn decr_log_path(decr_root: &Path) -> PathBuf {
    decr_root.join(DECR_RESERVED_DIRNAME).join(SYNC_LOG_FNAME)
}

/// True for anything under the decrypted side's reserved subdirectory (the `DirectoryId` marker
/// and the sync log itself), which §4.3 excludes from the three-way matcher's enumeration.
fn is_reserved_decr_path(relative_path: &Path) -> bool {
    relative_path
        .components()
        .next()
        .map(|c| c.as_os_str() == DECR_RESERVED_DIRNAME)
        .unwrap_or(false)
}

fn read_header(encr_root: &Path) -> HelixResult<DirectoryHeader> {
    let path = encr_header_path(encr_root);
    let mut file = fopen_r(&path).map_err(|_| HelixErr::NotInitialized(encr_root.to_path_buf()))?;
    read_record(&mut file)?.ok_or_else(|| HelixErr::NotInitialized(encr_root.to_path_buf()))
}

fn write_header(encr_root: &Path, header: &DirectoryHeader) -> HelixResult<()> {
    let mut file = fopen_w(encr_header_path(encr_root))?;
    write_record(&mut file, header)?;
    file.sync_all()?;
    Ok(())
}

fn read_marker(decr_root: &Path) -> HelixResult<DecrMarker> {
    let path = decr_marker_path(decr_root);
    let mut file = fopen_r(&path).map_err(|_| HelixErr::NotInitialized(decr_root.to_path_buf()))?;
    read_record(&mut file)?.ok_or_else(|| HelixErr::NotInitialized(decr_root.to_path_buf()))
}

fn write_marker(decr_root: &Path, marker: &DecrMarker) -> HelixResult<()> {
    let path = decr_marker_path(decr_root);
    std::fs::create_dir_all(path.parent().unwrap())?;
    let mut file = fopen_w(&path)?;
    write_record(&mut file, marker)?;
    file.sync_all()?;
    Ok(())
}

/// A rehash spec tuned to be cheap: its only job is to let `open` reject a wrong passphrase
/// quickly, well before any expensive per-file work starts.
fn fresh_rehash_spec() -> RehashSpec {
    RehashSpec::with_key_deriv_spec(KeyDerivSpec::Pbkdf2 {
        alg: Pbkdf2Algorithm::HmacSha512,
        num_iter: 1,
        salt: CryptoSecureBytes(rng!(DEFAULT_REHASH_OUTPUT_LEN).0),
    })
}

/// A decrypted/encrypted directory pair, opened together and released together. Holds both
/// `FSOverlay`s, the sync log, the name encoder, and the key derived for this session.
pub struct DirectoryPair {
    decr: FSOverlay,
    encr: FSOverlay,
    log: SyncLog,
    name_encoder: NameEncoder,
    derived_key: DerivedKey,
}

impl DirectoryPair {
    /// Stands up a fresh pair: derives a key from `init_key` per `key_deriv_spec_ext`, generates
    /// a `DirectoryId`, writes both reserved files, and opens the (now-initialized) pair. Does
    /// not touch any pre-existing content of either directory beyond that.
    pub fn init(decr_root: &Path, encr_root: &Path, init_key: InitialKey, key_deriv_spec_ext: KeyDerivSpecExt) -> HelixResult<Self> {
        if encr_header_path(encr_root).exists() || decr_marker_path(decr_root).exists() {
            return helix_err!(Other, format!("{:?} / {:?} already initialized", decr_root, encr_root));
        }

        std::fs::create_dir_all(decr_root)?;
        std::fs::create_dir_all(encr_root)?;
        std::fs::create_dir_all(decr_root.join(DECR_RESERVED_DIRNAME))?;

        let key_deriv_spec = KeyDerivSpec::try_from(&key_deriv_spec_ext)?;
        let derived_key = key_deriv_spec.derive(&init_key.0 .0)?;

        let rehash_spec = fresh_rehash_spec();
        let rehash = rehash_spec.rehash(&derived_key)?;

        let directory_id = DirectoryId::generate();
        let header = DirectoryHeader {
            directory_id: directory_id.clone(),
            file_version: FILE_VERSION,
            key_deriv_spec,
            cipher_spec: CipherSpec::Aes256Cbc {
                init_vec: CryptoSecureBytes(rng!(DEFAULT_SALT_LEN).0),
            },
            authenticator_spec: AuthenticatorSpec::default(),
            compressor_spec: CompressorSpec::default(),
            rehash_spec,
            rehash,
        };
        write_header(encr_root, &header)?;
        write_marker(decr_root, &DecrMarker { directory_id })?;
        SyncLog::open(decr_log_path(decr_root))?;

        Self::open(decr_root, encr_root, init_key)
    }

    /// Opens an existing pair: reads both reserved files, checks they agree on `DirectoryId`,
    /// derives the key from `init_key` per the stored `key_deriv_spec`, and verifies it against
    /// the stored rehash before building the overlays.
    pub fn open(decr_root: &Path, encr_root: &Path, init_key: InitialKey) -> HelixResult<Self> {
        let header = read_header(encr_root)?;
        let marker = read_marker(decr_root)?;
        if header.directory_id != marker.directory_id {
            return helix_err!(DirectoryIdMismatch);
        }

        let derived_key = header.key_deriv_spec.derive(&init_key.0 .0)?;
        header.rehash_spec.verify(&header.rehash, &derived_key)?;

        let case_sensitive = probe_case_sensitive(decr_root)?;
        let case_sensitivity = CaseSensitivity::from_probe(case_sensitive);
        let decr = FSOverlay::new_root(decr_root, false, case_sensitivity)?;
        let encr = FSOverlay::new_root(encr_root, false, case_sensitivity)?;
        let log = SyncLog::open(decr_log_path(decr_root))?;
        let name_encoder = NameEncoder::new(derived_key.clone());

        Ok(Self {
            decr,
            encr,
            log,
            name_encoder,
            derived_key,
        })
    }

    /// Re-reads both overlays from disk and reloads the sync log, without re-deriving the key or
    /// re-reading either reserved file.
    pub fn reset(&mut self) -> HelixResult<()> {
        self.decr.reset();
        self.encr.reset();
        self.log.reload()
    }

    /// Joins decrypted FS, encrypted FS, and the sync log (C3), classifies each joined record into
    /// a `SyncMode`/`DisplayOperation` (C4), and returns them in a legal application order (C5).
    /// `what_if` controls whether the two `FSOverlay`s were opened in dry-run mode; it does not by
    /// itself change anything here, since matching and classifying never touch disk.
    pub fn find_changes(&mut self) -> HelixResult<Vec<PreSync>> {
        let decr_entries: Vec<_> = self
            .decr
            .get_entries(GetEntriesMode::All)?
            .into_iter()
            .filter(|e| !is_reserved_decr_path(e.relative_path()))
            .collect();
        let encr_entries: Vec<_> = self
            .encr
            .get_entries(GetEntriesMode::TopOnly)?
            .into_iter()
            .filter(|e| e.relative_path() != Path::new(ENCR_HEADER_FNAME))
            .collect();

        let mut presyncs = presync::match_three_way(&decr_entries, &encr_entries, &self.log, &self.name_encoder)?;

        let derived_key = self.derived_key.clone();
        let encr_root = self.encr.root().to_path_buf();
        presync::classify(&mut presyncs, &self.name_encoder, |encr_relative_path| {
            crate::codec::decrypt_header(encr_root.join(encr_relative_path), &derived_key)
        })?;

        let changed: Vec<PreSync> = presyncs.into_iter().filter(|p| p.sync_mode != presync::SyncMode::Unchanged).collect();
        sorter::sort_presyncs(changed)
    }

    /// Applies a single classified, ordered `PreSync` (C6). Callers must apply the batch
    /// `find_changes` returned in order; applying one item can change what the next item sees
    /// (e.g. a parent directory must exist on disk before a child file can be written under it).
    pub fn try_sync(&mut self, presync: &PreSync) -> SyncResult {
        executor::try_sync(presync, &mut self.decr, &mut self.encr, &mut self.log, &self.name_encoder, &self.derived_key)
    }

    pub fn decr_root(&self) -> &Path {
        self.decr.root()
    }

    pub fn encr_root(&self) -> &Path {
        self.encr.root()
    }

    pub fn what_if(&self) -> bool {
        self.decr.what_if()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presync::{DisplayOperation, SyncMode};
    use std::fs;

    fn init_key(seed: &str) -> InitialKey {
        InitialKey(sha512!(&seed.to_string().into()))
    }

    fn fast_key_deriv_spec_ext() -> KeyDerivSpecExt {
        KeyDerivSpecExt::Pbkdf2 {
            alg_opt: Some(Pbkdf2Algorithm::HmacSha512),
            num_iter_opt: Some(1),
            time_opt: None,
        }
    }

    #[test]
    fn init_then_open_round_trips() {
        let decr_dir = tmpdir!().unwrap();
        let encr_dir = tmpdir!().unwrap();

        DirectoryPair::init(decr_dir.path(), encr_dir.path(), init_key("passphrase"), fast_key_deriv_spec_ext()).unwrap();
        let opened = DirectoryPair::open(decr_dir.path(), encr_dir.path(), init_key("passphrase"));
        assert!(opened.is_ok());
    }

    #[test]
    fn open_with_wrong_passphrase_fails() {
        let decr_dir = tmpdir!().unwrap();
        let encr_dir = tmpdir!().unwrap();

        DirectoryPair::init(decr_dir.path(), encr_dir.path(), init_key("passphrase"), fast_key_deriv_spec_ext()).unwrap();
        let opened = DirectoryPair::open(decr_dir.path(), encr_dir.path(), init_key("wrong"));
        assert!(matches!(opened, Err(HelixErr::AuthenticationFail)));
    }

    #[test]
    fn open_against_mismatched_encrypted_side_fails() {
        let decr_dir = tmpdir!().unwrap();
        let encr_dir_a = tmpdir!().unwrap();
        let encr_dir_b = tmpdir!().unwrap();

        DirectoryPair::init(decr_dir.path(), encr_dir_a.path(), init_key("passphrase"), fast_key_deriv_spec_ext()).unwrap();
        let other_decr_dir = tmpdir!().unwrap();
        DirectoryPair::init(other_decr_dir.path(), encr_dir_b.path(), init_key("passphrase"), fast_key_deriv_spec_ext()).unwrap();

        let opened = DirectoryPair::open(decr_dir.path(), encr_dir_b.path(), init_key("passphrase"));
        assert!(matches!(opened, Err(HelixErr::DirectoryIdMismatch)));
    }

    #[test]
    fn find_changes_then_sync_round_trips_a_new_file() {
        let decr_dir = tmpdir!().unwrap();
        let encr_dir = tmpdir!().unwrap();
        let mut pair =
            DirectoryPair::init(decr_dir.path(), encr_dir.path(), init_key("passphrase"), fast_key_deriv_spec_ext()).unwrap();

        fs::write(decr_dir.path().join("hello.txt"), b"hello world").unwrap();
        pair.reset().unwrap();

        let changes = pair.find_changes().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].sync_mode, SyncMode::DecryptedSide);
        assert_eq!(changes[0].display_operation, DisplayOperation::Add);

        for presync in &changes {
            assert!(matches!(pair.try_sync(presync), SyncResult::Success));
        }

        pair.reset().unwrap();
        assert!(pair.find_changes().unwrap().is_empty());
    }

    #[test]
    fn quiescent_pair_has_no_changes() {
        let decr_dir = tmpdir!().unwrap();
        let encr_dir = tmpdir!().unwrap();
        let mut pair =
            DirectoryPair::init(decr_dir.path(), encr_dir.path(), init_key("passphrase"), fast_key_deriv_spec_ext()).unwrap();
        assert!(pair.find_changes().unwrap().is_empty());
    }
}
