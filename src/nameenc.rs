//! Deterministic mapping from decrypted relative paths to encrypted-side filenames.
use crate::{
    encoder::{openssl::*, text::*},
    prelude::*,
    secure_vec::*,
    util::*,
};
use std::path::{Path, PathBuf};

/// Flat encrypted directory: no spread-dir chunking, every entry lives at the top level of the
/// encrypted side. The cipher's IV is seeded from the plaintext path itself.
pub struct NameEncoder {
    derived_key: DerivedKey,
}

impl NameEncoder {
    pub fn new(derived_key: DerivedKey) -> Self {
        Self { derived_key }
    }

    /// Deterministic given `derived_key`: the same relative path always encodes to the same
    /// ciphertext filename, which is what makes the three-way matcher's join well-defined.
    pub fn encode<P>(&self, decr_relative_path: P) -> HelixResult<PathBuf>
    where
        P: AsRef<Path>,
    {
        let rel_path_str = path_as_str(decr_relative_path.as_ref())
            .ok_or_else(|| HelixErr::Other(format!("{:?} is not valid utf8", decr_relative_path.as_ref())))?;

        let iv_seed = sha512!(&rel_path_str.clone().into());
        let key_hash = &self.derived_key.0;

        let ciphertext = compose_encoders!(
            rel_path_str.as_bytes(),
            Aes256CbcEnc => (key_hash, Some(&iv_seed)),
            TextEncoder => &BASE32PATH
        )?
        .as_string()?;

        Ok(PathBuf::from(format!("{}.{}", ciphertext, ENCR_FILE_SUFFIX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn key(seed: &str) -> DerivedKey {
        DerivedKey(sha512!(&seed.to_string().into()))
    }

    #[test]
    fn deterministic() {
        let enc = NameEncoder::new(key("passphrase"));
        let a = enc.encode("a/b.txt").unwrap();
        let b = enc.encode("a/b.txt").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinguishes_paths() {
        let enc = NameEncoder::new(key("passphrase"));
        let a = enc.encode("a/b.txt").unwrap();
        let b = enc.encode("a/c.txt").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn distinguishes_keys() {
        let a = NameEncoder::new(key("one")).encode("a/b.txt").unwrap();
        let b = NameEncoder::new(key("two")).encode("a/b.txt").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn suffix_is_stable() {
        let enc = NameEncoder::new(key("passphrase"));
        let encoded = enc.encode("x").unwrap();
        assert_eq!(encoded.extension().and_then(|e| e.to_str()), Some(ENCR_FILE_SUFFIX));
    }

    /// `data-encoding`'s `BASE32PATH` alphabet never contains `/`, so every encoded filename is a
    /// single path component regardless of how deep the decrypted path was.
    #[test]
    fn injective_over_many_paths() {
        let enc = NameEncoder::new(key("passphrase"));
        let paths = vec!["a", "a/b", "a/b/c", "a.txt", "a/b.txt", "z/y/x.bin"];
        let encoded: Vec<_> = paths.iter().map(|p| enc.encode(p).unwrap()).collect();
        assert_eq!(encoded.iter().unique().count(), paths.len());
        assert!(encoded.iter().all(|p| p.components().count() == 1));
    }
}
