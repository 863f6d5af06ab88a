use crate::{fs_util::*, prelude::*, secure_vec::*, util::*};
use rayon::prelude::*;
use std::{
    collections::HashSet,
    fs::{copy, create_dir_all},
    io::Read,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

///
pub fn find<P>(root: P) -> impl Iterator<Item = HelixResult<PathBuf>>
where
    P: AsRef<Path>,
{
    WalkDir::new(root).follow_links(true).into_iter().map(|entry| {
        entry
            .map(walkdir::DirEntry::into_path)
            .map_err(|err| HelixErr::Other(format!("{}", err)))
    })
}

/// None if path does not exist
pub fn hash_tree<P>(path: P) -> HelixResult<Option<CryptoSecureBytes>>
where
    P: AsRef<Path>,
{
    match path.as_ref().exists() {
        true => {
            let key_hash = sha512!(&b"SgG5U89uTcXiXqYA82H0zcCMbrmZw3wgfPJXeTROAEwzebmG9x268iGS8nuYWJLN"
                .to_vec()
                .into());

            let mut ctx = {
                let hmac_key = ring::hmac::Key::new(ring::hmac::HMAC_SHA512, key_hash.0.unsecure());
                ring::hmac::Context::with_key(&hmac_key)
            };

            let fail = walkdir::WalkDir::new(&path)
                .sort_by(|a, b| a.file_name().cmp(b.file_name()))
                .into_iter()
                .map(|entry_res| -> HelixResult<()> {
                    let entry = entry_res?;

                    let file_hash = hash_file(entry.path(), &key_hash)?;
                    ctx.update(file_hash.0.unsecure());

                    Ok(())
                })
                .any(|res| res.is_err());

            match fail {
                true => helix_err!(Other, "hashing failed".to_string()),
                false => Ok(Some(CryptoSecureBytes(ctx.clone().sign().as_ref().to_vec().into()))),
            }
        }
        false => Ok(None),
    }
}

/// HMAC over a single path's identity (file vs dir) and, for files, its content. Used by
/// `hash_tree` to fold a whole subtree into one digest.
fn hash_file<P>(path: P, key_hash: &CryptoSecureBytes) -> HelixResult<CryptoSecureBytes>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut ctx = {
        let hmac_key = ring::hmac::Key::new(ring::hmac::HMAC_SHA512, key_hash.0.unsecure());
        ring::hmac::Context::with_key(&hmac_key)
    };
    ctx.update(&[path.is_dir() as u8]);

    if path.is_file() {
        let mut file = fopen_r(path)?;
        let mut buffer = [0u8; BUFFER_SIZE];
        loop {
            match file.read(&mut buffer)? {
                0 => break,
                bytes_read => ctx.update(&buffer[..bytes_read]),
            }
        }
    }

    Ok(CryptoSecureBytes(ctx.sign().as_ref().to_vec().into()))
}

///
pub fn drng_range(num_bytes: usize, min: u8, max: u8) -> Vec<u8> {
    assert!(min < max);
    let seed = CryptoSecureBytes(vec![0u8; 32].into());

    let min = min as f64;
    let max = max as f64;
    let width = max - min;

    rng_seed!(&seed, num_bytes).0.unsecure()
        .iter()
        .copied()
        .map(|byte| byte as f64 / std::u8::MAX as f64)   // [0, 255] -> [0, 1]
        .map(|ratio| width * ratio)                      // [0, 1] -> [0, width]
        .map(|adjusted| (adjusted + min).round() as u8) // [0, width] -> [min, max]
        .collect()
}

///
fn parent_unwrap_safely<P>(path: &P) -> &Path
where
    P: AsRef<Path>,
{
    match path.as_ref().parent() {
        Some(par) => par,
        None => Path::new(""),
    }
}

pub fn dir_is_empty<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref().is_dir() && std::fs::read_dir(&path).unwrap().count() == 0
}

///
pub fn cp_r<P1, P2>(src: P1, out_dir: P2)
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let src_par = parent_unwrap_safely(&src);

    WalkDir::new(&src)
        .follow_links(false)
        .into_iter()
        .map(Result::unwrap)
        .for_each(|entry| {
            let pbuf = entry.path();
            let dest = {
                let rel_src_path = subpath(&pbuf, &src_par).unwrap();
                out_dir.as_ref().join(rel_src_path)
            };

            create_dir_all(parent_unwrap_safely(&dest)).unwrap();

            match entry.metadata().unwrap().is_dir() {
                true => create_dir_all(&pbuf).unwrap(),
                false => {
                    assert!(parent_unwrap_safely(&dest).exists());
                    copy(&pbuf, &dest).unwrap();
                }
            }
        });
}

///
pub fn basename<P>(path: P) -> Option<PathBuf>
where
    P: AsRef<Path>,
{
    path.as_ref().file_name()?.to_str().map(Path::new).map(Path::to_path_buf)
}

/// Check that two files are equivalent.
///
/// Two files are equivalent if all of the following properties of the two are the same:
/// 1. basename
/// 2. file content
/// 3. unix permission bits
fn assert_file_eq<P1, P2>(path_a: P1, path_b: P2)
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let path_a = path_a.as_ref();
    let path_b = path_b.as_ref();

    // both exist
    assert!(path_b.exists() && path_b.exists());
    // basename ==
    assert_eq!(basename(&path_a).unwrap(), basename(&path_b).unwrap());
    // permission bits ==
    assert_eq!(perm_bits(&path_a).unwrap(), perm_bits(&path_b).unwrap());

    //
    match (path_a.is_dir(), path_b.is_dir(), path_a.is_file(), path_b.is_file()) {
        (true, true, false, false) => (),
        (false, false, true, true) => {
            let bytes = |path| fopen_r(&path).unwrap().bytes().map(Result::unwrap);
            let bytes_a = bytes(path_a);
            let bytes_b = bytes(path_b);

            itertools::assert_equal(bytes_a, bytes_b);
        }
        _ => panic!(),
    }
}

/// inefficient, only use for testing
pub fn assert_tree_eq<P1, P2>(a: P1, b: P2)
where
    P1: AsRef<Path> + Sync,
    P2: AsRef<Path> + Sync,
{
    // basename ==
    assert_eq!(basename(&a), basename(&b));
    // permission bits ==
    assert_eq!(perm_bits(&a).unwrap(), perm_bits(&b).unwrap());

    match (a.as_ref().is_dir(), b.as_ref().is_dir()) {
        (false, false) => assert_file_eq(a, b),
        (true, true) => {
            let (a_paths, b_paths) = {
                let paths = |root| {
                    find(root)
                        .map(Result::unwrap)
                        .map(|p| subpath(&p, root).unwrap())
                        .collect::<HashSet<_>>()
                };
                (paths(a.as_ref()), paths(b.as_ref()))
            };
            if a_paths.len() != b_paths.len() {
                panic!();
            }

            {
                let dirs = |ps: &HashSet<PathBuf>| ps.par_iter().cloned().filter(|p| p.is_dir()).collect::<HashSet<_>>();
                let a_dirs = dirs(&a_paths);
                let b_dirs = dirs(&b_paths);
                if a_dirs != b_dirs {
                    panic!();
                }
            }
            let rel_paths = {
                let files = |ps: &HashSet<PathBuf>| ps.par_iter().cloned().filter(|p| p.is_file()).collect::<HashSet<_>>();
                let a_files = files(&a_paths);
                let b_files = files(&b_paths);
                if a_files != b_files {
                    panic!();
                }
                a_files // ok because these 2 sets are eq
            };

            rel_paths.into_par_iter().for_each(|rel_path| {
                let a_path = a.as_ref().join(&rel_path);
                let b_path = b.as_ref().join(&rel_path);

                assert_file_eq(&a_path, &b_path);
            });

            let a_hash = hash_tree(a).unwrap();
            let b_hash = hash_tree(b).unwrap();

            assert_eq!(a_hash, b_hash);
        }
        _ => panic!(),
    }
}
