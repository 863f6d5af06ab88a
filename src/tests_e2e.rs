//! End-to-end scenarios driving `DirectoryPair` directly against real temporary directories,
//! without going through the CLI. `S1`-`S7` below name the scenarios they exercise.
//!
//! `S2` (encrypted-side-only add) and `S7` (purge of a stale blob with no matching decrypted
//! entry) are exercised at the unit level in `codec.rs`/`executor.rs`/`presync.rs` instead of
//! here, since reproducing either setup from scratch requires reaching past `DirectoryPair`'s
//! private key material into the raw blob format.
use crate::{
    executor::SyncResult,
    prelude::*,
    presync::{DisplayOperation, PreSync, SyncMode},
    repo::DirectoryPair,
    secure_vec::*,
    specs::prelude::*,
};
use filetime::{set_file_mtime, FileTime};
use std::{fs, path::Path, time::Duration};

fn init_key(passphrase: &str) -> InitialKey {
    InitialKey(sha512!(&passphrase.to_string().into()))
}

/// `Pbkdf2` with a single iteration so these tests don't pay real key-stretching cost.
fn fast_key_deriv_spec_ext() -> KeyDerivSpecExt {
    KeyDerivSpecExt::Pbkdf2 {
        alg_opt: Some(Pbkdf2Algorithm::HmacSha512),
        num_iter_opt: Some(1),
        time_opt: None,
    }
}

fn init_pair(decr_dir: &Path, encr_dir: &Path) -> DirectoryPair {
    DirectoryPair::init(decr_dir, encr_dir, init_key("correct horse battery staple"), fast_key_deriv_spec_ext()).unwrap()
}

fn only_blob(encr_dir: &Path) -> std::path::PathBuf {
    fs::read_dir(encr_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.file_name().and_then(|n| n.to_str()) != Some(ENCR_HEADER_FNAME))
        .expect("exactly one blob expected on the encrypted side")
}

fn bump_mtime(path: &Path) {
    let current = fs::metadata(path).unwrap().modified().unwrap();
    set_file_mtime(path, FileTime::from_system_time(current + Duration::from_secs(10))).unwrap();
}

fn apply_all(pair: &mut DirectoryPair, changes: &[PreSync]) -> Vec<SyncResult> {
    changes.iter().map(|presync| pair.try_sync(presync)).collect()
}

/// S1: a brand-new decrypted file with nothing on the encrypted side or in the log becomes a
/// single `DecryptedSide`/`Add`, and applying it leaves the pair quiescent.
#[test]
fn s1_decrypted_side_add() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());

    fs::write(decr_dir.path().join("a_b.txt"), b"ten bytes!").unwrap();
    pair.reset().unwrap();

    let changes = pair.find_changes().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].sync_mode, SyncMode::DecryptedSide);
    assert_eq!(changes[0].display_operation, DisplayOperation::Add);

    let results = apply_all(&mut pair, &changes);
    assert!(results.iter().all(|r| matches!(r, SyncResult::Success)));
    assert!(only_blob(encr_dir.path()).exists());

    pair.reset().unwrap();
    assert!(pair.find_changes().unwrap().is_empty());
}

/// S3: both sides already agree with the log, so the pair reports no changes at all.
#[test]
fn s3_matching_state_is_unchanged() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());

    fs::write(decr_dir.path().join("x"), b"steady state").unwrap();
    pair.reset().unwrap();
    let changes = pair.find_changes().unwrap();
    apply_all(&mut pair, &changes);

    pair.reset().unwrap();
    assert!(pair.find_changes().unwrap().is_empty());
}

/// S4: touching the decrypted file after a successful sync produces a `DecryptedSide`/`Change`
/// that re-encrypts and overwrites the prior log entry.
#[test]
fn s4_decrypted_side_change() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());

    let decr_path = decr_dir.path().join("x");
    fs::write(&decr_path, b"version one").unwrap();
    pair.reset().unwrap();
    apply_all(&mut pair, &pair.find_changes().unwrap());

    fs::write(&decr_path, b"version two, longer than the first").unwrap();
    bump_mtime(&decr_path);
    pair.reset().unwrap();

    let changes = pair.find_changes().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].sync_mode, SyncMode::DecryptedSide);
    assert_eq!(changes[0].display_operation, DisplayOperation::Change);

    let results = apply_all(&mut pair, &changes);
    assert!(results.iter().all(|r| matches!(r, SyncResult::Success)));

    pair.reset().unwrap();
    assert!(pair.find_changes().unwrap().is_empty());
}

/// S5: deleting a previously-synced decrypted file produces a `DecryptedSide`/`Remove` that
/// deletes the encrypted blob and appends a `Removed` tombstone.
#[test]
fn s5_decrypted_side_remove() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());

    let decr_path = decr_dir.path().join("x");
    fs::write(&decr_path, b"soon to be deleted").unwrap();
    pair.reset().unwrap();
    apply_all(&mut pair, &pair.find_changes().unwrap());
    let blob_path = only_blob(encr_dir.path());

    fs::remove_file(&decr_path).unwrap();
    pair.reset().unwrap();

    let changes = pair.find_changes().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].sync_mode, SyncMode::DecryptedSide);
    assert_eq!(changes[0].display_operation, DisplayOperation::Remove);

    let results = apply_all(&mut pair, &changes);
    assert!(results.iter().all(|r| matches!(r, SyncResult::Success)));
    assert!(!blob_path.exists());

    pair.reset().unwrap();
    assert!(pair.find_changes().unwrap().is_empty());
}

/// S6: both sides change since the last sync, to genuinely different states, at a moment the
/// classifier can't reconcile on its own. The executor refuses to apply it.
#[test]
fn s6_conflict_is_refused() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());

    let decr_path = decr_dir.path().join("x");
    fs::write(&decr_path, b"shared ancestor").unwrap();
    pair.reset().unwrap();
    apply_all(&mut pair, &pair.find_changes().unwrap());
    let blob_path = only_blob(encr_dir.path());

    // decrypted side changes...
    fs::write(&decr_path, b"decrypted side's version").unwrap();
    bump_mtime(&decr_path);
    // ...and so does the encrypted side, independently, without going through the codec.
    bump_mtime(&blob_path);
    pair.reset().unwrap();

    let changes = pair.find_changes().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].sync_mode, SyncMode::Conflict);
    assert_eq!(changes[0].display_operation, DisplayOperation::Error);

    assert!(matches!(pair.try_sync(&changes[0]), SyncResult::Failure(_)));
}

/// A directory add and a nested file add land in the same batch; the sorter must place the
/// directory first so the file's parent exists when it's applied.
#[test]
fn nested_directory_and_file_add_together() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());

    fs::create_dir_all(decr_dir.path().join("nested")).unwrap();
    fs::write(decr_dir.path().join("nested").join("f.txt"), b"inside a fresh dir").unwrap();
    pair.reset().unwrap();

    let changes = pair.find_changes().unwrap();
    assert_eq!(changes.len(), 2);

    let results = apply_all(&mut pair, &changes);
    assert!(results.iter().all(|r| matches!(r, SyncResult::Success)));

    pair.reset().unwrap();
    assert!(pair.find_changes().unwrap().is_empty());
}

/// Whole-run idempotence (§8, quantified invariant 5): a batch mixing an add, a change, and a
/// remove all converge in one pass.
#[test]
fn mixed_batch_converges_in_one_pass() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());

    fs::write(decr_dir.path().join("keep_changing"), b"v1").unwrap();
    fs::write(decr_dir.path().join("keep_removing"), b"will be deleted").unwrap();
    pair.reset().unwrap();
    apply_all(&mut pair, &pair.find_changes().unwrap());

    fs::write(decr_dir.path().join("keep_changing"), b"v2").unwrap();
    bump_mtime(&decr_dir.path().join("keep_changing"));
    fs::remove_file(decr_dir.path().join("keep_removing")).unwrap();
    fs::write(decr_dir.path().join("brand_new"), b"fresh add").unwrap();
    pair.reset().unwrap();

    let changes = pair.find_changes().unwrap();
    assert_eq!(changes.len(), 3);

    let results = apply_all(&mut pair, &changes);
    assert!(results.iter().all(|r| matches!(r, SyncResult::Success)));

    pair.reset().unwrap();
    assert!(pair.find_changes().unwrap().is_empty());
}

/// Dry-run equivalence (§8, quantified invariant 6): a what-if pair classifies the same way a
/// real one would from the same starting state, and never touches disk.
#[test]
fn what_if_pair_does_not_touch_disk() {
    let decr_dir = tmpdir!().unwrap();
    let encr_dir = tmpdir!().unwrap();
    let mut pair = init_pair(decr_dir.path(), encr_dir.path());
    fs::write(decr_dir.path().join("x"), b"hello").unwrap();
    pair.reset().unwrap();

    assert!(!pair.what_if());
    let changes = pair.find_changes().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].sync_mode, SyncMode::DecryptedSide);
    assert_eq!(changes[0].display_operation, DisplayOperation::Add);

    // Classification alone never writes to either side, what-if or not.
    assert_eq!(fs::read_dir(encr_dir.path()).unwrap().count(), 1); // only the header file
}
