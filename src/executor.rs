//! Applies a single classified, ordered `PreSync`: encrypts, decrypts, deletes, or purges, then
//! writes the resulting log entry. Never panics on an expected file-state failure; every error
//! comes back as `SyncResult::Failure` so the driver can keep going with the rest of the batch.
use crate::{
    codec::{self, EncrEntryType, EncryptOptions},
    nameenc::NameEncoder,
    overlay::{FSEntry, FSOverlay},
    prelude::*,
    presync::{DisplayOperation, PreSync, SyncMode},
    secure_vec::DerivedKey,
    synclog::{SyncLog, SyncLogEntry, SyncLogEntryType},
};
use filetime::{set_file_mtime, FileTime};
use std::{
    path::PathBuf,
    time::{Duration, SystemTime},
};

#[derive(Debug)]
pub enum SyncResult {
    Success,
    Failure(HelixErr),
}

/// Applies `presync` against the two overlays and the sync log. `decr`/`encr` must be the same
/// overlays `presync` was classified against; the caller is expected to have already `refresh_entry`d
/// anything a prior item in the batch touched.
pub fn try_sync(
    presync: &PreSync,
    decr: &mut FSOverlay,
    encr: &mut FSOverlay,
    log: &mut SyncLog,
    name_encoder: &NameEncoder,
    derived_key: &DerivedKey,
) -> SyncResult {
    match run(presync, decr, encr, log, name_encoder, derived_key) {
        Ok(()) => SyncResult::Success,
        Err(err) => SyncResult::Failure(err),
    }
}

fn run(
    presync: &PreSync,
    decr: &mut FSOverlay,
    encr: &mut FSOverlay,
    log: &mut SyncLog,
    name_encoder: &NameEncoder,
    derived_key: &DerivedKey,
) -> HelixResult<()> {
    match presync.sync_mode {
        SyncMode::Unchanged => Ok(()),
        SyncMode::Unknown => helix_err!(UnclassifiedEntry, presync.encr_file_name.clone()),
        SyncMode::Conflict => helix_err!(
            Other,
            format!(
                "{:?} changed on both sides; conflict requires a resolution choice before it can be applied",
                presync.decr_file_name
            )
        ),
        SyncMode::Match => apply_match(presync, decr, encr, log),
        SyncMode::DecryptedSide => apply_decrypted_side(presync, decr, encr, log, name_encoder, derived_key),
        SyncMode::EncryptedSide => apply_encrypted_side(presync, decr, encr, log, name_encoder, derived_key),
    }
}

fn decr_name(presync: &PreSync) -> HelixResult<PathBuf> {
    presync
        .decr_file_name
        .clone()
        .ok_or_else(|| HelixErr::UnclassifiedEntry(presync.encr_file_name.clone()))
}

/// Both sides already agree (or a delete on one side already reflects the other); just record
/// the current state. No I/O beyond the log append.
fn apply_match(presync: &PreSync, decr: &mut FSOverlay, encr: &mut FSOverlay, log: &mut SyncLog) -> HelixResult<()> {
    let decr_file_name = decr_name(presync)?;
    let decr_entry = decr.try_get_entry(&decr_file_name)?;
    let decr_modified_utc = decr_entry.as_ref().and_then(|e| e.last_write_time_utc());
    let encr_modified_utc = encr.try_get_entry(&presync.encr_file_name)?.and_then(|e| e.last_write_time_utc());
    let entry_type = match decr_entry {
        Some(FSEntry::Directory { .. }) => SyncLogEntryType::Directory,
        Some(FSEntry::File { .. }) => SyncLogEntryType::File,
        Some(FSEntry::Removed { .. }) | Some(FSEntry::Purged { .. }) | None => SyncLogEntryType::Removed,
    };

    log.add(SyncLogEntry {
        entry_type,
        decr_file_name,
        decr_modified_utc,
        encr_file_name: presync.encr_file_name.clone(),
        encr_modified_utc,
    })
}

/// Propagates a decrypted-side change (Add/Change/Remove) out to the encrypted side.
fn apply_decrypted_side(
    presync: &PreSync,
    decr: &mut FSOverlay,
    encr: &mut FSOverlay,
    log: &mut SyncLog,
    name_encoder: &NameEncoder,
    derived_key: &DerivedKey,
) -> HelixResult<()> {
    let decr_file_name = decr_name(presync)?;

    if presync.display_operation == DisplayOperation::Remove {
        if let Some(encr_entry) = encr.try_get_entry(&presync.encr_file_name)? {
            if !encr_entry.is_removed() && !encr_entry.is_purged() {
                encr.delete_file(&encr_entry)?;
            }
        }
        return log.add(SyncLogEntry {
            entry_type: SyncLogEntryType::Removed,
            decr_file_name,
            decr_modified_utc: None,
            encr_file_name: presync.encr_file_name.clone(),
            encr_modified_utc: None,
        });
    }

    let decr_entry = decr
        .try_get_entry(&decr_file_name)?
        .ok_or_else(|| HelixErr::Other(format!("{:?} vanished before it could be encrypted", decr_file_name)))?;
    let entry_type = match decr_entry {
        FSEntry::Directory { .. } => EncrEntryType::Directory,
        _ => EncrEntryType::File,
    };

    let decr_abs = decr.root().join(&decr_file_name);
    let encr_abs = encr.root().join(&presync.encr_file_name);
    codec::encrypt_file(
        &decr_abs,
        &encr_abs,
        derived_key,
        EncryptOptions {
            stored_file_name: decr_file_name.clone(),
            entry_type,
        },
    )?;

    let prior_encr_modified = log.find_by_decr_file_name(&decr_file_name).and_then(|e| e.encr_modified_utc);
    enforce_min_mtime_advance(&encr_abs, prior_encr_modified)?;

    let refreshed_encr = encr.refresh_entry(&presync.encr_file_name)?;
    let encr_modified_utc = refreshed_encr.and_then(|e| e.last_write_time_utc());

    let log_entry_type = match entry_type {
        EncrEntryType::File => SyncLogEntryType::File,
        EncrEntryType::Directory => SyncLogEntryType::Directory,
    };
    log.add(SyncLogEntry {
        entry_type: log_entry_type,
        decr_file_name,
        decr_modified_utc: decr_entry.last_write_time_utc(),
        encr_file_name: presync.encr_file_name.clone(),
        encr_modified_utc,
    })
}

/// Ensures invariant 6: a freshly written encrypted blob's on-disk mtime advances by at least
/// `MIN_MTIME_ADVANCE_MS` past the previously logged one, so filesystem time-quantization never
/// makes a real update look unchanged to the next run's classifier.
fn enforce_min_mtime_advance(encr_abs: &std::path::Path, prior_encr_modified: Option<SystemTime>) -> HelixResult<()> {
    let prior = match prior_encr_modified {
        Some(t) => t,
        None => return Ok(()),
    };
    let current = std::fs::symlink_metadata(encr_abs)?.modified()?;
    let gap = current.duration_since(prior).unwrap_or(Duration::from_millis(0));
    if gap < Duration::from_millis(MIN_MTIME_ADVANCE_MS as u64) {
        let advanced = prior + Duration::from_millis(MIN_MTIME_ADVANCE_MS as u64);
        set_file_mtime(encr_abs, FileTime::from_system_time(advanced))?;
    }
    Ok(())
}

/// Propagates an encrypted-side change (Add/Change/Remove/Purge) in to the decrypted side.
fn apply_encrypted_side(
    presync: &PreSync,
    decr: &mut FSOverlay,
    encr: &mut FSOverlay,
    log: &mut SyncLog,
    name_encoder: &NameEncoder,
    derived_key: &DerivedKey,
) -> HelixResult<()> {
    if presync.display_operation == DisplayOperation::Purge {
        let decr_file_name = decr_name(presync)?;
        return log.add(SyncLogEntry {
            entry_type: SyncLogEntryType::Removed,
            decr_file_name,
            decr_modified_utc: None,
            encr_file_name: presync.encr_file_name.clone(),
            encr_modified_utc: None,
        });
    }

    if presync.display_operation == DisplayOperation::Remove {
        let decr_file_name = decr_name(presync)?;
        if let Some(decr_entry) = decr.try_get_entry(&decr_file_name)? {
            match decr_entry {
                FSEntry::Directory { .. } => decr.delete_directory(&decr_entry, true)?,
                FSEntry::File { .. } => decr.delete_file(&decr_entry)?,
                FSEntry::Removed { .. } | FSEntry::Purged { .. } => {}
            }
        }
        return log.add(SyncLogEntry {
            entry_type: SyncLogEntryType::Removed,
            decr_file_name,
            decr_modified_utc: None,
            encr_file_name: presync.encr_file_name.clone(),
            encr_modified_utc: None,
        });
    }

    let header = presync
        .encr_header
        .clone()
        .ok_or_else(|| HelixErr::HeaderDecryptFailed(format!("no header recovered for {:?}", presync.encr_file_name)))?;
    if name_encoder.encode(&header.file_name)? != presync.encr_file_name {
        helix_err!(NameRoundTripMismatch, presync.encr_file_name.clone())?;
    }
    let decr_file_name = header.file_name.clone();

    let encr_entry = encr
        .try_get_entry(&presync.encr_file_name)?
        .ok_or_else(|| HelixErr::Other(format!("{:?} vanished before it could be decrypted", presync.encr_file_name)))?;
    let target = SyncLogEntry {
        entry_type: match header.entry_type {
            EncrEntryType::File => SyncLogEntryType::File,
            EncrEntryType::Directory => SyncLogEntryType::Directory,
        },
        decr_file_name: decr_file_name.clone(),
        decr_modified_utc: Some(header.last_write_time_utc),
        encr_file_name: presync.encr_file_name.clone(),
        encr_modified_utc: encr_entry.last_write_time_utc(),
    };

    if log.find_by_decr_file_name(&decr_file_name) == Some(&target) {
        return Ok(());
    }

    if let Some(existing) = decr.try_get_entry(&decr_file_name)? {
        if !existing.is_removed() && !existing.is_purged() {
            let same_path = existing.relative_path() == decr_file_name.as_path();
            if !same_path {
                helix_err!(CaseOnlyConflict, decr_file_name)?;
            }
        }
    }

    let decr_abs = decr.root().join(&decr_file_name);
    let encr_abs = encr.root().join(&presync.encr_file_name);
    codec::decrypt_file(&encr_abs, &decr_abs, derived_key)?;
    decr.refresh_entry(&decr_file_name)?;

    log.add(target)
}
