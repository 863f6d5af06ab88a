//! The per-file reconciliation record (`PreSync`) and the two passes that build it: the
//! three-way matcher, which joins encrypted-FS, decrypted-FS and sync-log state together, and the
//! change classifier, which turns that join into a `SyncMode` and a `DisplayOperation`.
use crate::{
    codec::{EncrEntryType, EncrHeader},
    nameenc::NameEncoder,
    overlay::FSEntry,
    prelude::*,
    synclog::{SyncLog, SyncLogEntry, SyncLogEntryType},
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// What a `PreSync` resolved to after comparing all three sources.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncMode {
    Unchanged,
    Match,
    Conflict,
    DecryptedSide,
    EncryptedSide,
    Unknown,
}

/// The concrete action implied by a non-`Unchanged`/`Match` `SyncMode`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayOperation {
    None,
    Add,
    Remove,
    Change,
    Purge,
    Error,
}

/// What kind of thing `display_file_length`/the operation is about, independent of which side
/// actually drives the change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayEntryType {
    File,
    Directory,
    Removed,
    Purged,
}

/// A per-file reconciliation record assembled from decrypted FS, encrypted FS, and the sync log.
#[derive(Clone, Debug)]
pub struct PreSync {
    pub decr_file_name: Option<PathBuf>,
    pub encr_file_name: PathBuf,
    pub log_entry: Option<SyncLogEntry>,
    pub decr_info: Option<FSEntry>,
    pub encr_info: Option<FSEntry>,
    pub encr_header: Option<EncrHeader>,
    pub sync_mode: SyncMode,
    pub display_operation: DisplayOperation,
    pub display_entry_type: DisplayEntryType,
    pub display_file_length: u64,
}

impl PreSync {
    fn seed_from_log(entry: &SyncLogEntry) -> Self {
        Self {
            decr_file_name: Some(entry.decr_file_name.clone()),
            encr_file_name: entry.encr_file_name.clone(),
            log_entry: Some(entry.clone()),
            decr_info: None,
            encr_info: None,
            encr_header: None,
            sync_mode: SyncMode::Unchanged,
            display_operation: DisplayOperation::None,
            display_entry_type: DisplayEntryType::Removed,
            display_file_length: 0,
        }
    }
}

fn is_removed_or_absent(entry: &Option<FSEntry>) -> bool {
    match entry {
        None => true,
        Some(e) => e.is_removed() || e.is_purged(),
    }
}

/// `decr_changed` per §4.4's truth table.
fn decr_changed(log_entry: Option<&SyncLogEntry>, decr_info: Option<&FSEntry>) -> bool {
    match (log_entry, decr_info) {
        (None, None) => false,
        (None, Some(e)) if e.is_removed() || e.is_purged() => false,
        (None, Some(_)) => true,
        (Some(log), Some(d)) if log.entry_type == SyncLogEntryType::Removed && (d.is_removed() || d.is_purged()) => false,
        (Some(log), Some(d)) if !d.is_removed() && !d.is_purged() => {
            let same_type = matches!(
                (&log.entry_type, d),
                (SyncLogEntryType::File, FSEntry::File { .. }) | (SyncLogEntryType::Directory, FSEntry::Directory { .. })
            );
            !(same_type && log.decr_file_name == *d.relative_path() && log.decr_modified_utc == d.last_write_time_utc())
        }
        _ => true,
    }
}

/// Outcome of the `encr_changed` truth table; `Orphan` is the "log present non-removed but
/// encr_info missing" row, surfaced as a first-class error rather than raised as an exception.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EncrChange {
    Unchanged,
    Changed,
    Orphan,
}

fn encr_changed(log_entry: Option<&SyncLogEntry>, encr_info: Option<&FSEntry>) -> EncrChange {
    match (log_entry, encr_info) {
        (None, None) => EncrChange::Unchanged,
        (None, Some(e)) if e.is_removed() || e.is_purged() => EncrChange::Unchanged,
        (None, Some(_)) => EncrChange::Changed,
        (Some(log), None) if log.entry_type == SyncLogEntryType::Removed => EncrChange::Changed,
        (Some(_), None) => EncrChange::Orphan,
        (Some(log), Some(e)) if !e.is_removed() && !e.is_purged() => {
            match log.encr_file_name == *e.relative_path() && log.encr_modified_utc == e.last_write_time_utc() {
                true => EncrChange::Unchanged,
                false => EncrChange::Changed,
            }
        }
        _ => EncrChange::Changed,
    }
}

/// Joins encrypted-FS entries, decrypted-FS entries, and the sync log into a list of `PreSync`.
/// Purely in-memory; never reads file contents.
pub fn match_three_way(
    decr_entries: &[FSEntry],
    encr_entries: &[FSEntry],
    log: &SyncLog,
    name_encoder: &NameEncoder,
) -> HelixResult<Vec<PreSync>> {
    let mut presyncs: Vec<PreSync> = log.latest_entries().into_iter().map(PreSync::seed_from_log).collect();

    let mut by_decr_name: HashMap<PathBuf, usize> = presyncs
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.decr_file_name.clone().map(|n| (n, i)))
        .collect();

    for decr_entry in decr_entries {
        let name = decr_entry.relative_path().to_path_buf();
        match by_decr_name.get(&name) {
            Some(&i) => presyncs[i].decr_info = Some(decr_entry.clone()),
            None => {
                let encr_file_name = name_encoder.encode(&name)?;
                let idx = presyncs.len();
                presyncs.push(PreSync {
                    decr_file_name: Some(name.clone()),
                    encr_file_name,
                    log_entry: None,
                    decr_info: Some(decr_entry.clone()),
                    encr_info: None,
                    encr_header: None,
                    sync_mode: SyncMode::Unchanged,
                    display_operation: DisplayOperation::None,
                    display_entry_type: DisplayEntryType::Removed,
                    display_file_length: 0,
                });
                by_decr_name.insert(name, idx);
            }
        }
    }

    let mut by_encr_name: HashMap<PathBuf, usize> = presyncs
        .iter()
        .enumerate()
        .map(|(i, p)| (p.encr_file_name.clone(), i))
        .collect();

    for encr_entry in encr_entries {
        let name = encr_entry.relative_path().to_path_buf();
        match by_encr_name.get(&name) {
            Some(&i) => presyncs[i].encr_info = Some(encr_entry.clone()),
            None => {
                let idx = presyncs.len();
                presyncs.push(PreSync {
                    decr_file_name: None,
                    encr_file_name: name.clone(),
                    log_entry: None,
                    decr_info: None,
                    encr_info: Some(encr_entry.clone()),
                    encr_header: None,
                    sync_mode: SyncMode::Unchanged,
                    display_operation: DisplayOperation::None,
                    display_entry_type: DisplayEntryType::Removed,
                    display_file_length: 0,
                });
                by_encr_name.insert(name, idx);
            }
        }
    }

    Ok(presyncs)
}

fn entry_kind_matches(decr: &FSEntry, header: &EncrHeader) -> bool {
    matches!(
        (decr, header.entry_type),
        (FSEntry::File { .. }, EncrEntryType::File) | (FSEntry::Directory { .. }, EncrEntryType::Directory)
    )
}

/// Determines `sync_mode` for a single `PreSync`, given whatever `encr_header` has been fetched
/// so far (may be `None` on the first pass).
fn determine_sync_mode(presync: &PreSync) -> (SyncMode, bool) {
    let d_changed = decr_changed(presync.log_entry.as_ref(), presync.decr_info.as_ref());
    let e_change = encr_changed(presync.log_entry.as_ref(), presync.encr_info.as_ref());

    if e_change == EncrChange::Orphan {
        return (SyncMode::Unknown, d_changed);
    }
    let e_changed = e_change == EncrChange::Changed;

    let mode = match (d_changed, e_changed) {
        (false, false) => SyncMode::Unchanged,
        (true, true) => match (&presync.decr_info, &presync.encr_header) {
            (Some(d), _) if d.is_removed() || d.is_purged() => {
                if presync.encr_header.is_none() {
                    SyncMode::Match
                } else {
                    SyncMode::Conflict
                }
            }
            (None, _) if presync.encr_header.is_none() => SyncMode::Match,
            (Some(d), Some(header)) => {
                if Some(header.last_write_time_utc) == d.last_write_time_utc() && entry_kind_matches(d, header) {
                    SyncMode::Match
                } else {
                    SyncMode::Conflict
                }
            }
            _ => SyncMode::Conflict,
        },
        (false, true) => SyncMode::EncryptedSide,
        (true, false) => SyncMode::DecryptedSide,
    };
    (mode, d_changed)
}

fn display_operation_for(presync: &PreSync, mode: SyncMode) -> DisplayOperation {
    match mode {
        SyncMode::Match | SyncMode::Unchanged => DisplayOperation::None,
        SyncMode::Conflict | SyncMode::Unknown => DisplayOperation::Error,
        SyncMode::DecryptedSide => {
            if is_removed_or_absent(&presync.decr_info) {
                DisplayOperation::Remove
            } else if is_removed_or_absent(&presync.encr_info) {
                DisplayOperation::Add
            } else {
                DisplayOperation::Change
            }
        }
        SyncMode::EncryptedSide => {
            let log_says_removed = presync
                .log_entry
                .as_ref()
                .map(|l| l.entry_type == SyncLogEntryType::Removed)
                .unwrap_or(false);
            if is_removed_or_absent(&presync.encr_info) && log_says_removed {
                DisplayOperation::Purge
            } else if is_removed_or_absent(&presync.encr_info) {
                DisplayOperation::Remove
            } else if is_removed_or_absent(&presync.decr_info) {
                DisplayOperation::Add
            } else {
                DisplayOperation::Change
            }
        }
    }
}

fn display_shape(presync: &PreSync) -> (DisplayEntryType, u64) {
    match presync.display_operation {
        DisplayOperation::Purge => (DisplayEntryType::Purged, 0),
        DisplayOperation::Remove => (DisplayEntryType::Removed, 0),
        _ => match presync.sync_mode {
            SyncMode::DecryptedSide | SyncMode::Match | SyncMode::Unchanged if presync.decr_info.is_some() => {
                match presync.decr_info.as_ref().unwrap() {
                    FSEntry::File { length, .. } => (DisplayEntryType::File, *length),
                    FSEntry::Directory { .. } => (DisplayEntryType::Directory, 0),
                    FSEntry::Removed { .. } => (DisplayEntryType::Removed, 0),
                    FSEntry::Purged { .. } => (DisplayEntryType::Purged, 0),
                }
            }
            _ => match &presync.encr_header {
                Some(header) => match header.entry_type {
                    EncrEntryType::File => (DisplayEntryType::File, header.length),
                    EncrEntryType::Directory => (DisplayEntryType::Directory, 0),
                },
                None => (DisplayEntryType::Removed, 0),
            },
        },
    }
}

/// Classifies every `PreSync` in place: runs a first pass using only FS/log state, fetches
/// `encr_header` for every record with `encr_info` via `header_fetch`, then re-runs classification
/// with headers available, matching §4.4's two-pass description.
pub fn classify<F>(presyncs: &mut [PreSync], name_encoder: &NameEncoder, mut header_fetch: F) -> HelixResult<()>
where
    F: FnMut(&Path) -> HelixResult<EncrHeader>,
{
    for presync in presyncs.iter_mut() {
        if let Some(encr_info) = &presync.encr_info {
            match header_fetch(encr_info.relative_path()) {
                Ok(header) => {
                    if presync.decr_file_name.is_none() {
                        let round_trip = name_encoder.encode(&header.file_name)?;
                        if round_trip == *encr_info.relative_path() {
                            presync.decr_file_name = Some(header.file_name.clone());
                        }
                    }
                    presync.encr_header = Some(header);
                }
                Err(_) => presync.encr_header = None,
            }
        }

        let (mode, _) = determine_sync_mode(presync);
        presync.sync_mode = mode;
        presync.display_operation = display_operation_for(presync, mode);
        let (entry_type, length) = display_shape(presync);
        presync.display_entry_type = entry_type;
        presync.display_file_length = length;
    }
    Ok(())
}
