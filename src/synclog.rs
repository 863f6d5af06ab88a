//! Append-only record of the last-known synced state per decrypted path.
use crate::{fs_util::*, prelude::*, util::*};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Kind of a `SyncLogEntry`; `Removed` is a tombstone recording that a name used to exist.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SyncLogEntryType {
    File,
    Directory,
    Removed,
}

/// Immutable once appended; records the state of both sides as of the last successful sync of
/// this logical path.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SyncLogEntry {
    pub entry_type: SyncLogEntryType,
    pub decr_file_name: PathBuf,
    pub decr_modified_utc: Option<SystemTime>,
    pub encr_file_name: PathBuf,
    pub encr_modified_utc: Option<SystemTime>,
}

/// Backed by a single append-only file in the decrypted side's reserved subdirectory. Each
/// record is `bincode`-serialized and length-prefixed, mirroring the `ser`/`deser` framing this
/// codebase's codec already uses for its own metadata blobs.
pub struct SyncLog {
    path: PathBuf,
    entries: Vec<SyncLogEntry>,
    by_decr_name: HashMap<PathBuf, usize>,
}

impl SyncLog {
    /// Opens (creating if absent) the sync log at `path` and loads it into memory.
    pub fn open<P>(path: P) -> HelixResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fopen_w(&path)?;
        }
        let mut log = Self {
            path,
            entries: Vec::new(),
            by_decr_name: HashMap::new(),
        };
        log.reload()?;
        Ok(log)
    }

    /// Re-reads the log file from disk and rebuilds the `decr_file_name` index, keeping the
    /// last occurrence per name.
    pub fn reload(&mut self) -> HelixResult<()> {
        let mut file = fopen_r(&self.path)?;
        let mut entries = Vec::new();
        while let Some(entry) = read_record::<_, SyncLogEntry>(&mut file)? {
            entries.push(entry);
        }

        let mut by_decr_name = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_decr_name.insert(entry.decr_file_name.clone(), i);
        }

        self.entries = entries;
        self.by_decr_name = by_decr_name;
        Ok(())
    }

    /// Appends `entry` to both the in-memory index and the persisted file.
    pub fn add(&mut self, entry: SyncLogEntry) -> HelixResult<()> {
        let mut file = std::fs::OpenOptions::new().append(true).open(&self.path)?;
        write_record(&mut file, &entry)?;
        file.sync_all()?;

        self.by_decr_name.insert(entry.decr_file_name.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn find_by_decr_file_name<P>(&self, name: P) -> Option<&SyncLogEntry>
    where
        P: AsRef<Path>,
    {
        self.by_decr_name.get(name.as_ref()).map(|&i| &self.entries[i])
    }

    /// One entry per distinct `decr_file_name`, the most recent in each case. This is what the
    /// three-way matcher seeds its `PreSync` list from, rather than the raw append-only history.
    pub fn latest_entries(&self) -> Vec<&SyncLogEntry> {
        self.by_decr_name.values().map(|&i| &self.entries[i]).collect()
    }

    pub fn entries(&self) -> &[SyncLogEntry] {
        &self.entries
    }

    /// Atomically rewrites the log file to contain exactly the entries currently in memory,
    /// compacting away superseded records. Write-to-temp-then-rename, as the rest of this
    /// codebase does for anything meant to be crash-safe.
    pub fn compact(&mut self) -> HelixResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tmpfile!(dir)?;
        {
            let file = tmp.as_file_mut();
            for entry in &self.entries {
                write_record(file, entry)?;
            }
            file.sync_all()?;
        }
        tmp.persist(&self.path).map_err(|err| HelixErr::Other(format!("{}", err)))?;
        Ok(())
    }
}
