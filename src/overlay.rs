//! Cached, path-indexed view of a directory tree with an optional "what-if" mode that
//! simulates mutations without touching disk.
use crate::{fs_util::*, prelude::*, primitives::*, util::*};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// A single entry in an `FSOverlay`'s cache. Modeled as a tagged variant rather than a struct
/// with optional fields so the classifier can exhaustively match on what kind of thing it has.
#[derive(Clone, Debug, PartialEq)]
pub enum FSEntry {
    File {
        relative_path: PathBuf,
        last_write_time_utc: SystemTime,
        length: u64,
    },
    Directory {
        relative_path: PathBuf,
        last_write_time_utc: SystemTime,
    },
    /// A tombstone: something used to be here, decided either by a mutator of this overlay or by
    /// absence during a disk rescan.
    Removed { relative_path: PathBuf },
    /// A stale encrypted-side blob reconciled against a log tombstone; carries no content.
    Purged { relative_path: PathBuf },
}

impl FSEntry {
    pub fn relative_path(&self) -> &Path {
        match self {
            Self::File { relative_path, .. }
            | Self::Directory { relative_path, .. }
            | Self::Removed { relative_path }
            | Self::Purged { relative_path } => relative_path,
        }
    }

    pub fn last_write_time_utc(&self) -> Option<SystemTime> {
        match self {
            Self::File { last_write_time_utc, .. } | Self::Directory { last_write_time_utc, .. } => {
                Some(*last_write_time_utc)
            }
            Self::Removed { .. } | Self::Purged { .. } => None,
        }
    }

    pub fn length(&self) -> u64 {
        match self {
            Self::File { length, .. } => *length,
            _ => 0,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }

    pub fn is_purged(&self) -> bool {
        matches!(self, Self::Purged { .. })
    }
}

/// Controls whether `FSOverlay::get_entries` returns only the root's immediate children or
/// triggers a full recursive load.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GetEntriesMode {
    TopOnly,
    All,
}

#[derive(Debug, Default)]
struct DirMeta {
    /// Ordered, case-folded child keys; preserves invariant #1 (no duplicate names under the
    /// configured case rule) because inserts always replace by folded key.
    children: Vec<PathBuf>,
    is_loaded: bool,
    is_loaded_deep: bool,
}

/// Cached, path-indexed view of a directory tree rooted at `root`, optionally operating in
/// "what-if" (dry-run) mode where mutators update the cache but never touch disk.
pub struct FSOverlay {
    root: PathBuf,
    what_if: bool,
    case_sensitivity: CaseSensitivity,
    entries: HashMap<PathBuf, FSEntry>,
    dirs: HashMap<PathBuf, DirMeta>,
}

impl FSOverlay {
    pub fn new_root<P>(path: P, what_if: bool, case_sensitivity: CaseSensitivity) -> std::io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let root = path.as_ref().canonicalize()?;
        let mut dirs = HashMap::new();
        dirs.insert(PathBuf::new(), DirMeta::default());
        Ok(Self {
            root,
            what_if,
            case_sensitivity,
            entries: HashMap::new(),
            dirs,
        })
    }

    pub fn what_if(&self) -> bool {
        self.what_if
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn fold(&self, rel: &Path) -> PathBuf {
        match self.case_sensitivity {
            CaseSensitivity::Sensitive => rel.to_path_buf(),
            CaseSensitivity::Insensitive => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
                .collect::<Vec<_>>()
                .into_iter()
                .collect(),
        }
    }

    /// Normalizes an externally supplied absolute-or-relative path to universal relative form,
    /// rejecting anything that escapes the root.
    fn normalize(&self, path: &Path) -> HelixResult<PathBuf> {
        let rel = match path.is_absolute() {
            true => match subpath(path, &self.root) {
                Some(rel) => rel,
                None => helix_err!(PathOutsideRoot, path.to_path_buf())?,
            },
            false => path.to_path_buf(),
        };

        let mut comps = Vec::new();
        for comp in rel.components() {
            match comp {
                std::path::Component::Normal(c) => comps.push(c),
                std::path::Component::CurDir => (),
                std::path::Component::ParentDir => helix_err!(PathOutsideRoot, path.to_path_buf())?,
                _ => helix_err!(PathOutsideRoot, path.to_path_buf())?,
            }
        }
        Ok(comps.into_iter().collect())
    }

    fn to_entry<P>(relative_path: P, meta: &fs::Metadata) -> FSEntry
    where
        P: Into<PathBuf>,
    {
        let relative_path = relative_path.into();
        let last_write_time_utc = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        match meta.is_dir() {
            true => FSEntry::Directory {
                relative_path,
                last_write_time_utc,
            },
            false => FSEntry::File {
                relative_path,
                last_write_time_utc,
                length: meta.len(),
            },
        }
    }

    fn ensure_loaded(&mut self, dir_rel: &Path) -> HelixResult<()> {
        let key = self.fold(dir_rel);
        if self.dirs.get(&key).map(|d| d.is_loaded).unwrap_or(false) {
            return Ok(());
        }

        let abs = self.root.join(dir_rel);
        let mut children = Vec::new();
        let mut read = match ls(&abs) {
            Ok(iter) => iter.collect::<std::io::Result<Vec<_>>>()?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        read.sort();

        for child_abs in read {
            let name = match child_abs.file_name() {
                Some(n) => n,
                None => continue,
            };
            let child_rel = dir_rel.join(name);
            let child_key = self.fold(&child_rel);
            if self.entries.contains_key(&child_key) {
                children.push(child_key);
                continue;
            }
            let meta = fs::symlink_metadata(&child_abs)?;
            let entry = Self::to_entry(child_rel, &meta);
            if entry.is_directory() {
                self.dirs.entry(child_key.clone()).or_insert_with(DirMeta::default);
            }
            self.entries.insert(child_key.clone(), entry);
            children.push(child_key);
        }

        let dir = self.dirs.entry(key).or_insert_with(DirMeta::default);
        dir.children = children;
        dir.is_loaded = true;
        Ok(())
    }

    /// Returns the cached entry at `path`, lazily loading its parent directory's immediate
    /// children from disk if necessary.
    pub fn try_get_entry<P>(&mut self, path: P) -> HelixResult<Option<FSEntry>>
    where
        P: AsRef<Path>,
    {
        let rel = self.normalize(path.as_ref())?;
        if rel.as_os_str().is_empty() {
            let meta = fs::symlink_metadata(&self.root)?;
            return Ok(Some(Self::to_entry(PathBuf::new(), &meta)));
        }

        let parent = rel.parent().unwrap_or_else(|| Path::new(""));
        self.ensure_loaded(parent)?;
        Ok(self.entries.get(&self.fold(&rel)).cloned())
    }

    /// Recursively loads every directory reachable from `dir_rel` that has not yet been loaded.
    fn ensure_loaded_deep(&mut self, dir_rel: &Path) -> HelixResult<()> {
        self.ensure_loaded(dir_rel)?;
        let key = self.fold(dir_rel);
        if self.dirs.get(&key).map(|d| d.is_loaded_deep).unwrap_or(false) {
            return Ok(());
        }

        let children = self.dirs.get(&key).map(|d| d.children.clone()).unwrap_or_default();
        for child_key in children {
            if let Some(entry) = self.entries.get(&child_key) {
                if entry.is_directory() {
                    let child_rel = entry.relative_path().to_path_buf();
                    self.ensure_loaded_deep(&child_rel)?;
                }
            }
        }

        self.dirs.entry(key).or_insert_with(DirMeta::default).is_loaded_deep = true;
        Ok(())
    }

    pub fn get_entries(&mut self, mode: GetEntriesMode) -> HelixResult<Vec<FSEntry>> {
        match mode {
            GetEntriesMode::TopOnly => {
                self.ensure_loaded(Path::new(""))?;
                let children = self.dirs[&PathBuf::new()].children.clone();
                Ok(children.into_iter().filter_map(|k| self.entries.get(&k).cloned()).collect())
            }
            GetEntriesMode::All => {
                self.ensure_loaded_deep(Path::new(""))?;
                let mut out = Vec::new();
                let mut stack = vec![PathBuf::new()];
                while let Some(dir_key) = stack.pop() {
                    let children = match self.dirs.get(&dir_key) {
                        Some(d) => d.children.clone(),
                        None => continue,
                    };
                    for child_key in children {
                        if let Some(entry) = self.entries.get(&child_key).cloned() {
                            if entry.is_directory() {
                                stack.push(self.fold(entry.relative_path()));
                            }
                            out.push(entry);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// Re-stats `relative_path` and replaces any cached entry for it, per the recorded decision
    /// to always overwrite rather than merge with a stale child (preserves invariant #1).
    pub fn refresh_entry<P>(&mut self, relative_path: P) -> HelixResult<Option<FSEntry>>
    where
        P: AsRef<Path>,
    {
        let rel = self.normalize(relative_path.as_ref())?;
        let key = self.fold(&rel);
        let abs = self.root.join(&rel);
        let parent = rel.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let parent_key = self.fold(&parent);

        match fs::symlink_metadata(&abs) {
            Ok(meta) => {
                let entry = Self::to_entry(rel.clone(), &meta);
                if entry.is_directory() {
                    self.dirs.entry(key.clone()).or_insert_with(DirMeta::default);
                }
                self.entries.insert(key.clone(), entry.clone());
                let dir = self.dirs.entry(parent_key).or_insert_with(DirMeta::default);
                if !dir.children.contains(&key) {
                    dir.children.push(key);
                }
                Ok(Some(entry))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.entries.insert(key.clone(), FSEntry::Removed { relative_path: rel });
                if let Some(dir) = self.dirs.get_mut(&parent_key) {
                    dir.children.retain(|c| c != &key);
                }
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn move_file(&mut self, src_entry: &FSEntry, dest_path: &Path) -> HelixResult<FSEntry> {
        let src_rel = self.normalize(src_entry.relative_path())?;
        let dest_rel = self.normalize(dest_path)?;
        let src_key = self.fold(&src_rel);
        let dest_key = self.fold(&dest_rel);

        if let Some(existing) = self.entries.get(&dest_key) {
            if !existing.is_removed() && !existing.is_purged() {
                helix_err!(DestinationExists, dest_rel)?;
            }
        }
        let dest_parent = dest_rel.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let dest_parent_key = self.fold(&dest_parent);
        self.ensure_loaded(&dest_parent)?;
        if !dest_parent.as_os_str().is_empty() && !self.dirs.contains_key(&dest_parent_key) {
            helix_err!(Other, format!("destination directory {:?} does not exist", dest_parent))?;
        }

        if !self.what_if {
            fs::rename(self.root.join(&src_rel), self.root.join(&dest_rel))?;
        }

        let new_entry = match self.entries.remove(&src_key) {
            Some(FSEntry::File { length, last_write_time_utc, .. }) => FSEntry::File {
                relative_path: dest_rel.clone(),
                last_write_time_utc,
                length,
            },
            Some(FSEntry::Directory { last_write_time_utc, .. }) => FSEntry::Directory {
                relative_path: dest_rel.clone(),
                last_write_time_utc,
            },
            _ => helix_err!(Other, "move_file: source entry not found in overlay".to_string())?,
        };

        let src_parent = src_rel.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let src_parent_key = self.fold(&src_parent);
        if let Some(dir) = self.dirs.get_mut(&src_parent_key) {
            dir.children.retain(|c| c != &src_key);
        }
        self.entries.insert(src_key, FSEntry::Removed { relative_path: src_rel });

        self.entries.insert(dest_key.clone(), new_entry.clone());
        let dest_dir = self.dirs.entry(dest_parent_key).or_insert_with(DirMeta::default);
        if !dest_dir.children.contains(&dest_key) {
            dest_dir.children.push(dest_key);
        }

        Ok(new_entry)
    }

    pub fn delete_file(&mut self, entry: &FSEntry) -> HelixResult<()> {
        let rel = self.normalize(entry.relative_path())?;
        let key = self.fold(&rel);
        if !self.what_if {
            std::fs::remove_file(self.root.join(&rel))?;
        }
        let parent = rel.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let parent_key = self.fold(&parent);
        if let Some(dir) = self.dirs.get_mut(&parent_key) {
            dir.children.retain(|c| c != &key);
        }
        self.entries.insert(key, FSEntry::Removed { relative_path: rel });
        Ok(())
    }

    pub fn delete_directory(&mut self, entry: &FSEntry, recursive: bool) -> HelixResult<()> {
        let rel = self.normalize(entry.relative_path())?;
        let key = self.fold(&rel);

        self.ensure_loaded(&rel)?;
        let has_children = self.dirs.get(&key).map(|d| !d.children.is_empty()).unwrap_or(false);
        if has_children && !recursive {
            helix_err!(DirectoryNotEmpty, rel)?;
        }

        if !self.what_if {
            match recursive {
                true => std::fs::remove_dir_all(self.root.join(&rel))?,
                false => std::fs::remove_dir(self.root.join(&rel))?,
            }
        }

        let prefix = key.clone();
        self.entries.retain(|k, _| !(k.starts_with(&prefix) && k != &prefix));
        self.dirs.retain(|k, _| !(k.starts_with(&prefix) && k != &prefix));

        let parent = rel.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let parent_key = self.fold(&parent);
        if let Some(dir) = self.dirs.get_mut(&parent_key) {
            dir.children.retain(|c| c != &key);
        }
        self.dirs.remove(&key);
        self.entries.insert(key, FSEntry::Removed { relative_path: rel });
        Ok(())
    }

    /// Inserts a ghost `FSEntry::File` without touching disk, for dry-run planning.
    pub fn what_if_add_file<P>(&mut self, path: P, length: u64) -> HelixResult<FSEntry>
    where
        P: AsRef<Path>,
    {
        let rel = self.normalize(path.as_ref())?;
        let key = self.fold(&rel);
        let entry = FSEntry::File {
            relative_path: rel.clone(),
            last_write_time_utc: SystemTime::now(),
            length,
        };

        let parent = rel.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let parent_key = self.fold(&parent);
        self.ensure_loaded(&parent)?;
        self.entries.insert(key.clone(), entry.clone());
        let dir = self.dirs.entry(parent_key).or_insert_with(DirMeta::default);
        if !dir.children.contains(&key) {
            dir.children.push(key);
        }
        Ok(entry)
    }

    /// Discards all cached children, reverting every directory's `is_loaded*` flags to false.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.dirs.clear();
        self.dirs.insert(PathBuf::new(), DirMeta::default());
    }
}
