//! Produces a legal application order for a batch of non-`Unchanged` `PreSync` items: parents
//! before children for adds, children before parents for removes, same-path-case deletes before
//! re-adds, with uniformly random selection among items that are ready to apply at any given
//! step. Randomization is deliberate (see §4.5): it surfaces hidden order-dependence in tests and
//! spreads load across runs rather than hiding it behind one fixed traversal order.
use crate::{
    prelude::*,
    presync::{DisplayOperation, PreSync},
};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum OpKind {
    Add,
    Remove,
    Other,
}

fn op_kind(presync: &PreSync) -> OpKind {
    match presync.display_operation {
        DisplayOperation::Add => OpKind::Add,
        DisplayOperation::Remove | DisplayOperation::Purge => OpKind::Remove,
        _ => OpKind::Other,
    }
}

fn parent_of(path: &Path) -> Option<PathBuf> {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => Some(p.to_path_buf()),
        _ => None,
    }
}

/// Orders `items` so that every dependency edge from §4.5 is respected, picking uniformly at
/// random among items with no remaining unsatisfied dependency at each step.
pub fn sort_presyncs(items: Vec<PreSync>) -> HelixResult<Vec<PreSync>> {
    let n = items.len();
    let paths: Vec<Option<PathBuf>> = items.iter().map(|p| p.decr_file_name.clone()).collect();
    let kinds: Vec<OpKind> = items.iter().map(op_kind).collect();

    // index adds/removes by path for the dependency lookups below.
    let mut adds_by_path: HashMap<&Path, Vec<usize>> = HashMap::new();
    let mut removes_by_path: HashMap<&Path, Vec<usize>> = HashMap::new();
    for i in 0..n {
        if let Some(path) = paths[i].as_deref() {
            match kinds[i] {
                OpKind::Add => adds_by_path.entry(path).or_default().push(i),
                OpKind::Remove => removes_by_path.entry(path).or_default().push(i),
                OpKind::Other => {}
            }
        }
    }

    // parents[x] = set of item indices x depends on (must be applied before x).
    let mut parents: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for i in 0..n {
        let path = match paths[i].as_deref() {
            Some(p) => p,
            None => continue,
        };
        match kinds[i] {
            OpKind::Add => {
                // (a) create the parent directory before the child.
                if let Some(parent_path) = parent_of(path) {
                    if let Some(parent_adds) = adds_by_path.get(parent_path.as_path()) {
                        for &y in parent_adds {
                            if y != i {
                                parents[i].insert(y);
                            }
                        }
                    }
                }
                // (b) remove the old-cased name before re-adding under a new case.
                for (rm_path, rm_indices) in removes_by_path.iter() {
                    if rm_path.as_os_str().eq_ignore_ascii_case(path.as_os_str()) {
                        for &y in rm_indices {
                            if y != i {
                                parents[i].insert(y);
                            }
                        }
                    }
                }
            }
            OpKind::Remove => {
                // (c) remove children before the parent directory itself.
                for (child_path, child_indices) in removes_by_path.iter() {
                    if parent_of(child_path).as_deref() == Some(path) {
                        for &y in child_indices {
                            if y != i {
                                parents[i].insert(y);
                            }
                        }
                    }
                }
            }
            OpKind::Other => {}
        }
    }

    // children[y] = set of item indices that depend on y, used to decrement in-degree on emit.
    let mut children: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for (i, deps) in parents.iter().enumerate() {
        for &y in deps {
            children[y].insert(i);
        }
    }

    let mut remaining: Vec<usize> = (0..n).map(|i| parents[i].len()).collect();
    let mut ready: Vec<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while !ready.is_empty() {
        let pick = match ready.len() {
            1 => 0,
            len => crate::rand_util::rand_u64(None, 0, (len - 1) as u64) as usize,
        };
        let idx = ready.swap_remove(pick);
        emitted[idx] = true;
        order.push(idx);

        for &dependent in &children[idx] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.push(dependent);
            }
        }
    }

    if order.len() != n {
        helix_err!(CyclicDependency)?;
    }

    let mut items: Vec<Option<PreSync>> = items.into_iter().map(Some).collect();
    Ok(order.into_iter().map(|i| items[i].take().unwrap()).collect())
}
