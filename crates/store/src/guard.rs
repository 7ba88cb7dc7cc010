//! Per-path mutual exclusion for mutating store calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Serializes operations on the same resolved path.
///
/// Locks are created on demand and dropped from the table once no holder
/// or waiter remains, so unrelated files never contend and the table does
/// not grow with the number of files ever touched.
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Reference to one table entry; cleans the entry up when dropped.
struct Lease<'a> {
    guard: &'a ConcurrencyGuard,
    path: &'a Path,
    entry: Arc<Mutex<()>>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let mut table = self.guard.table();
        // Clones are only made under the table lock, so a count of two
        // (table + this lease) means nobody else holds or waits.
        if Arc::strong_count(&self.entry) == 2 {
            table.remove(self.path);
        }
    }
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `path`.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lease = self.lease(path);
        let _held = lease.entry.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of paths currently locked or waited on.
    pub fn held_paths(&self) -> usize {
        self.table().len()
    }

    fn lease<'a>(&'a self, path: &'a Path) -> Lease<'a> {
        let entry = Arc::clone(self.table().entry(path.to_path_buf()).or_default());
        Lease {
            guard: self,
            path,
            entry,
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
