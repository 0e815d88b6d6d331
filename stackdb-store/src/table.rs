use std::collections::BTreeMap;
use std::sync::Mutex;

use stackdb_base::{operation, Result};

use crate::lock::ExclusiveLock;

/// A named map with staged writes and an exclusive lock (§3, §4.3).
///
/// `committed` and `staged` are each behind their own `Mutex` purely so Rust
/// will let multiple `&Table` references share them at all; the actual
/// exclusivity readers and writers rely on is the logical `lock` above,
/// which callers must hold before calling any method below. Nothing here
/// enforces that at the type level -- same contract as the original,
/// comment-documented-only discipline.
pub struct Table {
    name: String,
    lock: ExclusiveLock,
    committed: Mutex<BTreeMap<String, String>>,
    staged: Mutex<BTreeMap<String, String>>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Table {
        Table {
            name: name.into(),
            lock: ExclusiveLock::new(),
            committed: Mutex::new(BTreeMap::new()),
            staged: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock(&self) {
        self.lock.lock();
    }

    pub fn try_lock(&self) -> bool {
        self.lock.try_lock()
    }

    /// Releases the table lock. Panics in debug builds if `staged` is
    /// non-empty, since the invariant in §3 requires every caller to commit
    /// or roll back before unlocking.
    pub fn unlock(&self) {
        debug_assert!(
            self.staged.lock().expect("table staged map poisoned").is_empty(),
            "unlocking table {:?} with staged writes still pending",
            self.name
        );
        self.lock.unlock();
    }

    /// Writes `staged[key] = value`. Caller must hold `lock`.
    pub fn set(&self, key: &str, value: &str) {
        self.staged
            .lock()
            .expect("table staged map poisoned")
            .insert(key.to_string(), value.to_string());
    }

    /// Reads `staged[key]` if present, else `committed[key]`. Caller must
    /// hold `lock`.
    pub fn get(&self, key: &str) -> Result<String> {
        if let Some(v) = self.staged.lock().expect("table staged map poisoned").get(key) {
            return Ok(v.clone());
        }
        self.committed
            .lock()
            .expect("table committed map poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| operation(format!("key not found: {key}")))
    }

    /// True if `key` is present in either map. Caller must hold `lock`.
    pub fn has(&self, key: &str) -> bool {
        self.staged.lock().expect("table staged map poisoned").contains_key(key)
            || self.committed.lock().expect("table committed map poisoned").contains_key(key)
    }

    /// Merges `staged` into `committed`, overwriting on collision, then
    /// clears `staged`. Caller must hold `lock`.
    pub fn commit(&self) {
        let staged = std::mem::take(&mut *self.staged.lock().expect("table staged map poisoned"));
        if staged.is_empty() {
            return;
        }
        self.committed
            .lock()
            .expect("table committed map poisoned")
            .extend(staged);
    }

    /// Discards `staged`. Caller must hold `lock`.
    pub fn rollback(&self) {
        self.staged.lock().expect("table staged map poisoned").clear();
    }
}
