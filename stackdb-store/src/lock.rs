use std::sync::{Condvar, Mutex};

/// A strictly exclusive lock with explicit lock/try_lock/unlock calls rather
/// than a scope-bound guard (§4.3). A Table's lock is held across several
/// method calls -- from the first table op in a transaction through COMMIT
/// or rollback -- so a `MutexGuard` tied to a borrow of `Table` doesn't fit;
/// this is the direct idiomatic-Rust analogue of the original source's
/// explicit `pthread_mutex_lock`/`trylock`/`unlock` triplet.
#[derive(Default)]
pub struct ExclusiveLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl ExclusiveLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) {
        let mut held = self.held.lock().expect("exclusive lock poisoned");
        while *held {
            held = self.released.wait(held).expect("exclusive lock poisoned");
        }
        *held = true;
    }

    pub fn try_lock(&self) -> bool {
        let mut held = self.held.lock().expect("exclusive lock poisoned");
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }

    pub fn unlock(&self) {
        let mut held = self.held.lock().expect("exclusive lock poisoned");
        *held = false;
        drop(held);
        self.released.notify_one();
    }
}
