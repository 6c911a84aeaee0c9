use std::sync::{Condvar, Mutex};

/// A latch is a primitive signaling mechanism. It starts as false, eventually
/// someone calls `set()` and it becomes true. You can test if it has been set
/// by calling `is_set()`.
pub trait Latch {
    /// Set the latch, signalling others.
    fn set(&self);
    /// Test if the latch is set.
    fn is_set(&self) -> bool;
}

/// A latch you can block on until it becomes true.
pub struct LockLatch {
    m: Mutex<bool>,
    v: Condvar,
}

impl Default for LockLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl LockLatch {
    #[inline]
    pub fn new() -> LockLatch {
        LockLatch {
            m: Mutex::new(false),
            v: Condvar::new(),
        }
    }

    /// Block until latch is set.
    pub fn wait(&self) {
        let mut guard = self.m.lock().unwrap();
        while !*guard {
            guard = self.v.wait(guard).unwrap();
        }
    }
}

impl Latch for LockLatch {
    #[inline]
    fn set(&self) {
        let mut guard = self.m.lock().unwrap();
        *guard = true;
        self.v.notify_all();
    }

    #[inline]
    fn is_set(&self) -> bool {
        // Not particularly efficient, but we don't really use this operation
        let guard = self.m.lock().unwrap();
        *guard
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lock_latch() {
        let latch = Arc::new(LockLatch::new());
        assert!(!latch.is_set());

        let setter = {
            let latch = latch.clone();
            thread::spawn(move || latch.set())
        };

        latch.wait();
        assert!(latch.is_set());
        setter.join().unwrap();
    }
}
