//! A small worker pool used for parallel translate and producer helper
//! tasks. Jobs are coarse (a whole translate unit or a user task), so the
//! pool keeps a single fifo injector the workers drain cooperatively
//! instead of per-worker deques with stealing.

pub mod latch;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crossbeam_deque as deque;

use self::latch::{Latch, LockLatch};

type Job = Box<dyn FnOnce() + Send>;

/// A completion handle for a job spawned onto the pool. Cloneable; any clone
/// may wait, all observe the same latch.
#[derive(Clone)]
pub struct TaskHandle {
    latch: Arc<LockLatch>,
}

impl TaskHandle {
    /// Returns a handle that is already complete.
    pub fn ready() -> Self {
        let latch = Arc::new(LockLatch::new());
        latch.set();
        TaskHandle { latch }
    }

    /// Blocks the calling thread until the job has finished.
    #[inline]
    pub fn wait(&self) {
        self.latch.wait();
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.latch.is_set()
    }
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
}

struct PoolShared {
    injector: Mutex<deque::Worker<Job>>,
    stealer: deque::Stealer<Job>,
    watcher: Watcher,
    pending: AtomicUsize,
    terminated: AtomicBool,
}

impl WorkerPool {
    pub fn new(num: u32, stack_size: Option<usize>) -> Self {
        assert!(num > 0);

        let (worker, stealer) = deque::fifo();
        let shared = Arc::new(PoolShared {
            injector: Mutex::new(worker),
            stealer,
            watcher: Watcher::new(),
            pending: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        });

        let mut threads = Vec::with_capacity(num as usize);
        for i in 0..num {
            let shared = shared.clone();
            let mut b = thread::Builder::new().name(format!("stylus-worker-{}", i));

            if let Some(stack_size) = stack_size {
                b = b.stack_size(stack_size);
            }

            threads.push(b.spawn(move || main_loop(shared)).unwrap());
        }

        info!("worker pool started with {} threads", num);

        WorkerPool {
            shared,
            threads: Mutex::new(threads),
        }
    }

    /// Spawns an asynchronous job onto the pool. A panicking job is caught
    /// and logged; its handle still completes.
    pub fn spawn<F>(&self, func: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let latch = Arc::new(LockLatch::new());
        let job: Job = {
            let latch = latch.clone();
            Box::new(move || {
                if let Err(err) = panic::catch_unwind(AssertUnwindSafe(func)) {
                    error!("worker job panicked: {}", panic_message(&err));
                }
                latch.set();
            })
        };

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        {
            let injector = self.shared.injector.lock().unwrap();
            injector.push(job);
        }
        self.shared.watcher.notify_one();

        TaskHandle { latch }
    }

    /// Blocks the calling thread until every spawned job has finished.
    pub fn wait_idle(&self) {
        let mut ms = 1;
        while self.shared.pending.load(Ordering::SeqCst) > 0 {
            self.shared.watcher.wait_timeout(ms);
            ms = (ms * 2).min(48);
        }
    }

    /// Signals termination and blocks until all the workers finished their
    /// queued jobs gracefully.
    pub fn terminate(&self) {
        self.shared.terminated.store(true, Ordering::SeqCst);
        self.shared.watcher.notify_all();

        let mut threads = self.threads.lock().unwrap();
        for v in threads.drain(..) {
            let _ = v.join();
        }

        info!("worker pool terminated");
    }
}

fn main_loop(shared: Arc<PoolShared>) {
    let mut ms = 1;
    loop {
        if let Some(job) = shared.stealer.steal() {
            job();
            shared.pending.fetch_sub(1, Ordering::SeqCst);
            shared.watcher.notify_all();
            ms = 1;
        } else if shared.terminated.load(Ordering::SeqCst) {
            break;
        } else {
            shared.watcher.wait_timeout(ms);
            ms = (ms * 2).min(48);
        }
    }
}

pub(crate) fn panic_message(err: &(dyn std::any::Any + Send)) -> String {
    if let Some(v) = err.downcast_ref::<&str>() {
        (*v).to_owned()
    } else if let Some(v) = err.downcast_ref::<String>() {
        v.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

struct Watcher(Mutex<()>, Condvar);

impl Watcher {
    fn new() -> Self {
        Watcher(Mutex::new(()), Condvar::new())
    }

    #[inline]
    fn wait_timeout(&self, ms: u64) {
        let duration = ::std::time::Duration::from_millis(ms);
        let v = self.0.lock().unwrap();
        let _ = self.1.wait_timeout(v, duration);
    }

    #[inline]
    pub fn notify_one(&self) {
        self.1.notify_one()
    }

    #[inline]
    pub fn notify_all(&self) {
        self.1.notify_all()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn spawn_and_wait() {
        let pool = WorkerPool::new(2, None);
        let counter = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let counter = counter.clone();
                pool.spawn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for v in &handles {
            v.wait();
            assert!(v.is_done());
        }

        assert_eq!(counter.load(Ordering::SeqCst), 16);
        pool.terminate();
    }

    #[test]
    fn wait_idle_drains_everything() {
        let pool = WorkerPool::new(1, None);
        let counter = Arc::new(AtomicU32::new(0));

        for _ in 0..8 {
            let counter = counter.clone();
            pool.spawn(move || {
                thread::sleep(::std::time::Duration::from_millis(1));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        pool.terminate();
    }

    #[test]
    fn panicking_job_completes_its_handle() {
        let pool = WorkerPool::new(1, None);
        let handle = pool.spawn(|| panic!("boom"));
        handle.wait();
        pool.terminate();
    }
}
