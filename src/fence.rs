//! The fence ring correlates CPU-side submissions with GPU-side completion.
//!
//! Submission code allocates a slot, records a signal operation carrying the
//! slot and a target value, and hands the resulting `FencePoint` to whoever
//! needs to know when that work has been consumed. Once the signal executes,
//! the value lands in the slot's storage; readers poll or block on that
//! storage directly, the ring provides no notification mechanism of its own.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// The value a slot holds before its signal has executed.
pub const FENCE_UNSET: u64 = 0;

const INITIAL_FRAME: u64 = u64::max_value();

/// A slot in the fence ring.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FenceIndex(u32);

impl FenceIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A fence slot paired with the value that marks it reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FencePoint {
    pub index: FenceIndex,
    pub value: u64,
}

#[derive(Debug)]
struct Slot {
    value: AtomicU64,
    frame: AtomicU64,
}

/// A fixed-size ring buffer mapping a monotonically increasing allocation
/// index to fence storage and the frame number it was issued in.
///
/// Allocating a slot whose previous occupant was issued in the current frame
/// means two in-flight fences would share storage; that is a producer pacing
/// bug and faults hard rather than resizing.
#[derive(Debug)]
pub struct FenceRing {
    slots: Vec<Slot>,
    head: AtomicUsize,
}

impl FenceRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);

        let slots = (0..capacity)
            .map(|_| Slot {
                value: AtomicU64::new(FENCE_UNSET),
                frame: AtomicU64::new(INITIAL_FRAME),
            })
            .collect();

        FenceRing {
            slots,
            head: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the next ring slot, tagged with `frame`. The slot's storage is
    /// reset to the unset sentinel.
    pub fn allocate(&self, frame: u64) -> FenceIndex {
        let index = self.head.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let slot = &self.slots[index];

        assert!(
            slot.frame.load(Ordering::Acquire) != frame,
            "fence ring wrapped around within frame {}; {} slots are not enough for the \
             submissions issued this frame",
            frame,
            self.slots.len()
        );

        slot.frame.store(frame, Ordering::Release);
        slot.value.store(FENCE_UNSET, Ordering::Release);
        FenceIndex(index as u32)
    }

    /// Writes the GPU-visible signal value into the slot.
    #[inline]
    pub fn signal(&self, index: FenceIndex, value: u64) {
        self.slots[index.index()].value.store(value, Ordering::Release);
    }

    /// Reads the slot's storage; `FENCE_UNSET` until the signal executes.
    #[inline]
    pub fn value(&self, index: FenceIndex) -> u64 {
        self.slots[index.index()].value.load(Ordering::Acquire)
    }

    /// Blocks the calling thread until the slot's stored value reaches
    /// `target`. Spin-with-backoff poll; the ring has no waiter list.
    pub fn wait(&self, index: FenceIndex, target: u64) {
        let mut ms = 0;
        while self.value(index) < target {
            if ms == 0 {
                thread::yield_now();
                ms = 1;
            } else {
                thread::sleep(Duration::from_millis(ms));
                ms = (ms * 2).min(8);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn allocate_signal_value() {
        let ring = FenceRing::new(4);
        let index = ring.allocate(1);

        assert_eq!(ring.value(index), FENCE_UNSET);
        ring.signal(index, 42);
        assert_eq!(ring.value(index), 42);
    }

    #[test]
    fn reuse_across_frames() {
        let ring = FenceRing::new(2);
        for frame in 1..=5 {
            let index = ring.allocate(frame);
            ring.signal(index, frame);
        }
    }

    #[test]
    #[should_panic(expected = "fence ring wrapped around")]
    fn same_frame_collision() {
        let ring = FenceRing::new(2);
        ring.allocate(1);
        ring.allocate(1);
        ring.allocate(1);
    }

    #[test]
    fn wait_blocks_until_signal() {
        let ring = Arc::new(FenceRing::new(4));
        let index = ring.allocate(1);

        let signaller = {
            let ring = ring.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                ring.signal(index, 7);
            })
        };

        ring.wait(index, 7);
        assert_eq!(ring.value(index), 7);
        signaller.join().unwrap();
    }
}
