//! The dedicated execution thread and its submission queue.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use crate::command::{CommandSequence, SequenceStats};
use crate::errors::*;

use super::Dispatch;

pub(crate) type SubmitOutcome = (CommandSequence, Result<SequenceStats>);

pub(crate) struct SubmitSlot {
    m: Mutex<Option<SubmitOutcome>>,
    v: Condvar,
}

impl SubmitSlot {
    pub fn new() -> Self {
        SubmitSlot {
            m: Mutex::new(None),
            v: Condvar::new(),
        }
    }

    pub fn fill(&self, outcome: SubmitOutcome) {
        let mut guard = self.m.lock().unwrap();
        debug_assert!(guard.is_none());
        *guard = Some(outcome);
        self.v.notify_all();
    }

    pub fn take_wait(&self) -> SubmitOutcome {
        let mut guard = self.m.lock().unwrap();
        loop {
            if let Some(v) = guard.take() {
                return v;
            }
            guard = self.v.wait(guard).unwrap();
        }
    }

    pub fn is_filled(&self) -> bool {
        self.m.lock().unwrap().is_some()
    }
}

/// A completion handle for one submitted sequence. Waiting hands the reset
/// sequence back to the caller along with the outcome of its replay, so the
/// sequence survives even a failed submission.
pub struct SubmitHandle {
    slot: Arc<SubmitSlot>,
}

impl SubmitHandle {
    pub(crate) fn pending(slot: Arc<SubmitSlot>) -> Self {
        SubmitHandle { slot }
    }

    /// A handle whose work already happened (bypass or inline replay).
    pub(crate) fn ready(seq: CommandSequence, result: Result<SequenceStats>) -> Self {
        let slot = Arc::new(SubmitSlot::new());
        slot.fill((seq, result));
        SubmitHandle { slot }
    }

    /// Blocks until the submission has fully replayed, then returns the
    /// reset sequence and the stats (or error) of its replay.
    pub fn wait(self) -> (CommandSequence, Result<SequenceStats>) {
        self.slot.take_wait()
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.slot.is_filled()
    }
}

struct QueueInner {
    pending: VecDeque<(CommandSequence, Arc<SubmitSlot>)>,
    in_flight: usize,
    terminated: bool,
}

/// The submission queue between producers and the execution thread.
/// `queued` and `in_flight` together drive the `Dispatched` and `Drained`
/// flush levels.
pub(crate) struct ExecQueue {
    inner: Mutex<QueueInner>,
    added: Condvar,
    drained: Condvar,
}

impl ExecQueue {
    pub fn new() -> Self {
        ExecQueue {
            inner: Mutex::new(QueueInner {
                pending: VecDeque::new(),
                in_flight: 0,
                terminated: false,
            }),
            added: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Enqueues a submission for the execution thread. Once the queue has
    /// been terminated the sequence is handed back instead of consumed.
    pub fn push(
        &self,
        seq: CommandSequence,
        slot: Arc<SubmitSlot>,
    ) -> ::std::result::Result<(), CommandSequence> {
        let mut inner = self.inner.lock().unwrap();
        if inner.terminated {
            return Err(seq);
        }

        inner.pending.push_back((seq, slot));
        self.added.notify_one();
        Ok(())
    }

    /// Blocks until every enqueued submission has been picked up by the
    /// execution thread.
    pub fn wait_dispatched(&self) {
        let mut inner = self.inner.lock().unwrap();
        while !inner.pending.is_empty() {
            inner = self.drained.wait(inner).unwrap();
        }
    }

    /// Blocks until every submission has fully replayed.
    pub fn wait_drained(&self) {
        let mut inner = self.inner.lock().unwrap();
        while !inner.pending.is_empty() || inner.in_flight > 0 {
            inner = self.drained.wait(inner).unwrap();
        }
    }

    /// Stops accepting submissions and wakes the execution thread so it can
    /// drain what is left and exit.
    pub fn terminate(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.terminated = true;
        self.added.notify_all();
    }
}

/// The execution thread body: pop a submission, replay it against the
/// backend context, hand the sequence back through its slot. Exits once
/// terminated and empty; queued work submitted before termination still
/// drains.
pub(crate) fn main_loop(queue: Arc<ExecQueue>, dispatch: Arc<Dispatch>) {
    info!("execution thread started");

    loop {
        let job = {
            let mut inner = queue.inner.lock().unwrap();
            loop {
                if let Some(v) = inner.pending.pop_front() {
                    inner.in_flight += 1;
                    break Some(v);
                }
                if inner.terminated {
                    break None;
                }
                inner = queue.added.wait(inner).unwrap();
            }
        };
        queue.drained.notify_all();

        let (mut seq, slot) = match job {
            Some(v) => v,
            None => break,
        };

        let result = dispatch.with_context(|ctx| seq.replay(ctx));
        if let Err(ref err) = result {
            error!("sequence #{} failed during replay: {}", seq.uid(), err);
        }
        slot.fill((seq, result));

        {
            let mut inner = queue.inner.lock().unwrap();
            inner.in_flight -= 1;
        }
        queue.drained.notify_all();
    }

    info!("execution thread stopped");
}
