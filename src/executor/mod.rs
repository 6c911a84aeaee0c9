//! The executor owns the dispatch pipeline: the privileged immediate
//! sequences, the bypass decision, the dedicated execution thread, the
//! worker pool used for parallel translate, and the fence ring.
//!
//! There is no ambient global state; construct an [`Executor`], pass its
//! [`ExecutorShared`] down to whoever records, and several independent
//! engines can coexist in one process (which is what the tests do).
//!
//! [`Executor`]: struct.Executor.html
//! [`ExecutorShared`]: struct.ExecutorShared.html

mod thread;

pub use self::thread::SubmitHandle;

use std::mem;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread as std_thread;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::command::{CommandSequence, SequenceStats};
use crate::context::{Context, NullContext};
use crate::errors::*;
use crate::fence::{FenceIndex, FencePoint, FenceRing};
use crate::sched::{panic_message, TaskHandle, WorkerPool};
use crate::settings::Settings;

use self::thread::{ExecQueue, SubmitSlot};

/// How much of the outstanding work `flush` waits for. Each level is a
/// superset of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlushMode {
    /// Helper tasks spawned onto the worker pool have finished.
    Tasks,
    /// Plus: every enqueued submission has been picked up by the execution
    /// thread.
    Dispatched,
    /// Plus: every submission has fully replayed.
    Drained,
    /// Plus: the backend context itself has flushed.
    Full,
}

/// The information of the frame that completed at the last `advance`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInfo {
    pub frame: u64,
    pub duration: Duration,
    pub sequences: u32,
    pub commands: u32,
    pub draws: u32,
    pub primitives: u32,
}

/// The shared dispatch state every sequence records against: the bypass
/// flag, the backend context, the fence ring and the bookkeeping counters.
pub struct Dispatch {
    bypass: AtomicBool,
    context: Mutex<Box<dyn Context + Send>>,
    fences: FenceRing,
    uids: AtomicU64,
    fence_values: AtomicU64,
    frame: AtomicU64,
    outstanding: AtomicUsize,
}

impl Dispatch {
    fn new(settings: &Settings, context: Box<dyn Context + Send>) -> Self {
        Dispatch {
            bypass: AtomicBool::new(settings.bypass),
            context: Mutex::new(context),
            fences: FenceRing::new(settings.fence_ring_size),
            uids: AtomicU64::new(0),
            fence_values: AtomicU64::new(0),
            frame: AtomicU64::new(0),
            outstanding: AtomicUsize::new(0),
        }
    }

    /// Whether recording calls go straight into the backend. This is the
    /// single hot-path branch of the engine.
    #[inline]
    pub fn bypass(&self) -> bool {
        self.bypass.load(Ordering::Relaxed)
    }

    /// Flips the bypass strategy. Only safe while no sequence has an open
    /// recording session; switching mid-sequence is unsupported. Compiled
    /// out of release builds, where the configured value is fixed.
    #[cfg(debug_assertions)]
    pub fn set_bypass(&self, enabled: bool) {
        assert_eq!(
            self.outstanding(),
            0,
            "bypass can only be toggled while no recording session is outstanding"
        );
        self.bypass.store(enabled, Ordering::Relaxed);
    }

    /// Runs `func` with exclusive access to the backend context.
    pub fn with_context<F, R>(&self, func: F) -> R
    where
        F: FnOnce(&mut dyn Context) -> R,
    {
        let mut guard = self.context.lock().unwrap();
        func(guard.as_mut())
    }

    #[inline]
    pub fn fences(&self) -> &FenceRing {
        &self.fences
    }

    /// The current frame number; advanced once per `Executor::advance`.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    /// The number of producer sequences with an open recording session.
    /// The immediate sequences are not counted; they live exactly as long
    /// as the executor.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Allocates the next fence slot, tagged with the current frame, and a
    /// fresh monotonically increasing target value.
    pub fn allocate_fence(&self) -> FencePoint {
        let value = self.fence_values.fetch_add(1, Ordering::Relaxed) + 1;
        let index = self.fences.allocate(self.frame());
        FencePoint { index, value }
    }

    pub(crate) fn next_uid(&self) -> u64 {
        self.uids.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn open_session(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn close_session(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    fn advance_frame(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::Relaxed) + 1
    }
}

struct Immediates {
    graphics: CommandSequence,
    compute: CommandSequence,
    spares: SmallVec<[CommandSequence; 2]>,
    pending: SmallVec<[SubmitHandle; 2]>,
    frame_start: Instant,
}

/// The multi-thread friendly parts of `Executor`.
pub struct ExecutorShared {
    dispatch: Arc<Dispatch>,
    queue: Arc<ExecQueue>,
    pool: Option<WorkerPool>,
    immediates: Mutex<Immediates>,
    settings: Settings,
}

/// The centralized management of the dispatch pipeline. Owns the execution
/// thread; dropping the executor drains it, stops the pool and verifies
/// that no sequence leaked across the teardown boundary.
pub struct Executor {
    shared: Arc<ExecutorShared>,
    thread: Option<std_thread::JoinHandle<()>>,
}

impl Executor {
    /// Creates a new `Executor` dispatching into `context`.
    pub fn new(settings: Settings, context: Box<dyn Context + Send>) -> Result<Self> {
        let dispatch = Arc::new(Dispatch::new(&settings, context));
        let queue = Arc::new(ExecQueue::new());

        let pool = if settings.num_workers > 0 {
            Some(WorkerPool::new(
                settings.num_workers,
                settings.worker_stack_size,
            ))
        } else {
            None
        };

        let thread = if settings.execution_thread {
            let queue = queue.clone();
            let dispatch = dispatch.clone();
            let handle = std_thread::Builder::new()
                .name("stylus-exec".into())
                .spawn(move || thread::main_loop(queue, dispatch))
                .unwrap();
            Some(handle)
        } else {
            None
        };

        let mut graphics = CommandSequence::new(
            dispatch.clone(),
            "imm-graphics",
            settings.sequence_capacity,
            settings.arena_block_size,
            true,
        );
        let mut compute = CommandSequence::new(
            dispatch.clone(),
            "imm-compute",
            settings.sequence_capacity,
            settings.arena_block_size,
            true,
        );
        graphics.begin();
        compute.begin();

        let shared = Arc::new(ExecutorShared {
            dispatch,
            queue,
            pool,
            immediates: Mutex::new(Immediates {
                graphics,
                compute,
                spares: SmallVec::new(),
                pending: SmallVec::new(),
                frame_start: Instant::now(),
            }),
            settings,
        });

        info!(
            "executor started (bypass: {}, execution thread: {})",
            shared.dispatch.bypass(),
            thread.is_some()
        );

        Ok(Executor { shared, thread })
    }

    /// Creates a new `Executor` against the built-in no-op context.
    pub fn headless(settings: Settings) -> Result<Self> {
        Self::new(settings, Box::new(NullContext::new()))
    }

    /// Returns the multi-thread friendly parts of `Executor`.
    pub fn shared(&self) -> Arc<ExecutorShared> {
        self.shared.clone()
    }
}

impl Deref for Executor {
    type Target = ExecutorShared;

    fn deref(&self) -> &ExecutorShared {
        &self.shared
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.queue.terminate();
        if let Some(v) = self.thread.take() {
            let _ = v.join();
        }

        if let Some(pool) = self.shared.pool.as_ref() {
            pool.terminate();
        }

        let mut imm = self.shared.immediates.lock().unwrap();
        for v in imm.pending.drain() {
            let (seq, result) = v.wait();
            if let Err(err) = result {
                error!("sequence #{} failed during teardown: {}", seq.uid(), err);
            }
        }

        let leaked = imm.graphics.len() + imm.compute.len();
        if leaked != 0 {
            warn!(
                "{} commands left on the immediate sequences at teardown",
                leaked
            );
        }
        imm.graphics.reset();
        imm.compute.reset();
        imm.spares.clear();
        drop(imm);

        let outstanding = self.shared.dispatch.outstanding();
        if outstanding != 0 {
            warn!(
                "{} command sequences leaked across executor teardown",
                outstanding
            );
        }

        debug_assert_eq!(leaked, 0, "immediate sequences not empty at teardown");
        debug_assert_eq!(outstanding, 0, "command sequences leaked across teardown");

        info!("executor terminated");
    }
}

impl ExecutorShared {
    /// The shared dispatch state, for code that only needs the bypass flag,
    /// the fence ring or the counters.
    #[inline]
    pub fn dispatch(&self) -> &Arc<Dispatch> {
        &self.dispatch
    }

    /// Whether recording calls currently go straight into the backend.
    #[inline]
    pub fn bypass(&self) -> bool {
        self.dispatch.bypass()
    }

    /// See [`Dispatch::set_bypass`](struct.Dispatch.html#method.set_bypass).
    /// Additionally requires the immediate sequences to be drained.
    #[cfg(debug_assertions)]
    pub fn set_bypass(&self, enabled: bool) {
        {
            let imm = self.immediates.lock().unwrap();
            assert!(
                imm.graphics.is_empty() && imm.compute.is_empty() && imm.pending.is_empty(),
                "bypass can only be toggled while the immediate sequences are drained"
            );
        }
        self.dispatch.set_bypass(enabled);
    }

    /// Creates a fresh, idle sequence recording against this executor.
    pub fn create_sequence(&self, label: &str) -> CommandSequence {
        CommandSequence::new(
            self.dispatch.clone(),
            label,
            self.settings.sequence_capacity,
            self.settings.arena_block_size,
            false,
        )
    }

    /// The privileged immediate graphics sequence. The guard serializes
    /// access; recording must still come from the producer thread.
    pub fn graphics(&self) -> ImmediateGuard {
        ImmediateGuard {
            guard: self.immediates.lock().unwrap(),
            compute: false,
        }
    }

    /// The privileged immediate async-compute sequence.
    pub fn compute(&self) -> ImmediateGuard {
        ImmediateGuard {
            guard: self.immediates.lock().unwrap(),
            compute: true,
        }
    }

    /// Spawns a helper task onto the worker pool; the handle can be attached
    /// to a sequence as a replay prerequisite. Without a pool the task runs
    /// inline.
    pub fn spawn<F>(&self, func: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        match self.pool {
            Some(ref pool) => pool.spawn(func),
            None => {
                func();
                TaskHandle::ready()
            }
        }
    }

    /// Submits a recorded sequence for execution.
    ///
    /// Under bypass the work already happened at the recording calls and
    /// this degenerates to handing the sequence straight back. With the
    /// execution thread enabled the sequence is enqueued and the call
    /// returns immediately; otherwise it replays inline on the calling
    /// thread. Either way the completion handle eventually yields the
    /// sequence back along with its replay outcome. A submission racing
    /// executor teardown yields `ExecutorTerminated` with the sequence
    /// un-replayed and its commands intact; `reset` makes it recordable
    /// again.
    pub fn execute(&self, mut seq: CommandSequence) -> Result<SubmitHandle> {
        if self.dispatch.bypass() {
            debug_assert!(seq.is_empty(), "bypass sequences never accumulate records");
            seq.reset();
            return Ok(SubmitHandle::ready(seq, Ok(SequenceStats::default())));
        }

        seq.submit();
        debug!("submitting sequence #{} ({} commands)", seq.uid(), seq.len());

        if self.thread_enabled() {
            let slot = Arc::new(SubmitSlot::new());
            match self.queue.push(seq, slot.clone()) {
                Ok(()) => Ok(SubmitHandle::pending(slot)),
                // The queue no longer accepts work; hand the sequence back
                // un-replayed so the producer keeps it.
                Err(seq) => Ok(SubmitHandle::ready(seq, Err(Error::ExecutorTerminated))),
            }
        } else {
            let result = self.dispatch.with_context(|ctx| seq.replay(ctx));
            if let Err(ref err) = result {
                error!("sequence #{} failed during replay: {}", seq.uid(), err);
            }
            Ok(SubmitHandle::ready(seq, result))
        }
    }

    /// Partitions already-recorded sequences into translate units of at
    /// least `min_commands` recorded commands each and replays the units
    /// concurrently, each against its own independent context. A trailing
    /// undersized unit is merged into its predecessor rather than paying
    /// worker dispatch for a trivial batch, and the unit count never
    /// exceeds the number of supplied contexts.
    ///
    /// Per-sequence internal order is preserved; across units there is no
    /// order by design.
    pub fn queue_parallel_submit(
        &self,
        sequences: Vec<CommandSequence>,
        contexts: Vec<Box<dyn Context + Send>>,
        min_commands: usize,
    ) -> Result<ParallelSubmit> {
        assert!(
            !contexts.is_empty(),
            "parallel submit needs at least one context"
        );

        let counts: Vec<usize> = sequences.iter().map(|v| v.len()).collect();
        let sizes = partition(&counts, min_commands, contexts.len());

        let mut seqs = sequences.into_iter();
        let mut ctxs = contexts.into_iter();
        let mut units = Vec::with_capacity(sizes.len());

        for size in sizes {
            let mut unit: Vec<CommandSequence> = seqs.by_ref().take(size).collect();
            for v in &mut unit {
                v.submit();
            }

            let ctx = ctxs.next().unwrap();
            let slot = Arc::new(UnitSlot::new());
            units.push(slot.clone());

            match (self.settings.parallel_translate, self.pool.as_ref()) {
                (true, Some(pool)) => {
                    pool.spawn(move || run_unit(unit, ctx, &slot));
                }
                _ => run_unit(unit, ctx, &slot),
            }
        }

        Ok(ParallelSubmit {
            units,
            spares: ctxs.collect(),
        })
    }

    /// Blocks the calling thread until outstanding work reaches the
    /// guarantee level of `mode`.
    pub fn flush(&self, mode: FlushMode) -> Result<()> {
        if let Some(pool) = self.pool.as_ref() {
            pool.wait_idle();
        }

        if mode >= FlushMode::Dispatched {
            self.queue.wait_dispatched();
        }

        if mode >= FlushMode::Drained {
            self.queue.wait_drained();
        }

        if mode >= FlushMode::Full {
            self.dispatch.with_context(|ctx| ctx.flush())?;
        }

        Ok(())
    }

    /// Allocates a fence point and records its signal into the immediate
    /// graphics sequence, so the point is reached once everything recorded
    /// so far has executed.
    pub fn insert_fence(&self) -> Result<FencePoint> {
        let point = self.dispatch.allocate_fence();
        self.graphics().signal_fence(point)?;
        Ok(point)
    }

    /// Blocks the calling thread until `point` has been reached.
    pub fn wait_fence(&self, point: FencePoint) {
        self.dispatch.fences().wait(point.index, point.value);
    }

    /// Reads a fence slot without blocking.
    pub fn fence_value(&self, index: FenceIndex) -> u64 {
        self.dispatch.fences().value(index)
    }

    /// Marks a frame boundary. Must be called from the producer thread.
    ///
    /// Harvests the immediate sequences submitted at the previous `advance`,
    /// swaps each filled immediate with a reset spare and submits it, bumps
    /// the frame counter, and reports what the completed frame did. The two
    /// sequences per slot ping-pong, so recording never waits on replay.
    pub fn advance(&self) -> Result<FrameInfo> {
        let mut guard = self.immediates.lock().unwrap();
        // Reborrow through the guard so field borrows stay disjoint.
        let imm = &mut *guard;
        let mut info = FrameInfo::default();
        let mut failure = None;

        for v in imm.pending.drain() {
            let (seq, result) = v.wait();
            match result {
                Ok(stats) => {
                    info.sequences += 1;
                    info.commands += stats.commands;
                    info.draws += stats.draws;
                    info.primitives += stats.primitives;
                }
                Err(err) => {
                    error!("sequence #{} failed during replay: {}", seq.uid(), err);
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
            imm.spares.push(seq);
        }

        info.frame = self.dispatch.advance_frame();

        if !imm.graphics.is_empty() {
            let mut spare = self.take_spare(imm);
            spare.begin();
            let filled = mem::replace(&mut imm.graphics, spare);
            let handle = self.execute(filled)?;
            imm.pending.push(handle);
        }

        if !imm.compute.is_empty() {
            let mut spare = self.take_spare(imm);
            spare.begin();
            let filled = mem::replace(&mut imm.compute, spare);
            let handle = self.execute(filled)?;
            imm.pending.push(handle);
        }

        info.duration = imm.frame_start.elapsed();
        imm.frame_start = Instant::now();

        match failure {
            Some(err) => Err(err),
            None => Ok(info),
        }
    }

    /// The number of producer sequences with an open recording session.
    #[inline]
    pub fn outstanding_sequences(&self) -> usize {
        self.dispatch.outstanding()
    }

    /// The current frame number.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.dispatch.frame()
    }

    #[inline]
    fn thread_enabled(&self) -> bool {
        self.settings.execution_thread
    }

    fn take_spare(&self, imm: &mut Immediates) -> CommandSequence {
        imm.spares.pop().unwrap_or_else(|| {
            CommandSequence::new(
                self.dispatch.clone(),
                "imm-spare",
                self.settings.sequence_capacity,
                self.settings.arena_block_size,
                true,
            )
        })
    }
}

/// A lock guard over one of the immediate sequences.
pub struct ImmediateGuard<'a> {
    guard: MutexGuard<'a, Immediates>,
    compute: bool,
}

impl<'a> Deref for ImmediateGuard<'a> {
    type Target = CommandSequence;

    fn deref(&self) -> &CommandSequence {
        if self.compute {
            &self.guard.compute
        } else {
            &self.guard.graphics
        }
    }
}

impl<'a> DerefMut for ImmediateGuard<'a> {
    fn deref_mut(&mut self) -> &mut CommandSequence {
        if self.compute {
            &mut self.guard.compute
        } else {
            &mut self.guard.graphics
        }
    }
}

type UnitOutcome = (
    Vec<CommandSequence>,
    Box<dyn Context + Send>,
    Result<SequenceStats>,
);

struct UnitSlot {
    m: Mutex<Option<UnitOutcome>>,
    v: Condvar,
}

impl UnitSlot {
    fn new() -> Self {
        UnitSlot {
            m: Mutex::new(None),
            v: Condvar::new(),
        }
    }

    fn fill(&self, outcome: UnitOutcome) {
        let mut guard = self.m.lock().unwrap();
        debug_assert!(guard.is_none());
        *guard = Some(outcome);
        self.v.notify_all();
    }

    fn take_wait(&self) -> UnitOutcome {
        let mut guard = self.m.lock().unwrap();
        loop {
            if let Some(v) = guard.take() {
                return v;
            }
            guard = self.v.wait(guard).unwrap();
        }
    }
}

fn run_unit(
    sequences: Vec<CommandSequence>,
    mut ctx: Box<dyn Context + Send>,
    slot: &UnitSlot,
) {
    let mut stats = SequenceStats::default();
    let mut failure = None;
    let mut out = Vec::with_capacity(sequences.len());

    for mut seq in sequences {
        if failure.is_none() {
            let replayed =
                panic::catch_unwind(AssertUnwindSafe(|| seq.replay(ctx.as_mut())));
            match replayed {
                Ok(Ok(v)) => stats.merge(v),
                Ok(Err(err)) => failure = Some(err),
                Err(err) => failure = Some(Error::TranslatePanic(panic_message(&*err))),
            }
        }
        seq.reset();
        out.push(seq);
    }

    slot.fill((
        out,
        ctx,
        match failure {
            Some(err) => Err(err),
            None => Ok(stats),
        },
    ));
}

/// What `ParallelSubmit::wait` hands back: every sequence (reset, in
/// submission order), every context, and the aggregate replay stats.
pub struct ParallelOutcome {
    pub sequences: Vec<CommandSequence>,
    pub contexts: Vec<Box<dyn Context + Send>>,
    pub stats: SequenceStats,
}

/// A ticket for one `queue_parallel_submit` call.
pub struct ParallelSubmit {
    units: Vec<Arc<UnitSlot>>,
    spares: Vec<Box<dyn Context + Send>>,
}

impl ParallelSubmit {
    /// The number of translate units the submission was partitioned into.
    #[inline]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Blocks until every unit has replayed. The first unit error is
    /// propagated; the remaining sequences and contexts are still waited
    /// for so nothing replays after this returns.
    pub fn wait(self) -> Result<ParallelOutcome> {
        let mut outcome = ParallelOutcome {
            sequences: Vec::new(),
            contexts: Vec::new(),
            stats: SequenceStats::default(),
        };
        let mut failure = None;

        for unit in self.units {
            let (seqs, ctx, result) = unit.take_wait();
            outcome.sequences.extend(seqs);
            outcome.contexts.push(ctx);
            match result {
                Ok(stats) => outcome.stats.merge(stats),
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }

        outcome.contexts.extend(self.spares);

        match failure {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }
}

/// Greedy in-order partition of `counts` into units of at least
/// `min_commands` recorded commands. A trailing undersized unit merges into
/// its predecessor; the unit count never exceeds `max_units`. Returns the
/// number of sequences in each unit.
fn partition(counts: &[usize], min_commands: usize, max_units: usize) -> Vec<usize> {
    debug_assert!(max_units > 0);

    let mut sizes = Vec::new();
    let mut run = 0;
    let mut acc = 0;

    for &count in counts {
        run += 1;
        acc += count;

        if acc >= min_commands && sizes.len() + 1 < max_units {
            sizes.push(run);
            run = 0;
            acc = 0;
        }
    }

    if run > 0 {
        if acc >= min_commands || sizes.is_empty() {
            sizes.push(run);
        } else {
            *sizes.last_mut().unwrap() += run;
        }
    }

    sizes
}

#[cfg(test)]
mod test {
    use super::partition;

    #[test]
    fn partition_merges_trailing_undersized_unit() {
        assert_eq!(partition(&[1000, 10], 50, 4), vec![2]);
    }

    #[test]
    fn partition_splits_at_threshold() {
        assert_eq!(partition(&[100, 60, 10], 50, 4), vec![1, 2]);
        assert_eq!(partition(&[30, 30, 30, 30], 50, 4), vec![2, 2]);
    }

    #[test]
    fn partition_respects_max_units() {
        assert_eq!(partition(&[100, 100, 100, 100], 50, 2), vec![1, 3]);
    }

    #[test]
    fn partition_always_yields_one_unit() {
        assert_eq!(partition(&[1, 1, 1], 50, 4), vec![3]);
        assert_eq!(partition(&[0], 50, 4), vec![1]);
    }
}
