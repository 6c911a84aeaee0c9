//! Functions for configuring the executor.

/// A structure containing configuration data for the command engine, which
/// are used to specify the dispatch strategy and the sizes of the internal
/// buffers at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Invokes recorded operations immediately on the calling thread instead
    /// of deferring them. The toggle is only available in debug builds; in
    /// release builds the configured value is fixed for the lifetime of the
    /// executor.
    pub bypass: bool,
    /// Replays submitted sequences on a dedicated execution thread. When
    /// disabled, submission replays inline on the calling thread.
    pub execution_thread: bool,
    /// Replays independent sequences concurrently on the worker pool during
    /// `queue_parallel_submit`. When disabled, translate units run
    /// sequentially with identical observable results.
    pub parallel_translate: bool,
    /// The number of worker threads backing parallel translate and helper
    /// tasks. A value of 0 disables the pool entirely.
    pub num_workers: u32,
    /// Sets the stack size of worker threads in bytes.
    pub worker_stack_size: Option<usize>,
    /// The number of slots in the fence ring. Allocating more fences than
    /// this within a single frame is a fatal pacing bug.
    pub fence_ring_size: usize,
    /// The size in bytes of the fixed blocks backing each sequence's arena.
    pub arena_block_size: usize,
    /// The initial command capacity of a freshly created sequence.
    pub sequence_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bypass: false,
            execution_thread: true,
            parallel_translate: true,
            num_workers: 2,
            worker_stack_size: None,
            fence_ring_size: 16,
            arena_block_size: 64 * 1024,
            sequence_capacity: 32,
        }
    }
}
