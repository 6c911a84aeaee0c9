pub use crate::command::{Command, CommandSequence, Draw, GpuMask, SequenceState, SequenceStats};
pub use crate::context::{Context, NullContext, UniformVar};
pub use crate::errors::{Error, Result};
pub use crate::executor::{
    Executor, ExecutorShared, FlushMode, FrameInfo, ParallelOutcome, ParallelSubmit, SubmitHandle,
};
pub use crate::fence::{FenceIndex, FencePoint, FenceRing, FENCE_UNSET};
pub use crate::resources::prelude::*;
pub use crate::sched::TaskHandle;
pub use crate::settings::Settings;
pub use crate::utils::handle::{Handle, HandleLike};
pub use crate::utils::hash_value::HashValue;
