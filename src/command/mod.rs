//! The unit of recording and replay: an ordered, append-only sequence of
//! command records built by one producer and later replayed as a whole
//! against a backend [`Context`].
//!
//! [`Context`]: ../context/trait.Context.html

pub mod record;
pub mod sequence;

pub use self::record::Command;
pub use self::sequence::{CommandSequence, SequenceState};

use crate::resources::prelude::*;
use crate::utils::hash_value::HashValue;

/// Which physical GPU(s) a sequence targets, as a bit set. Defaults to all.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuMask(u32);

impl GpuMask {
    pub const ALL: GpuMask = GpuMask(!0);

    /// A mask targeting the single GPU `index`.
    #[inline]
    pub fn single(index: u32) -> Self {
        assert!(index < 32);
        GpuMask(1 << index)
    }

    #[inline]
    pub fn contains(self, index: u32) -> bool {
        index < 32 && (self.0 & (1 << index)) != 0
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl Default for GpuMask {
    fn default() -> Self {
        GpuMask::ALL
    }
}

/// Counters accumulated while replaying one sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceStats {
    /// Total records executed.
    pub commands: u32,
    /// Draw calls among them.
    pub draws: u32,
    /// Primitives the backend reported assembling.
    pub primitives: u32,
}

impl SequenceStats {
    pub(crate) fn merge(&mut self, other: SequenceStats) {
        self.commands += other.commands;
        self.draws += other.draws;
        self.primitives += other.primitives;
    }
}

/// A draw call under construction: the pipeline and vertex source plus up to
/// `MAX_UNIFORM_VARIABLES` named uniforms.
#[derive(Debug, Copy, Clone)]
pub struct Draw {
    pub(crate) uniforms: [(HashValue<str>, UniformVariable); MAX_UNIFORM_VARIABLES],
    pub(crate) uniforms_len: usize,

    pub pipeline: PipelineHandle,
    pub buffer: BufferHandle,
    pub range: DrawRange,
}

impl Draw {
    /// Creates a new and empty draw call.
    pub fn new(pipeline: PipelineHandle, buffer: BufferHandle) -> Self {
        let nil = (HashValue::zero(), UniformVariable::I32(0));
        Draw {
            pipeline,
            buffer,
            uniforms: [nil; MAX_UNIFORM_VARIABLES],
            uniforms_len: 0,
            range: DrawRange::All,
        }
    }

    /// Binds the named field with `UniformVariable`.
    pub fn set_uniform_variable<F, V>(&mut self, field: F, variable: V)
    where
        F: Into<HashValue<str>>,
        V: Into<UniformVariable>,
    {
        assert!(self.uniforms_len < MAX_UNIFORM_VARIABLES);

        let field = field.into();
        let variable = variable.into();

        for i in 0..self.uniforms_len {
            if self.uniforms[i].0 == field {
                self.uniforms[i] = (field, variable);
                return;
            }
        }

        self.uniforms[self.uniforms_len] = (field, variable);
        self.uniforms_len += 1;
    }
}
