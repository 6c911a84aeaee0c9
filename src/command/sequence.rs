use inlinable_string::InlinableString;
use smallvec::SmallVec;

use crate::context::Context;
use crate::errors::*;
use crate::executor::Dispatch;
use crate::fence::FencePoint;
use crate::resources::prelude::*;
use crate::sched::TaskHandle;
use crate::utils::arena::Arena;

use super::record::Command;
use super::{Draw, GpuMask, SequenceStats};

use std::sync::Arc;

/// Where a sequence sits in its lifecycle. Appending is only legal while
/// `Recording`; replay consumes `Recording` or `Submitted` and always ends
/// back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    Recording,
    Submitted,
    Executing,
}

/// An ordered, append-only collection of command records built by one
/// producer and later replayed as a unit.
///
/// Every public recording method follows the same two-branch protocol: if
/// the executor's bypass flag is set, the corresponding [`Context`] method
/// is invoked directly on the calling thread and nothing is recorded;
/// otherwise the arguments are captured (inline, arena-copied or boxed) and
/// a record is appended. The bypass check is the single branch on the
/// recording hot path.
///
/// A sequence is not internally synchronized; all appends must come from
/// one producer. Cross-thread execution is expressed by moving the sequence
/// into the executor and receiving it back through the completion handle,
/// which makes "append while executing" unrepresentable across threads.
///
/// [`Context`]: ../../context/trait.Context.html
pub struct CommandSequence {
    dispatch: Arc<Dispatch>,
    cmds: Vec<Command>,
    arena: Arena,
    uid: u64,
    state: SequenceState,
    mask: GpuMask,
    label: InlinableString,
    waits: SmallVec<[TaskHandle; 4]>,
    immediate: bool,
    session: bool,
}

impl CommandSequence {
    pub(crate) fn new(
        dispatch: Arc<Dispatch>,
        label: &str,
        capacity: usize,
        block_size: usize,
        immediate: bool,
    ) -> Self {
        CommandSequence {
            dispatch,
            cmds: Vec::with_capacity(capacity),
            arena: Arena::with_block_size(block_size),
            uid: 0,
            state: SequenceState::Idle,
            mask: GpuMask::default(),
            label: InlinableString::from(label),
            waits: SmallVec::new(),
            immediate,
            session: false,
        }
    }

    /// Opens a new recording session: assigns a fresh UID and transitions to
    /// `Recording`. Returns the UID.
    pub fn begin(&mut self) -> u64 {
        assert_eq!(
            self.state,
            SequenceState::Idle,
            "begin() requires an idle sequence"
        );

        self.uid = self.dispatch.next_uid();
        if !self.immediate {
            self.dispatch.open_session();
        }
        self.session = true;
        self.state = SequenceState::Recording;
        self.uid
    }

    /// Marks the sequence ready for execution. Called by the executor on
    /// submission.
    pub(crate) fn submit(&mut self) {
        assert_eq!(
            self.state,
            SequenceState::Recording,
            "only a recording sequence can be submitted"
        );
        self.state = SequenceState::Submitted;
    }

    /// Discards recorded content without executing it: clears the records,
    /// resets the arena and returns to `Idle`. Only safe if the pending
    /// commands have no side effects that must be paired.
    pub fn reset(&mut self) {
        self.cmds.clear();
        self.arena.reset();
        self.waits.clear();
        self.state = SequenceState::Idle;
        if self.session {
            self.session = false;
            if !self.immediate {
                self.dispatch.close_session();
            }
        }
    }

    /// The UID assigned by the last `begin`.
    #[inline]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    #[inline]
    pub fn state(&self) -> SequenceState {
        self.state
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The number of recorded, not yet executed commands.
    #[inline]
    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// The bytes currently held by the payload arena.
    #[inline]
    pub fn arena_bytes(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn mask(&self) -> GpuMask {
        self.mask
    }

    /// Retargets the sequence to other GPU(s). Only legal once outstanding
    /// work has drained.
    pub fn set_mask(&mut self, mask: GpuMask) {
        assert!(
            self.state == SequenceState::Idle && self.cmds.is_empty(),
            "the GPU mask can only change while the sequence is drained"
        );
        self.mask = mask;
    }

    /// Whether recording currently bypasses straight into the backend.
    #[inline]
    pub fn bypass(&self) -> bool {
        self.dispatch.bypass()
    }

    /// Attaches a task that must complete before this sequence may replay.
    pub fn add_wait(&mut self, handle: TaskHandle) {
        self.waits.push(handle);
    }
}

impl CommandSequence {
    pub fn create_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.create_buffer(handle, params, data));
        }

        self.check_recording();
        let ptr = data.map(|v| self.arena.extend_from_slice(v));
        self.cmds
            .push(Command::CreateBuffer(Box::new((handle, params)), ptr));
        Ok(())
    }

    /// Updates a subset of a dynamic buffer. `offset` specifies the offset
    /// into the buffer object's data store where replacement begins,
    /// measured in bytes.
    pub fn update_buffer(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.update_buffer(handle, offset, data));
        }

        self.check_recording();
        let ptr = self.arena.extend_from_slice(data);
        self.cmds.push(Command::UpdateBuffer(handle, offset, ptr));
        Ok(())
    }

    pub fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        if self.dispatch.bypass() {
            return self.dispatch.with_context(|ctx| ctx.delete_buffer(handle));
        }

        self.check_recording();
        self.cmds.push(Command::DeleteBuffer(handle));
        Ok(())
    }

    pub fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.create_texture(handle, params, data));
        }

        self.check_recording();
        let ptr = data.map(|v| self.arena.extend_from_slice(v));
        self.cmds
            .push(Command::CreateTexture(Box::new((handle, params)), ptr));
        Ok(())
    }

    /// Updates a contiguous subregion of an existing two-dimensional texture
    /// object.
    pub fn update_texture(
        &mut self,
        handle: TextureHandle,
        area: SurfaceRect,
        data: &[u8],
    ) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.update_texture(handle, area, data));
        }

        self.check_recording();
        let ptr = self.arena.extend_from_slice(data);
        self.cmds.push(Command::UpdateTexture(handle, area, ptr));
        Ok(())
    }

    pub fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.delete_texture(handle));
        }

        self.check_recording();
        self.cmds.push(Command::DeleteTexture(handle));
        Ok(())
    }

    pub fn create_pipeline(
        &mut self,
        handle: PipelineHandle,
        params: PipelineParams,
    ) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.create_pipeline(handle, params));
        }

        self.check_recording();
        self.cmds
            .push(Command::CreatePipeline(Box::new((handle, params))));
        Ok(())
    }

    pub fn delete_pipeline(&mut self, handle: PipelineHandle) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.delete_pipeline(handle));
        }

        self.check_recording();
        self.cmds.push(Command::DeletePipeline(handle));
        Ok(())
    }

    pub fn bind_surface(&mut self, handle: SurfaceHandle) -> Result<()> {
        if self.dispatch.bypass() {
            return self.dispatch.with_context(|ctx| ctx.bind_surface(handle));
        }

        self.check_recording();
        self.cmds.push(Command::BindSurface(handle));
        Ok(())
    }

    pub fn update_viewport(&mut self, viewport: SurfaceViewport) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.update_viewport(viewport));
        }

        self.check_recording();
        self.cmds.push(Command::UpdateViewport(viewport));
        Ok(())
    }

    pub fn update_scissor(&mut self, scissor: SurfaceScissor) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.update_scissor(scissor));
        }

        self.check_recording();
        self.cmds.push(Command::UpdateScissor(scissor));
        Ok(())
    }

    /// Draws a mesh. In bypass mode the returned value is the number of
    /// primitives the backend assembled; in deferred mode it is zero, and
    /// the primitives show up in the replay stats instead.
    pub fn draw(&mut self, dc: Draw) -> Result<u32> {
        let vars = &dc.uniforms[..dc.uniforms_len];

        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.draw(dc.pipeline, dc.buffer, dc.range, vars));
        }

        self.check_recording();
        let ptr = self.arena.extend_from_slice(vars);
        self.cmds
            .push(Command::Draw(dc.pipeline, dc.buffer, dc.range, ptr));
        Ok(0)
    }

    pub fn dispatch(&mut self, pipeline: PipelineHandle, groups: [u32; 3]) -> Result<()> {
        if self.dispatch.bypass() {
            return self
                .dispatch
                .with_context(|ctx| ctx.dispatch(pipeline, groups));
        }

        self.check_recording();
        self.cmds.push(Command::Dispatch(pipeline, groups));
        Ok(())
    }

    /// Records a GPU-visible signal for `point`. The value is mirrored into
    /// the fence ring once the backend call has been issued.
    pub fn signal_fence(&mut self, point: FencePoint) -> Result<()> {
        if self.dispatch.bypass() {
            self.dispatch
                .with_context(|ctx| ctx.signal_fence(point.index, point.value))?;
            self.dispatch.fences().signal(point.index, point.value);
            return Ok(());
        }

        self.check_recording();
        self.cmds.push(Command::SignalFence(point.index, point.value));
        Ok(())
    }

    pub fn push_marker(&mut self, label: &str) -> Result<()> {
        if self.dispatch.bypass() {
            return self.dispatch.with_context(|ctx| ctx.push_marker(label));
        }

        self.check_recording();
        let ptr = self.arena.extend_from_str(label);
        self.cmds.push(Command::PushMarker(ptr));
        Ok(())
    }

    pub fn pop_marker(&mut self) -> Result<()> {
        if self.dispatch.bypass() {
            return self.dispatch.with_context(|ctx| ctx.pop_marker());
        }

        self.check_recording();
        self.cmds.push(Command::PopMarker);
        Ok(())
    }

    /// Defers an arbitrary operation with captured state, ordered alongside
    /// the typed commands around it. The closure receives the context the
    /// sequence is replaying against.
    pub fn run<F>(&mut self, func: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Context) -> Result<()> + Send + 'static,
    {
        if self.dispatch.bypass() {
            return self.dispatch.with_context(func);
        }

        self.check_recording();
        self.cmds.push(Command::Run(Box::new(func)));
        Ok(())
    }

    #[inline]
    fn check_recording(&self) {
        assert_eq!(
            self.state,
            SequenceState::Recording,
            "commands can only be recorded between begin() and submission"
        );
    }
}

impl CommandSequence {
    /// Replays the recorded commands in append order, invoking exactly one
    /// context method per record, then clears the sequence: records gone,
    /// arena reset, state back to `Idle`. The implicit reset makes replaying
    /// the same recorded content twice structurally impossible.
    ///
    /// A sequence with zero commands replays as a valid no-op. Attached task
    /// handles are waited on before the first record executes.
    pub fn replay(&mut self, ctx: &mut dyn Context) -> Result<SequenceStats> {
        assert!(
            self.state == SequenceState::Recording || self.state == SequenceState::Submitted,
            "replay of a sequence in state {:?}",
            self.state
        );
        self.state = SequenceState::Executing;

        for v in self.waits.drain() {
            v.wait();
        }

        let mut stats = SequenceStats::default();
        let result = self.drain(ctx, &mut stats);

        self.cmds.clear();
        self.arena.reset();
        self.state = SequenceState::Idle;
        if self.session {
            self.session = false;
            if !self.immediate {
                self.dispatch.close_session();
            }
        }

        result.map(|_| stats)
    }

    fn drain(&mut self, ctx: &mut dyn Context, stats: &mut SequenceStats) -> Result<()> {
        // Field borrows must stay disjoint from the `cmds` drain below.
        let arena = &self.arena;
        let dispatch = &self.dispatch;

        for v in self.cmds.drain(..) {
            stats.commands += 1;

            match v {
                Command::BindSurface(handle) => {
                    ctx.bind_surface(handle)?;
                }

                Command::UpdateViewport(viewport) => {
                    ctx.update_viewport(viewport)?;
                }

                Command::UpdateScissor(scissor) => {
                    ctx.update_scissor(scissor)?;
                }

                Command::Draw(pipeline, buffer, range, ptr) => {
                    let vars = arena.as_slice(ptr);
                    stats.draws += 1;
                    stats.primitives += ctx.draw(pipeline, buffer, range, vars)?;
                }

                Command::Dispatch(pipeline, groups) => {
                    ctx.dispatch(pipeline, groups)?;
                }

                Command::CreateBuffer(v, ptr) => {
                    let data = ptr.map(|ptr| arena.as_slice(ptr));
                    ctx.create_buffer(v.0, v.1, data)?;
                }

                Command::UpdateBuffer(handle, offset, ptr) => {
                    let data = arena.as_slice(ptr);
                    ctx.update_buffer(handle, offset, data)?;
                }

                Command::DeleteBuffer(handle) => {
                    ctx.delete_buffer(handle)?;
                }

                Command::CreateTexture(v, ptr) => {
                    let data = ptr.map(|ptr| arena.as_slice(ptr));
                    ctx.create_texture(v.0, v.1, data)?;
                }

                Command::UpdateTexture(handle, area, ptr) => {
                    let data = arena.as_slice(ptr);
                    ctx.update_texture(handle, area, data)?;
                }

                Command::DeleteTexture(handle) => {
                    ctx.delete_texture(handle)?;
                }

                Command::CreatePipeline(v) => {
                    ctx.create_pipeline(v.0, v.1)?;
                }

                Command::DeletePipeline(handle) => {
                    ctx.delete_pipeline(handle)?;
                }

                Command::SignalFence(index, value) => {
                    ctx.signal_fence(index, value)?;
                    dispatch.fences().signal(index, value);
                }

                Command::PushMarker(ptr) => {
                    ctx.push_marker(arena.as_str(ptr))?;
                }

                Command::PopMarker => {
                    ctx.pop_marker()?;
                }

                Command::Run(func) => {
                    func(ctx)?;
                }
            }
        }

        Ok(())
    }
}

impl Drop for CommandSequence {
    fn drop(&mut self) {
        if self.session {
            if !self.cmds.is_empty() {
                warn!(
                    "sequence #{} dropped with {} unexecuted commands",
                    self.uid,
                    self.cmds.len()
                );
            }
            self.session = false;
            if !self.immediate {
                self.dispatch.close_session();
            }
        }
    }
}

impl ::std::fmt::Debug for CommandSequence {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("CommandSequence")
            .field("uid", &self.uid)
            .field("label", &self.label)
            .field("state", &self.state)
            .field("commands", &self.cmds.len())
            .field("mask", &self.mask)
            .finish()
    }
}
