//! The backend of the engine, which should be responsible for only one
//! thing: translating commands into low-level driver calls.

use crate::errors::*;
use crate::fence::FenceIndex;
use crate::resources::prelude::*;
use crate::utils::hash_value::HashValue;

/// A named uniform variable, as captured by a draw.
pub type UniformVar = (HashValue<str>, UniformVariable);

/// The collaborator a recorded command's execute step ultimately calls into.
/// One method per distinct backend operation; the engine guarantees each is
/// called exactly once per record, in sequence order, and imposes no
/// batching contract beyond that.
pub trait Context {
    fn create_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    fn update_buffer(&mut self, handle: BufferHandle, offset: usize, data: &[u8]) -> Result<()>;

    fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()>;

    fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        area: SurfaceRect,
        data: &[u8],
    ) -> Result<()>;

    fn delete_texture(&mut self, handle: TextureHandle) -> Result<()>;

    fn create_pipeline(&mut self, handle: PipelineHandle, params: PipelineParams) -> Result<()>;

    fn delete_pipeline(&mut self, handle: PipelineHandle) -> Result<()>;

    fn bind_surface(&mut self, handle: SurfaceHandle) -> Result<()>;

    fn update_viewport(&mut self, viewport: SurfaceViewport) -> Result<()>;

    fn update_scissor(&mut self, scissor: SurfaceScissor) -> Result<()>;

    /// Issues a draw with the bound state. Returns the number of primitives
    /// assembled.
    fn draw(
        &mut self,
        pipeline: PipelineHandle,
        buffer: BufferHandle,
        range: DrawRange,
        uniforms: &[UniformVar],
    ) -> Result<u32>;

    fn dispatch(&mut self, pipeline: PipelineHandle, groups: [u32; 3]) -> Result<()>;

    /// Emits a GPU-visible signal; the engine mirrors the value into the
    /// fence ring once this returns.
    fn signal_fence(&mut self, index: FenceIndex, value: u64) -> Result<()>;

    fn push_marker(&mut self, label: &str) -> Result<()>;

    fn pop_marker(&mut self) -> Result<()>;

    /// Blocks until all execution is complete. Such effects include all
    /// changes to render state and all changes to the frame buffer contents.
    fn flush(&mut self) -> Result<()>;
}

/// A `Context` that accepts every operation and does nothing, for headless
/// operation and tests.
#[derive(Debug, Default)]
pub struct NullContext;

impl NullContext {
    pub fn new() -> Self {
        NullContext
    }
}

impl Context for NullContext {
    fn create_buffer(&mut self, _: BufferHandle, _: BufferParams, _: Option<&[u8]>) -> Result<()> {
        Ok(())
    }

    fn update_buffer(&mut self, _: BufferHandle, _: usize, _: &[u8]) -> Result<()> {
        Ok(())
    }

    fn delete_buffer(&mut self, _: BufferHandle) -> Result<()> {
        Ok(())
    }

    fn create_texture(
        &mut self,
        _: TextureHandle,
        _: TextureParams,
        _: Option<&[u8]>,
    ) -> Result<()> {
        Ok(())
    }

    fn update_texture(&mut self, _: TextureHandle, _: SurfaceRect, _: &[u8]) -> Result<()> {
        Ok(())
    }

    fn delete_texture(&mut self, _: TextureHandle) -> Result<()> {
        Ok(())
    }

    fn create_pipeline(&mut self, _: PipelineHandle, _: PipelineParams) -> Result<()> {
        Ok(())
    }

    fn delete_pipeline(&mut self, _: PipelineHandle) -> Result<()> {
        Ok(())
    }

    fn bind_surface(&mut self, _: SurfaceHandle) -> Result<()> {
        Ok(())
    }

    fn update_viewport(&mut self, _: SurfaceViewport) -> Result<()> {
        Ok(())
    }

    fn update_scissor(&mut self, _: SurfaceScissor) -> Result<()> {
        Ok(())
    }

    fn draw(
        &mut self,
        _: PipelineHandle,
        _: BufferHandle,
        _: DrawRange,
        _: &[UniformVar],
    ) -> Result<u32> {
        Ok(0)
    }

    fn dispatch(&mut self, _: PipelineHandle, _: [u32; 3]) -> Result<()> {
        Ok(())
    }

    fn signal_fence(&mut self, _: FenceIndex, _: u64) -> Result<()> {
        Ok(())
    }

    fn push_marker(&mut self, _: &str) -> Result<()> {
        Ok(())
    }

    fn pop_marker(&mut self) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
