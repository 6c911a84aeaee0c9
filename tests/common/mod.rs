#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use stylus::prelude::*;

/// A shared log of backend calls. The observable behavior of the engine is
/// the order of context invocations, so the assertions in the integration
/// tests all run against this.
#[derive(Clone, Default)]
pub struct Trace {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn context(&self) -> TraceContext {
        TraceContext {
            trace: self.clone(),
            draw_delay: None,
        }
    }

    /// A context whose draws stall, to simulate a slow driver.
    pub fn context_with_draw_delay(&self, delay: Duration) -> TraceContext {
        TraceContext {
            trace: self.clone(),
            draw_delay: Some(delay),
        }
    }

    fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// A `Context` that records every invocation into its `Trace`. Draws report
/// a fixed three primitives so stats are predictable.
pub struct TraceContext {
    trace: Trace,
    draw_delay: Option<Duration>,
}

impl Context for TraceContext {
    fn create_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.trace.push(format!(
            "create_buffer {} {:?} {:?}",
            handle.index(),
            params.kind,
            data
        ));
        Ok(())
    }

    fn update_buffer(&mut self, handle: BufferHandle, offset: usize, data: &[u8]) -> Result<()> {
        self.trace
            .push(format!("update_buffer {} {} {:?}", handle.index(), offset, data));
        Ok(())
    }

    fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        self.trace.push(format!("delete_buffer {}", handle.index()));
        Ok(())
    }

    fn create_texture(
        &mut self,
        handle: TextureHandle,
        _: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.trace
            .push(format!("create_texture {} {:?}", handle.index(), data));
        Ok(())
    }

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        area: SurfaceRect,
        data: &[u8],
    ) -> Result<()> {
        self.trace.push(format!(
            "update_texture {} {:?} {:?}",
            handle.index(),
            area.size,
            data
        ));
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        self.trace.push(format!("delete_texture {}", handle.index()));
        Ok(())
    }

    fn create_pipeline(&mut self, handle: PipelineHandle, _: PipelineParams) -> Result<()> {
        self.trace.push(format!("create_pipeline {}", handle.index()));
        Ok(())
    }

    fn delete_pipeline(&mut self, handle: PipelineHandle) -> Result<()> {
        self.trace.push(format!("delete_pipeline {}", handle.index()));
        Ok(())
    }

    fn bind_surface(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.trace.push(format!("bind_surface {}", handle.index()));
        Ok(())
    }

    fn update_viewport(&mut self, viewport: SurfaceViewport) -> Result<()> {
        self.trace.push(format!("update_viewport {:?}", viewport.size));
        Ok(())
    }

    fn update_scissor(&mut self, scissor: SurfaceScissor) -> Result<()> {
        self.trace.push(format!("update_scissor {:?}", scissor));
        Ok(())
    }

    fn draw(
        &mut self,
        pipeline: PipelineHandle,
        buffer: BufferHandle,
        _: DrawRange,
        uniforms: &[UniformVar],
    ) -> Result<u32> {
        if let Some(delay) = self.draw_delay {
            thread::sleep(delay);
        }

        self.trace.push(format!(
            "draw {} {} uniforms:{}",
            pipeline.index(),
            buffer.index(),
            uniforms.len()
        ));
        Ok(3)
    }

    fn dispatch(&mut self, pipeline: PipelineHandle, groups: [u32; 3]) -> Result<()> {
        self.trace
            .push(format!("dispatch {} {:?}", pipeline.index(), groups));
        Ok(())
    }

    fn signal_fence(&mut self, index: FenceIndex, value: u64) -> Result<()> {
        self.trace
            .push(format!("signal_fence {} {}", index.index(), value));
        Ok(())
    }

    fn push_marker(&mut self, label: &str) -> Result<()> {
        self.trace.push(format!("push_marker {}", label));
        Ok(())
    }

    fn pop_marker(&mut self) -> Result<()> {
        self.trace.push("pop_marker".to_owned());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.trace.push("flush".to_owned());
        Ok(())
    }
}

/// A `Context` that fails every draw, for error propagation tests.
pub struct FailingContext;

impl Context for FailingContext {
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
        Err(Error::Backend("draw rejected".to_owned()))
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

/// Settings that keep everything on the calling thread, so traces are
/// deterministic without flushing.
pub fn inline_settings() -> Settings {
    Settings {
        execution_thread: false,
        parallel_translate: false,
        num_workers: 0,
        ..Default::default()
    }
}
