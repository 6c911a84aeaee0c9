//! One deferred backend invocation plus its captured arguments.
//!
//! Small arguments live inline in the variant; bulk payloads (uniform lists,
//! byte blobs, marker strings) are copied into the owning sequence's arena
//! and referenced through typed offsets; cold-path creation parameters
//! travel in a `Box`. `Run` captures an arbitrary closure so that one-off
//! operations stay ordered with the typed records around them.

use crate::context::{Context, UniformVar};
use crate::errors::*;
use crate::fence::FenceIndex;
use crate::resources::prelude::*;
use crate::utils::arena::ArenaPtr;

pub type VarsPtr = ArenaPtr<[UniformVar]>;
pub type BytesPtr = ArenaPtr<[u8]>;
pub type StrPtr = ArenaPtr<str>;

pub enum Command {
    BindSurface(SurfaceHandle),
    UpdateViewport(SurfaceViewport),
    UpdateScissor(SurfaceScissor),
    Draw(PipelineHandle, BufferHandle, DrawRange, VarsPtr),
    Dispatch(PipelineHandle, [u32; 3]),

    CreateBuffer(Box<(BufferHandle, BufferParams)>, Option<BytesPtr>),
    UpdateBuffer(BufferHandle, usize, BytesPtr),
    DeleteBuffer(BufferHandle),

    CreateTexture(Box<(TextureHandle, TextureParams)>, Option<BytesPtr>),
    UpdateTexture(TextureHandle, SurfaceRect, BytesPtr),
    DeleteTexture(TextureHandle),

    CreatePipeline(Box<(PipelineHandle, PipelineParams)>),
    DeletePipeline(PipelineHandle),

    SignalFence(FenceIndex, u64),
    PushMarker(StrPtr),
    PopMarker,

    Run(Box<dyn FnOnce(&mut dyn Context) -> Result<()> + Send>),
}

impl ::std::fmt::Debug for Command {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        let name = match *self {
            Command::BindSurface(_) => "BindSurface",
            Command::UpdateViewport(_) => "UpdateViewport",
            Command::UpdateScissor(_) => "UpdateScissor",
            Command::Draw(_, _, _, _) => "Draw",
            Command::Dispatch(_, _) => "Dispatch",
            Command::CreateBuffer(_, _) => "CreateBuffer",
            Command::UpdateBuffer(_, _, _) => "UpdateBuffer",
            Command::DeleteBuffer(_) => "DeleteBuffer",
            Command::CreateTexture(_, _) => "CreateTexture",
            Command::UpdateTexture(_, _, _) => "UpdateTexture",
            Command::DeleteTexture(_) => "DeleteTexture",
            Command::CreatePipeline(_) => "CreatePipeline",
            Command::DeletePipeline(_) => "DeletePipeline",
            Command::SignalFence(_, _) => "SignalFence",
            Command::PushMarker(_) => "PushMarker",
            Command::PopMarker => "PopMarker",
            Command::Run(_) => "Run",
        };
        f.write_str(name)
    }
}
