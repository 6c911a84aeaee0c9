//! The argument vocabulary of backend operations: typed handles and the
//! parameter structs captured by recorded commands.

pub mod buffer;
pub mod pipeline;
pub mod surface;
pub mod texture;

pub mod prelude {
    pub use super::buffer::{BufferHandle, BufferHint, BufferKind, BufferParams};
    pub use super::pipeline::{
        DrawRange, PipelineHandle, PipelineParams, Primitive, UniformVariable,
        UniformVariableType, MAX_UNIFORM_VARIABLES,
    };
    pub use super::surface::{SurfaceHandle, SurfaceRect, SurfaceScissor, SurfaceViewport};
    pub use super::texture::{
        TextureFilter, TextureFormat, TextureHandle, TextureHint, TextureParams, TextureWrap,
    };
}
