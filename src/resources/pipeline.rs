//! Pipeline state object. It encapsulates all the information we need to
//! configure the device before a draw or dispatch is issued.

use crate::resources::texture::TextureHandle;

impl_handle!(PipelineHandle);

/// The maximum number of uniform variables that can be bound to one draw.
pub const MAX_UNIFORM_VARIABLES: usize = 8;

/// The parameters of a pipeline state object.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PipelineParams {
    /// The kind of geometric primitives assembled from vertex data.
    pub primitive: Primitive,
    /// Should incoming fragments be tested against the depth buffer.
    pub depth_test: bool,
    /// Should fragments write their depth value back.
    pub depth_write: bool,
    /// Should back-facing triangles be discarded.
    pub cull_face: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            primitive: Primitive::Triangles,
            depth_test: true,
            depth_write: true,
            cull_face: true,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// The vertex range consumed by one draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawRange {
    /// Consumes the whole bound buffer.
    All,
    /// Consumes `count` vertices starting at `first`.
    Range(u32, u32),
}

/// The type enumerations of `UniformVariable`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UniformVariableType {
    Texture,
    I32,
    F32,
    Vector2f,
    Vector3f,
    Vector4f,
    Matrix4f,
}

/// Uniform variable for pipeline objects. Each matrix based `UniformVariable`
/// is assumed to be supplied in row major order with a optional transpose.
#[derive(Debug, Copy, Clone)]
pub enum UniformVariable {
    Texture(TextureHandle),
    I32(i32),
    F32(f32),
    Vector2f([f32; 2]),
    Vector3f([f32; 3]),
    Vector4f([f32; 4]),
    Matrix4f([[f32; 4]; 4], bool),
}

impl UniformVariable {
    pub fn variable_type(&self) -> UniformVariableType {
        match *self {
            UniformVariable::Texture(_) => UniformVariableType::Texture,
            UniformVariable::I32(_) => UniformVariableType::I32,
            UniformVariable::F32(_) => UniformVariableType::F32,
            UniformVariable::Vector2f(_) => UniformVariableType::Vector2f,
            UniformVariable::Vector3f(_) => UniformVariableType::Vector3f,
            UniformVariable::Vector4f(_) => UniformVariableType::Vector4f,
            UniformVariable::Matrix4f(_, _) => UniformVariableType::Matrix4f,
        }
    }
}

impl From<TextureHandle> for UniformVariable {
    fn from(v: TextureHandle) -> Self {
        UniformVariable::Texture(v)
    }
}

impl From<i32> for UniformVariable {
    fn from(v: i32) -> Self {
        UniformVariable::I32(v)
    }
}

impl From<f32> for UniformVariable {
    fn from(v: f32) -> Self {
        UniformVariable::F32(v)
    }
}

impl From<[f32; 2]> for UniformVariable {
    fn from(v: [f32; 2]) -> Self {
        UniformVariable::Vector2f(v)
    }
}

impl From<[f32; 3]> for UniformVariable {
    fn from(v: [f32; 3]) -> Self {
        UniformVariable::Vector3f(v)
    }
}

impl From<[f32; 4]> for UniformVariable {
    fn from(v: [f32; 4]) -> Self {
        UniformVariable::Vector4f(v)
    }
}

impl From<[[f32; 4]; 4]> for UniformVariable {
    fn from(v: [[f32; 4]; 4]) -> Self {
        UniformVariable::Matrix4f(v, false)
    }
}
