//! Immutable or dynamic 2D texture. A texture is a container of one or more
//! images, which can be the source of a texture access from a pipeline.

use cgmath::Vector2;

impl_handle!(TextureHandle);

/// The parameters of a texture object.
#[derive(Debug, Copy, Clone)]
pub struct TextureParams {
    /// Hint abouts the intended update strategy of the data.
    pub hint: TextureHint,
    /// Sets the wrap parameter for texture.
    pub wrap: TextureWrap,
    /// Specify how the texture is used whenever the pixel being sampled.
    pub filter: TextureFilter,
    /// Should we generates a complete set of mipmaps for a texture object.
    pub mipmap: bool,
    /// Sets the format of data.
    pub format: TextureFormat,
    /// Sets the dimensions of texture.
    pub dimensions: Vector2<u32>,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            format: TextureFormat::RGBA8,
            wrap: TextureWrap::Clamp,
            filter: TextureFilter::Linear,
            hint: TextureHint::Immutable,
            mipmap: false,
            dimensions: Vector2::new(0, 0),
        }
    }
}

/// Hint abouts the intended update strategy of the data.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TextureHint {
    /// The data store contents will be specified once, and used many times.
    Immutable,
    /// The data store contents will be specified once, and used at most a few times.
    Stream,
    /// The data store contents will be respecified repeatedly, and used many times.
    Dynamic,
}

/// Sets the wrap parameter for texture.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureWrap {
    /// Samples at coord x + 1 map to coord x.
    Repeat,
    /// Samples at coord x + 1 map to coord 1 - x.
    Mirror,
    /// Samples at coord x + 1 map to coord 1.
    Clamp,
}

/// Specify how the texture is used whenever the pixel being sampled.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureFilter {
    /// Returns the value of the texture element that is nearest to the center
    /// of the pixel being textured.
    Nearest,
    /// Returns the weighted average of the four texture elements that are
    /// closest to the center of the pixel being textured.
    Linear,
}

/// List of the formats of the pixel data stored in a texture.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureFormat {
    R8,
    RG8,
    RGB8,
    RGBA8,
    RGBA16F,
    Depth24Stencil8,
}

impl TextureFormat {
    /// Returns the size in bytes of a single texel of this format.
    pub fn size(self) -> u8 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::RG8 => 2,
            TextureFormat::RGB8 => 3,
            TextureFormat::RGBA8 => 4,
            TextureFormat::RGBA16F => 8,
            TextureFormat::Depth24Stencil8 => 4,
        }
    }
}
