//! Named render target. A surface is where draw and dispatch operations end
//! up; binding one redirects subsequent commands to it.

use cgmath::Vector2;

impl_handle!(SurfaceHandle);

/// A rectangular area of a surface or texture, measured in pixels from the
/// lower left corner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SurfaceRect {
    pub position: Vector2<u32>,
    pub size: Vector2<u32>,
}

/// Sets the viewport of surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SurfaceViewport {
    pub position: Vector2<i32>,
    pub size: Vector2<u32>,
}

/// Sets the scissor test of surface.
///
/// The test is initially disabled. While the test is enabled, only pixels
/// that lie within the scissor box can be modified by drawing commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SurfaceScissor {
    Enable {
        position: Vector2<i32>,
        size: Vector2<u32>,
    },
    Disable,
}
