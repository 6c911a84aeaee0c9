//! A buffer object is an untyped region of video memory: vertex and index
//! data, uniform blocks, or raw storage for compute.

impl_handle!(BufferHandle);

/// The parameters of a buffer object.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferParams {
    /// What the buffer is bound as.
    pub kind: BufferKind,
    /// Hint abouts the intended update strategy of the data.
    pub hint: BufferHint,
    /// The size of the data store in bytes.
    pub size: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        BufferParams {
            kind: BufferKind::Vertex,
            hint: BufferHint::Immutable,
            size: 0,
        }
    }
}

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    Storage,
}

/// Hint abouts the intended update strategy of the data.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BufferHint {
    /// The data store contents will be specified once, and used many times.
    Immutable,
    /// The data store contents will be specified once, and used at most a few times.
    Stream,
    /// The data store contents will be respecified repeatedly, and used many times.
    Dynamic,
}
