//! Commonly used utilities shared by the recording engine.

#[macro_use]
pub mod handle;

pub mod arena;
pub mod hash;
pub mod hash_value;

pub mod prelude {
    pub use super::arena::{Arena, ArenaPtr};
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::hash::hash64;
    pub use super::hash_value::HashValue;
}
