//! # Stylus
//!
//! Stylus is a command recording and deferred execution engine that sits
//! between high-level rendering code and a graphics driver backend. Rendering
//! code issues state-change and draw operations from a producer thread
//! without stalling on the driver; the operations are batched into replayable
//! sequences and executed either synchronously (bypass) or asynchronously on
//! a dedicated execution thread, with strict per-sequence ordering and fences
//! for cross-thread synchronization.
//!
//! The driver itself is abstracted behind the [`Context`] trait; stylus only
//! guarantees that every recorded operation reaches the context exactly once,
//! in the order it was recorded.
//!
//! [`Context`]: context/trait.Context.html

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

#[macro_use]
pub mod utils;

pub mod command;
pub mod context;
pub mod errors;
pub mod executor;
pub mod fence;
pub mod resources;
pub mod sched;
pub mod settings;

pub mod prelude;

pub use crate::errors::{Error, Result};
pub use crate::settings::Settings;
