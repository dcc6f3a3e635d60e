//! # Vermilion Engine Core
//!
//! Foundation crate for the Vermilion engine: object lifecycle and
//! subsystem-decoupling primitives with no rendering, audio, or platform
//! dependencies.
//!
//! ## Core Types
//!
//! - [`Handle`] — packed, generation-checked reference into a pool
//! - [`HandlePool`] — dense object pool with O(1) add/swap-remove and
//!   use-after-free detection
//! - [`Signal`] — typed multicast publish/subscribe with RAII
//!   [`Connection`] tokens
//! - [`Observer`] — owned connection set, disconnecting on drop
//! - [`CoreSignals`] / [`FramePump`] — per-frame `begin_frame`/`end_frame`
//!   boundary bus driven by the host application
//!
//! See `DESIGN.md` at the workspace root for architecture decisions.

pub mod frame;
pub mod handle;
pub mod handle_pool;
pub mod signal;

pub use frame::{BeginFrame, CoreSignals, EndFrame, FramePump};
pub use handle::Handle;
pub use handle_pool::HandlePool;
pub use signal::{Connection, Observer, Signal};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
