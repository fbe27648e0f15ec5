//! Delay-and-collapse of rapid viewport updates.
//!
//! [`fixed::FixedDebounce`] and [`adaptive::AdaptiveDebounce`] are plain state
//! machines driven by explicit instants, so they can run inside any event loop.
//! [`fixed::Debouncer`] drives the fixed variant with tokio timers.

pub mod adaptive;
pub mod fixed;

pub use adaptive::{AdaptiveDebounce, FrameSampler};
pub use fixed::{Debouncer, FixedDebounce};
