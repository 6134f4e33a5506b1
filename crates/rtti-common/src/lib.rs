//! Common utilities shared by the rtti crates.
//!
//! - Centralized recursion and traversal limits
//! - Tracing subscriber configuration for binaries and debugging sessions

// Centralized limits and thresholds
pub mod limits;

// Tracing subscriber setup (RTTI_LOG / RTTI_LOG_FORMAT)
pub mod tracing_config;
pub use tracing_config::{LogFormat, init_tracing};
