//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the engine.
//!
//! # Tasks
//! - TTL Cleanup: Drops expired memoized results at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
