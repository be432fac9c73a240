//! Call Memo - A call-memoizing cache
//!
//! Describe the call that would compute a value; get back the stored result
//! while it is live, or compute it once, store it under a key derived from the
//! call, and get that.

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod tasks;

pub use config::{Config, KeyPolicy, LockStrategy};
pub use error::{MemoError, Result};
pub use memo::{Arg, CacheKey, CallDescriptor, Memoizer, RegionCache};
pub use tasks::spawn_cleanup_task;
