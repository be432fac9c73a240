//! Configuration Module
//!
//! Handles loading and managing engine configuration from environment variables.

use std::env;

/// How resolve, remove and bust operations are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockStrategy {
    /// One lock per cache key. Unrelated keys compute concurrently.
    #[default]
    PerKey,
    /// One store-wide lock held for every operation, including the computation.
    Global,
}

impl LockStrategy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_key" | "per-key" | "perkey" => Some(Self::PerKey),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

/// Key derivation options.
///
/// The defaults reproduce the plain `region.method(a,b)` format with no escaping
/// and no token for null arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPolicy {
    /// Escape `\` and `,` inside token text so token boundaries stay unambiguous
    pub escape_delimiters: bool,
    /// Token emitted for null arguments; `None` drops them from the key
    pub null_token: Option<String>,
}

/// Engine configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Lock scope used by the engine
    pub lock_strategy: LockStrategy,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Key derivation options
    pub key_policy: KeyPolicy,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LOCK_STRATEGY` - `per_key` or `global` (default: per_key)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `ESCAPE_KEY_DELIMITERS` - Escape commas inside tokens (default: false)
    /// - `NULL_ARGUMENT_TOKEN` - Token for null arguments (default: unset)
    pub fn from_env() -> Self {
        Self {
            lock_strategy: env::var("LOCK_STRATEGY")
                .ok()
                .and_then(|v| LockStrategy::parse(&v))
                .unwrap_or_default(),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            key_policy: KeyPolicy {
                escape_delimiters: env::var("ESCAPE_KEY_DELIMITERS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(false),
                null_token: env::var("NULL_ARGUMENT_TOKEN").ok(),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_strategy: LockStrategy::PerKey,
            cleanup_interval: 1,
            key_policy: KeyPolicy::default(),
        }
    }
}
