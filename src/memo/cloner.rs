//! Value Cloner
//!
//! Defensive copies of stored results, so a caller mutating what it got back
//! never changes what the next caller sees.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Produces an independent copy of a stored value.
pub trait ValueCloner<T>: Send + Sync {
    fn clone_value(&self, value: &T) -> Result<T>;
}

/// Copies through the type's own `Clone` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneCloner;

impl<T: Clone> ValueCloner<T> for CloneCloner {
    fn clone_value(&self, value: &T) -> Result<T> {
        Ok(value.clone())
    }
}

/// Structural deep copy through a JSON round trip.
///
/// For result types that are serializable but not `Clone`, or whose `Clone`
/// is shallow.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeCloner;

impl<T: Serialize + DeserializeOwned> ValueCloner<T> for SerdeCloner {
    fn clone_value(&self, value: &T) -> Result<T> {
        let snapshot = serde_json::to_value(value)?;
        Ok(serde_json::from_value(snapshot)?)
    }
}
