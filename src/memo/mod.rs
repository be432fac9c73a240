//! Memo Module
//!
//! Call descriptors, key derivation and the memoization engine.

mod canonical;
mod cloner;
mod descriptor;
mod engine;
mod key;
mod locks;
mod region;


// Re-export public types
pub use canonical::{canonicalize, CanonicalToken, JsonStringify, Stringify};
pub use cloner::{CloneCloner, SerdeCloner, ValueCloner};
pub use descriptor::{region_name, Arg, CallDescriptor, CallDescriptorBuilder};
pub use engine::{Keys, Memoizer, StoredValue};
pub use key::{encode, CacheKey, TOKEN_DELIMITER};
pub use region::RegionCache;
