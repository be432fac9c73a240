//! Key Encoder
//!
//! Joins region, method name and canonical tokens into one cache key of the
//! shape `region.method(token1,token2)`.
//!
//! Token text is not escaped by default, so distinct token sequences can join
//! to the same key (`["a,b"]` and `["a", "b"]`). Enable
//! [`KeyPolicy::escape_delimiters`](crate::config::KeyPolicy) to rule that out.

use std::borrow::Borrow;
use std::fmt;

use crate::memo::CanonicalToken;

/// Separator between tokens inside the parentheses.
pub const TOKEN_DELIMITER: char = ',';

// == Cache Key ==
/// A derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

// == Encode ==
/// Encodes a cache key. Empty parentheses when there are no tokens.
pub fn encode(region: &str, method: &str, tokens: &[CanonicalToken], escape: bool) -> CacheKey {
    let capacity = region.len()
        + method.len()
        + 3
        + tokens.iter().map(|t| t.as_str().len() + 1).sum::<usize>();
    let mut key = String::with_capacity(capacity);

    key.push_str(region);
    key.push('.');
    key.push_str(method);
    key.push('(');
    for (index, token) in tokens.iter().enumerate() {
        if index > 0 {
            key.push(TOKEN_DELIMITER);
        }
        if escape {
            push_escaped(&mut key, token.as_str());
        } else {
            key.push_str(token.as_str());
        }
    }
    key.push(')');

    CacheKey(key)
}

fn push_escaped(key: &mut String, text: &str) {
    for c in text.chars() {
        if c == '\\' || c == TOKEN_DELIMITER {
            key.push('\\');
        }
        key.push(c);
    }
}
