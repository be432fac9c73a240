//! Argument Canonicalizer
//!
//! Reduces a raw argument list to a flat, order-preserving sequence of tokens
//! whose string forms are stable across runs and locales.

use chrono::SecondsFormat;
use serde_json::Value;

use crate::config::KeyPolicy;
use crate::error::Result;
use crate::memo::Arg;

// == Canonical Token ==
/// The normalized string form of one (possibly expanded) argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalToken {
    /// A primitive or value-like argument
    Scalar(String),
    /// A complex argument rendered by the stringify capability
    SerializedObject(String),
}

impl CanonicalToken {
    pub fn as_str(&self) -> &str {
        match self {
            CanonicalToken::Scalar(text) | CanonicalToken::SerializedObject(text) => text,
        }
    }
}

// == Stringify Capability ==
/// Renders a complex argument to a string.
///
/// Implementations must be deterministic: equal values must always render to
/// identical strings, otherwise lookups and invalidation silently miss.
pub trait Stringify: Send + Sync {
    fn stringify(&self, value: &Value) -> Result<String>;
}

/// Compact JSON rendering. Object keys come out sorted.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStringify;

impl Stringify for JsonStringify {
    fn stringify(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }
}

// == Canonicalize ==
/// Canonicalizes `arguments` in order.
///
/// Nulls contribute nothing (or `policy.null_token` when set), lists splice
/// one token per element at any nesting depth, and objects become a single
/// serialized token.
pub fn canonicalize(
    arguments: &[Arg],
    stringify: &dyn Stringify,
    policy: &KeyPolicy,
) -> Result<Vec<CanonicalToken>> {
    let mut tokens = Vec::with_capacity(arguments.len());
    for argument in arguments {
        push_tokens(argument, stringify, policy, &mut tokens)?;
    }
    Ok(tokens)
}

fn push_tokens(
    argument: &Arg,
    stringify: &dyn Stringify,
    policy: &KeyPolicy,
    tokens: &mut Vec<CanonicalToken>,
) -> Result<()> {
    let scalar = match argument {
        Arg::Null => match &policy.null_token {
            Some(token) => token.clone(),
            None => return Ok(()),
        },
        Arg::Bool(value) => value.to_string(),
        Arg::Int(value) => value.to_string(),
        Arg::UInt(value) => value.to_string(),
        Arg::Float(value) => value.to_string(),
        Arg::Char(value) => value.to_string(),
        Arg::Str(value) => value.clone(),
        Arg::DateTime(value) => value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Arg::Date(value) => value.format("%Y-%m-%d").to_string(),
        Arg::List(items) => {
            for item in items {
                push_tokens(item, stringify, policy, tokens)?;
            }
            return Ok(());
        }
        Arg::Object(value) => {
            tokens.push(CanonicalToken::SerializedObject(stringify.stringify(value)?));
            return Ok(());
        }
    };
    tokens.push(CanonicalToken::Scalar(scalar));
    Ok(())
}
