//! Call Descriptor Module
//!
//! Describes a memoizable call: the region it belongs to, the method name and
//! the argument values in declaration order.

use std::collections::BTreeSet;
use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{MemoError, Result};

// == Arg ==
/// One argument of a described call.
///
/// Scalars are rendered to their natural string form when the key is derived,
/// lists are spliced into the argument stream element by element, and objects
/// go through the engine's stringify capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    List(Vec<Arg>),
    Object(Value),
}

impl Arg {
    /// Captures a complex value as a JSON snapshot.
    ///
    /// JSON objects keep their keys sorted, so equal states produce the same
    /// snapshot regardless of field declaration order.
    pub fn object<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Null => Ok(Arg::Null),
            value => Ok(Arg::Object(value)),
        }
    }

    /// Captures a value-like type through its `Display` form.
    pub fn display<T: Display + ?Sized>(value: &T) -> Self {
        Arg::Str(value.to_string())
    }

    /// Builds a list argument from any sequence of convertible items.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        Arg::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_from_arg {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Arg {
                fn from(value: $source) -> Self {
                    Arg::$variant(value as $target)
                }
            }
        )+
    };
}

impl_from_arg!(Int as i64: i8, i16, i32, i64, isize);
impl_from_arg!(UInt as u64: u8, u16, u32, u64, usize);
impl_from_arg!(Float as f64: f32, f64);

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<char> for Arg {
    fn from(value: char) -> Self {
        Arg::Char(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Str(value.clone())
    }
}

impl From<DateTime<Utc>> for Arg {
    fn from(value: DateTime<Utc>) -> Self {
        Arg::DateTime(value)
    }
}

impl From<NaiveDate> for Arg {
    fn from(value: NaiveDate) -> Self {
        Arg::Date(value)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Null, Into::into)
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(value: Vec<T>) -> Self {
        Arg::list(value)
    }
}

impl<T: Into<Arg> + Clone> From<&[T]> for Arg {
    fn from(value: &[T]) -> Self {
        Arg::list(value.iter().cloned())
    }
}

impl<T: Into<Arg>, const N: usize> From<[T; N]> for Arg {
    fn from(value: [T; N]) -> Self {
        Arg::list(value)
    }
}

// Only ordered sets: iteration order of hashed sets is not stable across runs.
impl<T: Into<Arg>> From<BTreeSet<T>> for Arg {
    fn from(value: BTreeSet<T>) -> Self {
        Arg::list(value)
    }
}

// == Call Descriptor ==
/// Immutable description of a memoizable call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    region: String,
    method: String,
    arguments: Vec<Arg>,
}

impl CallDescriptor {
    /// Starts a descriptor for `method` in `region`.
    pub fn builder(region: impl Into<String>, method: impl Into<String>) -> CallDescriptorBuilder {
        CallDescriptorBuilder {
            region: region.into(),
            method: method.into(),
            arguments: Vec::new(),
            error: None,
        }
    }

    /// Starts a descriptor whose region is the short name of type `R`.
    pub fn for_region<R: ?Sized>(method: impl Into<String>) -> CallDescriptorBuilder {
        Self::builder(region_name::<R>(), method)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &[Arg] {
        &self.arguments
    }
}

// == Builder ==
/// Collects arguments for a [`CallDescriptor`] and validates the call shape.
#[derive(Debug)]
pub struct CallDescriptorBuilder {
    region: String,
    method: String,
    arguments: Vec<Arg>,
    error: Option<MemoError>,
}

impl CallDescriptorBuilder {
    /// Appends one argument.
    pub fn arg(mut self, value: impl Into<Arg>) -> Self {
        self.arguments.push(value.into());
        self
    }

    /// Appends every argument of `values` in order.
    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        self.arguments.extend(values.into_iter().map(Into::into));
        self
    }

    /// Appends a complex argument captured through serde.
    ///
    /// A serialization failure is reported by [`build`](Self::build).
    pub fn object<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match Arg::object(value) {
            Ok(arg) => self.arguments.push(arg),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Validates the call shape and returns the descriptor.
    pub fn build(self) -> Result<CallDescriptor> {
        if let Some(err) = self.error {
            return Err(err);
        }
        validate_segment("region", &self.region, &['(', ')', ','])?;
        validate_segment("method name", &self.method, &['(', ')', ',', '.'])?;

        Ok(CallDescriptor {
            region: self.region,
            method: self.method,
            arguments: self.arguments,
        })
    }
}

fn validate_segment(what: &str, value: &str, forbidden: &[char]) -> Result<()> {
    if value.is_empty() {
        return Err(MemoError::Descriptor(format!("{what} must not be empty")));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || forbidden.contains(c))
    {
        return Err(MemoError::Descriptor(format!(
            "{what} {value:?} is not a call shape: contains {c:?}"
        )));
    }
    Ok(())
}

// == Region Name ==
/// Returns the short type name of `R`, without module path or generics.
///
/// `my_app::catalog::Catalog<u32>` becomes `Catalog`.
pub fn region_name<R: ?Sized>() -> &'static str {
    let full = std::any::type_name::<R>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// == Call Macro ==
/// Builds a [`CallDescriptor`] from call syntax.
///
/// ```
/// use call_memo::call;
///
/// struct Catalog;
///
/// let descriptor = call!(Catalog => find_product(42, "red")).unwrap();
/// assert_eq!(descriptor.region(), "Catalog");
/// assert_eq!(descriptor.method(), "find_product");
///
/// let descriptor = call!("billing" => totals()).unwrap();
/// assert_eq!(descriptor.region(), "billing");
/// ```
#[macro_export]
macro_rules! call {
    ($region:literal => $method:ident ( $($arg:expr),* $(,)? )) => {
        $crate::memo::CallDescriptor::builder($region, stringify!($method))
            $(.arg($arg))*
            .build()
    };
    ($region:ty => $method:ident ( $($arg:expr),* $(,)? )) => {
        $crate::memo::CallDescriptor::for_region::<$region>(stringify!($method))
            $(.arg($arg))*
            .build()
    };
}
