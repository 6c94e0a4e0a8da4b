//! Cache Key Module
//!
//! Builds the canonical string identity of a method call:
//! `DeclaringType.method(arg1,arg2,...)`.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

use crate::error::{CacheError, Result};
use crate::interception::MethodDescriptor;

const NULL_TOKEN: &str = "(null)";
const PROGRESS_TOKEN: &str = "progress";

// == Key Argument ==
/// One argument value as it takes part in a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyArg {
    /// Absent value, rendered as `(null)`
    Null,
    /// String-like value, rendered single-quoted
    Quoted(String),
    /// Progress callback, rendered as `progress` and excluded from identity
    Progress,
    /// Any other value in its display form
    Text {
        text: String,
        type_name: &'static str,
    },
}

impl KeyArg {
    /// Captures `value` through its `Display` implementation.
    pub fn display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        KeyArg::Text {
            text: value.to_string(),
            type_name: type_name::<T>(),
        }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        KeyArg::Quoted(value.into())
    }

    // == Render ==
    /// Key fragment for this argument.
    ///
    /// A display form equal to the type's name means the type has no
    /// meaningful string form, which would make keys collide.
    pub fn render(&self) -> Result<String> {
        match self {
            KeyArg::Null => Ok(NULL_TOKEN.to_string()),
            KeyArg::Quoted(value) => Ok(format!("'{}'", value)),
            KeyArg::Progress => Ok(PROGRESS_TOKEN.to_string()),
            KeyArg::Text { text, type_name } => {
                if text == type_name || text == short_type_name(type_name) {
                    return Err(CacheError::Configuration(format!(
                        "The type '{}' must implement a meaningful Display for method cache key generation",
                        type_name
                    )));
                }
                Ok(text.clone())
            }
        }
    }
}

/// `a::b::Thing<c::D>` becomes `Thing`.
fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

// == To Key Arg ==
/// Conversion of an argument value into its key form.
pub trait ToKeyArg {
    fn to_key_arg(&self) -> KeyArg;
}

impl<T: ToKeyArg + ?Sized> ToKeyArg for &T {
    fn to_key_arg(&self) -> KeyArg {
        (**self).to_key_arg()
    }
}

impl ToKeyArg for str {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::quoted(self)
    }
}

impl ToKeyArg for String {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::quoted(self.as_str())
    }
}

impl ToKeyArg for Url {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::quoted(self.as_str())
    }
}

impl<T: ToKeyArg> ToKeyArg for Option<T> {
    fn to_key_arg(&self) -> KeyArg {
        match self {
            Some(value) => value.to_key_arg(),
            None => KeyArg::Null,
        }
    }
}

impl ToKeyArg for KeyArg {
    fn to_key_arg(&self) -> KeyArg {
        self.clone()
    }
}

macro_rules! display_key_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToKeyArg for $ty {
                fn to_key_arg(&self) -> KeyArg {
                    KeyArg::display(self)
                }
            }
        )*
    };
}

display_key_arg!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    NaiveDate, DateTime<Utc>
);

// == Progress ==
/// Progress callback handed to long-running operations.
///
/// Never part of a call's identity.
#[derive(Clone)]
pub struct Progress(Arc<dyn Fn(f64) + Send + Sync>);

impl Progress {
    pub fn new(report: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self(Arc::new(report))
    }

    /// Reports completion as a fraction in `0.0..=1.0`.
    pub fn report(&self, fraction: f64) {
        (self.0)(fraction)
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Progress")
    }
}

impl ToKeyArg for Progress {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Progress
    }
}

// == Key Generator ==
/// Computes cache keys for method calls.
pub trait KeyGenerator: Send + Sync {
    fn cache_key(&self, method: &MethodDescriptor, arguments: &[KeyArg]) -> Result<String>;
}

/// `DeclaringType.method(arg1,arg2,...)` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodCacheKeyGenerator;

impl KeyGenerator for MethodCacheKeyGenerator {
    fn cache_key(&self, method: &MethodDescriptor, arguments: &[KeyArg]) -> Result<String> {
        let parts = arguments
            .iter()
            .map(KeyArg::render)
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "{}.{}({})",
            method.declaring_type,
            method.name,
            parts.join(",")
        ))
    }
}
