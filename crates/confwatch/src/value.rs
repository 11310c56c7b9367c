//! Immutable snapshot of one configuration entry.
//!
//! A [`Value`] holds the raw content fetched from the remote service and
//! exposes decoded views over it. It is never mutated: a reload builds a
//! brand-new `Value` and swaps it into the store, so anyone holding an older
//! clone keeps a consistent copy.
//!
//! # Example
//!
//! ```rust
//! use confwatch::Value;
//!
//! let value = Value::new("8080");
//! let port: u16 = value.int().unwrap();
//! assert_eq!(port, 8080);
//!
//! let missing = Value::empty();
//! assert!(!missing.exists());
//! assert!(missing.as_str().is_err());
//! ```

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use num_traits::NumCast;
use serde::de::DeserializeOwned;

use crate::error::ValueError;

/// Cached content of a single configuration entry.
///
/// Cloning is cheap (the content is shared behind an [`Arc`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Value {
    raw: Option<Arc<str>>,
}

impl Value {
    /// Creates a value holding `content`.
    pub fn new(content: impl Into<Arc<str>>) -> Self {
        Self {
            raw: Some(content.into()),
        }
    }

    /// The sentinel returned when an entry was never fetched or the fetch failed.
    #[must_use]
    pub const fn empty() -> Self {
        Self { raw: None }
    }

    /// Returns `true` unless this is the [`empty`](Self::empty) sentinel.
    ///
    /// An entry whose remote content is the empty string still exists.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.raw.is_some()
    }

    /// The raw content, if any.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// The raw content, or [`ValueError::Missing`] for the empty sentinel.
    pub fn as_str(&self) -> Result<&str, ValueError> {
        self.raw().ok_or(ValueError::Missing)
    }

    /// Parses the content as a boolean.
    ///
    /// Accepts `true/false`, `1/0`, `t/f`, `yes/no` and `on/off`,
    /// case-insensitively and ignoring surrounding whitespace.
    pub fn bool(&self) -> Result<bool, ValueError> {
        let content = self.as_str()?;
        match content.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "t" | "yes" | "on" => Ok(true),

            "false" | "0" | "f" | "no" | "off" => Ok(false),

            _ => Err(ValueError::parse(content, "bool")),
        }
    }

    /// Parses the content as an integer of type `T`.
    ///
    /// The text is parsed as `i64` (or `u64` for large positives) and then
    /// range-checked into `T`, so `"300"` fails for `u8` instead of wrapping.
    pub fn int<T: NumCast>(&self) -> Result<T, ValueError> {
        let content = self.as_str()?;
        let trimmed = content.trim();

        let cast = if let Ok(n) = trimmed.parse::<i64>() {
            <T as NumCast>::from(n)
        } else if let Ok(n) = trimmed.parse::<u64>() {
            <T as NumCast>::from(n)
        } else {
            None
        };

        cast.ok_or_else(|| ValueError::parse(content, std::any::type_name::<T>()))
    }

    /// Parses the content as a 64-bit float.
    pub fn float(&self) -> Result<f64, ValueError> {
        self.parse::<f64>()
    }

    /// Parses the trimmed content with [`FromStr`].
    pub fn parse<T: FromStr>(&self) -> Result<T, ValueError> {
        let content = self.as_str()?;
        content
            .trim()
            .parse()
            .map_err(|_| ValueError::parse(content, std::any::type_name::<T>()))
    }

    /// Decodes the content as a JSON document.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        serde_json::from_str(self.as_str()?).map_err(|e| ValueError::decode("json", e))
    }

    /// Decodes the content as a TOML document.
    #[cfg(feature = "toml")]
    pub fn toml<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        toml::from_str(self.as_str()?).map_err(|e| ValueError::decode("toml", e))
    }

    /// Decodes the content as a YAML document.
    #[cfg(feature = "yaml")]
    pub fn yaml<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        serde_saphyr::from_str(self.as_str()?).map_err(|e| ValueError::decode("yaml", e))
    }
}

impl From<&str> for Value {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for Value {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw().unwrap_or_default())
    }
}
