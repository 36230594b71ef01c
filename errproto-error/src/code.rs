//! Error codes and RFC-style identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Numeric code of an error, unique within its class.
///
/// This is the value that survives protocols which can only carry a number
/// (e.g. a MySQL-compatible wire protocol).
pub type ErrCode = i32;

/// Per-class identifier of an error: the textual code when one was given,
/// otherwise the decimal numeric code.
pub type ErrorId = String;

/// Errors produced when parsing an [`RfcCode`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RfcCodeError {
    #[error("empty error code")]
    Empty,

    #[error("empty inner error code in '{0}'")]
    EmptyId(String),
}

/// An error code following the RFC layout
/// `{Component}:{ErrorClass}:{InnerErrorCode}`.
///
/// Errors without a registry name drop the component (`{ErrorClass}:{ID}`)
/// and errors without a class are just `{ID}`. The colon separator and the
/// field order are part of the wire format and must never change.
///
/// # Example
///
/// ```rust
/// use errproto_error::RfcCode;
///
/// let code: RfcCode = "TiKV:ErrRegion:Unavailable".parse().unwrap();
/// assert_eq!(code.component(), Some("TiKV"));
/// assert_eq!(code.class(), Some("ErrRegion"));
/// assert_eq!(code.id(), "Unavailable");
/// assert_eq!(code.to_string(), "TiKV:ErrRegion:Unavailable");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RfcCode {
    component: Option<String>,
    class: Option<String>,
    id: String,
}

impl RfcCode {
    /// A code made of the inner error code only.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            component: None,
            class: None,
            id: id.into(),
        }
    }

    /// A code scoped by an error class. An empty component is omitted.
    pub fn scoped(component: &str, class: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            component: (!component.is_empty()).then(|| component.to_string()),
            class: Some(class.into()),
            id: id.into(),
        }
    }

    /// Parse a colon-joined code.
    ///
    /// One field is an inner code, two fields are `{class}:{id}`, three are
    /// `{component}:{class}:{id}`. Colons past the second stay in the id.
    pub fn parse(s: &str) -> Result<Self, RfcCodeError> {
        if s.is_empty() {
            return Err(RfcCodeError::Empty);
        }

        let code = match s.split_once(':') {
            None => Self::bare(s),
            Some((first, rest)) => match rest.split_once(':') {
                None => Self {
                    component: None,
                    class: Some(first.to_string()),
                    id: rest.to_string(),
                },
                Some((class, id)) => Self {
                    component: Some(first.to_string()),
                    class: Some(class.to_string()),
                    id: id.to_string(),
                },
            },
        };

        if code.id.is_empty() {
            return Err(RfcCodeError::EmptyId(s.to_string()));
        }
        Ok(code)
    }

    /// The component (registry name), if present.
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// The error class description, if present.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// The inner error code.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for RfcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.component, &self.class) {
            (Some(component), Some(class)) => write!(f, "{}:{}:{}", component, class, self.id),
            (None, Some(class)) => write!(f, "{}:{}", class, self.id),
            // A component never stands without a class.
            (_, None) => f.write_str(&self.id),
        }
    }
}

impl FromStr for RfcCode {
    type Err = RfcCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RfcCode {
    type Error = RfcCodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RfcCode> for String {
    fn from(code: RfcCode) -> Self {
        code.to_string()
    }
}

impl PartialEq<str> for RfcCode {
    fn eq(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

impl PartialEq<&str> for RfcCode {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}
