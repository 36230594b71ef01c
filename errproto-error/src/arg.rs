//! Formatting arguments bound to a derived error

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single printf-style argument.
///
/// Arguments are stored as-is when an error is derived and only rendered
/// when the error is displayed. The variant decides which verbs apply:
/// a `%d` given a [`Arg::Str`] renders a `%!d(string=...)` marker instead
/// of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
}

impl Arg {
    /// Capture any displayable value as a string argument.
    pub fn display(value: impl fmt::Display) -> Self {
        Arg::Str(value.to_string())
    }

    /// Type name shown inside mismatch markers.
    pub fn type_name(&self) -> &'static str {
        match self {
            Arg::Bool(_) => "bool",
            Arg::Int(_) => "int",
            Arg::Uint(_) => "uint",
            Arg::Float(_) => "float64",
            Arg::Str(_) => "string",
        }
    }
}

/// Renders the value the way `%v` would.
impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::sprintf("%v", std::slice::from_ref(self)))
    }
}

macro_rules! impl_from {
    ($variant:ident as $target:ty: $($ty:ty),+) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::$variant(v as $target)
                }
            }
        )+
    };
}

impl_from!(Int as i64: i8, i16, i32, i64, isize);
impl_from!(Uint as u64: u8, u16, u32, u64, usize);
impl_from!(Float as f64: f32, f64);

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

impl From<char> for Arg {
    fn from(v: char) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}

impl From<&String> for Arg {
    fn from(v: &String) -> Self {
        Arg::Str(v.clone())
    }
}

/// Build a `Vec<Arg>` from heterogeneous values.
///
/// ```rust
/// use errproto_error::{args, Arg};
///
/// let args = args![5, "idx1", 0.5];
/// assert_eq!(args, vec![Arg::Int(5), Arg::Str("idx1".into()), Arg::Float(0.5)]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Arg::from(-3i8), Arg::Int(-3));
        assert_eq!(Arg::from(7usize), Arg::Uint(7));
        assert_eq!(Arg::from(1.5f32), Arg::Float(1.5));
        assert_eq!(Arg::from('x'), Arg::Str("x".into()));
        assert_eq!(Arg::from(true), Arg::Bool(true));
    }

    #[test]
    fn test_args_macro() {
        assert!(args![].is_empty());
        let region_id = 42u64;
        assert_eq!(args![region_id, "down"], vec![Arg::Uint(42), Arg::Str("down".into())]);
    }

    #[test]
    fn test_display_uses_v_verb() {
        assert_eq!(Arg::Float(1.0).to_string(), "1");
        assert_eq!(Arg::Int(-5).to_string(), "-5");
        assert_eq!(Arg::display(std::net::Ipv4Addr::LOCALHOST).to_string(), "127.0.0.1");
    }

    #[test]
    fn test_untagged_json() {
        let args: Vec<Arg> = serde_json::from_str(r#"[1, "a", true, 2.5]"#).unwrap();
        assert_eq!(
            args,
            vec![Arg::Int(1), Arg::Str("a".into()), Arg::Bool(true), Arg::Float(2.5)]
        );
    }
}
