//! Equality of errors across wrapping layers
//!
//! Every comparison first resolves its operands to their root cause, so an
//! error wrapped by retries, `anyhow` contexts or any type exposing
//! [`std::error::Error::source`] still compares like the value it wraps.
//!
//! Errors derived from a prototype compare by identity: class and
//! [`Error::id`]. Anything else compares by its display string. That
//! fallback is weaker than identity (two unrelated errors that happen to
//! print the same text are equal) and callers comparing errors that crossed
//! a serialization boundary rely on it.

use crate::Error;
use std::error::Error as StdError;

/// The error values this module compares.
pub type DynError = dyn StdError + 'static;

/// Follow the `source()` chain down to the innermost error.
///
/// An error without a source is its own cause.
pub fn cause(err: &DynError) -> &DynError {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current
}

/// Whether two errors denote the same kind of failure.
///
/// `None` stands for "no error": two `None`s are equal, `None` never equals
/// an error.
pub fn error_equal(a: Option<&DynError>, b: Option<&DynError>) -> bool {
    let (e1, e2) = match (a.map(cause), b.map(cause)) {
        (None, None) => return true,
        (Some(e1), Some(e2)) => (e1, e2),
        _ => return false,
    };

    if same_object(e1, e2) {
        return true;
    }

    match (e1.downcast_ref::<Error>(), e2.downcast_ref::<Error>()) {
        (Some(t1), Some(t2)) => t1.equal(t2),
        _ => e1.to_string() == e2.to_string(),
    }
}

/// Negation of [`error_equal`].
pub fn error_not_equal(a: Option<&DynError>, b: Option<&DynError>) -> bool {
    !error_equal(a, b)
}

/// Whether both references point at the same error value of the same type.
///
/// A struct and its first field share an address, so the vtable is compared
/// along with the address. Zero-sized errors never count as the same object
/// here and fall through to the regular comparison.
pub(crate) fn same_object(a: &DynError, b: &DynError) -> bool {
    std::mem::size_of_val(a) != 0 && std::ptr::eq(a as *const DynError, b as *const DynError)
}
