//! Call-site capture for derived errors

use crate::Error;
use std::panic::Location;

/// Decides what provenance a freshly derived error carries and wraps it
/// into the generic error value handed back to the caller.
///
/// [`AddStack`] records the caller's file and line, [`SuspendStack`] skips
/// that work for hot paths. Custom strategies can be passed to
/// [`Error::derive_with`], which is how tests pin locations.
pub trait StackTrace: Send + Sync {
    /// Attach provenance to `err` derived at `caller`.
    fn attach(&self, err: Error, caller: &'static Location<'static>) -> anyhow::Error;
}

/// Records the derivation call site on the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddStack;

impl StackTrace for AddStack {
    fn attach(&self, err: Error, caller: &'static Location<'static>) -> anyhow::Error {
        anyhow::Error::new(err.with_location(caller.file(), caller.line()))
    }
}

/// Skips call-site capture; the location stays `("", 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuspendStack;

impl StackTrace for SuspendStack {
    fn attach(&self, err: Error, _caller: &'static Location<'static>) -> anyhow::Error {
        anyhow::Error::new(err.with_location("", 0))
    }
}
