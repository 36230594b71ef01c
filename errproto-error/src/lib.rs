//! # errproto-error
//!
//! Error prototypes with stable codes for a multi-component system.
//!
//! ## Design Philosophy
//!
//! - **Prototype**: every error kind is defined once, with a class, a numeric
//!   code, an optional textual code and a printf-style message template
//! - **Derivation**: failures produce copies of the prototype with their own
//!   arguments and call site; the prototype never changes
//! - **Identity**: two errors are the same kind when class and ID match,
//!   whatever their message, arguments or wrapping
//! - **RFC code**: `{Component}:{ErrorClass}:{InnerErrorCode}` names an error
//!   across components and survives any transport that keeps a string
//!
//! ## Usage
//!
//! ```rust
//! use errproto_error::{args, error_equal, Registry};
//!
//! let registry = Registry::new("TiKV");
//! let region = registry.register_class(1, "ErrRegion").unwrap();
//! let unavailable = region
//!     .define_error()
//!     .textual_code("Unavailable")
//!     .message_template("Region %d is unavailable")
//!     .build()
//!     .unwrap();
//!
//! fn load_region(proto: &errproto_error::Error) -> errproto_error::Result<()> {
//!     Err(proto.gen_with_stack_by_args(args![5]))
//! }
//!
//! let err = load_region(&unavailable).unwrap_err().context("split table");
//! assert!(unavailable.equal(&*err));
//! assert!(error_equal(Some(&*unavailable), Some(&*err)));
//! ```
//!
//! ## Principles
//!
//! - Derived errors travel as `anyhow::Error`; wrap them freely
//! - Compare with [`Error::equal`] or [`error_equal`], never with strings
//! - Use `fast_gen*` on hot paths where the call site is not worth recording

mod arg;
mod catalog;
mod class;
mod code;
mod equal;
mod error;
pub mod format;
mod stack;

pub use arg::Arg;
pub use catalog::{Catalog, CatalogEntry, CatalogError, Conflict};
pub use class::{ClassCode, ErrClass, ErrorBuilder, Registry, RegistryError};
pub use code::{ErrCode, ErrorId, RfcCode, RfcCodeError};
pub use equal::{cause, error_equal, error_not_equal, DynError};
pub use error::Error;
pub use stack::{AddStack, StackTrace, SuspendStack};

/// Result type carrying derived errors.
pub type Result<T> = std::result::Result<T, anyhow::Error>;
