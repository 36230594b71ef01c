//! The error prototype and the errors derived from it

use crate::class::ErrorBuilder;
use crate::equal::{cause, same_object, DynError};
use crate::stack::{AddStack, StackTrace, SuspendStack};
use crate::{format, Arg, ErrClass, ErrCode, ErrorId, RfcCode};
use std::fmt::{self, Write};
use std::panic::Location;
use std::sync::Arc;

/// The prototype of a kind of error, and every error derived from it.
///
/// A prototype carries:
/// - `class`: the error class it belongs to (absent for top-level errors)
/// - `code`: numeric code, unique within the class
/// - `code_text`: optional textual code; when set it is the error ID
/// - `message`: a printf-style message template
/// - `workaround` / `description`: remediation text for operators
///
/// Define prototypes once, then derive errors from them where failures
/// happen. Derivation copies the prototype and only overrides the message
/// template, the arguments and the location, so the class and codes of a
/// derived error always match its prototype.
///
/// # Example
///
/// ```rust
/// use errproto_error::{args, Registry};
///
/// let registry = Registry::new("TiDB");
/// let ddl = registry.register_class(4, "ddl").unwrap();
/// let dup_key = ddl
///     .define_error()
///     .textual_code("ErrDupKeyName")
///     .numeric_code(1061)
///     .message_template("duplicate key name %s")
///     .build()
///     .unwrap();
///
/// let err = dup_key.gen_with_stack_by_args(args!["idx1"]);
/// assert_eq!(err.to_string(), "[ddl:ErrDupKeyName] duplicate key name idx1");
/// assert!(dup_key.equal(&*err));
/// ```
#[derive(Clone)]
pub struct Error {
    class: Option<Arc<ErrClass>>,
    code: ErrCode,
    code_text: Arc<str>,
    message: Arc<str>,
    workaround: Arc<str>,
    description: Arc<str>,
    args: Vec<Arg>,
    file: &'static str,
    line: u32,
}

impl Error {
    /// Start defining a top-level error that belongs to no class.
    pub fn builder() -> ErrorBuilder {
        ErrorBuilder::new(None)
    }

    pub(crate) fn from_parts(
        class: Option<Arc<ErrClass>>,
        code: ErrCode,
        code_text: String,
        message: String,
        workaround: String,
        description: String,
    ) -> Self {
        Self {
            class,
            code,
            code_text: code_text.into(),
            message: message.into(),
            workaround: workaround.into(),
            description: description.into(),
            args: Vec::new(),
            file: "",
            line: 0,
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// The class of this error, `None` for top-level errors.
    pub fn class(&self) -> Option<&Arc<ErrClass>> {
        self.class.as_ref()
    }

    /// The numeric code.
    ///
    /// [`Error::id`] prefers the textual code; use this where only a number
    /// can be transmitted (e.g. a MySQL-compatible protocol).
    pub fn code(&self) -> ErrCode {
        self.code
    }

    /// The textual code, empty when none was defined.
    pub fn code_text(&self) -> &str {
        &self.code_text
    }

    /// The ID of this error within its class.
    pub fn id(&self) -> ErrorId {
        if self.code_text.is_empty() {
            self.code.to_string()
        } else {
            self.code_text.to_string()
        }
    }

    /// The RFC code `{Component}:{ErrorClass}:{InnerErrorCode}`.
    ///
    /// The component is dropped when the registry has no name, and the
    /// code is just the ID when there is no class.
    pub fn rfc_code(&self) -> RfcCode {
        match &self.class {
            Some(class) => RfcCode::scoped(class.registry_name(), class.description(), self.id()),
            None => RfcCode::bare(self.id()),
        }
    }

    // =========================================================================
    // Details
    // =========================================================================

    /// The raw, unexpanded message template.
    pub fn message_template(&self) -> &str {
        &self.message
    }

    /// The arguments bound at derivation; empty on prototypes.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Where the error was derived; `("", 0)` when capture was skipped.
    pub fn location(&self) -> (&'static str, u32) {
        (self.file, self.line)
    }

    pub fn workaround(&self) -> &str {
        &self.workaround
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Set the location, for [`StackTrace`] implementations.
    pub fn with_location(mut self, file: &'static str, line: u32) -> Self {
        self.file = file;
        self.line = line;
        self
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// Derive an error with a new message template and arguments, recording
    /// the caller's location.
    #[track_caller]
    pub fn gen_with_stack(&self, format: &str, args: Vec<Arg>) -> anyhow::Error {
        self.derive_with(&AddStack, Some(format), args)
    }

    /// Derive an error with new arguments for the prototype's template,
    /// recording the caller's location.
    #[track_caller]
    pub fn gen_with_stack_by_args(&self, args: Vec<Arg>) -> anyhow::Error {
        self.derive_with(&AddStack, None, args)
    }

    /// Like [`Error::gen_with_stack`] without location capture, for hot paths.
    #[track_caller]
    pub fn fast_gen(&self, format: &str, args: Vec<Arg>) -> anyhow::Error {
        self.derive_with(&SuspendStack, Some(format), args)
    }

    /// Like [`Error::gen_with_stack_by_args`] without location capture.
    #[track_caller]
    pub fn fast_gen_by_args(&self, args: Vec<Arg>) -> anyhow::Error {
        self.derive_with(&SuspendStack, None, args)
    }

    /// Copy this prototype, override template and arguments, and hand the
    /// copy to `stack`.
    ///
    /// Arguments are not checked against the template; a mismatch shows up
    /// as a marker when the message is displayed.
    #[track_caller]
    pub fn derive_with(
        &self,
        stack: &dyn StackTrace,
        format: Option<&str>,
        args: Vec<Arg>,
    ) -> anyhow::Error {
        let mut err = self.clone();
        if let Some(format) = format {
            err.message = Arc::from(format);
        }
        err.args = args;
        stack.attach(err, Location::caller())
    }

    // =========================================================================
    // Equality
    // =========================================================================

    /// Whether `err`, once unwrapped to its root cause, is an error of this
    /// kind: same class and same ID.
    ///
    /// Unlike [`crate::error_equal`], errors from outside this crate are
    /// never equal, whatever their message.
    pub fn equal(&self, err: &DynError) -> bool {
        let origin = cause(err);
        if same_object(self, origin) {
            return true;
        }
        match origin.downcast_ref::<Error>() {
            Some(other) => {
                ErrClass::equal(self.class.as_deref(), other.class.as_deref())
                    && self.id() == other.id()
            }
            None => false,
        }
    }

    /// Negation of [`Error::equal`].
    pub fn not_equal(&self, err: &DynError) -> bool {
        !self.equal(err)
    }
}

/// Identity equality: class and ID, see [`Error::equal`].
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl Eq for Error {}

// =============================================================================
// Display - `[{class}:{code}] {message}`
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        if let Some(class) = &self.class {
            write!(f, "{}", class)?;
        }
        if self.code_text.is_empty() {
            write!(f, ":{}] ", self.code)?;
        } else {
            write!(f, ":{}] ", self.code_text)?;
        }

        if self.args.is_empty() {
            f.write_str(&self.message)
        } else {
            format::write_printf(f, &self.message, &self.args)
        }
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self)?;
        writeln!(f, "    Code: {} ({})", self.rfc_code(), self.code)?;

        if !self.file.is_empty() {
            writeln!(f, "    Location: {}:{}", self.file, self.line)?;
        }
        if !self.description.is_empty() {
            writeln!(f, "    Description: {}", self.description)?;
        }
        if !self.workaround.is_empty() {
            writeln!(f, "    Workaround: {}", self.workaround)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, error_equal, Registry};

    fn tikv_unavailable() -> Arc<Error> {
        let registry = Registry::new("TiKV");
        let region = registry.register_class(1, "ErrRegion").unwrap();
        region
            .define_error()
            .textual_code("Unavailable")
            .numeric_code(9005)
            .message_template("Region %d is unavailable")
            .description("A certain Raft Group is not available.")
            .workaround("Check the status, monitoring data and log of the TiKV server.")
            .build()
            .unwrap()
    }

    fn derived(err: &anyhow::Error) -> &Error {
        err.downcast_ref::<Error>().unwrap()
    }

    #[test]
    fn test_id_prefers_textual_code() {
        let err = tikv_unavailable();
        assert_eq!(err.id(), "Unavailable");
        assert_eq!(err.code(), 9005);

        let numeric = Error::builder().numeric_code(8001).build().unwrap();
        assert_eq!(numeric.id(), "8001");
        assert_eq!(numeric.code_text(), "");
    }

    #[test]
    fn test_rfc_code_forms() {
        assert_eq!(tikv_unavailable().rfc_code(), "TiKV:ErrRegion:Unavailable");

        let top = Registry::new("");
        let region = top.register_class(1, "ErrRegion").unwrap();
        let err = region.define_error().textual_code("Unavailable").build().unwrap();
        assert_eq!(err.rfc_code(), "ErrRegion:Unavailable");

        let bare = Error::builder().textual_code("Unavailable").numeric_code(3).build().unwrap();
        assert_eq!(bare.rfc_code().to_string(), bare.id());
    }

    #[test]
    fn test_display_format() {
        let registry = Registry::new("TiDB");
        let ddl = registry.register_class(4, "ddl").unwrap();
        let dup_key = ddl
            .define_error()
            .textual_code("ErrDupKeyName")
            .message_template("duplicate key name %s")
            .build()
            .unwrap();

        let err = dup_key.gen_with_stack_by_args(args!["idx1"]);
        assert_eq!(err.to_string(), "[ddl:ErrDupKeyName] duplicate key name idx1");
        // The prototype itself shows the raw template.
        assert_eq!(dup_key.to_string(), "[ddl:ErrDupKeyName] duplicate key name %s");
    }

    #[test]
    fn test_display_numeric_and_classless() {
        let registry = Registry::new("TiDB");
        let exec = registry.register_class(5, "executor").unwrap();
        let err = exec.define_error().numeric_code(1105).message_template("unknown error").build().unwrap();
        assert_eq!(err.to_string(), "[executor:1105] unknown error");

        let top = Error::builder().numeric_code(1).message_template("top %v").build().unwrap();
        assert_eq!(top.fast_gen_by_args(args![true]).to_string(), "[:1] top true");
    }

    #[test]
    fn test_deferred_formatting_mismatch() {
        let err = tikv_unavailable().fast_gen_by_args(args!["r-1", 2]);
        assert_eq!(
            err.to_string(),
            "[ErrRegion:Unavailable] Region %!d(string=r-1) is unavailable%!(EXTRA int=2)"
        );
        // Arguments are kept as given.
        assert_eq!(derived(&err).args(), &[Arg::Str("r-1".into()), Arg::Int(2)]);
    }

    #[test]
    fn test_display_survives_oversized_width() {
        let proto = tikv_unavailable();
        let err = proto.gen_with_stack("region %99999999999999999999d at %.99999999999999999999f", args![7, 0.5]);
        assert_eq!(
            err.to_string(),
            "[ErrRegion:Unavailable] region %!(BADWIDTH)7 at %!(BADPREC)0.500000"
        );
    }

    #[test]
    fn test_derivations_equal_regardless_of_args() {
        let proto = tikv_unavailable();
        let d1 = proto.gen_with_stack_by_args(args![5]);
        let d2 = proto.gen_with_stack_by_args(args![9]);

        assert_ne!(d1.to_string(), d2.to_string());
        assert!(derived(&d1).equal(&*d2));
        assert!(derived(&d2).equal(&*d1));
        assert_eq!(derived(&d1).id(), proto.id());
        assert_eq!(derived(&d2).id(), proto.id());
    }

    #[test]
    fn test_equal_ignores_template_and_remediation() {
        let proto = tikv_unavailable();
        let custom = proto.gen_with_stack("region %d has no leader", args![3]);
        assert!(proto.equal(&*custom));
        assert_eq!(derived(&custom).message_template(), "region %d has no leader");
        assert_eq!(derived(&custom).workaround(), proto.workaround());
    }

    #[test]
    fn test_distinct_kinds_not_equal() {
        let registry = Registry::new("TiKV");
        let region = registry.register_class(1, "ErrRegion").unwrap();
        let store = registry.register_class(2, "ErrStore").unwrap();
        let a = region.define_error().textual_code("Unavailable").build().unwrap();
        let b = region.define_error().textual_code("EpochNotMatch").build().unwrap();
        let c = store.define_error().textual_code("Unavailable").build().unwrap();

        assert!(!a.equal(&*b) && !b.equal(&*a));
        assert!(!a.equal(&*c) && !c.equal(&*a));
        assert!(a.not_equal(&*c));
    }

    #[test]
    fn test_classless_vs_classed() {
        let classless = Error::builder().textual_code("Unavailable").build().unwrap();
        let classed = tikv_unavailable();
        assert!(!classless.equal(&*classed));
        assert!(!classed.equal(&*classless));
    }

    #[test]
    fn test_derivation_does_not_mutate_prototype() {
        let proto = tikv_unavailable();
        let _ = proto.gen_with_stack("other %s", args!["x"]);
        let _ = proto.fast_gen("other %s", args!["x"]);
        let _ = proto.gen_with_stack_by_args(args![1]);

        assert_eq!(proto.message_template(), "Region %d is unavailable");
        assert_eq!(proto.location(), ("", 0));
        assert!(proto.args().is_empty());
    }

    #[test]
    fn test_fast_gen_skips_location() {
        let proto = tikv_unavailable();
        assert_eq!(derived(&proto.fast_gen("x", args![])).location(), ("", 0));
        assert_eq!(derived(&proto.fast_gen_by_args(args![1])).location(), ("", 0));
    }

    #[test]
    fn test_gen_with_stack_records_location() {
        let proto = tikv_unavailable();
        for err in [proto.gen_with_stack("x", args![]), proto.gen_with_stack_by_args(args![1])] {
            let (file, line) = derived(&err).location();
            assert!(file.ends_with("error.rs"), "unexpected file {}", file);
            assert!(line > 0);
        }
    }

    #[test]
    fn test_concurrent_derivation() {
        let proto = tikv_unavailable();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let proto = Arc::clone(&proto);
                std::thread::spawn(move || {
                    (0..100).map(|j| proto.gen_with_stack_by_args(args![i * 100 + j])).collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for err in handle.join().unwrap() {
                assert!(proto.equal(&*err));
            }
        }
        assert!(proto.args().is_empty());
    }

    #[test]
    fn test_partial_eq_is_identity() {
        let proto = tikv_unavailable();
        let a = derived(&proto.fast_gen_by_args(args![1])).clone();
        let b = derived(&proto.gen_with_stack("changed", args![])).clone();
        assert_eq!(a, b);
        assert_eq!(&a, &*proto);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn test_debug_output() {
        let err = tikv_unavailable().gen_with_stack_by_args(args![5]);
        let debug = format!("{:?}", derived(&err));
        assert!(debug.contains("TiKV:ErrRegion:Unavailable"));
        assert!(debug.contains("Location:"));
        assert!(debug.contains("Workaround: Check the status"));
    }

    #[test]
    fn test_error_equal_with_prototype() {
        let proto = tikv_unavailable();
        let err = proto.gen_with_stack_by_args(args![5]);
        assert!(error_equal(Some(&*proto), Some(&*err)));
    }
}
