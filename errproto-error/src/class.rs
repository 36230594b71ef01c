//! Error classes and the registry that owns them

use crate::{ErrCode, Error, ErrorId, RfcCode};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use thiserror::Error as ThisError;

/// Numeric code of an error class, unique within its registry.
pub type ClassCode = u32;

/// Registration failures.
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("error class {code} ({description}) conflicts with an existing class in registry '{registry}'")]
    DuplicateClass {
        registry: String,
        code: ClassCode,
        description: String,
    },

    #[error("error {rfc_code} is already defined")]
    DuplicateError { rfc_code: RfcCode },

    #[error("numeric code {code} is already used in class {class}")]
    DuplicateNumericCode { class: String, code: ErrCode },

    #[error("error class {0} outlived its registry")]
    Detached(String),
}

/// Registry of error classes for one component.
///
/// The registry name is the first field of every RFC code produced by
/// errors of its classes. An empty name is allowed for top-level classes.
///
/// Cloning is cheap and yields a handle to the same registry.
///
/// # Example
///
/// ```rust
/// use errproto_error::{args, Registry};
///
/// let registry = Registry::new("TiKV");
/// let region = registry.register_class(1, "ErrRegion").unwrap();
/// let unavailable = region
///     .define_error()
///     .textual_code("Unavailable")
///     .message_template("Region %d is unavailable")
///     .workaround("Check the status, monitoring data and log of the TiKV server.")
///     .build()
///     .unwrap();
///
/// let err = unavailable.gen_with_stack_by_args(args![5]);
/// assert!(unavailable.equal(&*err));
/// assert_eq!(unavailable.rfc_code().to_string(), "TiKV:ErrRegion:Unavailable");
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    name: String,
    classes: RwLock<BTreeMap<ClassCode, Arc<ErrClass>>>,
    errors: RwLock<BTreeMap<(ClassCode, ErrorId), Arc<Error>>>,
}

// The maps only ever see whole inserts, so a poisoned lock holds
// consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl Registry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                name: name.into(),
                classes: RwLock::new(BTreeMap::new()),
                errors: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register a new error class.
    ///
    /// Both the code and the description must be unused in this registry:
    /// the description is the namespace of the class in RFC codes.
    pub fn register_class(
        &self,
        code: ClassCode,
        description: impl Into<String>,
    ) -> Result<Arc<ErrClass>, RegistryError> {
        let description = description.into();
        let mut classes = write(&self.inner.classes);

        if classes.contains_key(&code) || classes.values().any(|c| c.description == description) {
            tracing::warn!(registry = %self.inner.name, code, %description, "duplicate error class");
            return Err(RegistryError::DuplicateClass {
                registry: self.inner.name.clone(),
                code,
                description,
            });
        }

        let class = Arc::new(ErrClass {
            code,
            description,
            registry_name: self.inner.name.clone(),
            registry: Arc::downgrade(&self.inner),
        });
        classes.insert(code, Arc::clone(&class));
        tracing::debug!(registry = %self.inner.name, code, description = %class.description, "registered error class");
        Ok(class)
    }

    /// Look up a class by code.
    pub fn class(&self, code: ClassCode) -> Option<Arc<ErrClass>> {
        read(&self.inner.classes).get(&code).cloned()
    }

    /// All classes, ordered by code.
    pub fn classes(&self) -> Vec<Arc<ErrClass>> {
        read(&self.inner.classes).values().cloned().collect()
    }

    /// All registered prototypes, ordered by class code then ID.
    pub fn all_errors(&self) -> Vec<Arc<Error>> {
        read(&self.inner.errors).values().cloned().collect()
    }

    /// Find the prototype an RFC code refers to.
    pub fn find(&self, code: &RfcCode) -> Option<Arc<Error>> {
        if code.component().unwrap_or("") != self.inner.name {
            return None;
        }
        let class_desc = code.class()?;
        let class = read(&self.inner.classes)
            .values()
            .find(|c| c.description == class_desc)
            .cloned()?;
        read(&self.inner.errors)
            .get(&(class.code, code.id().to_string()))
            .cloned()
    }
}

impl RegistryInner {
    fn register_error(&self, class: &ErrClass, err: Error) -> Result<Arc<Error>, RegistryError> {
        let id = err.id();
        let mut errors = write(&self.errors);

        if errors.contains_key(&(class.code, id.clone())) {
            tracing::warn!(rfc_code = %err.rfc_code(), "duplicate error definition");
            return Err(RegistryError::DuplicateError {
                rfc_code: err.rfc_code(),
            });
        }
        let code_taken = err.code() != 0
            && errors
                .range((class.code, ErrorId::new())..)
                .take_while(|((c, _), _)| *c == class.code)
                .any(|(_, e)| e.code() == err.code());
        if code_taken {
            tracing::warn!(class = %class.description, code = err.code(), "duplicate numeric error code");
            return Err(RegistryError::DuplicateNumericCode {
                class: class.description.clone(),
                code: err.code(),
            });
        }

        let err = Arc::new(err);
        errors.insert((class.code, id), Arc::clone(&err));
        tracing::debug!(rfc_code = %err.rfc_code(), code = err.code(), "defined error");
        Ok(err)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.inner.name)
            .field("classes", &read(&self.inner.classes).len())
            .field("errors", &read(&self.inner.errors).len())
            .finish()
    }
}

/// A named group of errors inside a registry, e.g. `ErrRegion` in `TiKV`.
///
/// Displays as its description.
#[derive(Debug)]
pub struct ErrClass {
    code: ClassCode,
    description: String,
    registry_name: String,
    registry: Weak<RegistryInner>,
}

impl ErrClass {
    pub fn code(&self) -> ClassCode {
        self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the owning registry, possibly empty.
    pub fn registry_name(&self) -> &str {
        &self.registry_name
    }

    /// Class equality that tolerates absent classes: two absent classes are
    /// equal, an absent class never equals a present one.
    pub fn equal(a: Option<&ErrClass>, b: Option<&ErrClass>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Start defining an error of this class.
    pub fn define_error(self: &Arc<Self>) -> ErrorBuilder {
        ErrorBuilder::new(Some(Arc::clone(self)))
    }

    /// Prototypes defined in this class, ordered by ID.
    pub fn errors(&self) -> Vec<Arc<Error>> {
        let Some(registry) = self.registry.upgrade() else {
            return Vec::new();
        };
        let errors = read(&registry.errors);
        errors
            .range((self.code, ErrorId::new())..)
            .take_while(|((c, _), _)| *c == self.code)
            .map(|(_, e)| Arc::clone(e))
            .collect()
    }
}

/// Classes are the same when they share registry and code.
impl PartialEq for ErrClass {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.registry_name == other.registry_name
    }
}

impl Eq for ErrClass {}

impl fmt::Display for ErrClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Builder for error prototypes.
///
/// Obtained from [`ErrClass::define_error`] for class members, or from
/// [`Error::builder`] for top-level errors without a class. `build()`
/// registers class members with their registry.
#[derive(Debug)]
pub struct ErrorBuilder {
    class: Option<Arc<ErrClass>>,
    code: ErrCode,
    code_text: String,
    message: String,
    workaround: String,
    description: String,
}

impl ErrorBuilder {
    pub(crate) fn new(class: Option<Arc<ErrClass>>) -> Self {
        Self {
            class,
            code: 0,
            code_text: String::new(),
            message: String::new(),
            workaround: String::new(),
            description: String::new(),
        }
    }

    /// Set the numeric code, used when no textual code is given and on
    /// protocols that only carry numbers.
    pub fn numeric_code(mut self, code: ErrCode) -> Self {
        self.code = code;
        self
    }

    /// Set the textual code; it becomes the error ID.
    pub fn textual_code(mut self, text: impl Into<String>) -> Self {
        self.code_text = text.into();
        self
    }

    pub fn message_template(mut self, template: impl Into<String>) -> Self {
        self.message = template.into();
        self
    }

    pub fn workaround(mut self, text: impl Into<String>) -> Self {
        self.workaround = text.into();
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Finish the prototype.
    ///
    /// Class members must have an ID that is new in their class and, when
    /// non-zero, a numeric code that is new in their class.
    pub fn build(self) -> Result<Arc<Error>, RegistryError> {
        let err = Error::from_parts(
            self.class.clone(),
            self.code,
            self.code_text,
            self.message,
            self.workaround,
            self.description,
        );

        let Some(class) = self.class else {
            return Ok(Arc::new(err));
        };
        let registry = class
            .registry
            .upgrade()
            .ok_or_else(|| RegistryError::Detached(class.description.clone()))?;
        registry.register_error(&class, err)
    }
}
