//! Error catalogs
//!
//! A catalog is the serializable listing of every prototype in a registry,
//! indexed by RFC code. Services export it so that tooling can resolve the
//! codes found in logs and wire messages without linking the service.

use crate::{ErrCode, Error, Registry, RfcCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error as ThisError;

/// Catalog load/store failures.
#[derive(Debug, ThisError)]
pub enum CatalogError {
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One prototype as it appears in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub rfc_code: RfcCode,
    pub code: ErrCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workaround: String,
}

impl From<&Error> for CatalogEntry {
    fn from(err: &Error) -> Self {
        Self {
            rfc_code: err.rfc_code(),
            code: err.code(),
            message: err.message_template().to_string(),
            description: err.description().to_string(),
            workaround: err.workaround().to_string(),
        }
    }
}

/// The prototypes of one registry, sorted by RFC code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub registry: String,
    pub errors: Vec<CatalogEntry>,
}

/// Two catalog entries that cannot both be right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// The same RFC code is listed more than once.
    RfcCode(RfcCode),
    /// Two errors of one class share a non-zero numeric code.
    NumericCode { class: String, code: ErrCode },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::RfcCode(code) => write!(f, "duplicate RFC code {}", code),
            Conflict::NumericCode { class, code } => {
                write!(f, "duplicate numeric code {} in class {}", code, class)
            }
        }
    }
}

impl Catalog {
    pub fn from_json(s: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up an entry by RFC code.
    pub fn find(&self, code: &RfcCode) -> Option<&CatalogEntry> {
        self.errors.iter().find(|e| &e.rfc_code == code)
    }

    /// Entries with a given numeric code. Numeric codes are only unique
    /// within a class, so several entries may match.
    pub fn find_numeric(&self, code: ErrCode) -> Vec<&CatalogEntry> {
        self.errors.iter().filter(|e| e.code == code).collect()
    }

    /// Every conflicting pair of entries, in catalog order.
    pub fn conflicts(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        let mut seen_rfc = HashSet::new();
        let mut seen_numeric = HashSet::new();

        for entry in &self.errors {
            if !seen_rfc.insert(&entry.rfc_code) {
                conflicts.push(Conflict::RfcCode(entry.rfc_code.clone()));
                continue;
            }
            if entry.code == 0 {
                continue;
            }
            let key = (entry.rfc_code.component(), entry.rfc_code.class(), entry.code);
            if !seen_numeric.insert(key) {
                conflicts.push(Conflict::NumericCode {
                    class: entry.rfc_code.class().unwrap_or("").to_string(),
                    code: entry.code,
                });
            }
        }
        conflicts
    }
}

impl Registry {
    /// Snapshot of every prototype defined in this registry.
    pub fn catalog(&self) -> Catalog {
        let mut errors: Vec<CatalogEntry> =
            self.all_errors().iter().map(|e| CatalogEntry::from(&**e)).collect();
        errors.sort_by(|a, b| a.rfc_code.cmp(&b.rfc_code));

        Catalog {
            registry: self.name().to_string(),
            errors,
        }
    }
}
