//! Recoverable data-quality findings collected during assembly.
//!
//! Each finding is recorded on the document and emitted through `tracing`,
//! so callers can both inspect and log what was degraded.

use serde::Serialize;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// Model path of the issue (e.g., "Order/amount")
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)
    }
}

/// Diagnostic codes.
pub mod codes {
    pub const EMPTY_ENUMERATION: &str = "W001";
    pub const FACET_NOT_APPLICABLE: &str = "W002";
    pub const FACET_VALUE_UNPARSEABLE: &str = "W003";
    pub const EXTRA_CHOICE_DROPPED: &str = "W004";
    pub const SINGLE_MEMBER_CHOICE: &str = "W005";
    pub const FIXED_OVERRIDES_DEFAULT: &str = "W006";
    pub const UNKNOWN_FACET: &str = "W007";
    pub const DEFAULT_UNPARSEABLE: &str = "W008";
    pub const ROOT_ELEMENT_CONFLICT: &str = "W009";
    pub const FACET_UNREPRESENTABLE: &str = "W010";
    pub const DUPLICATE_MEMBER: &str = "W011";
    pub const CHOICE_NAME_CONFLICT: &str = "W012";
}

/// Ordered collection of diagnostics for one document.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it as a `tracing` event.
    pub fn warn(&mut self, code: &'static str, path: impl Into<String>, message: impl Into<String>) {
        let path = path.into();
        let message = message.into();
        tracing::warn!(code, path = %path, "{}", message);
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            code,
            path,
            message,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any diagnostic carries the given code.
    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    /// Append diagnostics from another collection, skipping exact duplicates.
    pub fn extend(&mut self, other: &Diagnostics) {
        for diag in &other.entries {
            if !self.entries.contains(diag) {
                self.entries.push(diag.clone());
            }
        }
    }
}
