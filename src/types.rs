//! Core types shared across schema assembly.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BuildError;

/// JSON Schema dialect every emitted document declares.
pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

/// File suffix of a serialized schema document.
pub const FILE_EXTENSION: &str = ".json";

/// Prefix that marks supplementary attribute property names.
pub const SUPPLEMENTARY_PREFIX: &str = "@";

/// Synthetic property holding the base value of a classifier with
/// supplementary attributes.
pub const CONTENT_PROPERTY: &str = "content";

/// Pointer prefix for entries of the `definitions` table.
pub const DEFINITIONS_POINTER: &str = "#/definitions/";

/// Returns the JSON type name for diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Builds a `$ref` shape pointing into a `definitions` table.
///
/// `document` is empty for local references.
pub fn definition_ref(document: &str, name: &str) -> Value {
    let pointer = format!("{}{}{}", document, DEFINITIONS_POINTER, escape_pointer(name));
    let mut map = serde_json::Map::new();
    map.insert("$ref".to_string(), Value::String(pointer));
    Value::Object(map)
}

/// Escape a key for use as a JSON Pointer token (RFC 6901).
fn escape_pointer(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

/// Shape of the emitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Exactly one root element; its class becomes the document itself.
    #[default]
    Message,
    /// Every root element becomes a property of a synthetic top-level object.
    Operation,
}

impl DocumentKind {
    /// Parse a document kind from a string.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "message" => Some(DocumentKind::Message),
            "operation" => Some(DocumentKind::Operation),
            _ => None,
        }
    }
}

/// Options for document assembly.
#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    /// Message or operation shaped output.
    pub kind: DocumentKind,
    /// When true, every emitted object shape gets `additionalProperties: false`.
    /// Choice branches are always closed.
    pub strict: bool,
}

impl DocumentOptions {
    /// Create options with strict mode disabled.
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            strict: false,
        }
    }

    /// Set strict mode (additionalProperties: false on all objects).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Whether an attribute carries the value itself or metadata about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Supplementary,
    #[default]
    Content,
}

/// Lower and upper occurrence bounds. An upper bound of 0 means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CardinalityRepr", into = "String")]
pub struct Cardinality {
    pub lower: u32,
    pub upper: u32,
}

impl Cardinality {
    /// Exactly one occurrence.
    pub const ONE: Cardinality = Cardinality { lower: 1, upper: 1 };
    /// Zero or one occurrence.
    pub const OPTIONAL: Cardinality = Cardinality { lower: 0, upper: 1 };
    /// Zero or more occurrences.
    pub const MANY: Cardinality = Cardinality { lower: 0, upper: 0 };

    /// Validate raw bounds.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InvalidCardinality` for negative bounds, or when
    /// `upper < lower` and `upper` is not the unbounded sentinel 0.
    pub fn new(lower: i64, upper: i64) -> Result<Self, BuildError> {
        let invalid = || BuildError::InvalidCardinality { lower, upper };
        let lo = u32::try_from(lower).map_err(|_| invalid())?;
        let hi = u32::try_from(upper).map_err(|_| invalid())?;
        if hi != 0 && hi < lo {
            return Err(invalid());
        }
        Ok(Self {
            lower: lo,
            upper: hi,
        })
    }

    /// Parse the textual form `lower..upper`, where upper may be `*` or `n`.
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        let invalid = || BuildError::MalformedCardinality {
            text: s.to_string(),
        };
        let (lo, hi) = match s.split_once("..") {
            Some((lo, hi)) => (lo.trim(), hi.trim()),
            None => (s.trim(), s.trim()),
        };
        let lower: i64 = lo.parse().map_err(|_| invalid())?;
        let upper: i64 = match hi {
            "*" | "n" | "unbounded" => 0,
            other => other.parse().map_err(|_| invalid())?,
        };
        Self::new(lower, upper)
    }

    /// True when the member renders as an array.
    pub fn is_list(&self) -> bool {
        self.upper == 0 || self.upper > 1
    }

    /// True when the member must be present.
    pub fn is_mandatory(&self) -> bool {
        self.lower >= 1
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.upper == 0 {
            write!(f, "{}..*", self.lower)
        } else {
            write!(f, "{}..{}", self.lower, self.upper)
        }
    }
}

impl From<Cardinality> for String {
    fn from(c: Cardinality) -> Self {
        c.to_string()
    }
}

/// Accepted serialized forms of a cardinality.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardinalityRepr {
    Pair([i64; 2]),
    Text(String),
}

impl TryFrom<CardinalityRepr> for Cardinality {
    type Error = BuildError;

    fn try_from(repr: CardinalityRepr) -> Result<Self, Self::Error> {
        match repr {
            CardinalityRepr::Pair([lower, upper]) => Cardinality::new(lower, upper),
            CardinalityRepr::Text(s) => Cardinality::parse(&s),
        }
    }
}

/// Membership of an attribute or association in a choice group.
///
/// Members sharing `sequence` form one branch; members without a sequence
/// each form a branch of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceMembership {
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

impl ChoiceMembership {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            sequence: None,
        }
    }

    /// Place the member in the branch identified by `sequence`.
    pub fn in_branch(mut self, sequence: u32) -> Self {
        self.sequence = Some(sequence);
        self
    }
}
