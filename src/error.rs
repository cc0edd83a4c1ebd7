//! Error types for schema assembly and model loading.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures that abort the current document build.
///
/// Data-quality problems never surface here; they degrade the output and
/// are reported through [`crate::Diagnostics`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unknown primitive type \"{primitive}\" for classifier \"{classifier}\"")]
    UnknownPrimitive {
        classifier: String,
        primitive: String,
    },

    #[error("attribute \"{attribute}\" references unknown classifier \"{classifier}\"")]
    UnknownClassifier {
        attribute: String,
        classifier: String,
    },

    #[error("association \"{role}\" of \"{source_node}\" targets unknown class \"{target}\"")]
    UnresolvedAssociation {
        source_node: String,
        role: String,
        target: String,
    },

    #[error("class \"{class}\" is sealed and cannot be modified")]
    ClassSealed { class: String },

    #[error("class \"{class}\" is not registered")]
    UnknownClass { class: String },

    #[error("a document with id \"{id}\" is already open")]
    DuplicateDocument { id: String },

    #[error("no open document with id \"{id}\"")]
    UnknownDocument { id: String },

    #[error("invalid cardinality {lower}..{upper}")]
    InvalidCardinality { lower: i64, upper: i64 },

    #[error("malformed cardinality \"{text}\": expected lower..upper")]
    MalformedCardinality { text: String },

    #[error("\"{name}\" is defined both as a classifier and as a class")]
    DefinitionConflict { name: String },

    #[error("message document requires exactly one root element, found {found}")]
    InvalidRootElements { found: usize },

    #[error("root element \"{element}\" targets unknown class \"{class}\"")]
    UnknownRootTarget { element: String, class: String },

    #[error("document \"{id}\" still has unresolved associations for: {}", nodes.join(", "))]
    PendingDeferred { id: String, nodes: Vec<String> },

    #[error("failed to serialize document: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write document: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Io { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while loading a model description.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid model: {source}")]
    InvalidModel {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidModel { .. } => 2,
        }
    }
}

/// An emitted document that is not a well-formed schema.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("document is not a valid schema: {message}")]
    Malformed { message: String },
}

impl CheckError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
