//! BIE Schema
//!
//! Deterministic JSON Schema assembly from business information entity
//! models.
//!
//! A [`SchemaDocument`] collects classifiers (reusable value types) and
//! classes (objects made of attributes and associations), resolves
//! self-referencing and cyclic associations, and emits one draft-07 JSON
//! Schema whose member order never depends on registration order.
//!
//! # Example
//!
//! ```
//! use bie_schema::{
//!     AssociationSpec, AttributeSpec, Cardinality, ClassSpec, DocumentKind, DocumentOptions,
//!     SchemaDocument,
//! };
//! use serde_json::json;
//!
//! let mut doc = SchemaDocument::new(
//!     "urn:example:person",
//!     "Person",
//!     "1.0",
//!     DocumentOptions::new(DocumentKind::Message),
//! );
//! doc.add_class(
//!     ClassSpec::new("Person")
//!         .attribute(AttributeSpec::new("name", "string"))
//!         .association(AssociationSpec::new("manager", "Person").cardinality(Cardinality::OPTIONAL)),
//! )
//! .unwrap();
//! doc.add_root_element("person", "Person");
//!
//! let schema = doc.build().unwrap();
//! let person = &schema["definitions"]["Person"];
//! assert_eq!(person["required"], json!(["name"]));
//! assert_eq!(person["properties"]["manager"], json!({ "$ref": "#/definitions/Person" }));
//! ```
//!
//! # Cardinality
//!
//! | Cardinality | Rendered shape | Required |
//! |-------------|----------------|----------|
//! | `1..1` | item | yes |
//! | `0..1` | item | no |
//! | `1..*` | `{"type": "array", "items": item, "minItems": 1}` | yes |
//! | `0..5` | `{"type": "array", "items": item, "minItems": 1, "maxItems": 5}` | no |
//!
//! # Ordering
//!
//! Definitions list reference classifiers before classes. Properties are
//! ordered by sequence key (0 last), then supplementary before content, then
//! name.

mod association;
mod attribute;
mod choice;
mod class;
mod classifier;
mod diagnostics;
mod document;
mod error;
mod facet;
mod loader;
mod model;
mod ordering;
mod primitive;
mod types;
mod validator;
mod workspace;

pub use association::{Association, AssociationSpec, ExternalReference, TargetLocation};
pub use attribute::{Attribute, AttributeSpec};
pub use choice::ChoiceSpec;
pub use class::{ClassDescriptor, ClassSpec, ClassState, Member, Property};
pub use classifier::{Classifier, ClassifierBase, ClassifierBaseSpec, ClassifierSpec};
pub use diagnostics::{codes, Diagnostic, Diagnostics, Severity};
pub use document::{Registration, SchemaDocument};
pub use error::{BuildError, CheckError, LoadError};
pub use facet::{CheckedFacet, Facet, FacetKind, FacetValue};
pub use loader::{is_url, load_model, load_model_auto, load_model_str};
pub use model::{Model, RootElementSpec};
pub use ordering::{compare, EntryKind, OrderingKey};
pub use primitive::{BaseType, PrimitiveDescriptor, PrimitiveKey, PrimitiveTypeRegistry};
pub use types::{
    Cardinality, ChoiceMembership, DocumentKind, DocumentOptions, MemberKind, CONTENT_PROPERTY,
    FILE_EXTENSION, SCHEMA_DRAFT, SUPPLEMENTARY_PREFIX,
};
pub use validator::check_document;
pub use workspace::Workspace;

#[cfg(feature = "remote")]
pub use loader::load_model_url;
