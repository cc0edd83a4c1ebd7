//! Model file format.
//!
//! A model file is the JSON rendition of what a modelling tool supplies for
//! one document: identity, classifiers, classes and root elements.
//!
//! ```json
//! {
//!   "id": "urn:example:person",
//!   "title": "Person",
//!   "kind": "message",
//!   "classifiers": [
//!     { "name": "Code", "primitive": "token", "facets": [{ "token": "maxLength", "value": "8" }] }
//!   ],
//!   "classes": [
//!     {
//!       "name": "Person",
//!       "attributes": [{ "name": "name", "classifier": "string" }],
//!       "associations": [{ "role": "manager", "target": "Person", "cardinality": "0..1" }]
//!     }
//!   ],
//!   "root_elements": [{ "name": "person", "class": "Person" }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::class::ClassSpec;
use crate::classifier::ClassifierSpec;
use crate::document::SchemaDocument;
use crate::error::BuildError;
use crate::types::{DocumentKind, DocumentOptions};

/// Root element: a named entry point bound to a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootElementSpec {
    pub name: String,
    pub class: String,
}

/// Parsed model file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub classifiers: Vec<ClassifierSpec>,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
    #[serde(default)]
    pub root_elements: Vec<RootElementSpec>,
}

impl Model {
    pub fn options(&self) -> DocumentOptions {
        DocumentOptions::new(self.kind).strict(self.strict)
    }

    /// Create a document from this model with its own options.
    pub fn into_document(self) -> Result<SchemaDocument, BuildError> {
        let options = self.options();
        self.into_document_with(options)
    }

    /// Create a document, overriding the options stored in the file.
    ///
    /// # Errors
    ///
    /// Returns the first fatal `BuildError` raised while registering.
    pub fn into_document_with(self, options: DocumentOptions) -> Result<SchemaDocument, BuildError> {
        let mut document = SchemaDocument::new(&self.id, &self.title, &self.version, options);
        self.populate(&mut document)?;
        Ok(document)
    }

    /// Register the model's content on an existing document.
    ///
    /// Classifiers go first; classes are registered as one batch.
    pub fn populate(self, document: &mut SchemaDocument) -> Result<(), BuildError> {
        for classifier in self.classifiers {
            document.add_classifier(classifier)?;
        }
        document.add_classes(self.classes)?;
        for root in &self.root_elements {
            document.add_root_element(&root.name, &root.class);
        }
        Ok(())
    }
}
