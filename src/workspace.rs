//! Set of open schema documents keyed by identifier.

use std::collections::BTreeMap;

use crate::document::SchemaDocument;
use crate::error::BuildError;
use crate::types::DocumentOptions;

/// Open documents. Each keeps its own tables and deferred registry.
#[derive(Debug, Default)]
pub struct Workspace {
    documents: BTreeMap<String, SchemaDocument>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new empty document.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::DuplicateDocument` if `id` is already open.
    pub fn open(
        &mut self,
        id: &str,
        title: &str,
        version: &str,
        options: DocumentOptions,
    ) -> Result<&mut SchemaDocument, BuildError> {
        self.insert(SchemaDocument::new(id, title, version, options))
    }

    /// Add an already populated document.
    pub fn insert(&mut self, document: SchemaDocument) -> Result<&mut SchemaDocument, BuildError> {
        if self.documents.contains_key(document.id()) {
            return Err(BuildError::DuplicateDocument {
                id: document.id().to_string(),
            });
        }
        tracing::debug!(id = %document.id(), "opened document");
        Ok(self
            .documents
            .entry(document.id().to_string())
            .or_insert(document))
    }

    pub fn get(&self, id: &str) -> Option<&SchemaDocument> {
        self.documents.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SchemaDocument> {
        self.documents.get_mut(id)
    }

    /// Remove a document, handing it back to the caller.
    pub fn close(&mut self, id: &str) -> Option<SchemaDocument> {
        self.documents.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Merge document `source` into document `target`. Both stay open.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownDocument` if either id is not open, or the
    /// error of [`SchemaDocument::merge`].
    pub fn merge_into(&mut self, target: &str, source: &str) -> Result<(), BuildError> {
        if target == source {
            return Ok(());
        }
        let source_doc = self
            .documents
            .remove(source)
            .ok_or_else(|| BuildError::UnknownDocument {
                id: source.to_string(),
            })?;
        let result = match self.documents.get_mut(target) {
            Some(target_doc) => target_doc.merge(&source_doc),
            None => Err(BuildError::UnknownDocument {
                id: target.to_string(),
            }),
        };
        self.documents.insert(source.to_string(), source_doc);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassSpec;
    use crate::types::DocumentKind;

    #[test]
    fn duplicate_id_is_rejected() {
        let mut ws = Workspace::new();
        ws.open("urn:a", "A", "", DocumentOptions::default()).unwrap();
        let err = ws
            .open("urn:a", "Again", "", DocumentOptions::new(DocumentKind::Operation))
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateDocument { ref id } if id == "urn:a"));
        assert_eq!(ws.get("urn:a").unwrap().title(), "A");
    }

    #[test]
    fn close_releases_the_id() {
        let mut ws = Workspace::new();
        ws.open("urn:a", "A", "", DocumentOptions::default()).unwrap();
        let doc = ws.close("urn:a").unwrap();
        assert_eq!(doc.id(), "urn:a");
        assert!(ws.is_empty());
        assert!(ws.open("urn:a", "A", "", DocumentOptions::default()).is_ok());
    }

    #[test]
    fn documents_do_not_share_state() {
        let mut ws = Workspace::new();
        ws.open("urn:a", "A", "", DocumentOptions::default())
            .unwrap()
            .add_class(ClassSpec::new("Order"))
            .unwrap();
        ws.open("urn:b", "B", "", DocumentOptions::default()).unwrap();

        assert!(ws.get("urn:a").unwrap().class("Order").is_some());
        assert!(ws.get("urn:b").unwrap().class("Order").is_none());
        assert_eq!(ws.ids().collect::<Vec<_>>(), ["urn:a", "urn:b"]);
    }

    #[test]
    fn merge_into_keeps_both_open() {
        let mut ws = Workspace::new();
        ws.open("urn:a", "A", "", DocumentOptions::default()).unwrap();
        ws.open("urn:b", "B", "", DocumentOptions::default())
            .unwrap()
            .add_class(ClassSpec::new("Address"))
            .unwrap();

        ws.merge_into("urn:a", "urn:b").unwrap();
        assert!(ws.get("urn:a").unwrap().class("Address").is_some());
        assert_eq!(ws.len(), 2);

        let err = ws.merge_into("urn:missing", "urn:b").unwrap_err();
        assert!(matches!(err, BuildError::UnknownDocument { .. }));
        assert!(ws.get("urn:b").is_some());
    }
}
