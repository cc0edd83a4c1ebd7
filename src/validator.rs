//! Well-formedness check of emitted documents.

use serde_json::Value;

use crate::error::CheckError;
use crate::types::json_type_name;

/// Check that an emitted document compiles as a JSON Schema.
///
/// The document is compiled against its declared draft, which also
/// validates it against the draft's meta-schema.
///
/// # Errors
///
/// Returns `CheckError::Malformed` if the document is not an object or the
/// schema compiler rejects it.
pub fn check_document(document: &Value) -> Result<(), CheckError> {
    if !document.is_object() {
        return Err(CheckError::Malformed {
            message: format!("expected an object, found {}", json_type_name(document)),
        });
    }

    jsonschema::validator_for(document).map_err(|e| CheckError::Malformed {
        message: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::AssociationSpec;
    use crate::attribute::AttributeSpec;
    use crate::class::ClassSpec;
    use crate::document::SchemaDocument;
    use crate::types::{Cardinality, DocumentKind, DocumentOptions};
    use serde_json::json;

    fn person_schema() -> Value {
        let mut doc = SchemaDocument::new(
            "urn:test:person",
            "Person",
            "",
            DocumentOptions::new(DocumentKind::Message).strict(true),
        );
        doc.add_class(
            ClassSpec::new("Person")
                .attribute(AttributeSpec::new("name", "string"))
                .attribute(AttributeSpec::new("age", "integer").cardinality(Cardinality::OPTIONAL))
                .association(
                    AssociationSpec::new("manager", "Person").cardinality(Cardinality::OPTIONAL),
                ),
        )
        .unwrap();
        doc.add_root_element("person", "Person");
        doc.build().unwrap()
    }

    #[test]
    fn built_document_is_well_formed() {
        assert!(check_document(&person_schema()).is_ok());
    }

    #[test]
    fn non_object_is_rejected() {
        let err = check_document(&json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("found array"));
    }

    #[test]
    fn bad_keyword_value_is_rejected() {
        let doc = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "minProperties": "three"
        });
        assert!(matches!(
            check_document(&doc),
            Err(CheckError::Malformed { .. })
        ));
    }

    #[test]
    fn emitted_schema_follows_the_self_reference() {
        let validator = jsonschema::validator_for(&person_schema()).unwrap();
        assert!(validator.is_valid(&json!({ "name": "Ada", "manager": { "name": "Grace" } })));

        let bad = json!({ "name": "Ada", "manager": { "age": 40 } });
        let paths: Vec<String> = validator
            .iter_errors(&bad)
            .map(|e| e.instance_path.to_string())
            .collect();
        assert_eq!(paths, ["/manager"]);

        assert!(!validator.is_valid(&json!({ "name": "Ada", "nickname": "A" })));
    }
}
