//! Schema document: registration, merge and final assembly.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::association::{
    Association, AssociationSpec, ClassIndex, DeferredAssociationRegistry, ExternalReference,
    Resolution, TargetLocation,
};
use crate::attribute::{Attribute, AttributeSpec};
use crate::choice::ChoiceSpec;
use crate::class::{ClassDescriptor, ClassSpec, Member};
use crate::classifier::{Classifier, ClassifierSpec, ClassifierTable, TypeContext};
use crate::diagnostics::{codes, Diagnostics};
use crate::error::BuildError;
use crate::facet::Facet;
use crate::ordering::OrderingKey;
use crate::primitive::PrimitiveTypeRegistry;
use crate::types::{definition_ref, DocumentKind, DocumentOptions, FILE_EXTENSION, SCHEMA_DRAFT};

/// Outcome of registering a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// A class with that name already exists; nothing changed.
    AlreadyPresent,
}

/// One schema document under construction.
///
/// Owns every table the build needs, including its own deferred
/// association registry, so independent documents never share state.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    id: String,
    title: String,
    version: String,
    options: DocumentOptions,
    primitives: PrimitiveTypeRegistry,
    classifiers: ClassifierTable,
    classes: BTreeMap<String, ClassDescriptor>,
    root_elements: BTreeMap<String, String>,
    external: BTreeMap<String, ExternalReference>,
    deferred: DeferredAssociationRegistry,
    diagnostics: Diagnostics,
}

impl SchemaDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        version: impl Into<String>,
        options: DocumentOptions,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            version: version.into(),
            options,
            primitives: PrimitiveTypeRegistry::new(),
            classifiers: ClassifierTable::new(),
            classes: BTreeMap::new(),
            root_elements: BTreeMap::new(),
            external: BTreeMap::new(),
            deferred: DeferredAssociationRegistry::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn primitives(&self) -> &PrimitiveTypeRegistry {
        &self.primitives
    }

    pub fn classifier(&self, name: &str) -> Option<&Arc<Classifier>> {
        self.classifiers.get(name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    /// Registered class names in name order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn root_elements(&self) -> &BTreeMap<String, String> {
        &self.root_elements
    }

    /// File name of the serialized artifact.
    pub fn file_name(&self) -> String {
        let stem = if self.title.is_empty() {
            self.id.rsplit(['/', ':']).next().unwrap_or(self.id.as_str())
        } else {
            self.title.as_str()
        };
        let stem: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = if stem.is_empty() { "schema".to_string() } else { stem };
        format!("{}{}", stem, FILE_EXTENSION)
    }

    fn type_context(&mut self) -> TypeContext<'_> {
        TypeContext {
            primitives: &mut self.primitives,
            classifiers: &mut self.classifiers,
            diagnostics: &mut self.diagnostics,
        }
    }

    /// Register a primitive-based classifier. Idempotent by name.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownPrimitive` if `primitive` is not known.
    pub fn add_simple_classifier(
        &mut self,
        name: &str,
        primitive: &str,
        documentation: Option<String>,
    ) -> Result<Arc<Classifier>, BuildError> {
        Classifier::create_simple(
            &mut self.type_context(),
            name,
            primitive,
            documentation,
            Vec::new(),
            &[],
        )
    }

    /// Register an enumeration. Idempotent by name.
    pub fn add_enum_classifier(
        &mut self,
        name: &str,
        values: Vec<String>,
        documentation: Option<String>,
    ) -> Result<Arc<Classifier>, BuildError> {
        Classifier::create_enumeration(
            &mut self.type_context(),
            name,
            documentation,
            Vec::new(),
            values,
        )
    }

    /// Register a facetted classifier, optionally with supplementary
    /// attributes. Idempotent by name.
    pub fn add_complex_classifier(
        &mut self,
        name: &str,
        primitive: &str,
        documentation: Option<String>,
        supplementary: Vec<AttributeSpec>,
        facets: &[Facet],
    ) -> Result<Arc<Classifier>, BuildError> {
        Classifier::create_simple(
            &mut self.type_context(),
            name,
            primitive,
            documentation,
            supplementary,
            facets,
        )
    }

    /// Register any classifier described by a model spec.
    pub fn add_classifier(&mut self, spec: ClassifierSpec) -> Result<Arc<Classifier>, BuildError> {
        Classifier::from_spec(&mut self.type_context(), spec)
    }

    /// Register one class and resolve its self-references.
    ///
    /// # Errors
    ///
    /// See [`SchemaDocument::add_classes`].
    pub fn add_class(&mut self, spec: ClassSpec) -> Result<Registration, BuildError> {
        let mut registrations = self.add_classes(vec![spec])?;
        Ok(registrations.pop().unwrap_or(Registration::AlreadyPresent))
    }

    /// Register a unit of classes.
    ///
    /// Every class is built and inserted before any deferred association is
    /// replayed, so classes of the batch may reference each other in any
    /// order. On error no class of the batch stays registered.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: an unknown classifier or primitive,
    /// invalid cardinality, or an association target still missing after
    /// replay.
    pub fn add_classes(&mut self, specs: Vec<ClassSpec>) -> Result<Vec<Registration>, BuildError> {
        let mut registrations = Vec::with_capacity(specs.len());
        let mut batch: Vec<ClassDescriptor> = Vec::new();

        for spec in specs {
            if self.classes.contains_key(&spec.name) || batch.iter().any(|c| c.name == spec.name) {
                tracing::debug!(class = %spec.name, "class already registered");
                registrations.push(Registration::AlreadyPresent);
                continue;
            }
            let name = spec.name.clone();
            match self.build_class(spec) {
                Ok(class) => batch.push(class),
                Err(err) => {
                    self.deferred.discard(&name);
                    self.rollback(batch.iter().map(|c| c.name.clone()).collect());
                    return Err(err);
                }
            }
            registrations.push(Registration::Added);
        }

        let names: Vec<String> = batch.iter().map(|c| c.name.clone()).collect();
        for class in batch {
            tracing::debug!(class = %class.name, "registered class");
            self.classes.insert(class.name.clone(), class);
        }

        for name in &names {
            if let Err(err) = self.replay(name) {
                self.rollback(names);
                return Err(err);
            }
        }
        Ok(registrations)
    }

    fn build_class(&mut self, spec: ClassSpec) -> Result<ClassDescriptor, BuildError> {
        let ClassSpec {
            name,
            documentation,
            attributes,
            associations,
            choices,
        } = spec;
        let mut class = ClassDescriptor::new(name.clone(), documentation);

        for choice in choices {
            class.declare_choice(choice)?;
        }
        for attribute in attributes {
            let attribute = Attribute::from_spec(&mut self.type_context(), &name, attribute)?;
            class.push_member(Member::Attribute(attribute))?;
        }
        for association in associations {
            let index = ClassIndex::new(&self.classes, &self.external);
            if let Resolution::Resolved(association) =
                Association::create(&index, &mut self.deferred, &name, association)?
            {
                class.push_member(Member::Association(association))?;
            }
        }
        Ok(class)
    }

    /// Drain the deferred queue of `source_node` into its class.
    fn replay(&mut self, source_node: &str) -> Result<(), BuildError> {
        let index = ClassIndex::new(&self.classes, &self.external);
        let resolved = self.deferred.replay(source_node, &index)?;
        if resolved.is_empty() {
            return Ok(());
        }
        let class = self
            .classes
            .get_mut(source_node)
            .ok_or_else(|| BuildError::UnknownClass {
                class: source_node.to_string(),
            })?;
        for association in resolved {
            class.push_member(Member::Association(association))?;
        }
        Ok(())
    }

    fn rollback(&mut self, names: Vec<String>) {
        for name in names {
            self.deferred.discard(&name);
            self.classes.remove(&name);
        }
    }

    fn open_class(&mut self, class: &str) -> Result<&mut ClassDescriptor, BuildError> {
        let descriptor = self
            .classes
            .get_mut(class)
            .ok_or_else(|| BuildError::UnknownClass {
                class: class.to_string(),
            })?;
        if descriptor.is_sealed() {
            return Err(BuildError::ClassSealed {
                class: class.to_string(),
            });
        }
        Ok(descriptor)
    }

    /// Add an attribute to an open class.
    pub fn add_attribute(&mut self, class: &str, spec: AttributeSpec) -> Result<(), BuildError> {
        self.open_class(class)?;
        let attribute = Attribute::from_spec(&mut self.type_context(), class, spec)?;
        self.open_class(class)?
            .push_member(Member::Attribute(attribute))
    }

    /// Add an association to an open class. The target must be registered
    /// by now; an unresolved target fails on the immediate replay.
    pub fn add_association(&mut self, class: &str, spec: AssociationSpec) -> Result<(), BuildError> {
        self.open_class(class)?;
        let index = ClassIndex::new(&self.classes, &self.external);
        match Association::create(&index, &mut self.deferred, class, spec)? {
            Resolution::Resolved(association) => self
                .open_class(class)?
                .push_member(Member::Association(association)),
            Resolution::Deferred => self.replay(class),
        }
    }

    /// Declare explicit settings for a choice group of an open class.
    pub fn declare_choice(&mut self, class: &str, spec: ChoiceSpec) -> Result<(), BuildError> {
        self.open_class(class)?.declare_choice(spec)
    }

    /// Expose `class` under `element`. A conflicting re-registration keeps
    /// the first target.
    pub fn add_root_element(&mut self, element: &str, class: &str) {
        match self.root_elements.get(element) {
            Some(existing) if existing != class => {
                self.diagnostics.warn(
                    codes::ROOT_ELEMENT_CONFLICT,
                    element,
                    format!(
                        "root element already targets \"{}\", ignoring \"{}\"",
                        existing, class
                    ),
                );
            }
            Some(_) => {}
            None => {
                self.root_elements
                    .insert(element.to_string(), class.to_string());
            }
        }
    }

    /// Make the classes of `other` available as association targets.
    pub fn add_external_reference(&mut self, other: &SchemaDocument) {
        if other.id == self.id {
            return;
        }
        let reference = self
            .external
            .entry(other.id.clone())
            .or_insert_with(|| ExternalReference {
                id: other.id.clone(),
                classes: BTreeSet::new(),
            });
        reference.classes.extend(other.classes.keys().cloned());
    }

    /// Copy every entry of `other` that is not present here yet.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::PendingDeferred` if `other` still has
    /// associations awaiting resolution.
    pub fn merge(&mut self, other: &SchemaDocument) -> Result<(), BuildError> {
        if !other.deferred.is_empty() {
            return Err(BuildError::PendingDeferred {
                id: other.id.clone(),
                nodes: other.deferred.nodes(),
            });
        }

        self.primitives.merge(&other.primitives);
        for (name, classifier) in &other.classifiers {
            self.classifiers
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(classifier));
        }
        for (name, class) in &other.classes {
            self.classes
                .entry(name.clone())
                .or_insert_with(|| class.clone());
        }
        for (element, class) in &other.root_elements {
            self.root_elements
                .entry(element.clone())
                .or_insert_with(|| class.clone());
        }
        for (id, reference) in &other.external {
            if *id != self.id {
                self.external
                    .entry(id.clone())
                    .or_insert_with(|| reference.clone());
            }
        }
        self.diagnostics.extend(&other.diagnostics);

        tracing::debug!(target_doc = %self.id, source_doc = %other.id, "merged document");
        Ok(())
    }

    /// Seal every class. Further mutation of any class fails.
    ///
    /// Association targets are located against the final class tables
    /// first, so a local class shadows an external one whichever was
    /// registered first.
    pub fn seal(&mut self) {
        let index = ClassIndex::new(&self.classes, &self.external);
        let locations: BTreeMap<String, TargetLocation> = self
            .classes
            .values()
            .flat_map(|class| class.association_targets())
            .filter_map(|target| index.locate(target).map(|loc| (target.to_string(), loc)))
            .collect();

        for class in self.classes.values_mut() {
            class.relocate(&locations);
            class.seal(&mut self.diagnostics);
        }
    }

    /// Assemble the ordered output document.
    ///
    /// Seals all classes first. Repeated calls yield identical output.
    ///
    /// # Errors
    ///
    /// Returns `BuildError` if associations are still pending, a name is
    /// both a reference classifier and a class, or the root elements do not
    /// fit the document kind.
    pub fn build(&mut self) -> Result<Value, BuildError> {
        if !self.deferred.is_empty() {
            return Err(BuildError::PendingDeferred {
                id: self.id.clone(),
                nodes: self.deferred.nodes(),
            });
        }
        self.seal();
        let strict = self.options.strict;

        let mut entries: Vec<(OrderingKey, &str, Value)> = Vec::new();
        for classifier in self.classifiers.values().filter(|c| c.is_reference_type()) {
            if self.classes.contains_key(&classifier.name) {
                return Err(BuildError::DefinitionConflict {
                    name: classifier.name.clone(),
                });
            }
            entries.push((
                OrderingKey::classifier(&classifier.name),
                classifier.name.as_str(),
                classifier.definition(strict),
            ));
        }
        for class in self.classes.values() {
            if let Some(definition) = class.definition(strict) {
                entries.push((OrderingKey::class(&class.name), class.name.as_str(), definition));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut document = Map::new();
        document.insert("$schema".into(), Value::String(SCHEMA_DRAFT.into()));
        document.insert("$id".into(), Value::String(self.id.clone()));
        document.insert("title".into(), Value::String(self.title.clone()));
        if !self.version.is_empty() {
            document.insert("version".into(), Value::String(self.version.clone()));
        }

        match self.options.kind {
            DocumentKind::Message => {
                let mut roots = self.root_elements.iter();
                let (element, class) = match (roots.next(), roots.next()) {
                    (Some(root), None) => root,
                    _ => {
                        return Err(BuildError::InvalidRootElements {
                            found: self.root_elements.len(),
                        })
                    }
                };
                let shape = self
                    .classes
                    .get(class)
                    .and_then(|c| c.definition(strict))
                    .ok_or_else(|| BuildError::UnknownRootTarget {
                        element: element.clone(),
                        class: class.clone(),
                    })?;
                if let Value::Object(shape) = shape {
                    for (key, value) in shape {
                        document.insert(key, value);
                    }
                }
            }
            DocumentKind::Operation => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (element, class) in &self.root_elements {
                    if !self.classes.contains_key(class) {
                        return Err(BuildError::UnknownRootTarget {
                            element: element.clone(),
                            class: class.clone(),
                        });
                    }
                    properties.insert(element.clone(), definition_ref("", class));
                    required.push(Value::String(element.clone()));
                }
                document.insert("type".into(), Value::String("object".into()));
                document.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    document.insert("required".into(), Value::Array(required));
                }
                if strict {
                    document.insert("additionalProperties".into(), Value::Bool(false));
                }
            }
        }

        let definitions: Map<String, Value> = entries
            .into_iter()
            .map(|(_, name, shape)| (name.to_string(), shape))
            .collect();
        document.insert("definitions".into(), Value::Object(definitions));

        tracing::debug!(id = %self.id, classes = self.classes.len(), "built document");
        Ok(Value::Object(document))
    }

    /// Build, then write the canonical text followed by a newline.
    pub fn serialize<W: Write>(&mut self, mut writer: W, pretty: bool) -> Result<(), BuildError> {
        let document = self.build()?;
        let written = if pretty {
            serde_json::to_writer_pretty(&mut writer, &document)
        } else {
            serde_json::to_writer(&mut writer, &document)
        };
        written.map_err(|source| {
            if source.is_io() {
                BuildError::Io {
                    source: source.into(),
                }
            } else {
                BuildError::Serialize { source }
            }
        })?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|source| BuildError::Io { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cardinality;
    use serde_json::json;

    fn message_doc() -> SchemaDocument {
        SchemaDocument::new(
            "urn:test:person",
            "Person",
            "1.0",
            DocumentOptions::new(DocumentKind::Message),
        )
    }

    fn person() -> ClassSpec {
        ClassSpec::new("Person")
            .attribute(AttributeSpec::new("name", "string"))
            .association(AssociationSpec::new("manager", "Person").cardinality(Cardinality::OPTIONAL))
    }

    #[test]
    fn person_with_self_referencing_manager() {
        let mut doc = message_doc();
        doc.add_simple_classifier("string", "string", None).unwrap();
        assert_eq!(doc.add_class(person()).unwrap(), Registration::Added);
        doc.add_root_element("person", "Person");

        let out = doc.build().unwrap();
        let def = &out["definitions"]["Person"];
        assert_eq!(def["properties"]["name"]["type"], "string");
        assert_eq!(def["required"], json!(["name"]));
        assert_eq!(
            def["properties"]["manager"],
            json!({ "$ref": "#/definitions/Person" })
        );

        // message kind promotes the root class
        assert_eq!(out["type"], "object");
        assert_eq!(out["required"], json!(["name"]));
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            ["$schema", "$id", "title", "version", "type", "properties", "required", "definitions"]
        );
    }

    #[test]
    fn re_registering_class_is_a_no_op() {
        let mut doc = message_doc();
        doc.add_class(person()).unwrap();
        doc.add_root_element("person", "Person");
        let before = doc.clone().build().unwrap();

        assert_eq!(doc.add_class(person()).unwrap(), Registration::AlreadyPresent);
        assert_eq!(doc.build().unwrap(), before);
    }

    #[test]
    fn batch_resolves_two_class_cycle() {
        let mut doc = message_doc();
        let regs = doc
            .add_classes(vec![
                ClassSpec::new("Order").association(AssociationSpec::new("buyer", "Party")),
                ClassSpec::new("Party").association(
                    AssociationSpec::new("orders", "Order").cardinality(Cardinality::MANY),
                ),
            ])
            .unwrap();
        assert_eq!(regs, [Registration::Added, Registration::Added]);
        doc.add_root_element("order", "Order");

        let out = doc.build().unwrap();
        assert_eq!(
            out["definitions"]["Party"]["properties"]["orders"]["items"],
            json!({ "$ref": "#/definitions/Order" })
        );
    }

    #[test]
    fn unresolved_target_rolls_back_batch() {
        let mut doc = message_doc();
        let err = doc
            .add_classes(vec![
                ClassSpec::new("Order").association(AssociationSpec::new("buyer", "Missing")),
                ClassSpec::new("Line"),
            ])
            .unwrap_err();
        assert!(matches!(err, BuildError::UnresolvedAssociation { ref target, .. } if target == "Missing"));
        assert!(doc.class("Order").is_none());
        assert!(doc.class("Line").is_none());
        assert!(doc.deferred.is_empty());
    }

    #[test]
    fn mutating_sealed_class_fails() {
        let mut doc = message_doc();
        doc.add_class(person()).unwrap();
        doc.add_attribute("Person", AttributeSpec::new("age", "integer"))
            .unwrap();
        doc.seal();

        let err = doc
            .add_attribute("Person", AttributeSpec::new("email", "string"))
            .unwrap_err();
        assert!(matches!(err, BuildError::ClassSealed { .. }));
        let err = doc
            .add_association("Person", AssociationSpec::new("peer", "Person"))
            .unwrap_err();
        assert!(matches!(err, BuildError::ClassSealed { .. }));
        let err = doc
            .add_attribute("Nobody", AttributeSpec::new("x", "string"))
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownClass { .. }));
    }

    #[test]
    fn add_association_to_unknown_target_fails() {
        let mut doc = message_doc();
        doc.add_class(ClassSpec::new("Order")).unwrap();
        let err = doc
            .add_association("Order", AssociationSpec::new("buyer", "Party"))
            .unwrap_err();
        assert!(matches!(err, BuildError::UnresolvedAssociation { .. }));
        assert!(doc.deferred.is_empty());
    }

    #[test]
    fn operation_exposes_root_elements() {
        let mut doc = SchemaDocument::new(
            "urn:test:op",
            "Ops",
            "",
            DocumentOptions::new(DocumentKind::Operation).strict(true),
        );
        doc.add_classes(vec![ClassSpec::new("Request"), ClassSpec::new("Header")])
            .unwrap();
        doc.add_root_element("request", "Request");
        doc.add_root_element("header", "Header");

        let out = doc.build().unwrap();
        assert!(out.get("version").is_none());
        assert_eq!(
            out["properties"],
            json!({
                "header": { "$ref": "#/definitions/Header" },
                "request": { "$ref": "#/definitions/Request" }
            })
        );
        assert_eq!(out["required"], json!(["header", "request"]));
        assert_eq!(out["additionalProperties"], json!(false));
        assert_eq!(out["definitions"]["Header"]["additionalProperties"], json!(false));
    }

    #[test]
    fn message_requires_exactly_one_root() {
        let mut doc = message_doc();
        doc.add_class(person()).unwrap();
        assert!(matches!(
            doc.build(),
            Err(BuildError::InvalidRootElements { found: 0 })
        ));

        let mut doc = message_doc();
        doc.add_root_element("person", "Ghost");
        assert!(matches!(doc.build(), Err(BuildError::UnknownRootTarget { .. })));
    }

    #[test]
    fn conflicting_root_keeps_first() {
        let mut doc = message_doc();
        doc.add_root_element("person", "Person");
        doc.add_root_element("person", "Other");
        doc.add_root_element("person", "Person");
        assert_eq!(doc.root_elements()["person"], "Person");
        assert_eq!(doc.diagnostics().len(), 1);
        assert!(doc.diagnostics().contains(codes::ROOT_ELEMENT_CONFLICT));
    }

    #[test]
    fn reference_classifier_sorts_before_classes() {
        let mut doc = message_doc();
        doc.add_enum_classifier("Status", vec!["open".into(), "closed".into()], None)
            .unwrap();
        doc.add_class(ClassSpec::new("Account").attribute(AttributeSpec::new("status", "Status")))
            .unwrap();
        doc.add_root_element("account", "Account");

        let out = doc.build().unwrap();
        let names: Vec<&String> = out["definitions"].as_object().unwrap().keys().collect();
        assert_eq!(names, ["Status", "Account"]);
        assert_eq!(
            out["properties"]["status"],
            json!({ "$ref": "#/definitions/Status" })
        );
    }

    #[test]
    fn classifier_and_class_sharing_a_name_conflict() {
        let mut doc = message_doc();
        doc.add_enum_classifier("Party", vec!["a".into()], None).unwrap();
        doc.add_class(ClassSpec::new("Party")).unwrap();
        doc.add_root_element("party", "Party");
        assert!(matches!(doc.build(), Err(BuildError::DefinitionConflict { .. })));
    }

    #[test]
    fn merge_copies_missing_entries_only() {
        let mut common = SchemaDocument::new("urn:common", "Common", "", DocumentOptions::default());
        common
            .add_class(ClassSpec::new("Address").attribute(AttributeSpec::new("city", "string")))
            .unwrap();
        common
            .add_class(ClassSpec::new("Person").documentation("from common"))
            .unwrap();

        let mut doc = message_doc();
        doc.add_class(person()).unwrap();
        doc.merge(&common).unwrap();

        assert!(doc.class("Address").is_some());
        assert_eq!(doc.class("Person").unwrap().documentation, None);
        assert!(doc.classifier("string").is_some());
    }

    #[test]
    fn merge_refuses_pending_source() {
        let mut other = SchemaDocument::new("urn:other", "Other", "", DocumentOptions::default());
        other
            .deferred
            .enqueue("Order", AssociationSpec::new("buyer", "Party"));

        let mut doc = message_doc();
        let err = doc.merge(&other).unwrap_err();
        assert!(matches!(err, BuildError::PendingDeferred { ref nodes, .. } if nodes == &["Order"]));
    }

    #[test]
    fn external_reference_renders_absolute_ref() {
        let mut common = SchemaDocument::new("urn:common", "Common", "", DocumentOptions::default());
        common.add_class(ClassSpec::new("Address")).unwrap();

        let mut doc = message_doc();
        doc.add_external_reference(&common);
        doc.add_class(ClassSpec::new("Person").association(AssociationSpec::new("home", "Address")))
            .unwrap();
        doc.add_root_element("person", "Person");

        let out = doc.build().unwrap();
        assert_eq!(
            out["properties"]["home"],
            json!({ "$ref": "urn:common#/definitions/Address" })
        );
        assert!(out["definitions"].get("Address").is_none());
    }

    #[test]
    fn local_class_shadows_external_in_any_order() {
        let mut common = SchemaDocument::new("urn:common", "Common", "", DocumentOptions::default());
        common.add_class(ClassSpec::new("Address")).unwrap();
        let person = || {
            ClassSpec::new("Person").association(AssociationSpec::new("home", "Address"))
        };

        let mut local_first = message_doc();
        local_first.add_external_reference(&common);
        local_first.add_class(ClassSpec::new("Address")).unwrap();
        local_first.add_class(person()).unwrap();
        local_first.add_root_element("person", "Person");

        let mut local_last = message_doc();
        local_last.add_external_reference(&common);
        local_last.add_class(person()).unwrap();
        local_last.add_class(ClassSpec::new("Address")).unwrap();
        local_last.add_root_element("person", "Person");

        let out = local_first.build().unwrap();
        assert_eq!(out, local_last.build().unwrap());
        assert_eq!(out["properties"]["home"], json!({ "$ref": "#/definitions/Address" }));
    }

    #[test]
    fn serialize_writes_newline_terminated_json() {
        let mut doc = message_doc();
        doc.add_class(person()).unwrap();
        doc.add_root_element("person", "Person");

        let mut buf = Vec::new();
        doc.serialize(&mut buf, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, doc.build().unwrap());
    }

    #[test]
    fn file_name_uses_title_or_id() {
        assert_eq!(message_doc().file_name(), "Person.json");
        let doc = SchemaDocument::new("urn:test:orders", "", "", DocumentOptions::default());
        assert_eq!(doc.file_name(), "orders.json");
        let doc = SchemaDocument::new("x", "Purchase Order", "", DocumentOptions::default());
        assert_eq!(doc.file_name(), "Purchase_Order.json");
    }
}
