//! Classifiers: named, reusable value types.
//!
//! A classifier wraps a primitive (optionally facetted) or an enumeration.
//! Enumerations and classifiers owning supplementary attributes are
//! reference types: emitted once under `definitions` and referenced with
//! `$ref`. Every other classifier is expanded inline at each use site.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attribute::{Attribute, AttributeSpec};
use crate::diagnostics::{codes, Diagnostics};
use crate::error::BuildError;
use crate::facet::Facet;
use crate::ordering::OrderingKey;
use crate::primitive::{BaseType, PrimitiveDescriptor, PrimitiveTypeRegistry};
use crate::types::{definition_ref, MemberKind, CONTENT_PROPERTY};

/// Classifiers of one document, keyed by name.
pub type ClassifierTable = BTreeMap<String, Arc<Classifier>>;

/// Mutable state needed while constructing classifiers and attributes.
pub(crate) struct TypeContext<'a> {
    pub primitives: &'a mut PrimitiveTypeRegistry,
    pub classifiers: &'a mut ClassifierTable,
    pub diagnostics: &'a mut Diagnostics,
}

/// What a classifier is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBaseSpec {
    Primitive(String),
    Enumeration(Vec<String>),
}

/// Classifier as supplied by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierSpec {
    pub name: String,
    #[serde(flatten)]
    pub base: ClassifierBaseSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplementary: Vec<AttributeSpec>,
}

impl ClassifierSpec {
    pub fn simple(name: impl Into<String>, primitive: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: ClassifierBaseSpec::Primitive(primitive.into()),
            documentation: None,
            facets: Vec::new(),
            supplementary: Vec::new(),
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            base: ClassifierBaseSpec::Enumeration(values.into_iter().map(Into::into).collect()),
            documentation: None,
            facets: Vec::new(),
            supplementary: Vec::new(),
        }
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    pub fn facet(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.facets.push(Facet::new(token, value));
        self
    }

    pub fn supplementary(mut self, attribute: AttributeSpec) -> Self {
        self.supplementary.push(attribute);
        self
    }
}

/// Value source of a built classifier.
#[derive(Debug, Clone)]
pub enum ClassifierBase {
    Primitive(Arc<PrimitiveDescriptor>),
    Enumeration(Vec<String>),
}

/// A built classifier. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Classifier {
    pub name: String,
    pub documentation: Option<String>,
    pub base: ClassifierBase,
    pub supplementary: Vec<Attribute>,
}

impl Classifier {
    /// Build a primitive-based classifier, or return the registered one.
    pub(crate) fn create_simple(
        ctx: &mut TypeContext<'_>,
        name: &str,
        primitive: &str,
        documentation: Option<String>,
        supplementary: Vec<AttributeSpec>,
        facets: &[Facet],
    ) -> Result<Arc<Self>, BuildError> {
        if let Some(existing) = ctx.classifiers.get(name) {
            return Ok(Arc::clone(existing));
        }

        let descriptor = ctx
            .primitives
            .resolve_facetted(name, primitive, facets, ctx.diagnostics)
            .ok_or_else(|| BuildError::UnknownPrimitive {
                classifier: name.to_string(),
                primitive: primitive.to_string(),
            })?;
        let supplementary = build_supplementary(ctx, name, supplementary)?;

        Ok(register(
            ctx,
            Self {
                name: name.to_string(),
                documentation,
                base: ClassifierBase::Primitive(descriptor),
                supplementary,
            },
        ))
    }

    /// Build an enumerated classifier, or return the registered one.
    ///
    /// An enumeration without values degrades to a plain string classifier.
    pub(crate) fn create_enumeration(
        ctx: &mut TypeContext<'_>,
        name: &str,
        documentation: Option<String>,
        supplementary: Vec<AttributeSpec>,
        values: Vec<String>,
    ) -> Result<Arc<Self>, BuildError> {
        if let Some(existing) = ctx.classifiers.get(name) {
            return Ok(Arc::clone(existing));
        }

        if values.is_empty() {
            ctx.diagnostics.warn(
                codes::EMPTY_ENUMERATION,
                name,
                "enumeration has no values, using string",
            );
            return Self::create_simple(ctx, name, "string", documentation, supplementary, &[]);
        }

        let supplementary = build_supplementary(ctx, name, supplementary)?;
        Ok(register(
            ctx,
            Self {
                name: name.to_string(),
                documentation,
                base: ClassifierBase::Enumeration(values),
                supplementary,
            },
        ))
    }

    /// Build any classifier from a model spec.
    pub(crate) fn from_spec(
        ctx: &mut TypeContext<'_>,
        spec: ClassifierSpec,
    ) -> Result<Arc<Self>, BuildError> {
        match spec.base {
            ClassifierBaseSpec::Primitive(primitive) => Self::create_simple(
                ctx,
                &spec.name,
                &primitive,
                spec.documentation,
                spec.supplementary,
                &spec.facets,
            ),
            ClassifierBaseSpec::Enumeration(values) => Self::create_enumeration(
                ctx,
                &spec.name,
                spec.documentation,
                spec.supplementary,
                values,
            ),
        }
    }

    /// Emitted once under `definitions` and referenced everywhere else.
    pub fn is_reference_type(&self) -> bool {
        !self.supplementary.is_empty() || matches!(self.base, ClassifierBase::Enumeration(_))
    }

    pub fn base_type(&self) -> BaseType {
        match &self.base {
            ClassifierBase::Primitive(p) => p.base_type,
            ClassifierBase::Enumeration(_) => BaseType::String,
        }
    }

    /// Shape of the bare value, without documentation.
    fn value_shape(&self) -> Map<String, Value> {
        match &self.base {
            ClassifierBase::Primitive(p) => p.shape(),
            ClassifierBase::Enumeration(values) => {
                let mut shape = Map::new();
                shape.insert("type".into(), Value::String("string".into()));
                shape.insert(
                    "enum".into(),
                    Value::Array(values.iter().cloned().map(Value::String).collect()),
                );
                shape
            }
        }
    }

    /// Shape at a use site: a `$ref` for reference types, otherwise the
    /// inline expansion.
    pub fn use_shape(&self) -> Value {
        if self.is_reference_type() {
            return definition_ref("", &self.name);
        }
        let mut shape = self.value_shape();
        if let Some(doc) = &self.documentation {
            shape.insert("description".into(), Value::String(doc.clone()));
        }
        Value::Object(shape)
    }

    /// Entry for the `definitions` table. Only meaningful for reference types.
    pub fn definition(&self, strict: bool) -> Value {
        if self.supplementary.is_empty() {
            let mut shape = Map::new();
            if let Some(doc) = &self.documentation {
                shape.insert("description".into(), Value::String(doc.clone()));
            }
            shape.extend(self.value_shape());
            return Value::Object(shape);
        }

        let mut members: Vec<(OrderingKey, &str, Value, bool)> = self
            .supplementary
            .iter()
            .map(|a| (a.ordering_key(), a.name.as_str(), a.shape(), a.is_mandatory()))
            .collect();
        members.push((
            OrderingKey::member(CONTENT_PROPERTY, 0, MemberKind::Content),
            CONTENT_PROPERTY,
            Value::Object(self.value_shape()),
            true,
        ));
        members.sort_by(|a, b| a.0.cmp(&b.0));

        let mut properties = Map::new();
        let mut required = Vec::new();
        for (_, name, shape, mandatory) in members {
            if mandatory {
                required.push(Value::String(name.to_string()));
            }
            properties.insert(name.to_string(), shape);
        }

        let mut shape = Map::new();
        shape.insert("type".into(), Value::String("object".into()));
        if let Some(doc) = &self.documentation {
            shape.insert("description".into(), Value::String(doc.clone()));
        }
        shape.insert("properties".into(), Value::Object(properties));
        shape.insert("required".into(), Value::Array(required));
        if strict {
            shape.insert("additionalProperties".into(), Value::Bool(false));
        }
        Value::Object(shape)
    }
}

fn build_supplementary(
    ctx: &mut TypeContext<'_>,
    owner: &str,
    specs: Vec<AttributeSpec>,
) -> Result<Vec<Attribute>, BuildError> {
    specs
        .into_iter()
        .map(|spec| Attribute::create_supplementary(ctx, owner, spec))
        .collect()
}

fn register(ctx: &mut TypeContext<'_>, classifier: Classifier) -> Arc<Classifier> {
    tracing::debug!(
        classifier = %classifier.name,
        reference = classifier.is_reference_type(),
        "registered classifier"
    );
    let classifier = Arc::new(classifier);
    ctx.classifiers
        .insert(classifier.name.clone(), Arc::clone(&classifier));
    classifier
}

/// Find the classifier an attribute is bound to.
///
/// Falls back to the primitive vocabulary, registering a simple classifier
/// named after the primitive.
pub(crate) fn resolve_classifier(
    ctx: &mut TypeContext<'_>,
    attribute: &str,
    name: &str,
) -> Result<Arc<Classifier>, BuildError> {
    if let Some(existing) = ctx.classifiers.get(name) {
        return Ok(Arc::clone(existing));
    }
    if ctx.primitives.resolve(name).is_none() {
        return Err(BuildError::UnknownClassifier {
            attribute: attribute.to_string(),
            classifier: name.to_string(),
        });
    }
    Classifier::create_simple(ctx, name, name, None, Vec::new(), &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        primitives: PrimitiveTypeRegistry,
        classifiers: ClassifierTable,
        diagnostics: Diagnostics,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                primitives: PrimitiveTypeRegistry::new(),
                classifiers: ClassifierTable::new(),
                diagnostics: Diagnostics::new(),
            }
        }

        fn ctx(&mut self) -> TypeContext<'_> {
            TypeContext {
                primitives: &mut self.primitives,
                classifiers: &mut self.classifiers,
                diagnostics: &mut self.diagnostics,
            }
        }

        fn add(&mut self, spec: ClassifierSpec) -> Result<Arc<Classifier>, BuildError> {
            Classifier::from_spec(&mut self.ctx(), spec)
        }
    }

    #[test]
    fn simple_classifier_is_inline() {
        let mut fx = Fixture::new();
        let text = fx
            .add(ClassifierSpec::simple("Text", "string").documentation("Free text"))
            .unwrap();
        assert!(!text.is_reference_type());
        assert_eq!(
            text.use_shape(),
            json!({ "type": "string", "description": "Free text" })
        );
    }

    #[test]
    fn enumeration_is_reference_type() {
        let mut fx = Fixture::new();
        let status = fx
            .add(ClassifierSpec::enumeration("Status", ["OPEN", "CLOSED"]))
            .unwrap();
        assert!(status.is_reference_type());
        assert_eq!(status.use_shape(), json!({ "$ref": "#/definitions/Status" }));
        assert_eq!(
            status.definition(false),
            json!({ "type": "string", "enum": ["OPEN", "CLOSED"] })
        );
    }

    #[test]
    fn empty_enumeration_degrades_to_string() {
        let mut fx = Fixture::new();
        let empty = fx
            .add(ClassifierSpec::enumeration("Empty", Vec::<String>::new()))
            .unwrap();
        assert!(!empty.is_reference_type());
        assert_eq!(empty.use_shape(), json!({ "type": "string" }));
        assert!(fx.diagnostics.contains(codes::EMPTY_ENUMERATION));
    }

    #[test]
    fn registration_is_idempotent() {
        let mut fx = Fixture::new();
        let first = fx.add(ClassifierSpec::simple("Code", "token")).unwrap();
        let second = fx
            .add(ClassifierSpec::simple("Code", "integer").facet("totalDigits", "3"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fx.classifiers.len(), 1);
    }

    #[test]
    fn unknown_primitive_is_fatal() {
        let mut fx = Fixture::new();
        let err = fx.add(ClassifierSpec::simple("Price", "money")).unwrap_err();
        assert!(matches!(err, BuildError::UnknownPrimitive { .. }));
        assert!(fx.classifiers.is_empty());
    }

    #[test]
    fn supplementary_attributes_make_an_object() {
        let mut fx = Fixture::new();
        let amount = fx
            .add(
                ClassifierSpec::simple("Amount", "decimal")
                    .facet("fractionDigits", "2")
                    .supplementary(AttributeSpec::new("currencyID", "token")),
            )
            .unwrap();

        assert!(amount.is_reference_type());
        assert_eq!(
            amount.definition(true),
            json!({
                "type": "object",
                "properties": {
                    "@currencyID": { "type": "string" },
                    "content": { "type": "number", "multipleOf": 0.01 }
                },
                "required": ["@currencyID", "content"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn facetted_decimal_with_zero_fraction_is_integer() {
        let mut fx = Fixture::new();
        let qty = fx
            .add(ClassifierSpec::simple("Quantity", "decimal").facet("fractionDigits", "0"))
            .unwrap();
        assert_eq!(qty.use_shape(), json!({ "type": "integer" }));
        assert_eq!(qty.base_type(), BaseType::Integer);
    }

    #[test]
    fn attribute_on_primitive_registers_implicit_classifier() {
        let mut fx = Fixture::new();
        let c = resolve_classifier(&mut fx.ctx(), "birthDate", "date").unwrap();
        assert_eq!(c.name, "date");
        assert!(fx.classifiers.contains_key("date"));
    }

    #[test]
    fn spec_deserializes_with_flattened_base() {
        let spec: ClassifierSpec =
            serde_json::from_str(r#"{"name": "Status", "enumeration": ["A", "B"]}"#).unwrap();
        assert_eq!(
            spec.base,
            ClassifierBaseSpec::Enumeration(vec!["A".into(), "B".into()])
        );

        let spec: ClassifierSpec = serde_json::from_str(
            r#"{"name": "Code", "primitive": "token", "facets": [{"token": "length", "value": "2"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.base, ClassifierBaseSpec::Primitive("token".into()));
        assert_eq!(spec.facets.len(), 1);
    }
}
