//! Attributes: properties bound to a classifier.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

use crate::classifier::{resolve_classifier, Classifier, TypeContext};
use crate::diagnostics::codes;
use crate::error::BuildError;
use crate::ordering::OrderingKey;
use crate::primitive::BaseType;
use crate::types::{Cardinality, ChoiceMembership, MemberKind, SUPPLEMENTARY_PREFIX};

/// Attribute as supplied by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    /// Registered classifier name, or a primitive name.
    pub classifier: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub sequence_key: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<ChoiceMembership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_value: Option<String>,
    #[serde(default)]
    pub nillable: bool,
    #[serde(default)]
    pub kind: MemberKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, classifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classifier: classifier.into(),
            cardinality: Cardinality::ONE,
            sequence_key: 0,
            choice: None,
            default_value: None,
            fixed_value: None,
            nillable: false,
            kind: MemberKind::Content,
            documentation: None,
        }
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn sequence(mut self, key: u32) -> Self {
        self.sequence_key = key;
        self
    }

    pub fn in_choice(mut self, membership: ChoiceMembership) -> Self {
        self.choice = Some(membership);
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn fixed_value(mut self, value: impl Into<String>) -> Self {
        self.fixed_value = Some(value.into());
        self
    }

    pub fn nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    pub fn supplementary(mut self) -> Self {
        self.kind = MemberKind::Supplementary;
        self
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }
}

/// A constructed attribute. Immutable once built.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Property name; supplementary attributes carry [`SUPPLEMENTARY_PREFIX`].
    pub name: String,
    pub classifier: Arc<Classifier>,
    pub cardinality: Cardinality,
    pub sequence_key: u32,
    pub choice: Option<ChoiceMembership>,
    pub default_value: Option<Value>,
    pub fixed_value: Option<String>,
    pub nillable: bool,
    pub kind: MemberKind,
    pub documentation: Option<String>,
}

impl Attribute {
    /// Build a content attribute.
    pub(crate) fn create_content(
        ctx: &mut TypeContext<'_>,
        path: &str,
        spec: AttributeSpec,
    ) -> Result<Self, BuildError> {
        Self::create(ctx, path, spec, MemberKind::Content)
    }

    /// Build a supplementary attribute; its name gets the structural prefix.
    pub(crate) fn create_supplementary(
        ctx: &mut TypeContext<'_>,
        path: &str,
        spec: AttributeSpec,
    ) -> Result<Self, BuildError> {
        Self::create(ctx, path, spec, MemberKind::Supplementary)
    }

    /// Build an attribute of the kind named by the spec.
    pub(crate) fn from_spec(
        ctx: &mut TypeContext<'_>,
        path: &str,
        spec: AttributeSpec,
    ) -> Result<Self, BuildError> {
        match spec.kind {
            MemberKind::Content => Self::create_content(ctx, path, spec),
            MemberKind::Supplementary => Self::create_supplementary(ctx, path, spec),
        }
    }

    fn create(
        ctx: &mut TypeContext<'_>,
        path: &str,
        spec: AttributeSpec,
        kind: MemberKind,
    ) -> Result<Self, BuildError> {
        let cardinality = Cardinality::new(
            i64::from(spec.cardinality.lower),
            i64::from(spec.cardinality.upper),
        )?;
        let classifier = resolve_classifier(ctx, &spec.name, &spec.classifier)?;

        let name = match kind {
            MemberKind::Supplementary if !spec.name.starts_with(SUPPLEMENTARY_PREFIX) => {
                format!("{}{}", SUPPLEMENTARY_PREFIX, spec.name)
            }
            _ => spec.name,
        };
        let attr_path = format!("{}/{}", path, name);

        let default_value = match (&spec.fixed_value, spec.default_value) {
            (Some(_), Some(_)) => {
                ctx.diagnostics.warn(
                    codes::FIXED_OVERRIDES_DEFAULT,
                    &attr_path,
                    "fixed value overrides default value, default dropped",
                );
                None
            }
            (None, Some(raw)) => match typed_default(classifier.base_type(), &raw) {
                Some(value) => Some(value),
                None => {
                    ctx.diagnostics.warn(
                        codes::DEFAULT_UNPARSEABLE,
                        &attr_path,
                        format!(
                            "default \"{}\" is not a valid {} value, default dropped",
                            raw,
                            classifier.base_type().as_str()
                        ),
                    );
                    None
                }
            },
            (_, None) => None,
        };

        Ok(Self {
            name,
            classifier,
            cardinality,
            sequence_key: spec.sequence_key,
            choice: spec.choice,
            default_value,
            fixed_value: spec.fixed_value,
            nillable: spec.nillable,
            kind,
            documentation: spec.documentation,
        })
    }

    pub fn is_mandatory(&self) -> bool {
        self.cardinality.is_mandatory()
    }

    pub fn ordering_key(&self) -> OrderingKey {
        OrderingKey::member(&self.name, self.sequence_key, self.kind)
    }

    /// Rendered property shape.
    pub fn shape(&self) -> Value {
        if let Some(fixed) = &self.fixed_value {
            return json!({ "type": "string", "enum": [fixed] });
        }

        let mut item = self.classifier.use_shape();
        if let Some(default) = &self.default_value {
            item = annotate(item, "default", default.clone());
        }
        if self.nillable {
            item = nullable(item);
        }

        let shape = if self.cardinality.is_list() {
            array_shape(item, self.cardinality)
        } else {
            item
        };
        match &self.documentation {
            Some(doc) => annotate(shape, "description", Value::String(doc.clone())),
            None => shape,
        }
    }
}

/// Parse a default value according to the classifier's base type.
fn typed_default(base: BaseType, raw: &str) -> Option<Value> {
    match base {
        BaseType::String => Some(Value::String(raw.to_string())),
        BaseType::Boolean => match raw.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        BaseType::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
        BaseType::Number => raw.trim().parse::<Number>().ok().map(Value::Number),
    }
}

/// Wrap a list member: `minItems` is at least 1, `maxItems` only when bounded.
pub(crate) fn array_shape(item: Value, cardinality: Cardinality) -> Value {
    let mut shape = Map::new();
    shape.insert("type".into(), Value::String("array".into()));
    shape.insert("items".into(), item);
    shape.insert("minItems".into(), Value::from(cardinality.lower.max(1)));
    if cardinality.upper > 0 {
        shape.insert("maxItems".into(), Value::from(cardinality.upper));
    }
    Value::Object(shape)
}

/// Attach an annotation keyword. `$ref` siblings are ignored by draft-07,
/// so references are wrapped in `allOf` first.
pub(crate) fn annotate(shape: Value, keyword: &str, value: Value) -> Value {
    let mut map = match shape {
        Value::Object(map) if map.contains_key("$ref") => {
            let mut wrapper = Map::new();
            wrapper.insert("allOf".into(), Value::Array(vec![Value::Object(map)]));
            wrapper
        }
        Value::Object(map) => map,
        other => return other,
    };
    map.insert(keyword.to_string(), value);
    Value::Object(map)
}

fn nullable(shape: Value) -> Value {
    match shape {
        Value::Object(mut map) if matches!(map.get("type"), Some(Value::String(_))) => {
            if let Some(t) = map.get("type").cloned() {
                map.insert("type".into(), json!([t, "null"]));
            }
            Value::Object(map)
        }
        other => json!({ "anyOf": [other, { "type": "null" }] }),
    }
}
