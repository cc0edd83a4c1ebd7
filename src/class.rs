//! Class descriptors and their `Open -> Sealed` lifecycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::association::{Association, AssociationSpec, TargetLocation};
use crate::attribute::{Attribute, AttributeSpec};
use crate::choice::{Choice, ChoiceSpec};
use crate::diagnostics::{codes, Diagnostics};
use crate::error::BuildError;
use crate::ordering::OrderingKey;
use crate::types::ChoiceMembership;

/// Class as supplied by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<AssociationSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceSpec>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documentation: None,
            attributes: Vec::new(),
            associations: Vec::new(),
            choices: Vec::new(),
        }
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn association(mut self, association: AssociationSpec) -> Self {
        self.associations.push(association);
        self
    }

    pub fn choice(mut self, choice: ChoiceSpec) -> Self {
        self.choices.push(choice);
        self
    }
}

/// A property-bearing member of a class.
#[derive(Debug, Clone)]
pub enum Member {
    Attribute(Attribute),
    Association(Association),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Attribute(a) => &a.name,
            Member::Association(a) => &a.role,
        }
    }

    pub fn choice(&self) -> Option<&ChoiceMembership> {
        match self {
            Member::Attribute(a) => a.choice.as_ref(),
            Member::Association(a) => a.choice.as_ref(),
        }
    }

    pub fn is_mandatory(&self) -> bool {
        match self {
            Member::Attribute(a) => a.is_mandatory(),
            Member::Association(a) => a.is_mandatory(),
        }
    }

    pub fn ordering_key(&self) -> OrderingKey {
        match self {
            Member::Attribute(a) => a.ordering_key(),
            Member::Association(a) => a.ordering_key(),
        }
    }

    pub fn shape(&self) -> Value {
        match self {
            Member::Attribute(a) => a.shape(),
            Member::Association(a) => a.shape(),
        }
    }

    /// Total order over same-named members; mandatory ones rank first.
    fn rank(&self) -> (OrderingKey, bool, Option<(String, Option<u32>)>, String) {
        (
            self.ordering_key(),
            !self.is_mandatory(),
            self.choice().map(|c| (c.group.clone(), c.sequence)),
            self.shape().to_string(),
        )
    }
}

/// Keep one member per property name, picked by [`Member::rank`].
fn distinct_members(class: &str, members: Vec<Member>, diagnostics: &mut Diagnostics) -> Vec<Member> {
    let mut by_name: BTreeMap<String, Vec<Member>> = BTreeMap::new();
    for member in members {
        by_name.entry(member.name().to_string()).or_default().push(member);
    }

    let mut distinct = Vec::with_capacity(by_name.len());
    for (name, mut candidates) in by_name {
        if candidates.len() > 1 {
            diagnostics.warn(
                codes::DUPLICATE_MEMBER,
                format!("{}/{}", class, name),
                format!("{} members share this name, keeping one", candidates.len()),
            );
            candidates.sort_by_cached_key(Member::rank);
        }
        distinct.extend(candidates.into_iter().next());
    }
    distinct
}

/// One emitted property of a sealed class.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: OrderingKey,
    pub name: String,
    pub shape: Value,
    pub required: bool,
}

/// Lifecycle state of a class.
#[derive(Debug, Clone)]
pub enum ClassState {
    /// Accepting members and choice declarations.
    Open {
        members: Vec<Member>,
        choices: BTreeMap<String, ChoiceSpec>,
    },
    /// Ordered properties and the derived required list.
    Sealed { properties: Vec<Property> },
}

/// A class registered on a document.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub name: String,
    pub documentation: Option<String>,
    state: ClassState,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>, documentation: Option<String>) -> Self {
        Self {
            name: name.into(),
            documentation,
            state: ClassState::Open {
                members: Vec::new(),
                choices: BTreeMap::new(),
            },
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.state, ClassState::Sealed { .. })
    }

    pub fn state(&self) -> &ClassState {
        &self.state
    }

    /// Append an attribute or association.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ClassSealed` once the class is sealed.
    pub fn push_member(&mut self, member: Member) -> Result<(), BuildError> {
        match &mut self.state {
            ClassState::Open { members, .. } => {
                members.push(member);
                Ok(())
            }
            ClassState::Sealed { .. } => Err(BuildError::ClassSealed {
                class: self.name.clone(),
            }),
        }
    }

    /// Declare explicit settings for a choice group. The first declaration wins.
    pub fn declare_choice(&mut self, spec: ChoiceSpec) -> Result<(), BuildError> {
        match &mut self.state {
            ClassState::Open { choices, .. } => {
                choices.entry(spec.group.clone()).or_insert(spec);
                Ok(())
            }
            ClassState::Sealed { .. } => Err(BuildError::ClassSealed {
                class: self.name.clone(),
            }),
        }
    }

    /// Targets of the associations registered so far.
    pub(crate) fn association_targets(&self) -> Vec<&str> {
        match &self.state {
            ClassState::Open { members, .. } => members
                .iter()
                .filter_map(|m| match m {
                    Member::Association(a) => Some(a.target.as_str()),
                    Member::Attribute(_) => None,
                })
                .collect(),
            ClassState::Sealed { .. } => Vec::new(),
        }
    }

    /// Point every association at its final target location.
    pub(crate) fn relocate(&mut self, locations: &BTreeMap<String, TargetLocation>) {
        let ClassState::Open { members, .. } = &mut self.state else {
            return;
        };
        for member in members {
            if let Member::Association(association) = member {
                if let Some(location) = locations.get(&association.target) {
                    association.location = location.clone();
                }
            }
        }
    }

    /// Resolve choices, order properties and compute the required list.
    ///
    /// Same-named members are reduced to one. Groups with fewer than two
    /// members collapse into ordinary properties. Only the first group in
    /// member order is materialized, and only if no ordinary property
    /// already carries its name; the members of any other group stay
    /// ordinary properties. Sealing an already sealed class is a no-op.
    pub fn seal(&mut self, diagnostics: &mut Diagnostics) {
        let ClassState::Open { members, choices } = &mut self.state else {
            return;
        };
        let members = distinct_members(&self.name, std::mem::take(members), diagnostics);
        let declared = std::mem::take(choices);

        let mut ordinary = Vec::new();
        let mut groups: BTreeMap<String, Choice> = BTreeMap::new();
        for member in members {
            match member.choice().map(|c| c.group.clone()) {
                Some(group) => groups
                    .entry(group.clone())
                    .or_insert_with(|| match declared.get(&group) {
                        Some(spec) => Choice::from_spec(spec),
                        None => Choice::new(group),
                    })
                    .add_member(member),
                None => ordinary.push(member),
            }
        }

        let mut candidates = Vec::new();
        for (group, choice) in groups {
            if choice.member_count() < 2 {
                diagnostics.warn(
                    codes::SINGLE_MEMBER_CHOICE,
                    format!("{}/{}", self.name, group),
                    "choice group has a single member, emitted as an ordinary property",
                );
                ordinary.extend(choice.into_members());
            } else {
                candidates.push(choice);
            }
        }
        candidates.sort_by_key(Choice::ordering_key);

        let mut candidates = candidates.into_iter();
        let materialized = candidates.next();
        for dropped in candidates {
            diagnostics.warn(
                codes::EXTRA_CHOICE_DROPPED,
                format!("{}/{}", self.name, dropped.group),
                "only one choice group per object is supported, members emitted as ordinary properties",
            );
            ordinary.extend(dropped.into_members());
        }
        let materialized = match materialized {
            Some(choice) if ordinary.iter().any(|m| m.name() == choice.group) => {
                diagnostics.warn(
                    codes::CHOICE_NAME_CONFLICT,
                    format!("{}/{}", self.name, choice.group),
                    "choice group name is already a property name, members emitted as ordinary properties",
                );
                ordinary.extend(choice.into_members());
                None
            }
            other => other,
        };

        let mut properties: Vec<Property> = ordinary
            .iter()
            .map(|m| Property {
                key: m.ordering_key(),
                name: m.name().to_string(),
                shape: m.shape(),
                required: m.is_mandatory(),
            })
            .collect();
        if let Some(choice) = materialized {
            properties.push(Property {
                key: choice.ordering_key(),
                name: choice.group.clone(),
                shape: choice.materialize(),
                required: choice.is_mandatory(),
            });
        }
        properties.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!(class = %self.name, properties = properties.len(), "sealed class");
        self.state = ClassState::Sealed { properties };
    }

    /// Ordered properties, once sealed.
    pub fn properties(&self) -> Option<&[Property]> {
        match &self.state {
            ClassState::Sealed { properties } => Some(properties),
            ClassState::Open { .. } => None,
        }
    }

    /// Names of mandatory properties in emission order, once sealed.
    pub fn required(&self) -> Option<Vec<&str>> {
        self.properties().map(|props| {
            props
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name.as_str())
                .collect()
        })
    }

    /// Entry for the `definitions` table. `None` while the class is open.
    pub fn definition(&self, strict: bool) -> Option<Value> {
        let properties = self.properties()?;

        let mut props = Map::new();
        let mut required = Vec::new();
        for property in properties {
            if property.required {
                required.push(Value::String(property.name.clone()));
            }
            props.insert(property.name.clone(), property.shape.clone());
        }

        let mut shape = Map::new();
        shape.insert("type".into(), Value::String("object".into()));
        if let Some(doc) = &self.documentation {
            shape.insert("description".into(), Value::String(doc.clone()));
        }
        shape.insert("properties".into(), Value::Object(props));
        if !required.is_empty() {
            shape.insert("required".into(), Value::Array(required));
        }
        if strict {
            shape.insert("additionalProperties".into(), Value::Bool(false));
        }
        Some(Value::Object(shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::TargetLocation;
    use crate::types::Cardinality;
    use serde_json::json;

    fn assoc(role: &str, seq: u32, card: Cardinality, choice: Option<ChoiceMembership>) -> Member {
        Member::Association(Association {
            role: role.into(),
            target: "Target".into(),
            location: TargetLocation::Local,
            cardinality: card,
            sequence_key: seq,
            choice,
            documentation: None,
        })
    }

    #[test]
    fn sealed_class_rejects_members() {
        let mut class = ClassDescriptor::new("Order", None);
        class.push_member(assoc("a", 0, Cardinality::ONE, None)).unwrap();
        class.seal(&mut Diagnostics::new());
        assert!(class.is_sealed());

        let err = class
            .push_member(assoc("b", 0, Cardinality::ONE, None))
            .unwrap_err();
        assert!(matches!(err, BuildError::ClassSealed { ref class } if class == "Order"));
        assert!(class.declare_choice(ChoiceSpec::new("g")).is_err());
    }

    #[test]
    fn properties_are_ordered_and_required_computed() {
        let mut class = ClassDescriptor::new("Order", Some("A purchase order".into()));
        class.push_member(assoc("zeta", 0, Cardinality::ONE, None)).unwrap();
        class.push_member(assoc("beta", 2, Cardinality::OPTIONAL, None)).unwrap();
        class.push_member(assoc("alpha", 1, Cardinality::ONE, None)).unwrap();
        assert!(class.definition(false).is_none());

        class.seal(&mut Diagnostics::new());
        let names: Vec<&str> = class
            .properties()
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["alpha", "beta", "zeta"]);
        assert_eq!(class.required().unwrap(), ["alpha", "zeta"]);

        let def = class.definition(true).unwrap();
        assert_eq!(def["description"], "A purchase order");
        assert_eq!(def["required"], json!(["alpha", "zeta"]));
        assert_eq!(def["additionalProperties"], json!(false));
    }

    #[test]
    fn single_member_choice_collapses() {
        let mut diags = Diagnostics::new();
        let mut class = ClassDescriptor::new("Order", None);
        class
            .push_member(assoc("only", 0, Cardinality::ONE, Some(ChoiceMembership::new("g"))))
            .unwrap();
        class.seal(&mut diags);

        let def = class.definition(false).unwrap();
        assert!(def["properties"].get("g").is_none());
        assert_eq!(def["properties"]["only"], json!({ "$ref": "#/definitions/Target" }));
        assert_eq!(def["required"], json!(["only"]));
        assert!(diags.contains(codes::SINGLE_MEMBER_CHOICE));
    }

    #[test]
    fn only_first_choice_group_materializes() {
        let mut diags = Diagnostics::new();
        let mut class = ClassDescriptor::new("Order", None);
        let g1 = || Some(ChoiceMembership::new("first"));
        let g2 = || Some(ChoiceMembership::new("second"));
        class.push_member(assoc("c", 5, Cardinality::ONE, g2())).unwrap();
        class.push_member(assoc("d", 6, Cardinality::ONE, g2())).unwrap();
        class.push_member(assoc("a", 1, Cardinality::ONE, g1())).unwrap();
        class.push_member(assoc("b", 2, Cardinality::ONE, g1())).unwrap();
        class.seal(&mut diags);

        let def = class.definition(false).unwrap();
        let props = def["properties"].as_object().unwrap();
        let keys: Vec<&String> = props.keys().collect();
        assert_eq!(keys, ["first", "c", "d"]);
        assert!(props["first"]["oneOf"].is_array());
        // dropped group's members keep their own cardinality
        assert_eq!(def["required"], json!(["first", "c", "d"]));
        assert!(diags.contains(codes::EXTRA_CHOICE_DROPPED));
    }

    #[test]
    fn declared_choice_cardinality_is_used() {
        let mut class = ClassDescriptor::new("Order", None);
        class
            .declare_choice(ChoiceSpec::new("g").cardinality(Cardinality::OPTIONAL))
            .unwrap();
        let g = || Some(ChoiceMembership::new("g"));
        class.push_member(assoc("a", 0, Cardinality::ONE, g())).unwrap();
        class.push_member(assoc("b", 0, Cardinality::ONE, g())).unwrap();
        class.seal(&mut Diagnostics::new());

        assert!(class.required().unwrap().is_empty());
        let def = class.definition(false).unwrap();
        assert!(def.get("required").is_none());
    }

    #[test]
    fn same_named_members_keep_one_regardless_of_order() {
        let definition_for = |members: Vec<Member>| {
            let mut diags = Diagnostics::new();
            let mut class = ClassDescriptor::new("Order", None);
            for member in members {
                class.push_member(member).unwrap();
            }
            class.seal(&mut diags);
            assert!(diags.contains(codes::DUPLICATE_MEMBER));
            class.definition(false).unwrap()
        };

        let one = || assoc("code", 0, Cardinality::ONE, None);
        let many = || assoc("code", 0, Cardinality::MANY, None);
        let forward = definition_for(vec![one(), many()]);
        let reversed = definition_for(vec![many(), one()]);

        assert_eq!(forward, reversed);
        assert_eq!(forward["properties"]["code"], json!({ "$ref": "#/definitions/Target" }));
        assert_eq!(forward["required"], json!(["code"]));
    }

    #[test]
    fn same_named_choice_members_are_not_required_twice() {
        let mut diags = Diagnostics::new();
        let mut class = ClassDescriptor::new("Order", None);
        let g = || Some(ChoiceMembership::new("g").in_branch(1));
        class.push_member(assoc("x", 0, Cardinality::ONE, g())).unwrap();
        class.push_member(assoc("x", 0, Cardinality::ONE, g())).unwrap();
        class.seal(&mut diags);

        let def = class.definition(false).unwrap();
        assert!(def["properties"].get("g").is_none());
        assert_eq!(def["required"], json!(["x"]));
        assert!(diags.contains(codes::DUPLICATE_MEMBER));
        assert!(diags.contains(codes::SINGLE_MEMBER_CHOICE));
    }

    #[test]
    fn choice_named_like_a_property_stays_unmaterialized() {
        let mut diags = Diagnostics::new();
        let mut class = ClassDescriptor::new("Order", None);
        let g = || Some(ChoiceMembership::new("pay"));
        class.push_member(assoc("pay", 0, Cardinality::ONE, None)).unwrap();
        class.push_member(assoc("x", 0, Cardinality::OPTIONAL, g())).unwrap();
        class.push_member(assoc("y", 0, Cardinality::OPTIONAL, g())).unwrap();
        class.seal(&mut diags);

        let def = class.definition(false).unwrap();
        let keys: Vec<&String> = def["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["pay", "x", "y"]);
        assert_eq!(def["properties"]["pay"], json!({ "$ref": "#/definitions/Target" }));
        assert!(diags.contains(codes::CHOICE_NAME_CONFLICT));
    }

    #[test]
    fn seal_is_idempotent() {
        let mut class = ClassDescriptor::new("Order", None);
        class.push_member(assoc("a", 0, Cardinality::ONE, None)).unwrap();
        class.seal(&mut Diagnostics::new());
        let first = class.definition(false);
        class.seal(&mut Diagnostics::new());
        assert_eq!(class.definition(false), first);
    }
}
