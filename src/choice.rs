//! Mutually exclusive choice groups.
//!
//! Members sharing a choice group are partitioned into branches by their
//! sequence id; each branch becomes one alternative of a `oneOf`. The
//! target format can express only one such construct per object, so the
//! owning class materializes at most one group.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attribute::annotate;
use crate::class::Member;
use crate::ordering::OrderingKey;
use crate::types::{Cardinality, MemberKind};

/// Optional per-class declaration of a choice group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSpec {
    pub group: String,
    /// Explicit occurrence; its lower bound decides mandatoriness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    #[serde(default)]
    pub sequence_key: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl ChoiceSpec {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            cardinality: None,
            sequence_key: 0,
            documentation: None,
        }
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    pub fn sequence(mut self, key: u32) -> Self {
        self.sequence_key = key;
        self
    }

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }
}

/// Branch identity. Numbered branches precede single-member ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum BranchKey {
    Sequence(u32),
    Single(String),
}

/// A choice group collected from a class's members.
#[derive(Debug, Clone)]
pub struct Choice {
    pub group: String,
    explicit: Option<Cardinality>,
    sequence_key: u32,
    documentation: Option<String>,
    branches: BTreeMap<BranchKey, Vec<Member>>,
}

impl Choice {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            explicit: None,
            sequence_key: 0,
            documentation: None,
            branches: BTreeMap::new(),
        }
    }

    pub fn from_spec(spec: &ChoiceSpec) -> Self {
        Self {
            group: spec.group.clone(),
            explicit: spec.cardinality,
            sequence_key: spec.sequence_key,
            documentation: spec.documentation.clone(),
            branches: BTreeMap::new(),
        }
    }

    /// Add a member to the branch named by its choice membership.
    pub fn add_member(&mut self, member: Member) {
        let key = match member.choice().and_then(|c| c.sequence) {
            Some(sequence) => BranchKey::Sequence(sequence),
            None => BranchKey::Single(member.name().to_string()),
        };
        self.branches.entry(key).or_default().push(member);
    }

    pub fn member_count(&self) -> usize {
        self.branches.values().map(Vec::len).sum()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// The explicit lower bound if declared, otherwise mandatory only when
    /// every branch has a mandatory member.
    pub fn is_mandatory(&self) -> bool {
        match self.explicit {
            Some(cardinality) => cardinality.is_mandatory(),
            None => {
                !self.branches.is_empty()
                    && self
                        .branches
                        .values()
                        .all(|members| members.iter().any(Member::is_mandatory))
            }
        }
    }

    /// Declared sequence, else the lowest non-zero member sequence.
    pub fn ordering_key(&self) -> OrderingKey {
        let sequence = if self.sequence_key != 0 {
            self.sequence_key
        } else {
            self.branches
                .values()
                .flatten()
                .map(|m| m.ordering_key().sequence)
                .filter(|s| *s != 0)
                .min()
                .unwrap_or(0)
        };
        OrderingKey::member(&self.group, sequence, MemberKind::Content)
    }

    /// Render as `{ "oneOf": [ <closed branch object>, ... ] }`.
    pub fn materialize(&self) -> Value {
        let alternatives: Vec<Value> = self
            .branches
            .values()
            .map(|members| {
                let mut members: Vec<&Member> = members.iter().collect();
                members.sort_by_key(|m| m.ordering_key());

                let mut properties = Map::new();
                let mut required = Vec::new();
                for member in members {
                    if member.is_mandatory() {
                        required.push(Value::String(member.name().to_string()));
                    }
                    properties.insert(member.name().to_string(), member.shape());
                }

                let mut branch = Map::new();
                branch.insert("type".into(), Value::String("object".into()));
                branch.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    branch.insert("required".into(), Value::Array(required));
                }
                branch.insert("additionalProperties".into(), Value::Bool(false));
                Value::Object(branch)
            })
            .collect();

        let mut shape = Map::new();
        shape.insert("oneOf".into(), Value::Array(alternatives));
        let shape = Value::Object(shape);
        match &self.documentation {
            Some(doc) => annotate(shape, "description", Value::String(doc.clone())),
            None => shape,
        }
    }

    /// Give the members back, e.g. when the group is not materialized.
    pub fn into_members(self) -> Vec<Member> {
        self.branches.into_values().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::{Association, TargetLocation};
    use crate::types::ChoiceMembership;
    use serde_json::json;

    fn assoc(role: &str, target: &str, membership: ChoiceMembership, card: Cardinality) -> Member {
        Member::Association(Association {
            role: role.into(),
            target: target.into(),
            location: TargetLocation::Local,
            cardinality: card,
            sequence_key: 0,
            choice: Some(membership),
            documentation: None,
        })
    }

    #[test]
    fn single_member_branches_render_one_of() {
        let mut choice = Choice::new("party");
        choice.add_member(assoc("person", "Person", ChoiceMembership::new("party"), Cardinality::ONE));
        choice.add_member(assoc(
            "organization",
            "Organization",
            ChoiceMembership::new("party"),
            Cardinality::ONE,
        ));

        assert_eq!(choice.member_count(), 2);
        assert_eq!(choice.branch_count(), 2);
        assert_eq!(
            choice.materialize(),
            json!({
                "oneOf": [
                    {
                        "type": "object",
                        "properties": { "organization": { "$ref": "#/definitions/Organization" } },
                        "required": ["organization"],
                        "additionalProperties": false
                    },
                    {
                        "type": "object",
                        "properties": { "person": { "$ref": "#/definitions/Person" } },
                        "required": ["person"],
                        "additionalProperties": false
                    }
                ]
            })
        );
    }

    #[test]
    fn sequence_ids_group_members_into_branches() {
        let mut choice = Choice::new("contact");
        let branch = |seq| ChoiceMembership::new("contact").in_branch(seq);
        choice.add_member(assoc("phone", "Phone", branch(1), Cardinality::ONE));
        choice.add_member(assoc("fax", "Phone", branch(1), Cardinality::OPTIONAL));
        choice.add_member(assoc("email", "Email", branch(2), Cardinality::ONE));

        assert_eq!(choice.branch_count(), 2);
        let shape = choice.materialize();
        let first = &shape["oneOf"][0];
        assert_eq!(first["required"], json!(["phone"]));
        assert!(first["properties"].get("fax").is_some());
    }

    #[test]
    fn mandatory_only_if_every_branch_has_mandatory_member() {
        let mut choice = Choice::new("g");
        choice.add_member(assoc("a", "A", ChoiceMembership::new("g"), Cardinality::ONE));
        choice.add_member(assoc("b", "B", ChoiceMembership::new("g"), Cardinality::OPTIONAL));
        assert!(!choice.is_mandatory());

        let mut choice = Choice::new("g");
        choice.add_member(assoc("a", "A", ChoiceMembership::new("g"), Cardinality::ONE));
        choice.add_member(assoc("b", "B", ChoiceMembership::new("g"), Cardinality::ONE));
        assert!(choice.is_mandatory());
    }

    #[test]
    fn explicit_cardinality_overrides_members() {
        let spec = ChoiceSpec::new("g").cardinality(Cardinality::ONE);
        let mut choice = Choice::from_spec(&spec);
        choice.add_member(assoc("a", "A", ChoiceMembership::new("g"), Cardinality::OPTIONAL));
        choice.add_member(assoc("b", "B", ChoiceMembership::new("g"), Cardinality::OPTIONAL));
        assert!(choice.is_mandatory());

        let spec = ChoiceSpec::new("g").cardinality(Cardinality::OPTIONAL);
        let mut choice = Choice::from_spec(&spec);
        choice.add_member(assoc("a", "A", ChoiceMembership::new("g"), Cardinality::ONE));
        choice.add_member(assoc("b", "B", ChoiceMembership::new("g"), Cardinality::ONE));
        assert!(!choice.is_mandatory());
    }

    #[test]
    fn into_members_returns_everything() {
        let mut choice = Choice::new("g");
        choice.add_member(assoc("a", "A", ChoiceMembership::new("g"), Cardinality::ONE));
        choice.add_member(assoc("b", "B", ChoiceMembership::new("g").in_branch(4), Cardinality::ONE));
        let names: Vec<String> = choice
            .into_members()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, ["b", "a"]);
    }
}
