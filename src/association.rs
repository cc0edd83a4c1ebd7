//! Associations between classes and their deferred resolution.
//!
//! An association whose target class is not registered yet (typically a
//! self-reference, or a cycle within one batch) is queued per source class
//! and replayed once that class has been registered. A target still missing
//! at replay time is a fatal error.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::{annotate, array_shape};
use crate::class::ClassDescriptor;
use crate::error::BuildError;
use crate::ordering::OrderingKey;
use crate::types::{definition_ref, Cardinality, ChoiceMembership, MemberKind};

/// Association as supplied by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSpec {
    pub role: String,
    pub target: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub sequence_key: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<ChoiceMembership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl AssociationSpec {
    pub fn new(role: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            target: target.into(),
            cardinality: Cardinality::ONE,
            sequence_key: 0,
            choice: None,
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

    pub fn documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }
}

/// Classes defined by another document that associations may target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    /// `$id` of the referenced document.
    pub id: String,
    pub classes: BTreeSet<String>,
}

/// Where an association target lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLocation {
    Local,
    External(String),
}

/// Read view over the class tables an association may resolve against.
pub struct ClassIndex<'a> {
    local: &'a BTreeMap<String, ClassDescriptor>,
    external: &'a BTreeMap<String, ExternalReference>,
}

impl<'a> ClassIndex<'a> {
    pub fn new(
        local: &'a BTreeMap<String, ClassDescriptor>,
        external: &'a BTreeMap<String, ExternalReference>,
    ) -> Self {
        Self { local, external }
    }

    /// Local classes win over external ones; externals are searched by id.
    pub fn locate(&self, class: &str) -> Option<TargetLocation> {
        if self.local.contains_key(class) {
            return Some(TargetLocation::Local);
        }
        self.external
            .values()
            .find(|ext| ext.classes.contains(class))
            .map(|ext| TargetLocation::External(ext.id.clone()))
    }
}

/// A resolved association.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub role: String,
    pub target: String,
    pub location: TargetLocation,
    pub cardinality: Cardinality,
    pub sequence_key: u32,
    pub choice: Option<ChoiceMembership>,
    pub documentation: Option<String>,
}

/// Outcome of [`Association::create`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Association),
    /// Queued on the registry; rendered after replay.
    Deferred,
}

impl Association {
    /// Resolve an association, queueing it when the target is unknown.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InvalidCardinality` for invalid bounds, and
    /// `BuildError::UnresolvedAssociation` when the target is still missing
    /// while `source_node` is being replayed.
    pub fn create(
        index: &ClassIndex<'_>,
        deferred: &mut DeferredAssociationRegistry,
        source_node: &str,
        spec: AssociationSpec,
    ) -> Result<Resolution, BuildError> {
        let cardinality = Cardinality::new(
            i64::from(spec.cardinality.lower),
            i64::from(spec.cardinality.upper),
        )?;

        let Some(location) = index.locate(&spec.target) else {
            if deferred.is_replaying(source_node) {
                return Err(BuildError::UnresolvedAssociation {
                    source_node: source_node.to_string(),
                    role: spec.role,
                    target: spec.target,
                });
            }
            tracing::debug!(source_node, role = %spec.role, target = %spec.target, "association deferred");
            deferred.enqueue(source_node, spec);
            return Ok(Resolution::Deferred);
        };

        Ok(Resolution::Resolved(Self {
            role: spec.role,
            target: spec.target,
            location,
            cardinality,
            sequence_key: spec.sequence_key,
            choice: spec.choice,
            documentation: spec.documentation,
        }))
    }

    pub fn is_mandatory(&self) -> bool {
        self.cardinality.is_mandatory()
    }

    pub fn ordering_key(&self) -> OrderingKey {
        OrderingKey::member(&self.role, self.sequence_key, MemberKind::Content)
    }

    /// Rendered property shape: a reference, or an array of references.
    pub fn shape(&self) -> Value {
        let document = match &self.location {
            TargetLocation::Local => "",
            TargetLocation::External(id) => id.as_str(),
        };
        let reference = definition_ref(document, &self.target);
        let shape = if self.cardinality.is_list() {
            array_shape(reference, self.cardinality)
        } else {
            reference
        };
        match &self.documentation {
            Some(doc) => annotate(shape, "description", Value::String(doc.clone())),
            None => shape,
        }
    }
}

/// Per-document queue of associations awaiting their target.
#[derive(Debug, Clone, Default)]
pub struct DeferredAssociationRegistry {
    queues: BTreeMap<String, Vec<AssociationSpec>>,
    replaying: Option<String>,
}

impl DeferredAssociationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the constructor arguments verbatim under the source class.
    pub fn enqueue(&mut self, source_node: &str, spec: AssociationSpec) {
        self.queues
            .entry(source_node.to_string())
            .or_default()
            .push(spec);
    }

    pub fn is_replaying(&self, source_node: &str) -> bool {
        self.replaying.as_deref() == Some(source_node)
    }

    pub fn pending(&self, source_node: &str) -> usize {
        self.queues.get(source_node).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Source classes with queued associations.
    pub fn nodes(&self) -> Vec<String> {
        self.queues.keys().cloned().collect()
    }

    /// Drop the queue of a source class without resolving it.
    pub fn discard(&mut self, source_node: &str) {
        self.queues.remove(source_node);
    }

    /// Resolve every queued association of `source_node` and drain its queue.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnresolvedAssociation` for the first target that
    /// is still missing; nothing is re-queued.
    pub fn replay(
        &mut self,
        source_node: &str,
        index: &ClassIndex<'_>,
    ) -> Result<Vec<Association>, BuildError> {
        let Some(queue) = self.queues.remove(source_node) else {
            return Ok(Vec::new());
        };

        self.replaying = Some(source_node.to_string());
        let result: Result<Vec<Association>, BuildError> = queue
            .into_iter()
            .map(|spec| {
                let (role, target) = (spec.role.clone(), spec.target.clone());
                match Association::create(index, self, source_node, spec)? {
                    Resolution::Resolved(association) => Ok(association),
                    Resolution::Deferred => Err(BuildError::UnresolvedAssociation {
                        source_node: source_node.to_string(),
                        role,
                        target,
                    }),
                }
            })
            .collect();
        self.replaying = None;
        result
    }
}
