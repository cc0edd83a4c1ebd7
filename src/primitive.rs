//! Registry of domain primitive types.
//!
//! Maps the closed set of primitive names a model may use onto a JSON
//! Schema base type plus an optional format. Facetted variants are cached
//! per owning classifier so differently constrained uses of one primitive
//! never collide.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::diagnostics::Diagnostics;
use crate::facet::{check_facets, render_facets, CheckedFacet, Facet, FacetKind};

/// JSON Schema base types a primitive can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseType {
    String,
    Boolean,
    Integer,
    Number,
}

impl BaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::String => "string",
            BaseType::Boolean => "boolean",
            BaseType::Integer => "integer",
            BaseType::Number => "number",
        }
    }
}

/// (source name, base type, format, content encoding)
const PRIMITIVES: &[(&str, BaseType, Option<&str>, Option<&str>)] = &[
    ("string", BaseType::String, None, None),
    ("normalizedstring", BaseType::String, None, None),
    ("token", BaseType::String, None, None),
    ("boolean", BaseType::Boolean, None, None),
    ("integer", BaseType::Integer, None, None),
    ("decimal", BaseType::Number, None, None),
    ("double", BaseType::Number, None, None),
    ("float", BaseType::Number, None, None),
    ("numeric", BaseType::Number, None, None),
    ("date", BaseType::String, Some("date"), None),
    ("time", BaseType::String, Some("time"), None),
    ("datetime", BaseType::String, Some("date-time"), None),
    ("duration", BaseType::String, Some("duration"), None),
    ("uri", BaseType::String, Some("uri"), None),
    ("binary", BaseType::String, None, Some("base64")),
];

fn lookup(source_name: &str) -> Option<(BaseType, Option<&'static str>, Option<&'static str>)> {
    let key = source_name.to_ascii_lowercase();
    PRIMITIVES
        .iter()
        .find(|(name, ..)| *name == key)
        .map(|(_, base, format, encoding)| (*base, *format, *encoding))
}

/// Immutable description of a primitive, possibly facetted.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveDescriptor {
    pub source_name: String,
    pub base_type: BaseType,
    pub format: Option<&'static str>,
    pub content_encoding: Option<&'static str>,
    /// Owning classifier for facetted variants.
    pub owner: Option<String>,
    pub facets: Vec<CheckedFacet>,
    keywords: Map<String, Value>,
}

impl PrimitiveDescriptor {
    pub fn is_facetted(&self) -> bool {
        self.owner.is_some()
    }

    /// Cache identity of this descriptor.
    pub fn key(&self) -> PrimitiveKey {
        match &self.owner {
            Some(owner) => PrimitiveKey::Facetted {
                owner: owner.clone(),
                source_name: self.source_name.clone(),
            },
            None => PrimitiveKey::Plain(self.source_name.clone()),
        }
    }

    /// Inline JSON Schema shape of the primitive.
    pub fn shape(&self) -> Map<String, Value> {
        let mut shape = Map::new();
        shape.insert("type".into(), Value::String(self.base_type.as_str().into()));
        if let Some(format) = self.format {
            shape.insert("format".into(), Value::String(format.into()));
        }
        if let Some(encoding) = self.content_encoding {
            shape.insert("contentEncoding".into(), Value::String(encoding.into()));
        }
        for (k, v) in &self.keywords {
            shape.insert(k.clone(), v.clone());
        }
        shape
    }
}

/// Identity of a cached descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKey {
    Plain(String),
    Facetted { owner: String, source_name: String },
}

/// Per-document cache of primitive descriptors.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveTypeRegistry {
    entries: BTreeMap<PrimitiveKey, Arc<PrimitiveDescriptor>>,
}

impl PrimitiveTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an unfacetted primitive by name.
    ///
    /// Returns `None` for names outside the primitive vocabulary.
    pub fn resolve(&mut self, source_name: &str) -> Option<Arc<PrimitiveDescriptor>> {
        let source_name = source_name.to_ascii_lowercase();
        let key = PrimitiveKey::Plain(source_name.clone());
        if let Some(existing) = self.entries.get(&key) {
            return Some(Arc::clone(existing));
        }

        let (base_type, format, content_encoding) = lookup(&source_name)?;
        let descriptor = Arc::new(PrimitiveDescriptor {
            source_name,
            base_type,
            format,
            content_encoding,
            owner: None,
            facets: Vec::new(),
            keywords: Map::new(),
        });
        self.entries.insert(key, Arc::clone(&descriptor));
        Some(descriptor)
    }

    /// Resolve a primitive specialised by facets for one owning classifier.
    ///
    /// A `fractionDigits` of 0 on a number primitive substitutes the integer
    /// base type and is consumed; on an integer primitive it is consumed
    /// as-is. Remaining facets are validated against
    /// the resulting base type; invalid ones are dropped with a warning.
    /// Without facets this is the same as [`resolve`](Self::resolve).
    pub fn resolve_facetted(
        &mut self,
        owner: &str,
        source_name: &str,
        facets: &[Facet],
        diagnostics: &mut Diagnostics,
    ) -> Option<Arc<PrimitiveDescriptor>> {
        if facets.is_empty() {
            return self.resolve(source_name);
        }

        let source_name = source_name.to_ascii_lowercase();
        let key = PrimitiveKey::Facetted {
            owner: owner.to_string(),
            source_name: source_name.clone(),
        };
        if let Some(existing) = self.entries.get(&key) {
            return Some(Arc::clone(existing));
        }

        let (mut base_type, format, content_encoding) = lookup(&source_name)?;
        let mut remaining: Vec<Facet> = facets.to_vec();
        match base_type {
            BaseType::Number => {
                if let Some(idx) = remaining.iter().position(forces_integer) {
                    base_type = BaseType::Integer;
                    remaining.remove(idx);
                    tracing::debug!(owner, primitive = %source_name, "fractionDigits 0 substitutes integer");
                }
            }
            BaseType::Integer => remaining.retain(|facet| !forces_integer(facet)),
            _ => {}
        }

        let checked = check_facets(owner, base_type, &remaining, diagnostics);
        let keywords = render_facets(owner, base_type, &checked, diagnostics);
        let descriptor = Arc::new(PrimitiveDescriptor {
            source_name,
            base_type,
            format,
            content_encoding,
            owner: Some(owner.to_string()),
            facets: checked,
            keywords,
        });
        self.entries.insert(key, Arc::clone(&descriptor));
        Some(descriptor)
    }

    pub fn get(&self, key: &PrimitiveKey) -> Option<&Arc<PrimitiveDescriptor>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &PrimitiveKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy entries from `other` whose keys are not present yet.
    pub fn merge(&mut self, other: &PrimitiveTypeRegistry) {
        for (key, descriptor) in &other.entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::clone(descriptor));
        }
    }
}

fn forces_integer(facet: &Facet) -> bool {
    FacetKind::parse(&facet.token) == Some(FacetKind::FractionDigits)
        && facet.value.trim().parse::<u64>() == Ok(0)
}
