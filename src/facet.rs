//! Constraining facets and their JSON Schema keywords.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::diagnostics::{codes, Diagnostics};
use crate::primitive::BaseType;

/// Largest power of ten that still fits an `i64` bound.
const MAX_DIGITS: u64 = 18;

/// Smallest `multipleOf` step that still survives an `f64` round trip.
const MAX_FRACTION_DIGITS: u64 = 15;

/// Facet as supplied by the model: a token and its raw value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Facet {
    pub token: String,
    pub value: String,
}

impl Facet {
    pub fn new(token: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            value: value.into(),
        }
    }
}

/// Closed facet vocabulary, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FacetKind {
    Length,
    MinLength,
    MaxLength,
    Pattern,
    MinInclusive,
    MinExclusive,
    MaxInclusive,
    MaxExclusive,
    FractionDigits,
    TotalDigits,
}

impl FacetKind {
    /// Parse a facet token. Tokens are matched case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        let kind = match token.to_ascii_lowercase().as_str() {
            "length" => FacetKind::Length,
            "minlength" => FacetKind::MinLength,
            "maxlength" => FacetKind::MaxLength,
            "pattern" => FacetKind::Pattern,
            "mininclusive" => FacetKind::MinInclusive,
            "minexclusive" => FacetKind::MinExclusive,
            "maxinclusive" => FacetKind::MaxInclusive,
            "maxexclusive" => FacetKind::MaxExclusive,
            "fractiondigits" => FacetKind::FractionDigits,
            "totaldigits" => FacetKind::TotalDigits,
            _ => return None,
        };
        Some(kind)
    }

    pub fn token(&self) -> &'static str {
        match self {
            FacetKind::Length => "length",
            FacetKind::MinLength => "minLength",
            FacetKind::MaxLength => "maxLength",
            FacetKind::Pattern => "pattern",
            FacetKind::MinInclusive => "minInclusive",
            FacetKind::MinExclusive => "minExclusive",
            FacetKind::MaxInclusive => "maxInclusive",
            FacetKind::MaxExclusive => "maxExclusive",
            FacetKind::FractionDigits => "fractionDigits",
            FacetKind::TotalDigits => "totalDigits",
        }
    }

    /// Whether this facet constrains values of the given base type.
    pub fn applies_to(&self, base: BaseType) -> bool {
        match self {
            FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength | FacetKind::Pattern => {
                base == BaseType::String
            }
            FacetKind::MinInclusive
            | FacetKind::MinExclusive
            | FacetKind::MaxInclusive
            | FacetKind::MaxExclusive
            | FacetKind::TotalDigits => matches!(base, BaseType::Integer | BaseType::Number),
            FacetKind::FractionDigits => base == BaseType::Number,
        }
    }
}

/// Parsed facet value.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetValue {
    Count(u64),
    Bound(Number),
    Pattern(String),
}

/// A facet that passed token and value validation for its target type.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedFacet {
    pub kind: FacetKind,
    pub value: FacetValue,
}

impl CheckedFacet {
    fn count(&self) -> Option<u64> {
        match self.value {
            FacetValue::Count(n) => Some(n),
            _ => None,
        }
    }
}

/// Parse a facet value for its kind. `None` means unparseable.
fn parse_value(kind: FacetKind, raw: &str) -> Option<FacetValue> {
    let raw = raw.trim();
    match kind {
        FacetKind::Length
        | FacetKind::MinLength
        | FacetKind::MaxLength
        | FacetKind::FractionDigits
        | FacetKind::TotalDigits => raw.parse().ok().map(FacetValue::Count),
        FacetKind::MinInclusive
        | FacetKind::MinExclusive
        | FacetKind::MaxInclusive
        | FacetKind::MaxExclusive => raw.parse::<Number>().ok().map(FacetValue::Bound),
        FacetKind::Pattern => {
            if raw.is_empty() {
                None
            } else {
                Some(FacetValue::Pattern(raw.to_string()))
            }
        }
    }
}

/// Validate facets against a base type.
///
/// Unknown tokens, facets that do not apply to `base` and unparseable values
/// are dropped with a warning. The result is sorted into emission order.
pub fn check_facets(
    owner: &str,
    base: BaseType,
    facets: &[Facet],
    diagnostics: &mut Diagnostics,
) -> Vec<CheckedFacet> {
    let mut checked = Vec::new();
    for facet in facets {
        let Some(kind) = FacetKind::parse(&facet.token) else {
            diagnostics.warn(
                codes::UNKNOWN_FACET,
                owner,
                format!("unknown facet token \"{}\", facet dropped", facet.token),
            );
            continue;
        };
        if !kind.applies_to(base) {
            diagnostics.warn(
                codes::FACET_NOT_APPLICABLE,
                owner,
                format!(
                    "facet {} does not apply to {} values, facet dropped",
                    kind.token(),
                    base.as_str()
                ),
            );
            continue;
        }
        match parse_value(kind, &facet.value) {
            Some(value) => checked.push(CheckedFacet { kind, value }),
            None => diagnostics.warn(
                codes::FACET_VALUE_UNPARSEABLE,
                owner,
                format!(
                    "cannot parse {} value \"{}\", facet dropped",
                    kind.token(),
                    facet.value
                ),
            ),
        }
    }
    checked.sort_by_key(|f| f.kind);
    checked
}

/// Render checked facets as JSON Schema keywords.
pub fn render_facets(
    owner: &str,
    base: BaseType,
    facets: &[CheckedFacet],
    diagnostics: &mut Diagnostics,
) -> Map<String, Value> {
    let mut keywords = Map::new();

    for facet in facets {
        match (&facet.kind, &facet.value) {
            (FacetKind::Length, FacetValue::Count(n)) => {
                keywords.insert("minLength".into(), Value::from(*n));
                keywords.insert("maxLength".into(), Value::from(*n));
            }
            (FacetKind::MinLength, FacetValue::Count(n)) => {
                keywords.insert("minLength".into(), Value::from(*n));
            }
            (FacetKind::MaxLength, FacetValue::Count(n)) => {
                keywords.insert("maxLength".into(), Value::from(*n));
            }
            (FacetKind::Pattern, FacetValue::Pattern(p)) => {
                keywords.insert("pattern".into(), Value::String(p.clone()));
            }
            (FacetKind::MinInclusive, FacetValue::Bound(b)) => {
                keywords.insert("minimum".into(), Value::Number(b.clone()));
            }
            (FacetKind::MinExclusive, FacetValue::Bound(b)) => {
                keywords.insert("exclusiveMinimum".into(), Value::Number(b.clone()));
            }
            (FacetKind::MaxInclusive, FacetValue::Bound(b)) => {
                keywords.insert("maximum".into(), Value::Number(b.clone()));
            }
            (FacetKind::MaxExclusive, FacetValue::Bound(b)) => {
                keywords.insert("exclusiveMaximum".into(), Value::Number(b.clone()));
            }
            (FacetKind::FractionDigits, FacetValue::Count(n)) => {
                render_fraction_digits(owner, *n, &mut keywords, diagnostics);
            }
            (FacetKind::TotalDigits, FacetValue::Count(n)) => {
                let fraction = facets
                    .iter()
                    .find(|f| f.kind == FacetKind::FractionDigits)
                    .and_then(CheckedFacet::count)
                    .unwrap_or(0);
                render_total_digits(owner, base, *n, fraction, &mut keywords, diagnostics);
            }
            _ => {}
        }
    }

    keywords
}

fn render_fraction_digits(
    owner: &str,
    digits: u64,
    keywords: &mut Map<String, Value>,
    diagnostics: &mut Diagnostics,
) {
    if digits == 0 {
        return;
    }
    if digits > MAX_FRACTION_DIGITS {
        diagnostics.warn(
            codes::FACET_UNREPRESENTABLE,
            owner,
            format!("fractionDigits {} cannot be expressed as multipleOf", digits),
        );
        return;
    }
    // Exact decimal literal: 10^-n parses to the nearest f64
    let step: f64 = format!("1e-{}", digits).parse().unwrap_or(1.0);
    if let Some(number) = Number::from_f64(step) {
        keywords.insert("multipleOf".into(), Value::Number(number));
    }
}

/// Total digits become symmetric bounds where no explicit bound exists.
fn render_total_digits(
    owner: &str,
    base: BaseType,
    total: u64,
    fraction: u64,
    keywords: &mut Map<String, Value>,
    diagnostics: &mut Diagnostics,
) {
    let integer_digits = total.saturating_sub(fraction);
    if integer_digits > MAX_DIGITS || total == 0 {
        diagnostics.warn(
            codes::FACET_UNREPRESENTABLE,
            owner,
            format!("totalDigits {} cannot be expressed as bounds", total),
        );
        return;
    }
    let limit = 10_i64.pow(integer_digits as u32);
    let has_lower = keywords.contains_key("minimum") || keywords.contains_key("exclusiveMinimum");
    let has_upper = keywords.contains_key("maximum") || keywords.contains_key("exclusiveMaximum");

    if base == BaseType::Integer {
        if !has_lower {
            keywords.insert("minimum".into(), Value::from(-(limit - 1)));
        }
        if !has_upper {
            keywords.insert("maximum".into(), Value::from(limit - 1));
        }
    } else {
        if !has_lower {
            keywords.insert("exclusiveMinimum".into(), Value::from(-limit));
        }
        if !has_upper {
            keywords.insert("exclusiveMaximum".into(), Value::from(limit));
        }
    }
}
