//! Feature extraction and match rules.
//!
//! A record's JSON is reduced to a sorted set of normalized [`Feature`]s.
//! Two feature sets are compared by [`compare`], which names the shared
//! feature kinds (the match key) and the resulting [`MatchLevel`].

use std::fmt;

use serde_json::{Map, Value};

/// Kind of identifying feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    /// Person or organization name
    Name,
    /// Date of birth
    Dob,
    /// Postal address
    Address,
    /// Phone number
    Phone,
    /// Email address
    Email,
    /// Social security number
    Ssn,
    /// Passport number
    Passport,
    /// Driver's license number
    DriversLicense,
}

/// Attribute-name suffixes and the feature kind they produce.
const ATTRIBUTES: &[(&str, FeatureKind)] = &[
    ("NAME_FULL", FeatureKind::Name),
    ("NAME_ORG", FeatureKind::Name),
    ("DATE_OF_BIRTH", FeatureKind::Dob),
    ("ADDR_FULL", FeatureKind::Address),
    ("PHONE_NUMBER", FeatureKind::Phone),
    ("EMAIL_ADDRESS", FeatureKind::Email),
    ("SSN_NUMBER", FeatureKind::Ssn),
    ("PASSPORT_NUMBER", FeatureKind::Passport),
    ("DRIVERS_LICENSE_NUMBER", FeatureKind::DriversLicense),
];

impl FeatureKind {
    /// Feature type code used in responses and match keys.
    pub fn code(&self) -> &'static str {
        match self {
            FeatureKind::Name => "NAME",
            FeatureKind::Dob => "DOB",
            FeatureKind::Address => "ADDRESS",
            FeatureKind::Phone => "PHONE",
            FeatureKind::Email => "EMAIL",
            FeatureKind::Ssn => "SSN",
            FeatureKind::Passport => "PASSPORT",
            FeatureKind::DriversLicense => "DRLIC",
        }
    }

    /// A shared value of this kind resolves two records on its own.
    fn is_strong(&self) -> bool {
        matches!(
            self,
            FeatureKind::Ssn | FeatureKind::Passport | FeatureKind::DriversLicense | FeatureKind::Email
        )
    }

    /// A shared value of this kind resolves two records together with a name.
    fn confirms_name(&self) -> bool {
        matches!(self, FeatureKind::Dob | FeatureKind::Phone | FeatureKind::Address)
    }
}

/// A normalized feature value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Feature {
    /// Feature kind
    pub kind: FeatureKind,
    /// Normalized value
    pub value: String,
}

impl Feature {
    fn new(kind: FeatureKind, raw: &str) -> Option<Self> {
        let value = normalize(kind, raw);
        if value.is_empty() {
            None
        } else {
            Some(Self { kind, value })
        }
    }
}

fn normalize(kind: FeatureKind, raw: &str) -> String {
    match kind {
        FeatureKind::Phone | FeatureKind::Ssn => raw.chars().filter(char::is_ascii_digit).collect(),
        FeatureKind::Name => raw
            .chars()
            .filter(|c| !matches!(c, '.' | ',' | '\''))
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase(),
        _ => raw.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase(),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attribute_kind(key: &str) -> Option<FeatureKind> {
    ATTRIBUTES.iter().find_map(|(suffix, kind)| {
        let matches = key == *suffix
            || key
                .strip_suffix(suffix)
                .is_some_and(|prefix| prefix.ends_with('_'));
        matches.then_some(*kind)
    })
}

fn extract_object(object: &Map<String, Value>, out: &mut Vec<Feature>) {
    for (key, value) in object {
        if let Some(kind) = attribute_kind(key) {
            if let Some(raw) = scalar(value) {
                out.extend(Feature::new(kind, &raw));
            }
            continue;
        }
        // NAME_FIRST + NAME_LAST (optionally prefixed) form one name.
        if let Some(prefix) = key.strip_suffix("NAME_LAST") {
            let first = object
                .get(&format!("{}NAME_FIRST", prefix))
                .and_then(scalar)
                .unwrap_or_default();
            if let Some(last) = scalar(value) {
                out.extend(Feature::new(
                    FeatureKind::Name,
                    &format!("{} {}", first, last),
                ));
            }
        }
    }
}

/// Extract the sorted, de-duplicated features of a record or attribute bag.
///
/// Top-level attributes and one level of arrays of objects are read.
pub fn extract(document: &Map<String, Value>) -> Vec<Feature> {
    let mut features = Vec::new();
    extract_object(document, &mut features);
    for value in document.values() {
        if let Value::Array(items) = value {
            for item in items {
                if let Value::Object(nested) = item {
                    extract_object(nested, &mut features);
                }
            }
        }
    }
    features.sort();
    features.dedup();
    features
}

/// Strength of a match between two feature sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchLevel {
    /// Same entity
    Resolved,
    /// Related through a non-name feature
    PossiblyRelated,
    /// Related through a name only
    NameOnly,
    /// Nothing shared
    None,
}

impl MatchLevel {
    /// Match level code used in responses; empty for no match.
    pub fn code(&self) -> &'static str {
        match self {
            MatchLevel::Resolved => "RESOLVED",
            MatchLevel::PossiblyRelated => "POSSIBLY_RELATED",
            MatchLevel::NameOnly => "NAME_ONLY",
            MatchLevel::None => "",
        }
    }

    /// Numeric match level used in CSV reports.
    pub fn number(&self) -> u8 {
        match self {
            MatchLevel::Resolved => 1,
            MatchLevel::PossiblyRelated => 3,
            MatchLevel::NameOnly => 4,
            MatchLevel::None => 0,
        }
    }

    /// True for the two relationship levels.
    pub fn is_relationship(&self) -> bool {
        matches!(self, MatchLevel::PossiblyRelated | MatchLevel::NameOnly)
    }
}

impl fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of comparing two feature sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Features present on both sides
    pub shared: Vec<Feature>,
    /// Resulting level
    pub level: MatchLevel,
}

impl Match {
    /// Distinct shared kinds in kind order.
    pub fn kinds(&self) -> Vec<FeatureKind> {
        let mut kinds: Vec<FeatureKind> = self.shared.iter().map(|f| f.kind).collect();
        kinds.dedup();
        kinds
    }

    /// Match key, e.g. `+NAME+DOB`; empty when nothing is shared.
    pub fn key(&self) -> String {
        self.kinds().iter().map(|k| format!("+{}", k.code())).collect()
    }

    /// Rule that produced the level.
    pub fn rule(&self) -> &'static str {
        let kinds = self.kinds();
        match self.level {
            MatchLevel::Resolved if kinds.iter().any(FeatureKind::is_strong) => "STRONG_ID",
            MatchLevel::Resolved => "NAME_PLUS",
            MatchLevel::PossiblyRelated => "SHARED_ATTRIBUTE",
            MatchLevel::NameOnly => "NAME_ONLY",
            MatchLevel::None => "",
        }
    }

    /// Score used to rank candidates: 100 per shared value.
    pub fn score(&self) -> u32 {
        100 * self.shared.len() as u32
    }
}

/// Compare two sorted feature sets.
pub fn compare(left: &[Feature], right: &[Feature]) -> Match {
    let shared: Vec<Feature> = left
        .iter()
        .filter(|f| right.binary_search(f).is_ok())
        .cloned()
        .collect();

    let has = |pred: fn(&FeatureKind) -> bool| shared.iter().any(|f| pred(&f.kind));
    let name = shared.iter().any(|f| f.kind == FeatureKind::Name);

    let level = if has(FeatureKind::is_strong) || (name && has(FeatureKind::confirms_name)) {
        MatchLevel::Resolved
    } else if shared.iter().any(|f| f.kind != FeatureKind::Name) {
        MatchLevel::PossiblyRelated
    } else if name {
        MatchLevel::NameOnly
    } else {
        MatchLevel::None
    };

    Match { shared, level }
}
