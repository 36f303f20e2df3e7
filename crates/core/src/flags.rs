//! Request flags.
//!
//! Every engine call that returns a JSON document accepts an [`EngineFlags`]
//! value selecting which optional sections the engine includes. Flags are a
//! closed set of named options combined with `|`; a raw integer only becomes
//! flags through [`EngineFlags::from_bits`], which rejects bits the table
//! does not name.
//!
//! # Recognized options per call
//!
//! | Call | Options the engine honours |
//! |------|----------------------------|
//! | `add_record`, `delete_record`, `reevaluate_*`, `process_redo_record` | `WITH_INFO` |
//! | `get_entity_by_*`, `get_virtual_entity_by_record_id` | `ENTITY_INCLUDE_*` |
//! | `get_record` | `ENTITY_INCLUDE_RECORD_JSON_DATA`, `ENTITY_INCLUDE_RECORD_FEATURES` |
//! | `get_record_preview` | `ENTITY_INCLUDE_RECORD_FEATURES` |
//! | `find_path_by_*` | `FIND_PATH_*`, `ENTITY_INCLUDE_*` |
//! | `find_network_by_*` | `FIND_NETWORK_INCLUDE_MATCHING_INFO`, `ENTITY_INCLUDE_*` |
//! | `search_by_attributes` | `SEARCH_INCLUDE_*`, `INCLUDE_FEATURE_SCORES`, `ENTITY_INCLUDE_*` |
//! | `why_*`, `how_entity_by_entity_id` | `INCLUDE_FEATURE_SCORES`, `ENTITY_INCLUDE_*` |
//! | `export_*_entity_report` | `EXPORT_INCLUDE_*`, `ENTITY_INCLUDE_*` |
//!
//! Options outside a call's row are accepted and ignored by the engine.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A typed set of engine request options.
///
/// Deserializes from an integer through [`TryFrom<u64>`], so unknown bits
/// are rejected there too.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct EngineFlags(u64);

macro_rules! engine_flags {
    ($($(#[$doc:meta])* $name:ident = $bit:expr;)*) => {
        impl EngineFlags {
            $(
                $(#[$doc])*
                pub const $name: EngineFlags = EngineFlags(1 << $bit);
            )*

            /// Every single named option, in bit order.
            const NAMED: &'static [(&'static str, EngineFlags)] = &[
                $((stringify!($name), EngineFlags::$name),)*
            ];
        }
    };
}

engine_flags! {
    /// Export entities that have more than one record.
    EXPORT_INCLUDE_MULTI_RECORD_ENTITIES = 0;
    /// Export entities that have possibly-related relationships.
    EXPORT_INCLUDE_POSSIBLY_RELATED = 1;
    /// Export entities that have name-only relationships.
    EXPORT_INCLUDE_NAME_ONLY = 2;
    /// Export entities that have a single record.
    EXPORT_INCLUDE_SINGLE_RECORD_ENTITIES = 3;
    /// Include possibly-related relationships on entities.
    ENTITY_INCLUDE_POSSIBLY_RELATED_RELATIONS = 4;
    /// Include name-only relationships on entities.
    ENTITY_INCLUDE_NAME_ONLY_RELATIONS = 5;
    /// Include every feature value of the entity.
    ENTITY_INCLUDE_ALL_FEATURES = 6;
    /// Include one representative value per feature type.
    ENTITY_INCLUDE_REPRESENTATIVE_FEATURES = 7;
    /// Include the best name of the entity.
    ENTITY_INCLUDE_ENTITY_NAME = 8;
    /// Include record counts per data source.
    ENTITY_INCLUDE_RECORD_SUMMARY = 9;
    /// Include the constituent records.
    ENTITY_INCLUDE_RECORD_DATA = 10;
    /// Include the match key that brought each record in.
    ENTITY_INCLUDE_RECORD_MATCHING_INFO = 11;
    /// Include the original JSON of each record.
    ENTITY_INCLUDE_RECORD_JSON_DATA = 12;
    /// Include the features derived from each record.
    ENTITY_INCLUDE_RECORD_FEATURES = 13;
    /// Include the name of related entities.
    ENTITY_INCLUDE_RELATED_ENTITY_NAME = 14;
    /// Include match level and match key of relationships.
    ENTITY_INCLUDE_RELATED_MATCHING_INFO = 15;
    /// Include record counts of related entities.
    ENTITY_INCLUDE_RELATED_RECORD_SUMMARY = 16;
    /// Treat avoided entities as a preference rather than a hard exclusion.
    FIND_PATH_PREFER_EXCLUDE = 17;
    /// Include the links between consecutive path entities.
    FIND_PATH_INCLUDE_MATCHING_INFO = 18;
    /// Include the links between network entities.
    FIND_NETWORK_INCLUDE_MATCHING_INFO = 19;
    /// Include per-feature scores in why, how and search responses.
    INCLUDE_FEATURE_SCORES = 20;
    /// Return search candidates that would resolve.
    SEARCH_INCLUDE_RESOLVED = 21;
    /// Return search candidates that are possibly related.
    SEARCH_INCLUDE_POSSIBLY_RELATED = 22;
    /// Return search candidates that only share a name.
    SEARCH_INCLUDE_NAME_ONLY = 23;
    /// Include candidate statistics in search responses.
    SEARCH_INCLUDE_STATS = 24;
    /// Return the entities affected by a mutation.
    WITH_INFO = 62;
}

impl EngineFlags {
    /// No options.
    pub const NO_FLAGS: EngineFlags = EngineFlags(0);

    // Composite presets

    /// All relationship kinds.
    pub const ENTITY_INCLUDE_ALL_RELATIONS: EngineFlags = EngineFlags(
        Self::ENTITY_INCLUDE_POSSIBLY_RELATED_RELATIONS.0 | Self::ENTITY_INCLUDE_NAME_ONLY_RELATIONS.0,
    );
    /// Single- and multi-record entities.
    pub const EXPORT_INCLUDE_ALL_ENTITIES: EngineFlags = EngineFlags(
        Self::EXPORT_INCLUDE_MULTI_RECORD_ENTITIES.0 | Self::EXPORT_INCLUDE_SINGLE_RECORD_ENTITIES.0,
    );
    /// Entities having any relationship kind.
    pub const EXPORT_INCLUDE_ALL_HAVING_RELATIONSHIPS: EngineFlags = EngineFlags(
        Self::EXPORT_INCLUDE_POSSIBLY_RELATED.0 | Self::EXPORT_INCLUDE_NAME_ONLY.0,
    );
    /// Core sections of a resolved entity.
    pub const ENTITY_CORE_FLAGS: EngineFlags = EngineFlags(
        Self::ENTITY_INCLUDE_REPRESENTATIVE_FEATURES.0
            | Self::ENTITY_INCLUDE_ENTITY_NAME.0
            | Self::ENTITY_INCLUDE_RECORD_SUMMARY.0
            | Self::ENTITY_INCLUDE_RECORD_DATA.0
            | Self::ENTITY_INCLUDE_RECORD_MATCHING_INFO.0,
    );
    /// Default for `get_entity_by_*`.
    pub const ENTITY_DEFAULT_FLAGS: EngineFlags = EngineFlags(
        Self::ENTITY_CORE_FLAGS.0
            | Self::ENTITY_INCLUDE_ALL_RELATIONS.0
            | Self::ENTITY_INCLUDE_RELATED_ENTITY_NAME.0
            | Self::ENTITY_INCLUDE_RELATED_RECORD_SUMMARY.0
            | Self::ENTITY_INCLUDE_RELATED_MATCHING_INFO.0,
    );
    /// Identifiers and relationships only.
    pub const ENTITY_BRIEF_DEFAULT_FLAGS: EngineFlags = EngineFlags(
        Self::ENTITY_INCLUDE_RECORD_MATCHING_INFO.0
            | Self::ENTITY_INCLUDE_ALL_RELATIONS.0
            | Self::ENTITY_INCLUDE_RELATED_MATCHING_INFO.0,
    );
    /// Default for `get_record`.
    pub const RECORD_DEFAULT_FLAGS: EngineFlags =
        EngineFlags(Self::ENTITY_INCLUDE_RECORD_JSON_DATA.0);
    /// Default for `get_record_preview`.
    pub const RECORD_PREVIEW_DEFAULT_FLAGS: EngineFlags =
        EngineFlags(Self::ENTITY_INCLUDE_RECORD_FEATURES.0);
    /// Default for `get_virtual_entity_by_record_id`.
    pub const VIRTUAL_ENTITY_DEFAULT_FLAGS: EngineFlags = Self::ENTITY_CORE_FLAGS;
    /// Default for the export reports.
    pub const EXPORT_DEFAULT_FLAGS: EngineFlags =
        EngineFlags(Self::EXPORT_INCLUDE_ALL_ENTITIES.0 | Self::ENTITY_DEFAULT_FLAGS.0);
    /// Default for `find_path_by_*`.
    pub const FIND_PATH_DEFAULT_FLAGS: EngineFlags = EngineFlags(
        Self::FIND_PATH_INCLUDE_MATCHING_INFO.0
            | Self::ENTITY_INCLUDE_ENTITY_NAME.0
            | Self::ENTITY_INCLUDE_RECORD_SUMMARY.0,
    );
    /// Default for `find_network_by_*`.
    pub const FIND_NETWORK_DEFAULT_FLAGS: EngineFlags = EngineFlags(
        Self::FIND_NETWORK_INCLUDE_MATCHING_INFO.0
            | Self::ENTITY_INCLUDE_ENTITY_NAME.0
            | Self::ENTITY_INCLUDE_RECORD_SUMMARY.0,
    );
    /// Default for `why_entities`.
    pub const WHY_ENTITIES_DEFAULT_FLAGS: EngineFlags =
        EngineFlags(Self::ENTITY_DEFAULT_FLAGS.0 | Self::INCLUDE_FEATURE_SCORES.0);
    /// Default for `why_records`.
    pub const WHY_RECORDS_DEFAULT_FLAGS: EngineFlags = Self::WHY_ENTITIES_DEFAULT_FLAGS;
    /// Default for `why_record_in_entity`.
    pub const WHY_RECORD_IN_ENTITY_DEFAULT_FLAGS: EngineFlags = Self::WHY_ENTITIES_DEFAULT_FLAGS;
    /// Default for `why_search`.
    pub const WHY_SEARCH_DEFAULT_FLAGS: EngineFlags = EngineFlags(
        Self::INCLUDE_FEATURE_SCORES.0
            | Self::SEARCH_INCLUDE_STATS.0
            | Self::ENTITY_INCLUDE_REPRESENTATIVE_FEATURES.0
            | Self::ENTITY_INCLUDE_ENTITY_NAME.0
            | Self::ENTITY_INCLUDE_RECORD_SUMMARY.0,
    );
    /// Default for `how_entity_by_entity_id`.
    pub const HOW_ENTITY_DEFAULT_FLAGS: EngineFlags = Self::INCLUDE_FEATURE_SCORES;
    /// Every search match level.
    pub const SEARCH_BY_ATTRIBUTES_ALL: EngineFlags = EngineFlags(
        Self::SEARCH_INCLUDE_RESOLVED.0
            | Self::SEARCH_INCLUDE_POSSIBLY_RELATED.0
            | Self::SEARCH_INCLUDE_NAME_ONLY.0,
    );
    /// Resolving and possibly-related search candidates.
    pub const SEARCH_BY_ATTRIBUTES_STRONG: EngineFlags = EngineFlags(
        Self::SEARCH_INCLUDE_RESOLVED.0 | Self::SEARCH_INCLUDE_POSSIBLY_RELATED.0,
    );
    /// Default for `search_by_attributes`.
    pub const SEARCH_BY_ATTRIBUTES_DEFAULT_FLAGS: EngineFlags = EngineFlags(
        Self::SEARCH_BY_ATTRIBUTES_ALL.0
            | Self::SEARCH_INCLUDE_STATS.0
            | Self::ENTITY_INCLUDE_REPRESENTATIVE_FEATURES.0
            | Self::ENTITY_INCLUDE_ENTITY_NAME.0
            | Self::ENTITY_INCLUDE_RECORD_SUMMARY.0,
    );

    /// Union of every named option.
    pub const fn all() -> EngineFlags {
        let mut bits = 0;
        let mut i = 0;
        while i < Self::NAMED.len() {
            bits |= Self::NAMED[i].1 .0;
            i += 1;
        }
        EngineFlags(bits)
    }

    /// Raw bitmask as sent to the engine.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Convert a raw bitmask, rejecting bits outside the named table.
    pub fn from_bits(bits: u64) -> Option<EngineFlags> {
        if bits & !Self::all().0 == 0 {
            Some(EngineFlags(bits))
        } else {
            None
        }
    }

    /// Convert a raw bitmask, dropping unknown bits.
    pub const fn from_bits_truncate(bits: u64) -> EngineFlags {
        EngineFlags(bits & Self::all().0)
    }

    /// True if every option in `other` is set.
    pub const fn contains(self, other: EngineFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any option in `other` is set.
    pub const fn intersects(self, other: EngineFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// True if no option is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the single options set, in bit order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
    }

    /// Look up a single or composite option by name.
    pub fn by_name(name: &str) -> Option<EngineFlags> {
        if let Some((_, flag)) = Self::NAMED.iter().find(|(n, _)| *n == name) {
            return Some(*flag);
        }
        let preset = match name {
            "NO_FLAGS" => Self::NO_FLAGS,
            "ENTITY_INCLUDE_ALL_RELATIONS" => Self::ENTITY_INCLUDE_ALL_RELATIONS,
            "EXPORT_INCLUDE_ALL_ENTITIES" => Self::EXPORT_INCLUDE_ALL_ENTITIES,
            "EXPORT_INCLUDE_ALL_HAVING_RELATIONSHIPS" => Self::EXPORT_INCLUDE_ALL_HAVING_RELATIONSHIPS,
            "ENTITY_CORE_FLAGS" => Self::ENTITY_CORE_FLAGS,
            "ENTITY_DEFAULT_FLAGS" => Self::ENTITY_DEFAULT_FLAGS,
            "ENTITY_BRIEF_DEFAULT_FLAGS" => Self::ENTITY_BRIEF_DEFAULT_FLAGS,
            "RECORD_DEFAULT_FLAGS" => Self::RECORD_DEFAULT_FLAGS,
            "RECORD_PREVIEW_DEFAULT_FLAGS" => Self::RECORD_PREVIEW_DEFAULT_FLAGS,
            "VIRTUAL_ENTITY_DEFAULT_FLAGS" => Self::VIRTUAL_ENTITY_DEFAULT_FLAGS,
            "EXPORT_DEFAULT_FLAGS" => Self::EXPORT_DEFAULT_FLAGS,
            "FIND_PATH_DEFAULT_FLAGS" => Self::FIND_PATH_DEFAULT_FLAGS,
            "FIND_NETWORK_DEFAULT_FLAGS" => Self::FIND_NETWORK_DEFAULT_FLAGS,
            "WHY_ENTITIES_DEFAULT_FLAGS" => Self::WHY_ENTITIES_DEFAULT_FLAGS,
            "WHY_RECORDS_DEFAULT_FLAGS" => Self::WHY_RECORDS_DEFAULT_FLAGS,
            "WHY_RECORD_IN_ENTITY_DEFAULT_FLAGS" => Self::WHY_RECORD_IN_ENTITY_DEFAULT_FLAGS,
            "WHY_SEARCH_DEFAULT_FLAGS" => Self::WHY_SEARCH_DEFAULT_FLAGS,
            "HOW_ENTITY_DEFAULT_FLAGS" => Self::HOW_ENTITY_DEFAULT_FLAGS,
            "SEARCH_BY_ATTRIBUTES_ALL" => Self::SEARCH_BY_ATTRIBUTES_ALL,
            "SEARCH_BY_ATTRIBUTES_STRONG" => Self::SEARCH_BY_ATTRIBUTES_STRONG,
            "SEARCH_BY_ATTRIBUTES_DEFAULT_FLAGS" => Self::SEARCH_BY_ATTRIBUTES_DEFAULT_FLAGS,
            _ => return None,
        };
        Some(preset)
    }
}

impl TryFrom<u64> for EngineFlags {
    type Error = Error;

    fn try_from(bits: u64) -> Result<Self, Self::Error> {
        EngineFlags::from_bits(bits).ok_or(Error::InvalidFlags {
            bits: bits & !EngineFlags::all().0,
        })
    }
}

impl From<EngineFlags> for u64 {
    fn from(flags: EngineFlags) -> u64 {
        flags.0
    }
}

impl BitOr for EngineFlags {
    type Output = EngineFlags;

    fn bitor(self, rhs: EngineFlags) -> EngineFlags {
        EngineFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for EngineFlags {
    fn bitor_assign(&mut self, rhs: EngineFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EngineFlags {
    type Output = EngineFlags;

    fn bitand(self, rhs: EngineFlags) -> EngineFlags {
        EngineFlags(self.0 & rhs.0)
    }
}

impl fmt::Display for EngineFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NO_FLAGS");
        }
        let mut first = true;
        for name in self.names() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for EngineFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineFlags({})", self)
    }
}

impl FromStr for EngineFlags {
    type Err = Error;

    /// Parse `NAME | NAME | 0x10 | 32`; every part must be a known name or a
    /// number made only of recognized bits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = EngineFlags::NO_FLAGS;
        for part in s.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(named) = EngineFlags::by_name(part) {
                flags |= named;
                continue;
            }
            let bits = match part.strip_prefix("0x").or_else(|| part.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => part.parse::<u64>(),
            }
            .map_err(|_| Error::invalid_input(format!("unknown flag '{}'", part)))?;
            flags |= EngineFlags::try_from(bits)?;
        }
        Ok(flags)
    }
}
