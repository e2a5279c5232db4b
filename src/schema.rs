use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fixed set of fields every input table is normalized onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Date,
    Campaign,
    Impressions,
    Clicks,
    Spend,
    Conversions,
    Revenue,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 7] = [
        CanonicalField::Date,
        CanonicalField::Campaign,
        CanonicalField::Impressions,
        CanonicalField::Clicks,
        CanonicalField::Spend,
        CanonicalField::Conversions,
        CanonicalField::Revenue,
    ];

    pub const REQUIRED: [CanonicalField; 3] = [
        CanonicalField::Impressions,
        CanonicalField::Clicks,
        CanonicalField::Spend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Campaign => "campaign",
            CanonicalField::Impressions => "impressions",
            CanonicalField::Clicks => "clicks",
            CanonicalField::Spend => "spend",
            CanonicalField::Conversions => "conversions",
            CanonicalField::Revenue => "revenue",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            CanonicalField::Impressions | CanonicalField::Clicks | CanonicalField::Spend
        )
    }
}

/// Default alias entries, in declaration order. Order matters: when two
/// fields could claim the same header via substring matching, the earlier
/// entry wins. Exclusion tokens stop derived-metric headers (CTR, rates,
/// per-unit costs) from being claimed as raw fields.
const DEFAULT_ALIASES: &[(CanonicalField, &[&str], &[&str])] = &[
    (CanonicalField::Date, &["date", "day", "week", "month"], &[]),
    (
        CanonicalField::Campaign,
        &["campaign", "campaign name", "ad group", "adset", "ad set"],
        &[],
    ),
    (
        CanonicalField::Impressions,
        &["impressions", "impression", "impr", "views"],
        &[],
    ),
    (
        CanonicalField::Clicks,
        &["clicks", "click", "link clicks", "click_count"],
        &["ctr", "rate", "cost", "per"],
    ),
    (
        CanonicalField::Spend,
        &["spend", "cost", "amount spent", "budget"],
        &["cpc", "cpm", "cpa", "per click", "per mille"],
    ),
    (
        CanonicalField::Conversions,
        &["conversions", "conversion", "purchases", "results"],
        &["rate", "cost", "value", "per"],
    ),
    (
        CanonicalField::Revenue,
        &["revenue", "sales", "conversion value", "purchase value"],
        &[],
    ),
];

#[derive(Debug, Clone)]
struct AliasEntry {
    field: CanonicalField,
    aliases: Vec<String>,
    exclusions: Vec<String>,
}

/// Ordered table mapping canonical fields to their accepted spellings.
/// Built once per run from the static defaults; callers may append
/// site-specific aliases before resolving.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let entries = DEFAULT_ALIASES
            .iter()
            .map(|(field, aliases, exclusions)| AliasEntry {
                field: *field,
                aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
                exclusions: exclusions.iter().map(|x| (*x).to_string()).collect(),
            })
            .collect();
        Self { entries }
    }
}

impl AliasTable {
    /// Append an extra accepted spelling for a canonical field.
    pub fn push_alias(&mut self, field: CanonicalField, alias: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.field == field) {
            entry.aliases.push(alias.trim().to_lowercase());
        }
    }

    /// Resolve input column names to canonical fields.
    ///
    /// Two passes: case-insensitive exact match against the field name and
    /// its aliases, then case-insensitive substring match. Fields are tried
    /// in declaration order and a header claimed by one field is never
    /// re-claimed by another. Fails if any required field stays unresolved.
    pub fn resolve(&self, headers: &[String]) -> Result<ColumnMap> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut claimed = vec![false; headers.len()];
        let mut map: BTreeMap<CanonicalField, String> = BTreeMap::new();

        for entry in &self.entries {
            for (idx, header) in lowered.iter().enumerate() {
                if claimed[idx] {
                    continue;
                }
                if header == entry.field.as_str() || entry.aliases.iter().any(|a| header == a) {
                    claimed[idx] = true;
                    map.insert(entry.field, headers[idx].clone());
                    break;
                }
            }
        }

        for entry in &self.entries {
            if map.contains_key(&entry.field) {
                continue;
            }
            for (idx, header) in lowered.iter().enumerate() {
                if claimed[idx] {
                    continue;
                }
                if entry.exclusions.iter().any(|x| header.contains(x.as_str())) {
                    continue;
                }
                if entry.aliases.iter().any(|a| header.contains(a.as_str())) {
                    claimed[idx] = true;
                    map.insert(entry.field, headers[idx].clone());
                    break;
                }
            }
        }

        let missing: Vec<String> = CanonicalField::REQUIRED
            .iter()
            .filter(|f| !map.contains_key(f))
            .map(|f| f.as_str().to_string())
            .collect();

        if !missing.is_empty() {
            return Err(InsightError::MissingRequiredColumns { missing });
        }

        Ok(ColumnMap { map })
    }
}

/// Resolved mapping from canonical field to source column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    map: BTreeMap<CanonicalField, String>,
}

impl ColumnMap {
    pub fn source(&self, field: CanonicalField) -> Option<&str> {
        self.map.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.map.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.map.iter().map(|(f, s)| (*f, s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
