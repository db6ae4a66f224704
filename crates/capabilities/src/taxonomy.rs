//! Restaurant taxonomy: maps a dining scenario to an AMap POI type code.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const EMBEDDED_TAXONOMY: &str = include_str!("../data/restaurant_taxonomy.json");

/// One category of the AMap 餐饮服务 classification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxonomyEntry {
    pub medium_category: String,
    #[serde(default)]
    pub small_category: Option<String>,
    /// AMap `types` code.
    #[serde(rename = "type")]
    pub type_code: String,
}

impl TaxonomyEntry {
    fn categories(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.medium_category.as_str())
            .chain(self.small_category.as_deref())
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("taxonomy is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Keyed `medium-small` category table.
///
/// Entries are consulted in the order they appear in the source JSON, so a
/// containment match prefers the entry listed first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Taxonomy {
    entries: Vec<(String, TaxonomyEntry)>,
}

impl<'de> Deserialize<'de> for Taxonomy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TaxonomyVisitor)
    }
}

struct TaxonomyVisitor;

impl<'de> Visitor<'de> for TaxonomyVisitor {
    type Value = Taxonomy;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of taxonomy entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Taxonomy, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, TaxonomyEntry>()? {
            entries.push(entry);
        }
        Ok(Taxonomy { entries })
    }
}

impl Taxonomy {
    /// The table compiled into the binary.
    pub fn embedded() -> Result<Self, TaxonomyError> {
        Self::from_json(EMBEDDED_TAXONOMY)
    }

    pub fn from_json(text: &str) -> Result<Self, TaxonomyError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let text = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the type code for `scenario`.
    ///
    /// Tried in order, first hit wins:
    /// 1. the exact composite key;
    /// 2. an exact medium or small category;
    /// 3. containment of the scenario in a category, or of a category in the
    ///    scenario.
    pub fn type_for(&self, scenario: &str) -> Option<&str> {
        let scenario = scenario.trim();
        if scenario.is_empty() {
            return None;
        }

        if let Some((_, entry)) = self.entries.iter().find(|(key, _)| key == scenario) {
            return Some(&entry.type_code);
        }

        let mut entries = self.entries.iter().map(|(_, entry)| entry);
        entries
            .clone()
            .find(|entry| entry.categories().any(|c| c == scenario))
            .or_else(|| {
                entries.find(|entry| {
                    entry
                        .categories()
                        .any(|c| c.contains(scenario) || scenario.contains(c))
                })
            })
            .map(|entry| entry.type_code.as_str())
    }
}
