//! The closed capability catalog.
//!
//! [`CapabilityName`] enumerates every task unit the engine knows about; the
//! oracle may only name these. [`CapabilityCatalog`] binds the names that are
//! actually available in a deployment to their implementations.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Capability, CapabilityError, StepInput};

/// Name of a task unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityName {
    /// Resolves the city and coordinates the user is asking about.
    ParseQuery,
    /// Classifies the dining scenario and maps it to an AMap type code.
    ScenarioClassifier,
    /// Searches nearby restaurants.
    FoodSearch,
}

impl CapabilityName {
    /// Every known capability, in catalog order.
    pub const ALL: [CapabilityName; 3] = [
        CapabilityName::ParseQuery,
        CapabilityName::ScenarioClassifier,
        CapabilityName::FoodSearch,
    ];

    /// The exact key the oracle must use.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseQuery => "parse_query",
            Self::ScenarioClassifier => "scenario_classifier",
            Self::FoodSearch => "food_search",
        }
    }

    /// Catalog description shown to the oracle.
    pub fn description(self) -> &'static str {
        match self {
            Self::ParseQuery => {
                "resolve the city mentioned in the query and its coordinates; falls back to the device location; outputs city, location"
            }
            Self::ScenarioClassifier => {
                "identify the dining scenario in the query and map it to an AMap POI type code; outputs scenario, types"
            }
            Self::FoodSearch => {
                "search nearby restaurants through AMap; inputs keywords, city, location (lng,lat), types; outputs search_results"
            }
        }
    }

    /// Looks a name up by its catalog key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Registry of available task units, keyed by [`CapabilityName`].
#[derive(Clone, Default)]
pub struct CapabilityCatalog {
    entries: BTreeMap<CapabilityName, Arc<dyn Capability>>,
}

impl CapabilityCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `capability` under its own name, replacing any earlier entry.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.entries.insert(capability.name(), capability);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.register(capability);
        self
    }

    /// Returns `true` if `name` has an implementation.
    pub fn contains(&self, name: CapabilityName) -> bool {
        self.entries.contains_key(&name)
    }

    /// Registered names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = CapabilityName> + '_ {
        self.entries.keys().copied()
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `- name: description` line per registered capability.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for name in self.names() {
            let _ = writeln!(out, "- {}: {}", name, name.description());
        }
        out.truncate(out.trim_end().len());
        out
    }

    /// Invokes the capability registered under `name`.
    pub async fn dispatch(
        &self,
        name: CapabilityName,
        input: StepInput,
    ) -> Result<Value, CapabilityError> {
        let capability = self
            .entries
            .get(&name)
            .ok_or(CapabilityError::UnknownCapability { name })?;
        capability.invoke(input).await
    }
}

impl std::fmt::Debug for CapabilityCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityCatalog")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
