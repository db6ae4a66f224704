//! Task units of the restaurant recommendation agent.
//!
//! Each unit implements [`pipeline::Capability`] and always answers with a
//! JSON object carrying an `error_messages` list of non-fatal warnings:
//!
//! | Unit | Output |
//! |------|--------|
//! | [`ParseQueryCapability`] | `city`, `location` (`"lng,lat"`) |
//! | [`ScenarioClassifierCapability`] | `scenario`, `types` (AMap type code) |
//! | [`FoodSearchCapability`] | `search_results` |
//!
//! Only a missing AMap key in `food_search` is raised as a failure; every
//! other problem is reported through `error_messages`.

use std::sync::Arc;

use pipeline::{CapabilityCatalog, CapabilityError, LlmProvider};
use serde::Serialize;
use serde_json::Value;

pub mod food_search;
pub mod parse_query;
pub mod places;
pub mod prompts;
pub mod scenario_classifier;
pub mod taxonomy;

#[cfg(test)]
mod test_support;

pub use food_search::FoodSearchCapability;
pub use parse_query::{LocationDefaults, ParseQueryCapability};
pub use places::PlacesApi;
pub use scenario_classifier::ScenarioClassifierCapability;
pub use taxonomy::{Taxonomy, TaxonomyEntry, TaxonomyError};

pub(crate) fn to_output<T: Serialize>(value: &T) -> Result<Value, CapabilityError> {
    serde_json::to_value(value).map_err(|e| CapabilityError::MalformedOutput {
        message: e.to_string(),
    })
}

/// Registers all three task units.
pub fn restaurant_catalog(
    oracle: Arc<dyn LlmProvider>,
    places: Arc<dyn PlacesApi>,
    taxonomy: Arc<Taxonomy>,
    defaults: LocationDefaults,
) -> CapabilityCatalog {
    CapabilityCatalog::new()
        .with(Arc::new(ParseQueryCapability::new(
            oracle.clone(),
            places.clone(),
            defaults,
        )))
        .with(Arc::new(ScenarioClassifierCapability::new(oracle, taxonomy)))
        .with(Arc::new(FoodSearchCapability::new(places)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePlaces, ScriptedOracle};
    use pipeline::CapabilityName;

    #[test]
    fn catalog_registers_every_unit() {
        let catalog = restaurant_catalog(
            ScriptedOracle::replying("{}"),
            Arc::new(FakePlaces::without_key()),
            Arc::new(Taxonomy::default()),
            LocationDefaults::default(),
        );
        for name in CapabilityName::ALL {
            assert!(catalog.contains(name), "{name} missing");
        }
    }
}
