//! `food_search`: paged nearby-restaurant search.

use std::sync::Arc;

use amap::Restaurant;
use async_trait::async_trait;
use pipeline::{Capability, CapabilityError, CapabilityName, StepInput, QUERY_PARAM};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::places::PlaceAroundQuery;
use crate::{to_output, PlacesApi};

/// AMap's top-level 餐饮服务 type.
pub const DEFAULT_TYPES: &str = "050000";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_PAGES: u32 = 5;

#[derive(Debug, Default, Serialize)]
struct SearchOutcome {
    search_results: Vec<Restaurant>,
    error_messages: Vec<String>,
}

pub struct FoodSearchCapability {
    places: Arc<dyn PlacesApi>,
}

impl FoodSearchCapability {
    pub fn new(places: Arc<dyn PlacesApi>) -> Self {
        Self { places }
    }

    /// Builds the search from the step input, applying the fallbacks.
    ///
    /// `None` when neither keywords nor a location can be derived.
    fn query_from(input: &StepInput) -> Option<(PlaceAroundQuery, u32)> {
        let keywords = input.get_str("keywords").or_else(|| input.get_str(QUERY_PARAM))?;
        let location = input.get_str("location").or_else(|| input.get_str("city"))?;
        let offset = input
            .get_u64("offset")
            .map_or(DEFAULT_PAGE_SIZE, |v| v.clamp(1, u64::from(u32::MAX)) as u32);
        let pages = input
            .get_u64("pages")
            .map_or(DEFAULT_PAGES, |v| v.min(u64::from(u32::MAX)) as u32);

        let query = PlaceAroundQuery {
            keywords: keywords.to_owned(),
            location: location.to_owned(),
            types: input.get_str("types").unwrap_or(DEFAULT_TYPES).to_owned(),
            city: input.get_str("city").unwrap_or_default().to_owned(),
            offset,
        };
        Some((query, pages))
    }

    async fn search(&self, query: &PlaceAroundQuery, pages: u32) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();
        let mut collected = Vec::new();
        for page in 1..=pages {
            match self.places.place_around(query, page).await {
                Ok(pois) => {
                    let last_page = pois.len() < query.offset as usize;
                    collected.extend(pois.into_iter().map(Restaurant::from));
                    if last_page {
                        break;
                    }
                }
                Err(err) => {
                    warn!(page, error = %err, "nearby search failed; discarding partial results");
                    outcome.error_messages.push(err.to_string());
                    return outcome;
                }
            }
        }
        info!(
            keywords = %query.keywords,
            count = collected.len(),
            "nearby search finished"
        );
        outcome.search_results = collected;
        outcome
    }
}

#[async_trait]
impl Capability for FoodSearchCapability {
    fn name(&self) -> CapabilityName {
        CapabilityName::FoodSearch
    }

    async fn invoke(&self, input: StepInput) -> Result<Value, CapabilityError> {
        if !self.places.has_api_key() {
            return Err(CapabilityError::failed("GAODE_API_KEY is not set"));
        }

        let Some((query, pages)) = Self::query_from(&input) else {
            warn!("search input lacks keywords or location");
            return to_output(&SearchOutcome {
                search_results: Vec::new(),
                error_messages: vec!["search input must include keywords and location".to_owned()],
            });
        };

        to_output(&self.search(&query, pages).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakePlaces;
    use amap::{AmapError, Poi};
    use pipeline::ErrorType;
    use serde_json::json;

    fn poi(name: &str) -> Poi {
        Poi {
            name: Some(name.to_owned()),
            ..Poi::default()
        }
    }

    fn page(n: usize) -> Result<Vec<Poi>, AmapError> {
        Ok((0..n).map(|i| poi(&format!("r{i}"))).collect())
    }

    fn bound_input() -> StepInput {
        let mut input = StepInput::new();
        input.insert("keywords", json!("川菜"));
        input.insert("city", json!("北京"));
        input.insert("location", json!("116.397128,39.916527"));
        input.insert("types", json!("050102"));
        input.insert("offset", json!(2));
        input.insert(QUERY_PARAM, json!("我在北京想吃川菜"));
        input
    }

    #[tokio::test]
    async fn pages_until_a_short_page() {
        let places = Arc::new(FakePlaces::with_pages(vec![page(2), page(2), page(1), page(2)]));
        let capability = FoodSearchCapability::new(places.clone());

        let out = capability.invoke(bound_input()).await.unwrap();

        assert_eq!(out["search_results"].as_array().unwrap().len(), 5);
        assert_eq!(out["error_messages"], json!([]));
        let queries = places.searches();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].0.types, "050102");
        assert_eq!(queries[2].1, 3);
    }

    #[tokio::test]
    async fn fallbacks_fill_keywords_location_and_types() {
        let places = Arc::new(FakePlaces::with_pages(vec![page(0)]));
        let capability = FoodSearchCapability::new(places.clone());
        let mut input = StepInput::new();
        input.insert(QUERY_PARAM, json!("火锅"));
        input.insert("city", json!("杭州"));
        input.insert("types", Value::Null);

        capability.invoke(input).await.unwrap();

        let (query, _) = &places.searches()[0];
        assert_eq!(query.keywords, "火锅");
        assert_eq!(query.location, "杭州");
        assert_eq!(query.types, DEFAULT_TYPES);
        assert_eq!(query.offset, DEFAULT_PAGE_SIZE);
    }

    #[tokio::test]
    async fn page_failure_discards_collected_results() {
        let places = Arc::new(FakePlaces::with_pages(vec![
            page(2),
            Err(AmapError::Api {
                info: "DAILY_QUERY_OVER_LIMIT".to_owned(),
            }),
        ]));
        let capability = FoodSearchCapability::new(places);

        let out = capability.invoke(bound_input()).await.unwrap();

        assert_eq!(out["search_results"], json!([]));
        assert!(out["error_messages"][0]
            .as_str()
            .unwrap()
            .contains("DAILY_QUERY_OVER_LIMIT"));
    }

    #[tokio::test]
    async fn missing_location_is_a_warning() {
        let capability = FoodSearchCapability::new(Arc::new(FakePlaces::with_pages(vec![])));
        let mut input = StepInput::new();
        input.insert(QUERY_PARAM, json!("火锅"));

        let out = capability.invoke(input).await.unwrap();

        assert_eq!(out["search_results"], json!([]));
        assert_eq!(
            out["error_messages"],
            json!(["search input must include keywords and location"])
        );
    }

    #[tokio::test]
    async fn missing_api_key_fails_the_step() {
        let capability = FoodSearchCapability::new(Arc::new(FakePlaces::without_key()));

        let err = capability.invoke(bound_input()).await.unwrap_err();

        assert_eq!(err.error_type(), ErrorType::ExecutionError);
        assert_eq!(err.to_string(), "GAODE_API_KEY is not set");
    }
}
