//! `parse_query`: works out the city and coordinates a request is about.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    strip_code_fences, Capability, CapabilityError, CapabilityName, CompletionRequest,
    LlmProvider, StepInput, QUERY_PARAM,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::prompts::{with_query, PARSE_QUERY_SYSTEM_PROMPT, PARSE_QUERY_USER_PROMPT_TEMPLATE};
use crate::{to_output, PlacesApi};

/// Coordinates used when nothing better is known (central Beijing).
pub const FALLBACK_LOCATION: &str = "116.4074,39.9042";

pub const DEFAULT_CITY: &str = "北京";

const CITY_LOCATIONS: [(&str, &str); 5] = [
    ("北京", "116.397128,39.916527"),
    ("上海", "121.473701,31.230416"),
    ("广州", "113.264385,23.129112"),
    ("深圳", "114.057868,22.543099"),
    ("杭州", "120.15507,30.274085"),
];

fn known_city_location(city: &str) -> Option<&'static str> {
    CITY_LOCATIONS
        .iter()
        .find(|(name, _)| *name == city)
        .map(|(_, location)| *location)
}

/// Where the "device" is when the request names no city.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDefaults {
    pub city: String,
    /// Explicit coordinates; when unset the city's table entry is used.
    pub location: Option<String>,
}

impl Default for LocationDefaults {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_owned(),
            location: None,
        }
    }
}

impl LocationDefaults {
    /// Coordinates for a named city whose geocoding failed.
    fn fallback_for(&self, city: &str) -> String {
        known_city_location(city)
            .map(str::to_owned)
            .or_else(|| self.location.clone())
            .unwrap_or_else(|| FALLBACK_LOCATION.to_owned())
    }

    fn device_location(&self) -> String {
        self.location
            .clone()
            .or_else(|| known_city_location(&self.city).map(str::to_owned))
            .unwrap_or_else(|| FALLBACK_LOCATION.to_owned())
    }
}

#[derive(Debug, Default, Deserialize)]
struct CityGuess {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    location_text: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

/// The step result. Only these keys are visible to later steps.
#[derive(Debug, Default, Serialize)]
struct ParsedLocation {
    city: Option<String>,
    location: Option<String>,
    error_messages: Vec<String>,
}

pub struct ParseQueryCapability {
    oracle: Arc<dyn LlmProvider>,
    places: Arc<dyn PlacesApi>,
    defaults: LocationDefaults,
}

impl ParseQueryCapability {
    pub fn new(
        oracle: Arc<dyn LlmProvider>,
        places: Arc<dyn PlacesApi>,
        defaults: LocationDefaults,
    ) -> Self {
        Self {
            oracle,
            places,
            defaults,
        }
    }

    async fn ask_oracle(&self, query: &str) -> Result<CityGuess, String> {
        let request = CompletionRequest::deterministic(
            PARSE_QUERY_SYSTEM_PROMPT,
            with_query(PARSE_QUERY_USER_PROMPT_TEMPLATE, query),
        );
        let text = self
            .oracle
            .complete(request)
            .await
            .map_err(|e| format!("query parsing failed: {e}"))?;
        serde_json::from_str(strip_code_fences(&text))
            .map_err(|e| format!("oracle returned invalid JSON: {e}"))
    }

    async fn geocode(&self, address: &str, city: &str) -> Option<String> {
        if !self.places.has_api_key() {
            debug!("no AMap key; skipping geocoding");
            return None;
        }
        match self.places.geocode(address, Some(city)).await {
            Ok(location) => location,
            Err(err) => {
                warn!(address, city, error = %err, "geocoding failed");
                None
            }
        }
    }

    async fn resolve(&self, query: &str) -> ParsedLocation {
        let mut out = ParsedLocation::default();
        if query.is_empty() {
            out.error_messages
                .push("query must not be empty".to_owned());
            return out;
        }

        let guess = match self.ask_oracle(query).await {
            Ok(guess) => guess,
            Err(message) => {
                warn!(%message, "city extraction failed");
                out.error_messages.push(message);
                return out;
            }
        };

        match guess.city.filter(|c| !c.trim().is_empty()) {
            Some(city) => {
                let location_text = guess
                    .location_text
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| city.clone());
                let location = match self.geocode(&location_text, &city).await {
                    Some(location) => location,
                    None => self.defaults.fallback_for(&city),
                };
                info!(
                    %city,
                    %location,
                    %location_text,
                    confidence = ?guess.confidence,
                    reason = ?guess.reason,
                    "city taken from request"
                );
                out.city = Some(city);
                out.location = Some(location);
            }
            None => {
                let city = self.defaults.city.clone();
                let location = self.defaults.device_location();
                info!(%city, %location, "no city in request; using device location");
                out.city = Some(city);
                out.location = Some(location);
            }
        }
        out
    }
}

#[async_trait]
impl Capability for ParseQueryCapability {
    fn name(&self) -> CapabilityName {
        CapabilityName::ParseQuery
    }

    async fn invoke(&self, input: StepInput) -> Result<Value, CapabilityError> {
        let query = input.get_str(QUERY_PARAM).map(str::trim).unwrap_or_default();
        let parsed = self.resolve(query).await;
        to_output(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePlaces, ScriptedOracle};
    use amap::AmapError;
    use serde_json::json;

    fn input(query: &str) -> StepInput {
        let mut input = StepInput::new();
        input.insert(QUERY_PARAM, json!(query));
        input
    }

    fn capability(reply: &str, places: FakePlaces) -> ParseQueryCapability {
        ParseQueryCapability::new(
            ScriptedOracle::replying(reply),
            Arc::new(places),
            LocationDefaults::default(),
        )
    }

    #[tokio::test]
    async fn geocoded_location_is_preferred() {
        let places = FakePlaces::with_geocode(Ok(Some("116.455,39.937".to_owned())));
        let capability = capability(
            r#"{"city":"北京","location_text":"北京三里屯","confidence":0.95,"reason":"explicit"}"#,
            places,
        );

        let out = capability.invoke(input("我在北京三里屯想吃川菜")).await.unwrap();

        assert_eq!(out["city"], json!("北京"));
        assert_eq!(out["location"], json!("116.455,39.937"));
        assert_eq!(out["error_messages"], json!([]));
        let mut keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["city", "error_messages", "location"]);
    }

    #[tokio::test]
    async fn failed_geocoding_falls_back_to_city_table() {
        let places = FakePlaces::with_geocode(Err(AmapError::Http("timeout".to_owned())));
        let capability = capability(r#"{"city":"上海","confidence":0.9}"#, places);

        let out = capability.invoke(input("上海有什么好吃的")).await.unwrap();

        assert_eq!(out["city"], json!("上海"));
        assert_eq!(out["location"], json!("121.473701,31.230416"));
    }

    #[tokio::test]
    async fn unknown_city_without_geocoding_uses_fallback_location() {
        let capability = capability(r#"{"city":"成都"}"#, FakePlaces::without_key());

        let out = capability.invoke(input("成都火锅")).await.unwrap();

        assert_eq!(out["city"], json!("成都"));
        assert_eq!(out["location"], json!(FALLBACK_LOCATION));
    }

    #[tokio::test]
    async fn no_city_uses_device_defaults() {
        let capability = capability(
            "```json\n{\"city\": null, \"confidence\": 0}\n```",
            FakePlaces::without_key(),
        );

        let out = capability.invoke(input("想吃火锅")).await.unwrap();

        assert_eq!(out["city"], json!("北京"));
        assert_eq!(out["location"], json!("116.397128,39.916527"));
        assert_eq!(out["error_messages"], json!([]));
    }

    #[tokio::test]
    async fn empty_query_is_a_warning_not_a_failure() {
        let capability = capability("{}", FakePlaces::without_key());

        let out = capability.invoke(input("   ")).await.unwrap();

        assert!(out["city"].is_null());
        assert!(out["location"].is_null());
        assert_eq!(out["error_messages"], json!(["query must not be empty"]));
    }

    #[tokio::test]
    async fn invalid_oracle_json_is_a_warning() {
        let capability = capability("Beijing, probably", FakePlaces::without_key());

        let out = capability.invoke(input("北京烤鸭")).await.unwrap();

        assert!(out["city"].is_null());
        let warnings = out["error_messages"].as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].as_str().unwrap().contains("invalid JSON"));
    }

    #[test]
    fn explicit_default_location_wins_for_device() {
        let defaults = LocationDefaults {
            city: "杭州".to_owned(),
            location: Some("120.0,30.0".to_owned()),
        };
        assert_eq!(defaults.device_location(), "120.0,30.0");
        assert_eq!(LocationDefaults::default().fallback_for("深圳"), "114.057868,22.543099");
    }
}
