//! HTTP client for the AMap web-service API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{GeocodeResponse, PlaceAroundResponse};
use crate::{AmapError, Poi};

/// Production AMap web-service host.
pub const DEFAULT_BASE_URL: &str = "https://restapi.amap.com";

const GEOCODE_PATH: &str = "/v3/geocode/geo";
const PLACE_AROUND_PATH: &str = "/v3/place/around";
const SUCCESS_STATUS: &str = "1";

/// Connection settings for [`AmapClient`].
#[derive(Debug, Clone)]
pub struct AmapConfig {
    pub base_url: String,
    /// Web-service key. Calls fail with [`AmapError::MissingApiKey`] when absent.
    pub api_key: Option<String>,
    pub geocode_timeout: Duration,
    pub search_timeout: Duration,
}

impl AmapConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.filter(|key| !key.is_empty()),
            geocode_timeout: Duration::from_secs(5),
            search_timeout: Duration::from_secs(10),
        }
    }
}

/// Parameters of one `/v3/place/around` search.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceAroundQuery {
    pub keywords: String,
    /// Centre point as `"lng,lat"`.
    pub location: String,
    pub types: String,
    pub city: String,
    /// Page size.
    pub offset: u32,
}

impl PlaceAroundQuery {
    fn params(&self, key: &str, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("key", key.to_owned()),
            ("keywords", self.keywords.clone()),
            ("location", self.location.clone()),
            ("types", self.types.clone()),
            ("city", self.city.clone()),
            ("citylimit", "true".to_owned()),
            ("offset", self.offset.to_string()),
            ("page", page.to_string()),
            ("extensions", "all".to_owned()),
        ]
    }
}

/// Thin client over the two AMap endpoints the agent uses.
#[derive(Debug, Clone)]
pub struct AmapClient {
    http: reqwest::Client,
    config: AmapConfig,
}

impl AmapClient {
    pub fn new(config: AmapConfig) -> Result<Self, AmapError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(AmapError::from_reqwest)?;
        Ok(Self { http, config })
    }

    /// Returns `true` when a key is configured.
    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, AmapError> {
        self.config.api_key.as_deref().ok_or(AmapError::MissingApiKey)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, AmapError> {
        let response = self
            .http
            .get(self.url(path))
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(AmapError::from_reqwest)?
            .error_for_status()
            .map_err(AmapError::from_reqwest)?;
        let body = response.text().await.map_err(AmapError::from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| AmapError::InvalidResponse(e.to_string()))
    }

    /// Resolves `address` to `"lng,lat"`.
    ///
    /// `Ok(None)` means AMap answered but found nothing usable.
    pub async fn geocode(
        &self,
        address: &str,
        city: Option<&str>,
    ) -> Result<Option<String>, AmapError> {
        let mut params = vec![
            ("key", self.api_key()?.to_owned()),
            ("address", address.to_owned()),
        ];
        if let Some(city) = city.filter(|c| !c.is_empty()) {
            params.push(("city", city.to_owned()));
        }

        debug!(address, city, "geocoding");
        let response: GeocodeResponse = self
            .get(GEOCODE_PATH, &params, self.config.geocode_timeout)
            .await?;
        Ok(geocode_location(response))
    }

    /// Fetches one page (1-based) of nearby POIs.
    pub async fn place_around(
        &self,
        query: &PlaceAroundQuery,
        page: u32,
    ) -> Result<Vec<Poi>, AmapError> {
        let params = query.params(self.api_key()?, page);
        debug!(
            keywords = %query.keywords,
            location = %query.location,
            types = %query.types,
            page,
            "searching nearby POIs"
        );
        let response: PlaceAroundResponse = self
            .get(PLACE_AROUND_PATH, &params, self.config.search_timeout)
            .await?;
        place_around_pois(response)
    }
}

fn geocode_location(response: GeocodeResponse) -> Option<String> {
    if response.status != SUCCESS_STATUS {
        warn!(info = ?response.info, "geocoding rejected");
        return None;
    }
    response.geocodes.into_iter().next().and_then(|g| g.location)
}

fn place_around_pois(response: PlaceAroundResponse) -> Result<Vec<Poi>, AmapError> {
    if response.status != SUCCESS_STATUS {
        return Err(AmapError::Api {
            info: response
                .info
                .unwrap_or_else(|| "unknown AMap business error".to_owned()),
        });
    }
    Ok(response.pois)
}
