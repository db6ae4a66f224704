//! The AMap operations the task units depend on.

use amap::{AmapClient, AmapError, Poi};
use async_trait::async_trait;

pub use amap::PlaceAroundQuery;

/// Geocoding and nearby search, as used by `parse_query` and `food_search`.
#[async_trait]
pub trait PlacesApi: Send + Sync {
    fn has_api_key(&self) -> bool;

    async fn geocode(&self, address: &str, city: Option<&str>)
        -> Result<Option<String>, AmapError>;

    async fn place_around(&self, query: &PlaceAroundQuery, page: u32)
        -> Result<Vec<Poi>, AmapError>;
}

#[async_trait]
impl PlacesApi for AmapClient {
    fn has_api_key(&self) -> bool {
        AmapClient::has_api_key(self)
    }

    async fn geocode(
        &self,
        address: &str,
        city: Option<&str>,
    ) -> Result<Option<String>, AmapError> {
        AmapClient::geocode(self, address, city).await
    }

    async fn place_around(
        &self,
        query: &PlaceAroundQuery,
        page: u32,
    ) -> Result<Vec<Poi>, AmapError> {
        AmapClient::place_around(self, query, page).await
    }
}
