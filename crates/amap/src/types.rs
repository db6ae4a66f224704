//! AMap response shapes.
//!
//! AMap encodes an absent string as an empty JSON array (`[]`) and sometimes
//! as an empty string. Every optional text field here goes through
//! [`lenient_string`], which turns both into `None`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Business extension block on a POI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BizExt {
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cost: Option<String>,
}

/// One POI from `/v3/place/around`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Poi {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tel: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub poi_type: Option<String>,
    /// `[]` when AMap has no extension data.
    #[serde(default, deserialize_with = "lenient_biz_ext")]
    pub biz_ext: BizExt,
}

fn lenient_biz_ext<'de, D>(deserializer: D) -> Result<BizExt, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(BizExt::default()),
    }
}

/// A cleaned-up search hit as exposed to the rest of the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub telephone: Option<String>,
    #[serde(rename = "type")]
    pub restaurant_type: Option<String>,
    pub rating: Option<String>,
    pub cost: Option<String>,
}

impl From<Poi> for Restaurant {
    fn from(poi: Poi) -> Self {
        Self {
            name: poi.name,
            address: poi.address,
            location: poi.location,
            telephone: poi.tel,
            restaurant_type: poi.poi_type,
            rating: poi.biz_ext.rating,
            cost: poi.biz_ext.cost,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub info: Option<String>,
    #[serde(default)]
    pub geocodes: Vec<Geocode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geocode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaceAroundResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub info: Option<String>,
    #[serde(default)]
    pub pois: Vec<Poi>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_array_placeholders_become_none() {
        let poi: Poi = serde_json::from_value(json!({
            "name": "川味小馆",
            "address": [],
            "location": "116.40,39.91",
            "tel": "",
            "type": "餐饮服务;中餐厅;四川菜(川菜)",
            "biz_ext": {"rating": "4.6", "cost": []}
        }))
        .unwrap();

        let restaurant = Restaurant::from(poi);

        assert_eq!(restaurant.name.as_deref(), Some("川味小馆"));
        assert_eq!(restaurant.address, None);
        assert_eq!(restaurant.telephone, None);
        assert_eq!(restaurant.rating.as_deref(), Some("4.6"));
        assert_eq!(restaurant.cost, None);
    }

    #[test]
    fn biz_ext_placeholder_array_is_tolerated() {
        let poi: Poi = serde_json::from_value(json!({"name": "A", "biz_ext": []})).unwrap();
        assert_eq!(poi.biz_ext, BizExt::default());
    }

    #[test]
    fn restaurant_serialises_with_type_key() {
        let restaurant = Restaurant::from(Poi {
            poi_type: Some("餐饮服务".to_owned()),
            ..Poi::default()
        });
        let value = serde_json::to_value(restaurant).unwrap();
        assert_eq!(value["type"], json!("餐饮服务"));
        assert!(value["rating"].is_null());
    }
}
