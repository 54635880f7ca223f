//! Search request types

use serde::{Deserialize, Serialize};

use super::listing::ResultKind;

/// Where the caller is searching from
///
/// Coordinates enable distance annotation; the postal code and city/state
/// fields are a coarser fallback that only narrows the candidate set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl UserLocation {
    /// Location from a latitude/longitude pair
    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Default::default()
        }
    }

    /// Location from a postal code only
    pub fn postal_code(code: impl Into<String>) -> Self {
        Self {
            postal_code: Some(code.into()),
            ..Default::default()
        }
    }

    /// Location from a city and state only
    pub fn city_state(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            state: Some(state.into()),
            ..Default::default()
        }
    }
}

/// A raw search request as received from the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Free-text term, may be empty
    pub term: String,
    /// Category tags; order and casing are irrelevant
    pub categories: Vec<String>,
    pub verified_only: bool,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Restricts results to services or products
    pub kind: Option<ResultKind>,
    pub location: Option<UserLocation>,
    /// Only honoured when the location carries coordinates
    pub sort_by_distance: bool,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_kind(mut self, kind: ResultKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_location(mut self, location: UserLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn verified_only(mut self) -> Self {
        self.verified_only = true;
        self
    }

    pub fn sorted_by_distance(mut self) -> Self {
        self.sort_by_distance = true;
        self
    }
}
