//! Listing records returned by the data store and their annotated form

use serde::{Deserialize, Serialize, Serializer};

use crate::domain::geo::GeoPoint;

/// Distinguishes the two kinds of searchable listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Service,
    Product,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Product => "product",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "product" => Ok(Self::Product),
            other => Err(format!("unknown listing kind '{}'", other)),
        }
    }
}

/// A service or product record as stored upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub kind: ResultKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Listing {
    pub fn new(id: impl Into<String>, kind: ResultKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            description: None,
            categories: Vec::new(),
            verified: false,
            price: None,
            latitude: None,
            longitude: None,
            city: None,
            state: None,
            postal_code: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Stored coordinates, if both halves are present and valid
    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).ok(),
            _ => None,
        }
    }
}

/// A listing plus its distance from the searching user
///
/// `distance` keeps full precision for ordering; it is rounded to one decimal
/// only when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedResult {
    #[serde(flatten)]
    pub record: Listing,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_rounded_distance"
    )]
    pub distance: Option<f64>,
}

impl AnnotatedResult {
    pub fn new(record: Listing, distance: Option<f64>) -> Self {
        Self { record, distance }
    }

    /// Distance rounded to one decimal place
    pub fn display_distance(&self) -> Option<f64> {
        self.distance.map(round_one_decimal)
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn serialize_rounded_distance<S>(distance: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match distance {
        Some(d) => serializer.serialize_some(&round_one_decimal(*d)),
        None => serializer.serialize_none(),
    }
}
