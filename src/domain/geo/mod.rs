//! Geographic primitives and great-circle distance

mod annotator;

pub use annotator::DistanceAnnotator;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A validated latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting non-finite or out-of-range coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(DomainError::invalid_query(
                "coordinates must be finite numbers",
            ));
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::invalid_query(format!(
                "latitude {} is outside [-90, 90]",
                latitude
            )));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::invalid_query(format!(
                "longitude {} is outside [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Unit in which distances are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Miles,
}

impl DistanceUnit {
    /// Mean Earth radius expressed in this unit
    pub fn earth_radius(&self) -> f64 {
        match self {
            Self::Kilometers => 6371.0088,
            Self::Miles => 3958.7613,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kilometers => "km",
            Self::Miles => "mi",
        }
    }
}

/// Haversine great-circle distance between two points
pub fn haversine_distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    // Clamp guards asin against h drifting just above 1.0
    2.0 * unit.earth_radius() * h.sqrt().min(1.0).asin()
}
