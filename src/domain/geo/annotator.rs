//! Attaches distances to candidate records and orders them when asked

use std::cmp::Ordering;

use super::{haversine_distance, DistanceUnit, GeoPoint};
use crate::domain::search::{AnnotatedResult, Listing};

/// Computes per-result distances from the searching user
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceAnnotator {
    unit: DistanceUnit,
}

impl DistanceAnnotator {
    pub fn new(unit: DistanceUnit) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> DistanceUnit {
        self.unit
    }

    /// Annotates records with their distance from `origin`
    ///
    /// Without an origin every distance is `None` and the upstream order is
    /// kept. With `sort_by_distance` the located records come first in
    /// non-decreasing distance; records without coordinates follow in their
    /// upstream order.
    pub fn annotate(
        &self,
        records: Vec<Listing>,
        origin: Option<GeoPoint>,
        sort_by_distance: bool,
    ) -> Vec<AnnotatedResult> {
        let Some(origin) = origin else {
            return records
                .into_iter()
                .map(|record| AnnotatedResult::new(record, None))
                .collect();
        };

        let mut results: Vec<AnnotatedResult> = records
            .into_iter()
            .map(|record| {
                let distance = record
                    .coordinates()
                    .map(|point| haversine_distance(origin, point, self.unit));
                AnnotatedResult::new(record, distance)
            })
            .collect();

        if sort_by_distance {
            // sort_by is stable, so ties keep upstream order
            results.sort_by(|a, b| compare_distance(a.distance, b.distance));
        }

        results
    }
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
