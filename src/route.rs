// 🛷 Route Planner - delivery ranking and route distance
//
// The visit order is the ranking: good_child_count descending, ties keep the
// order the registry returned them in. No permutation search happens here;
// the distance is accumulated over that fixed order.

use serde::Serialize;

use crate::entities::Location;
use crate::error::RegistryError;
use crate::geo::distance_km;
use crate::registry::EntityRegistry;

// ============================================================================
// ROUTE
// ============================================================================

/// One leg between consecutive stops
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Number of locations visited, in ranking order
    pub stops: usize,
    pub segments: Vec<Segment>,
    pub total_distance_km: f64,
}

impl Route {
    pub fn empty() -> Self {
        Route {
            stops: 0,
            segments: Vec::new(),
            total_distance_km: 0.0,
        }
    }
}

/// Order locations for delivery: most good children first.
///
/// `sort_by` is stable, so equal counts keep their incoming order.
pub fn rank(mut locations: Vec<Location>) -> Vec<Location> {
    locations.sort_by(|a, b| b.good_child_count.cmp(&a.good_child_count));
    locations
}

/// Fold the distance over consecutive stops in the given order.
pub fn plan(stops: &[Location]) -> Route {
    let segments: Vec<Segment> = stops
        .windows(2)
        .map(|pair| Segment {
            from: pair[0].name.clone(),
            to: pair[1].name.clone(),
            distance_km: distance_km(pair[0].coordinates, pair[1].coordinates),
        })
        .collect();

    let total_distance_km = segments.iter().map(|s| s.distance_km).sum();

    Route {
        stops: stops.len(),
        segments,
        total_distance_km,
    }
}

// ============================================================================
// PLANNER
// ============================================================================

/// Read-only view over the registry that answers delivery questions.
pub struct RoutePlanner<'a> {
    registry: &'a EntityRegistry,
}

impl<'a> RoutePlanner<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        RoutePlanner { registry }
    }

    pub fn ranked_locations(&self) -> Result<Vec<Location>, RegistryError> {
        Ok(rank(self.registry.list_locations()?))
    }

    pub fn compute_route(&self) -> Result<Route, RegistryError> {
        Ok(plan(&self.ranked_locations()?))
    }
}
