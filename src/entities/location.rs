// 📍 Location Entity - a delivery stop
//
// "Location name is unique, Location UUID is IDENTITY (never changes)"
//
// The good-child counter is owned by the store: it starts at 0 and only the
// store's atomic increment (run when a good child is created) moves it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

// ============================================================================
// LOCATION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Stable identity (UUID) - NEVER changes
    pub id: String,

    /// Unique across all locations (case-sensitive)
    pub name: String,

    pub coordinates: Coordinates,

    /// Number of good children assigned here
    pub good_child_count: u64,

    pub created_at: DateTime<Utc>,
}

impl Location {
    /// Create a new location with a fresh UUID and an empty counter
    pub fn new(name: String, coordinates: Coordinates) -> Self {
        Location {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            coordinates,
            good_child_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// Create-location request as it arrives from a caller. Every field is
/// optional so that a missing field is reported as invalid input by the
/// registry instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,

    #[serde(default, alias = "coordenadas")]
    pub coordinates: Option<Coordinates>,
}

impl NewLocation {
    pub fn new(name: &str, lat: f64, lon: f64) -> Self {
        NewLocation {
            name: Some(name.to_string()),
            coordinates: Some(Coordinates::new(lat, lon)),
        }
    }
}
