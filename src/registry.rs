// 📒 Entity Registry - Locations and the children assigned to them
//
// Invariants after every completed operation:
// - no two locations share a name
// - no two children share a name
// - every child's location_id resolves to a location
// - every location's good_child_count equals its number of good children
//
// Uniqueness and the counter are enforced by the store (constraint + atomic
// increment). The registry never reads before writing to decide "duplicate".

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::entities::{Behavior, Child, Location, NewChild, NewLocation};
use crate::error::RegistryError;
use crate::store::{Store, StoreError};

/// A location whose stored counter disagrees with its children
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDrift {
    pub location_id: String,
    pub name: String,
    pub stored: u64,
    pub actual: u64,
}

#[derive(Clone)]
pub struct EntityRegistry {
    store: Arc<dyn Store>,
}

fn required(field: Option<String>, label: &str) -> Result<String, RegistryError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RegistryError::invalid(format!("{} is required", label))),
    }
}

impl EntityRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        EntityRegistry { store }
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Create a location with an empty good-child counter and return its id.
    pub fn create_location(&self, input: NewLocation) -> Result<String, RegistryError> {
        let name = required(input.name, "name")?;
        let coordinates = input
            .coordinates
            .ok_or_else(|| RegistryError::invalid("coordinates are required"))?;

        if !coordinates.is_valid() {
            return Err(RegistryError::invalid(format!(
                "coordinates out of range: lat {} lon {} (expected lat in [-90, 90], lon in [-180, 180])",
                coordinates.lat, coordinates.lon
            )));
        }

        let location = Location::new(name, coordinates);

        match self.store.insert_location(&location) {
            Ok(()) => {
                info!("Created location {} ({})", location.name, location.id);
                Ok(location.id)
            }
            Err(StoreError::ConstraintViolation(detail)) => {
                debug!("Location insert rejected: {}", detail);
                Err(RegistryError::DuplicateName {
                    entity: "Location",
                    name: location.name,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create a child and, when it is good, bump its location's counter in
    /// the same store operation. Returns the child's id.
    pub fn create_child(&self, input: NewChild) -> Result<String, RegistryError> {
        let name = required(input.name, "name")?;
        let behavior_raw = required(input.behavior, "behavior")?;
        let location_id = required(input.location_id, "locationId")?;

        let behavior = behavior_raw
            .parse::<Behavior>()
            .map_err(|e| RegistryError::invalid(e.to_string()))?;

        if self.store.find_location(&location_id)?.is_none() {
            return Err(RegistryError::NotFound {
                entity: "Location",
                id: location_id,
            });
        }

        let child = Child::new(name, behavior, location_id);

        match self.store.insert_child(&child) {
            Ok(()) => {
                info!(
                    "Created {} child {} at location {}",
                    child.behavior, child.name, child.location_id
                );
                Ok(child.id)
            }
            Err(StoreError::ConstraintViolation(detail)) => {
                debug!("Child insert rejected: {}", detail);
                Err(RegistryError::DuplicateName {
                    entity: "Child",
                    name: child.name,
                })
            }
            // Location existed a moment ago; report it the same way
            Err(StoreError::MissingReference(_)) => Err(RegistryError::NotFound {
                entity: "Location",
                id: child.location_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// All children with the given behavior, in storage order
    pub fn list_children(&self, behavior: Behavior) -> Result<Vec<Child>, RegistryError> {
        Ok(self.store.find_children(Some(behavior))?)
    }

    /// All locations, in storage order
    pub fn list_locations(&self) -> Result<Vec<Location>, RegistryError> {
        Ok(self.store.find_locations()?)
    }

    pub fn get_location(&self, id: &str) -> Result<Location, RegistryError> {
        self.store
            .find_location(id)?
            .ok_or_else(|| RegistryError::NotFound {
                entity: "Location",
                id: id.to_string(),
            })
    }

    /// Compare every stored counter with a count derived from the children.
    ///
    /// Read-only: drifted counters are reported, never rewritten.
    pub fn audit_counters(&self) -> Result<Vec<CounterDrift>, RegistryError> {
        let locations = self.store.find_locations()?;
        let good_children = self.store.find_children(Some(Behavior::Good))?;

        let mut actual: HashMap<&str, u64> = HashMap::new();
        for child in &good_children {
            *actual.entry(child.location_id.as_str()).or_insert(0) += 1;
        }

        let drift: Vec<CounterDrift> = locations
            .iter()
            .filter_map(|location| {
                let count = actual.get(location.id.as_str()).copied().unwrap_or(0);
                (count != location.good_child_count).then(|| CounterDrift {
                    location_id: location.id.clone(),
                    name: location.name.clone(),
                    stored: location.good_child_count,
                    actual: count,
                })
            })
            .collect();

        if !drift.is_empty() {
            warn!("{} location counter(s) drifted from their children", drift.len());
        }

        Ok(drift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SqliteStore};

    fn memory_registry() -> EntityRegistry {
        EntityRegistry::new(Arc::new(MemoryStore::new()))
    }

    fn sqlite_registry() -> EntityRegistry {
        EntityRegistry::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    fn registries() -> Vec<EntityRegistry> {
        vec![memory_registry(), sqlite_registry()]
    }

    /// Store whose backend is gone: every call fails
    struct UnreachableStore;

    impl Store for UnreachableStore {
        fn find_location(&self, _id: &str) -> Result<Option<Location>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn insert_location(&self, _location: &Location) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn insert_child(&self, _child: &Child) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn find_locations(&self) -> Result<Vec<Location>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn find_children(&self, _behavior: Option<Behavior>) -> Result<Vec<Child>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_scenario_good_child_counts_at_its_location() {
        for registry in registries() {
            let north = registry.create_location(NewLocation::new("North", 40.0, -3.0)).unwrap();
            let south = registry.create_location(NewLocation::new("South", 39.0, -3.0)).unwrap();

            registry.create_child(NewChild::new("Ana", "good", &north)).unwrap();

            assert_eq!(registry.get_location(&north).unwrap().good_child_count, 1);
            assert_eq!(registry.get_location(&south).unwrap().good_child_count, 0);
        }
    }

    #[test]
    fn test_duplicate_location_name() {
        for registry in registries() {
            registry.create_location(NewLocation::new("Plaza", 10.0, 10.0)).unwrap();
            let err = registry
                .create_location(NewLocation::new("Plaza", 20.0, 20.0))
                .unwrap_err();

            assert_eq!(
                err,
                RegistryError::DuplicateName {
                    entity: "Location",
                    name: "Plaza".to_string()
                }
            );

            let plazas = registry
                .list_locations()
                .unwrap()
                .into_iter()
                .filter(|l| l.name == "Plaza")
                .count();
            assert_eq!(plazas, 1);
        }
    }

    #[test]
    fn test_location_names_are_case_sensitive() {
        let registry = sqlite_registry();
        registry.create_location(NewLocation::new("plaza", 0.0, 0.0)).unwrap();
        registry.create_location(NewLocation::new("Plaza", 0.0, 0.0)).unwrap();
        assert_eq!(registry.list_locations().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_location_input() {
        let registry = memory_registry();

        let missing_name = NewLocation {
            name: None,
            ..NewLocation::new("x", 0.0, 0.0)
        };
        let blank_name = NewLocation::new("   ", 0.0, 0.0);
        let missing_coordinates = NewLocation {
            coordinates: None,
            ..NewLocation::new("x", 0.0, 0.0)
        };

        for input in [
            missing_name,
            blank_name,
            missing_coordinates,
            NewLocation::new("TooNorth", 90.5, 0.0),
            NewLocation::new("TooWest", 0.0, -181.0),
            NewLocation::new("NaN", f64::NAN, 0.0),
        ] {
            let err = registry.create_location(input).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidInput(_)), "got {:?}", err);
        }

        assert!(registry.list_locations().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_child_input() {
        let registry = memory_registry();
        let north = registry.create_location(NewLocation::new("North", 40.0, -3.0)).unwrap();

        for input in [
            NewChild { name: None, ..NewChild::new("x", "good", &north) },
            NewChild { behavior: None, ..NewChild::new("x", "good", &north) },
            NewChild { location_id: None, ..NewChild::new("x", "good", &north) },
            NewChild::new("", "good", &north),
            NewChild::new("Ana", "naughty", &north),
        ] {
            let err = registry.create_child(input).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidInput(_)), "got {:?}", err);
        }

        assert_eq!(registry.get_location(&north).unwrap().good_child_count, 0);
    }

    #[test]
    fn test_child_with_unknown_location() {
        for registry in registries() {
            registry.create_location(NewLocation::new("North", 40.0, -3.0)).unwrap();
            let missing = uuid::Uuid::new_v4().to_string();

            let err = registry.create_child(NewChild::new("Ana", "good", &missing)).unwrap_err();
            assert!(matches!(err, RegistryError::NotFound { .. }), "got {:?}", err);

            assert!(registry.list_children(Behavior::Good).unwrap().is_empty());
            assert!(registry.list_children(Behavior::Bad).unwrap().is_empty());
        }
    }

    #[test]
    fn test_duplicate_child_leaves_counter_alone() {
        for registry in registries() {
            let north = registry.create_location(NewLocation::new("North", 40.0, -3.0)).unwrap();
            let south = registry.create_location(NewLocation::new("South", 39.0, -3.0)).unwrap();

            registry.create_child(NewChild::new("Ana", "good", &north)).unwrap();
            let err = registry.create_child(NewChild::new("Ana", "good", &south)).unwrap_err();

            assert_eq!(
                err,
                RegistryError::DuplicateName {
                    entity: "Child",
                    name: "Ana".to_string()
                }
            );
            assert_eq!(registry.get_location(&north).unwrap().good_child_count, 1);
            assert_eq!(registry.get_location(&south).unwrap().good_child_count, 0);
            assert_eq!(registry.list_children(Behavior::Good).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_list_children_by_behavior() {
        let registry = sqlite_registry();
        let north = registry.create_location(NewLocation::new("North", 40.0, -3.0)).unwrap();

        registry.create_child(NewChild::new("Ana", "good", &north)).unwrap();
        registry.create_child(NewChild::new("Luis", "bad", &north)).unwrap();
        registry.create_child(NewChild::new("Marta", "bueno", &north)).unwrap();

        let good: Vec<String> = registry
            .list_children(Behavior::Good)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        let bad: Vec<String> = registry
            .list_children(Behavior::Bad)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(good, vec!["Ana", "Marta"]);
        assert_eq!(bad, vec!["Luis"]);
        assert_eq!(registry.get_location(&north).unwrap().good_child_count, 2);
    }

    #[test]
    fn test_unreachable_store_surfaces_store_unavailable() {
        let registry = EntityRegistry::new(Arc::new(UnreachableStore));

        for err in [
            registry.list_locations().unwrap_err(),
            registry.list_children(Behavior::Good).unwrap_err(),
            registry.get_location("any").unwrap_err(),
            registry.audit_counters().unwrap_err(),
            registry.create_location(NewLocation::new("North", 40.0, -3.0)).unwrap_err(),
            registry.create_child(NewChild::new("Ana", "good", "any")).unwrap_err(),
        ] {
            assert!(matches!(err, RegistryError::StoreUnavailable(_)), "got {:?}", err);
        }

        // Input is still checked before the store is touched
        let err = registry.create_child(NewChild::new("Ana", "naughty", "any")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput(_)));
    }

    #[test]
    fn test_poisoned_store_surfaces_store_unavailable() {
        let store = MemoryStore::new();
        store.poison();

        let registry = EntityRegistry::new(Arc::new(store));
        assert!(matches!(
            registry.list_locations(),
            Err(RegistryError::StoreUnavailable(_))
        ));
        assert!(matches!(
            registry.create_location(NewLocation::new("North", 40.0, -3.0)),
            Err(RegistryError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_get_location_not_found() {
        let registry = memory_registry();
        let err = registry.get_location("nope").unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotFound {
                entity: "Location",
                id: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_counters_match_children_after_mixed_sequence() {
        for registry in registries() {
            let ids: Vec<String> = ["A", "B", "C"]
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    registry
                        .create_location(NewLocation::new(name, i as f64, i as f64))
                        .unwrap()
                })
                .collect();

            for i in 0..30 {
                let behavior = if i % 3 == 0 { "bad" } else { "good" };
                let location = &ids[i % ids.len()];
                registry
                    .create_child(NewChild::new(&format!("child-{}", i), behavior, location))
                    .unwrap();
                // Duplicates and orphans never touch a counter
                let _ = registry.create_child(NewChild::new(&format!("child-{}", i), "good", location));
                let _ = registry.create_child(NewChild::new(&format!("orphan-{}", i), "good", "missing"));
            }

            assert!(registry.audit_counters().unwrap().is_empty());

            let total: u64 = registry
                .list_locations()
                .unwrap()
                .iter()
                .map(|l| l.good_child_count)
                .sum();
            assert_eq!(total, registry.list_children(Behavior::Good).unwrap().len() as u64);
        }
    }

    #[test]
    fn test_audit_reports_drift() {
        // A store seeded behind the registry's back
        let store = MemoryStore::new();
        let mut seeded = Location::new("Drifted".to_string(), crate::geo::Coordinates::new(0.0, 0.0));
        seeded.good_child_count = 3;
        store.insert_location(&seeded).unwrap();

        let registry = EntityRegistry::new(Arc::new(store));
        let drift = registry.audit_counters().unwrap();

        assert_eq!(
            drift,
            vec![CounterDrift {
                location_id: seeded.id.clone(),
                name: "Drifted".to_string(),
                stored: 3,
                actual: 0,
            }]
        );

        // Reporting does not repair
        assert_eq!(registry.get_location(&seeded.id).unwrap().good_child_count, 3);
    }

    #[test]
    fn test_concurrent_location_creation_single_winner() {
        let registry = sqlite_registry();

        let results: Vec<Result<String, RegistryError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = registry.clone();
                    s.spawn(move || registry.create_location(NewLocation::new("Plaza", 1.0, 1.0)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, RegistryError::DuplicateName { .. })));
        assert_eq!(registry.list_locations().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_good_children_never_lose_increments() {
        for registry in registries() {
            let north = registry.create_location(NewLocation::new("North", 40.0, -3.0)).unwrap();

            std::thread::scope(|s| {
                for t in 0..8 {
                    let registry = registry.clone();
                    let north = north.clone();
                    s.spawn(move || {
                        for i in 0..10 {
                            registry
                                .create_child(NewChild::new(&format!("kid-{}-{}", t, i), "good", &north))
                                .unwrap();
                        }
                    });
                }
            });

            assert_eq!(registry.get_location(&north).unwrap().good_child_count, 80);
            assert!(registry.audit_counters().unwrap().is_empty());
        }
    }
}
