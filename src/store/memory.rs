use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Store, StoreError};
use crate::entities::{Behavior, Child, Location};

/// In-process store holding both collections in memory.
///
/// Writes to the children collection take the locations lock first and the
/// children lock second, so the uniqueness check, the insert and the counter
/// increment happen as one step with respect to every other writer.
#[derive(Default, Clone)]
pub struct MemoryStore {
    locations: Arc<RwLock<Vec<Location>>>,
    children: Arc<RwLock<Vec<Child>>>,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_locations(&self) -> Result<RwLockReadGuard<'_, Vec<Location>>, StoreError> {
        self.locations.read().map_err(|_| poisoned())
    }

    fn write_locations(&self) -> Result<RwLockWriteGuard<'_, Vec<Location>>, StoreError> {
        self.locations.write().map_err(|_| poisoned())
    }

    fn read_children(&self) -> Result<RwLockReadGuard<'_, Vec<Child>>, StoreError> {
        self.children.read().map_err(|_| poisoned())
    }

    fn write_children(&self) -> Result<RwLockWriteGuard<'_, Vec<Child>>, StoreError> {
        self.children.write().map_err(|_| poisoned())
    }
}

impl Store for MemoryStore {
    fn find_location(&self, id: &str) -> Result<Option<Location>, StoreError> {
        let locations = self.read_locations()?;
        Ok(locations.iter().find(|l| l.id == id).cloned())
    }

    fn insert_location(&self, location: &Location) -> Result<(), StoreError> {
        let mut locations = self.write_locations()?;

        if locations.iter().any(|l| l.name == location.name) {
            return Err(StoreError::ConstraintViolation(format!(
                "locations.name = {}",
                location.name
            )));
        }

        locations.push(location.clone());
        Ok(())
    }

    fn insert_child(&self, child: &Child) -> Result<(), StoreError> {
        let mut locations = self.write_locations()?;
        let mut children = self.write_children()?;

        let location = locations
            .iter_mut()
            .find(|l| l.id == child.location_id)
            .ok_or_else(|| StoreError::MissingReference(child.location_id.clone()))?;

        if children.iter().any(|c| c.name == child.name) {
            return Err(StoreError::ConstraintViolation(format!(
                "children.name = {}",
                child.name
            )));
        }

        if child.behavior.is_good() {
            location.good_child_count += 1;
        }
        children.push(child.clone());

        Ok(())
    }

    fn find_locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.read_locations()?.clone())
    }

    fn find_children(&self, behavior: Option<Behavior>) -> Result<Vec<Child>, StoreError> {
        let children = self.read_children()?;
        Ok(children
            .iter()
            .filter(|c| behavior.map_or(true, |b| c.behavior == b))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Panic while holding both write locks, leaving them poisoned
    pub(crate) fn poison(&self) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _locations = self.locations.write().unwrap();
            let _children = self.children.write().unwrap();
            panic!("writer died mid-update");
        }));
        assert!(result.is_err());
    }
}
