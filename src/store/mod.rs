//! Document store boundary.
//!
//! The registry never talks to a database directly; it is handed an
//! `Arc<dyn Store>` and relies on these guarantees:
//!
//! - `insert_location` / `insert_child` reject a duplicate `name` with
//!   [`StoreError::ConstraintViolation`], decided by the store itself so that two
//!   concurrent writers cannot both win.
//! - `insert_child` increments the referenced location's `good_child_count`
//!   in the same unit of work when the child is good. Either both effects are
//!   applied or neither is.
//! - A write that returned `Ok` is visible to every read issued afterwards.
//! - Listings come back in insertion order.

use thiserror::Error;

use crate::entities::{Behavior, Child, Location};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The referenced document does not exist
    #[error("Missing reference: {0}")]
    MissingReference(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub trait Store: Send + Sync {
    /// findOne(locations, {id})
    fn find_location(&self, id: &str) -> Result<Option<Location>, StoreError>;

    /// insertOne(locations)
    fn insert_location(&self, location: &Location) -> Result<(), StoreError>;

    /// insertOne(children), plus updateOne(locations, {increment goodChildCount})
    /// for a good child, atomically.
    fn insert_child(&self, child: &Child) -> Result<(), StoreError>;

    /// findAll(locations)
    fn find_locations(&self) -> Result<Vec<Location>, StoreError>;

    /// findAll(children, {behavior}); `None` returns every child
    fn find_children(&self, behavior: Option<Behavior>) -> Result<Vec<Child>, StoreError>;
}
