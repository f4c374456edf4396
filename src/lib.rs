// Santa Route - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod entities;
pub mod error;
pub mod geo;
pub mod import;
pub mod registry;
pub mod route;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use entities::{Behavior, Child, Location, NewChild, NewLocation};
pub use error::RegistryError;
pub use geo::{distance_km, Coordinates};
pub use import::{
    import_child_file, import_children, import_location_file, import_locations, ImportSummary,
};
pub use registry::{CounterDrift, EntityRegistry};
pub use route::{plan, rank, Route, RoutePlanner, Segment};
pub use store::{MemoryStore, SqliteStore, Store, StoreError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
