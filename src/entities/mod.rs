// Entity Models
//
// Each entity has:
// - Stable identity (UUID) that NEVER changes
// - A unique name
// - No update or delete path: entities are created once

pub mod child;
pub mod location;

pub use child::{Behavior, Child, NewChild, UnknownBehavior};
pub use location::{Location, NewLocation};
