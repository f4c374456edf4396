// 🧒 Child Entity - assigned to exactly one Location
//
// Relationship: location_id → Location entity (foreign key, must resolve at
// creation time). Nothing about a child changes after it is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// BEHAVIOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Good,
    Bad,
}

impl Behavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Behavior::Good => "good",
            Behavior::Bad => "bad",
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, Behavior::Good)
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown behavior '{0}', expected 'good' or 'bad'")]
pub struct UnknownBehavior(pub String);

impl FromStr for Behavior {
    type Err = UnknownBehavior;

    /// Accepts "good"/"bad" in any case, plus the Spanish "bueno"/"malo"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "good" | "bueno" => Ok(Behavior::Good),
            "bad" | "malo" => Ok(Behavior::Bad),
            _ => Err(UnknownBehavior(s.to_string())),
        }
    }
}

// ============================================================================
// CHILD ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    /// Stable identity (UUID) - NEVER changes
    pub id: String,

    /// Unique across all children
    pub name: String,

    pub behavior: Behavior,

    /// Location ID (foreign key to Location entity)
    pub location_id: String,

    pub created_at: DateTime<Utc>,
}

impl Child {
    pub fn new(name: String, behavior: Behavior, location_id: String) -> Self {
        Child {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            behavior,
            location_id,
            created_at: Utc::now(),
        }
    }
}

/// Create-child request as it arrives from a caller. Behavior stays textual
/// here; the registry decides whether it is one of the known values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChild {
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,

    #[serde(default, alias = "comportamiento")]
    pub behavior: Option<String>,

    #[serde(default, alias = "ubicacion", alias = "location")]
    pub location_id: Option<String>,
}

impl NewChild {
    pub fn new(name: &str, behavior: &str, location_id: &str) -> Self {
        NewChild {
            name: Some(name.to_string()),
            behavior: Some(behavior.to_string()),
            location_id: Some(location_id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_behavior_parsing() {
        assert_eq!("good".parse::<Behavior>(), Ok(Behavior::Good));
        assert_eq!("BAD".parse::<Behavior>(), Ok(Behavior::Bad));
        assert_eq!(" Good ".parse::<Behavior>(), Ok(Behavior::Good));
        assert_eq!("bueno".parse::<Behavior>(), Ok(Behavior::Good));
        assert_eq!("malo".parse::<Behavior>(), Ok(Behavior::Bad));

        let err = "naughty".parse::<Behavior>().unwrap_err();
        assert_eq!(err, UnknownBehavior("naughty".to_string()));
        assert_eq!(
            err.to_string(),
            "unknown behavior 'naughty', expected 'good' or 'bad'"
        );

        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn test_behavior_serialization() {
        assert_eq!(serde_json::to_string(&Behavior::Good).unwrap(), "\"good\"");
        assert_eq!(Behavior::Bad.to_string(), "bad");
        assert!(Behavior::Good.is_good());
        assert!(!Behavior::Bad.is_good());
    }

    #[test]
    fn test_child_creation() {
        let location_id = uuid::Uuid::new_v4().to_string();
        let child = Child::new("Ana".to_string(), Behavior::Good, location_id.clone());

        assert!(!child.id.is_empty());
        assert_eq!(child.name, "Ana");
        assert_eq!(child.location_id, location_id);

        let json = serde_json::to_value(&child).unwrap();
        assert_eq!(json["locationId"], location_id.as_str());
        assert_eq!(json["behavior"], "good");
    }

    #[test]
    fn test_new_child_aliases() {
        let req: NewChild = serde_json::from_str(
            r#"{"nombre": "Ana", "comportamiento": "bueno", "ubicacion": "abc"}"#,
        )
        .unwrap();

        assert_eq!(req.name.as_deref(), Some("Ana"));
        assert_eq!(req.behavior.as_deref(), Some("bueno"));
        assert_eq!(req.location_id.as_deref(), Some("abc"));
    }
}
