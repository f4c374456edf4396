// Seed import - CSV → registry
//
// Every row goes through the registry, so the same validation, uniqueness and
// counter rules apply as for requests. Rows whose name already exists are
// skipped and counted, which makes re-running an import harmless.
//
// locations.csv: name,lat,lon
// children.csv:  name,behavior,location   (location is the location's NAME)

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::entities::{Behavior, NewChild, NewLocation};
use crate::error::RegistryError;
use crate::registry::EntityRegistry;

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildRecord {
    pub name: String,
    pub behavior: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

fn read_records<T, R>(reader: R, what: &str) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        // +2: header line and 1-based numbering
        let record: T = result.with_context(|| format!("Failed to parse {} row {}", what, i + 2))?;
        records.push(record);
    }

    Ok(records)
}

pub fn load_locations<R: Read>(reader: R) -> Result<Vec<LocationRecord>> {
    read_records(reader, "location")
}

pub fn load_children<R: Read>(reader: R) -> Result<Vec<ChildRecord>> {
    read_records(reader, "child")
}

pub fn import_locations(
    registry: &EntityRegistry,
    records: &[LocationRecord],
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for record in records {
        match registry.create_location(NewLocation::new(&record.name, record.lat, record.lon)) {
            Ok(_) => summary.inserted += 1,
            Err(RegistryError::DuplicateName { .. }) => summary.duplicates += 1,
            Err(e) => return Err(e).with_context(|| format!("Failed to import location '{}'", record.name)),
        }
    }

    info!(
        "Imported {} locations ({} duplicates skipped)",
        summary.inserted, summary.duplicates
    );
    Ok(summary)
}

/// Import children, resolving each `location` column by location name.
///
/// Location names and behaviors are checked for every row before anything is
/// written, so an unknown location or behavior fails the import with nothing
/// applied. Errors raised by the registry itself (a blank name, an unreachable
/// store) stop the import at that row, keeping the rows before it.
pub fn import_children(registry: &EntityRegistry, records: &[ChildRecord]) -> Result<ImportSummary> {
    let ids_by_name: HashMap<String, String> = registry
        .list_locations()?
        .into_iter()
        .map(|l| (l.name, l.id))
        .collect();

    let mut resolved = Vec::with_capacity(records.len());
    for record in records {
        let Some(location_id) = ids_by_name.get(&record.location) else {
            bail!(
                "Child '{}' refers to unknown location '{}'",
                record.name,
                record.location
            );
        };
        if let Err(e) = record.behavior.parse::<Behavior>() {
            bail!("Child '{}' has an invalid behavior: {}", record.name, e);
        }
        resolved.push(NewChild::new(&record.name, &record.behavior, location_id));
    }

    let mut summary = ImportSummary::default();
    for (record, input) in records.iter().zip(resolved) {
        match registry.create_child(input) {
            Ok(_) => summary.inserted += 1,
            Err(RegistryError::DuplicateName { .. }) => {
                warn!("Skipping duplicate child '{}'", record.name);
                summary.duplicates += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to import child '{}'", record.name)),
        }
    }

    info!(
        "Imported {} children ({} duplicates skipped)",
        summary.inserted, summary.duplicates
    );
    Ok(summary)
}

pub fn import_location_file(registry: &EntityRegistry, path: &Path) -> Result<ImportSummary> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
    import_locations(registry, &load_locations(file)?)
}

pub fn import_child_file(registry: &EntityRegistry, path: &Path) -> Result<ImportSummary> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
    import_children(registry, &load_children(file)?)
}
