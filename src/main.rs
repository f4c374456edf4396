use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use santa_route::{
    import_child_file, import_location_file, Config, EntityRegistry, RoutePlanner, SqliteStore,
};

const USAGE: &str = "usage: santa-route <import LOCATIONS.csv [CHILDREN.csv] | deliveries | route | audit>";

#[derive(Debug, PartialEq)]
enum Command {
    Import {
        locations: PathBuf,
        children: Option<PathBuf>,
    },
    Deliveries,
    Route,
    Audit,
}

/// Parse the arguments after the program name.
fn parse_command(args: &[String]) -> Result<Command> {
    match args.first().map(String::as_str) {
        Some("import") => {
            let Some(locations) = args.get(1) else {
                bail!(USAGE);
            };
            Ok(Command::Import {
                locations: PathBuf::from(locations),
                children: args.get(2).map(PathBuf::from),
            })
        }
        Some("deliveries") => Ok(Command::Deliveries),
        Some("route") => Ok(Command::Route),
        Some("audit") => Ok(Command::Audit),
        _ => bail!(USAGE),
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_command(&args)?;
    let config = Config::load()?;

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    let registry = EntityRegistry::new(Arc::new(store));

    match command {
        Command::Import {
            locations,
            children,
        } => run_import(&registry, &locations, children.as_deref()),
        Command::Deliveries => run_deliveries(&registry),
        Command::Route => run_route(&registry),
        Command::Audit => run_audit(&registry),
    }
}

fn run_import(registry: &EntityRegistry, locations: &Path, children: Option<&Path>) -> Result<()> {
    println!("📂 Importing locations from {}", locations.display());
    let summary = import_location_file(registry, locations)?;
    println!("✓ Inserted: {} locations", summary.inserted);
    println!("✓ Skipped duplicates: {}", summary.duplicates);

    if let Some(children) = children {
        println!("\n📂 Importing children from {}", children.display());
        let summary = import_child_file(registry, children)?;
        println!("✓ Inserted: {} children", summary.inserted);
        println!("✓ Skipped duplicates: {}", summary.duplicates);
    }

    Ok(())
}

fn run_deliveries(registry: &EntityRegistry) -> Result<()> {
    let ranked = RoutePlanner::new(registry).ranked_locations()?;

    println!("🎁 Delivery order ({} locations)", ranked.len());
    for (i, location) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {:<24} {:>5} good   ({:.4}, {:.4})",
            i + 1,
            location.name,
            location.good_child_count,
            location.coordinates.lat,
            location.coordinates.lon
        );
    }

    Ok(())
}

fn run_route(registry: &EntityRegistry) -> Result<()> {
    let route = RoutePlanner::new(registry).compute_route()?;

    println!("🛷 Route: {} stops", route.stops);
    for segment in &route.segments {
        println!(
            "   {} → {}: {:.2} km",
            segment.from, segment.to, segment.distance_km
        );
    }
    println!("Total: {:.2} km", route.total_distance_km);

    Ok(())
}

fn run_audit(registry: &EntityRegistry) -> Result<()> {
    let drift = registry.audit_counters()?;

    if drift.is_empty() {
        println!("✅ Every good-child counter matches its children");
        return Ok(());
    }

    println!("⚠️  {} location counter(s) disagree with their children", drift.len());
    for d in &drift {
        println!("   {} ({}): stored {}, actual {}", d.name, d.location_id, d.stored, d.actual);
    }
    bail!("{} location counter(s) drifted", drift.len());
}
