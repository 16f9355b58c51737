//! Command-line front end of the consistency engine.
//!
//! Loads an in-memory store from a JSON snapshot, runs one engine operation
//! and prints its result as JSON on stdout. Logs go to stderr.
//!
//! ```text
//! trip-engine [--config engine.toml] --snapshot state.json [--write-back] [--metrics] <command>
//!
//!   check-config                                   validate and print the configuration
//!   reorder --trip <id> --order <via,via,...>      reorder a trip; unlisted vias are removed
//!   remove-passengers --ids <id,id,...>            destroy passenger links with the cascade
//!   neighborhood --lat <f> --lon <f> --airport <code>... [--city <id> | --city-name <n> --country <cc>]
//! ```

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use trip_engine::config::{load_config, validate_config, ConfigError, EngineConfig};
use trip_engine::geo::FixedGeocoder;
use trip_engine::itinerary::ViaReorderRequest;
use trip_engine::model::{AddressPoint, AirportCode, CityId, GeoPoint, Trip, TripId, ViaId, ViaTravelerId};
use trip_engine::observability::{logging, metrics};
use trip_engine::store::{InMemoryStore, ItineraryStore};
use trip_engine::{Engine, EngineError};

#[derive(Parser)]
#[command(name = "trip-engine", version)]
#[command(about = "Itinerary & membership consistency engine", long_about = None)]
struct Cli {
    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store snapshot (JSON).
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Save the store back to the snapshot after a successful command.
    #[arg(long)]
    write_back: bool,

    /// Print Prometheus metrics to stderr when done.
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print it
    CheckConfig,
    /// Reorder the vias of a trip; vias left out of the order are removed
    Reorder {
        #[arg(long)]
        trip: TripId,
        #[arg(long, value_delimiter = ',', required = true)]
        order: Vec<ViaId>,
    },
    /// Remove passenger links and everything depending on them
    RemovePassengers {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<ViaTravelerId>,
    },
    /// Resolve the neighborhood of a point for one or more airports
    Neighborhood {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long = "airport", required = true)]
        airports: Vec<String>,
        #[arg(long, conflicts_with = "city_name")]
        city: Option<CityId>,
        #[arg(long, requires = "country")]
        city_name: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = EngineConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };
    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "trip-engine starting");

    let handle = if config.observability.metrics_enabled {
        metrics::init_metrics()
    } else {
        None
    };

    if let Commands::CheckConfig = cli.command {
        print_json(&config)?;
        return Ok(());
    }

    let snapshot = cli
        .snapshot
        .clone()
        .ok_or("--snapshot is required for this command")?;
    let store = InMemoryStore::load_from_file(&snapshot)?;
    let engine = Engine::new(store, config);

    match cli.command {
        Commands::CheckConfig => {}
        Commands::Reorder { trip, order } => {
            let vias = engine.store().trip_vias(trip).await?;
            if vias.is_empty() {
                return Err(EngineError::NotFound(format!("trip {}", trip)).into());
            }
            let request = ViaReorderRequest::reorder(&Trip::new(trip, vias), &order)?;
            let outcome = engine.reorder_trip(trip, request).await?;
            print_json(&outcome)?;
        }
        Commands::RemovePassengers { ids } => {
            let report = engine.remove_passengers(ids).await?;
            print_json(&report)?;
        }
        Commands::Neighborhood {
            lat,
            lon,
            airports,
            city,
            city_name,
            country,
        } => {
            let location = GeoPoint::new(lat, lon);
            let address = match (city, city_name, country) {
                (Some(city_id), _, _) => AddressPoint {
                    location,
                    city_id: Some(city_id),
                },
                (None, Some(name), Some(country)) => {
                    let geocoder = FixedGeocoder::city(name, country);
                    engine.locate_address(&geocoder, location).await?.point
                }
                _ => AddressPoint {
                    location,
                    city_id: None,
                },
            };
            let codes: Vec<AirportCode> = airports.iter().map(AirportCode::new).collect();
            if let [code] = codes.as_slice() {
                let found = engine.find_neighborhood(&address, Some(code)).await?;
                print_json(&found)?;
            } else {
                let map = engine.create_neighborhood_map(&address, &codes).await?;
                print_json(&map)?;
            }
        }
    }

    if cli.write_back {
        engine.store().save_to_file(&snapshot)?;
    }
    if let (true, Some(handle)) = (cli.metrics, handle) {
        eprintln!("{}", handle.render());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
