use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use polygon_mapper::service::{Request, Response};
use polygon_mapper::{
    Error, JsonFileBackend, MemoryBackend, PolygonDraft, PolygonPatch, PolygonService, Repository,
    Result, Ring, StorageBackend, geodesic, read_polygon, reference,
};

/// Measure, store and export geodesic polygons.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// JSON file holding the stored polygons
    #[arg(long, global = true, env = "POLYGON_MAPPER_STORE", default_value = "polygons.json")]
    store: PathBuf,

    /// Keep polygons in memory only (nothing is written)
    #[arg(long, global = true)]
    memory: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored polygons
    List,
    /// Show one polygon
    Get { id: Uuid },
    /// Store a new polygon
    Create {
        #[arg(long)]
        name: String,
        /// Open ring as JSON, e.g. '[[-74.01,40.70],[-74.00,40.70],[-74.00,40.71]]'
        #[arg(long)]
        ring: String,
    },
    /// Rename a polygon and/or replace its ring
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        ring: Option<String>,
    },
    /// Delete a polygon
    Delete { id: Uuid },
    /// Print one polygon, or all of them, as GeoJSON
    Export {
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Store the polygons of a GeoJSON, KML or GPX file
    Import {
        path: PathBuf,
        /// Name for polygons the file leaves unnamed (default: file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Measure a ring or a file without storing anything
    Metrics {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        ring: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Answer JSON requests read line by line from stdin
    Serve,
}

fn main() -> ExitCode {
    let Cli {
        store,
        memory,
        verbose,
        command,
    } = Cli::parse();

    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let outcome = if memory {
        Repository::open(MemoryBackend).and_then(|repo| run(PolygonService::new(repo), command))
    } else {
        log::debug!("store: {}", store.display());
        Repository::open(JsonFileBackend::new(store))
            .and_then(|repo| run(PolygonService::new(repo), command))
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            exit_code(&err)
        }
    }
}

fn exit_code(err: &Error) -> ExitCode {
    match err.status() {
        404 => ExitCode::from(3),
        400 => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn run<B: StorageBackend>(service: PolygonService<B>, command: Command) -> Result<()> {
    match command {
        Command::List => print_json(&service.list()?),
        Command::Get { id } => print_json(&service.get(id)?),
        Command::Create { name, ring } => {
            let draft = PolygonDraft {
                name,
                ring: parse_ring(&ring)?,
            };
            print_json(&service.create(draft)?)
        }
        Command::Update { id, name, ring } => {
            let ring = ring.as_deref().map(parse_ring).transpose()?;
            print_json(&service.update(id, PolygonPatch { name, ring })?)
        }
        Command::Delete { id } => service.delete(id)?,
        Command::Export { id: Some(id) } => print_json(&service.export_geojson(id)?),
        Command::Export { id: None } => print_json(&service.export_geojson_collection()?),
        Command::Import { path, name } => print_json(&service.import_file(&path, name.as_deref())?),
        Command::Metrics { ring, file } => {
            let drafts = match (ring, file) {
                (Some(ring), _) => vec![PolygonDraft {
                    name: "ring".to_string(),
                    ring: parse_ring(&ring)?,
                }],
                (None, Some(file)) => read_polygon::read_file(&file)?,
                (None, None) => Vec::new(),
            };
            for draft in &drafts {
                print_metrics(draft)?;
            }
        }
        Command::Serve => serve(&service),
    }
    Ok(())
}

fn parse_ring(text: &str) -> Result<Ring> {
    serde_json::from_str(text).map_err(|e| {
        Error::InvalidGeometry(format!("ring must be a JSON array of [lng, lat] pairs: {}", e))
    })
}

fn print_json<T: Serialize>(value: &T) {
    println!("{:#}", json!(value));
}

fn print_metrics(draft: &PolygonDraft) -> Result<()> {
    let metrics = geodesic::compute_metrics(&draft.ring)?;
    println!("{}", draft.name);
    println!("      area: {:.1} m2 (sphere)", metrics.area_sq_meters);
    let ellipsoid = reference::ellipsoid_metrics(&draft.ring);
    println!(
        "      area: {:.1} m2 (ellipsoid, geo crate, sphere off by {:+.3}%)",
        ellipsoid.area_sq_meters,
        100.0 * reference::sphere_deviation(&metrics, &ellipsoid)
    );
    println!("  hectares: {:.4}", metrics.area_hectares());
    println!("     acres: {:.4}", metrics.area_acres());
    println!(" perimeter: {:.1} m (sphere)", metrics.perimeter_meters);
    println!(" perimeter: {:.1} m (ellipsoid)", ellipsoid.perimeter_meters);
    println!();
    Ok(())
}

fn serve<B: StorageBackend>(service: &PolygonService<B>) {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            log::warn!("serve: cannot read stdin");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => service.handle(request),
            Err(e) => Response {
                status: 400,
                body: json!({ "error": "invalid_request", "message": e.to_string() }),
            },
        };
        if writeln!(out, "{}", json!(response)).and_then(|_| out.flush()).is_err() {
            log::warn!("serve: stdout closed");
            break;
        }
    }
}
