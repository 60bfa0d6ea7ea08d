use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use territorial_intel::auth::{IdentityProvider, Submitter};
use territorial_intel::config::Config;
use territorial_intel::gateway::{SupabaseAuth, SupabaseStore};
use territorial_intel::logging;
use territorial_intel::metrics::init_metrics;
use territorial_intel::pipeline::ingestion::IngestProgress;
use territorial_intel::pipeline::read::Selections;
use territorial_intel::server::{start_server, AppState};
use territorial_intel::service::TerritorialService;
use territorial_intel::storage::PointStore;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "territorial_intel")]
#[command(about = "Territorial point ingestion and map data service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a workbook of SSR points into the points table
    Ingest {
        /// Spreadsheet file (xlsx, xls, ods)
        file: PathBuf,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TERRITORIAL_PASSWORD")]
        password: String,
    },
    /// Print the filtered map view
    Show {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        commune: Option<String>,
        #[arg(long)]
        classification: Option<String>,
        /// Case-insensitive substring of the official name
        #[arg(long)]
        name: Option<String>,
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the filter options available for a selection
    Options {
        #[arg(long)]
        region: Option<String>,
    },
    /// Read rows with filters applied by the store, bypassing the cache
    Fetch {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        commune: Option<String>,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

fn anon_service(config: &Config) -> anyhow::Result<TerritorialService> {
    let store: Arc<dyn PointStore> = Arc::new(SupabaseStore::from_config(config)?);
    Ok(TerritorialService::new(store, config))
}

async fn run_ingest(config: &Config, file: PathBuf, email: &str, password: &str) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;

    let auth = SupabaseAuth::from_config(config)?;
    let session = auth.sign_in(email, password).await?;
    let submitter = Submitter::try_from(&session.identity)?;
    println!("🔑 Signed in as {}", submitter);

    let store: Arc<dyn PointStore> =
        Arc::new(SupabaseStore::from_config(config)?.with_access_token(session.access_token.clone()));
    let service = TerritorialService::new(store, config);

    println!("📥 Loading {}...", file.display());
    let result = service
        .ingest(&bytes, &submitter, &mut |p: IngestProgress| {
            println!("   {:>3.0}% ({}/{})", p.fraction() * 100.0, p.rows_scanned, p.total_rows)
        })
        .await;

    if let Err(e) = auth.sign_out(&session.access_token).await {
        error!("Sign-out failed: {}", e);
    }

    let report = result?;
    println!("✅ Stored {} points ({} rows skipped)", report.accepted, report.rejected);
    println!("   Run id: {}", report.run_id);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Ingest {
            file,
            email,
            password,
        } => {
            run_ingest(&config, file, &email, &password).await?;
        }
        Commands::Show {
            region,
            commune,
            classification,
            name,
            json,
        } => {
            let selections = Selections {
                region,
                commune,
                classification,
                name,
            };
            let view = anon_service(&config)?.view(&selections).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("🗺️  Showing {} of {} points (zoom {})", view.shown, view.total, view.zoom);
                if let Some(center) = view.center {
                    println!("   Center: {:.4}, {:.4}", center.latitude, center.longitude);
                }
                for point in &view.points {
                    let row = &point.row;
                    println!(
                        "   - {} | {} / {} | {} | arranques {} | beneficiarios {}",
                        row.name(),
                        row.region(),
                        row.commune(),
                        row.clasificacion,
                        row.arranques,
                        row.beneficiarios
                    );
                }
            }
        }
        Commands::Options { region } => {
            let selections = Selections {
                region,
                ..Selections::default()
            };
            let options = anon_service(&config)?.options(&selections).await?;
            println!("📍 Regions: {}", options.regions.join(", "));
            println!("🏘️  Communes: {}", options.communes.join(", "));
            println!("🏷️  Classifications: {}", options.classifications.join(", "));
        }
        Commands::Fetch { region, commune } => {
            let mut filters = Vec::new();
            if let Some(region) = region {
                filters.push(("region".to_string(), region));
            }
            if let Some(commune) = commune {
                filters.push(("comuna".to_string(), commune));
            }
            let rows = anon_service(&config)?.fetch_where(&filters).await?;
            println!("📡 Fetched {} rows", rows.len());
            for row in &rows {
                println!("   - {} ({}, {})", row.name(), row.commune(), row.region());
            }
        }
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            init_metrics(config.server.metrics_port);

            let base = SupabaseStore::from_config(&config)?;
            let store: Arc<dyn PointStore> = Arc::new(base.clone());
            let state = Arc::new(AppState {
                service: Arc::new(TerritorialService::new(store, &config)),
                identity: Arc::new(SupabaseAuth::from_config(&config)?),
                store_for_token: Arc::new(move |token: &str| {
                    Arc::new(base.clone().with_access_token(token)) as Arc<dyn PointStore>
                }),
            });

            info!("Starting HTTP server on port {}", port);
            start_server(state, port)
                .await
                .map_err(|e| anyhow::anyhow!("server error: {e}"))?;
        }
    }
    Ok(())
}
