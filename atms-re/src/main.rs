//! atms-re (Roster Engine) - Roster consistency and attendance aggregation
//!
//! Runs one maintenance pass at startup so attendance marking always sees
//! a consistent roster, then serves the engine's trigger points over HTTP.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use atms_re::services::MaintenanceService;
use atms_re::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "atms-re", about = "ATMS roster engine")]
struct Args {
    /// Root folder holding the database (overrides ATMS_ROOT_FOLDER)
    #[arg(long)]
    root_folder: Option<String>,

    /// Port to listen on
    #[arg(long, default_value_t = 5780)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting ATMS Roster Engine (atms-re) v{}", env!("CARGO_PKG_VERSION"));

    let root_folder =
        atms_common::config::resolve_root_folder(args.root_folder.as_deref(), "ATMS_ROOT_FOLDER")?;
    let db_path = atms_common::config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = atms_common::db::init::init_database(&db_path).await?;

    let state = AppState::new(pool.clone());

    // Startup reconciliation: fix semester/section drift, merge duplicate
    // subjects, and relink staff before the first request arrives. A failed
    // pass is logged, not fatal; the admin endpoint can re-trigger it.
    let maintenance = MaintenanceService::new(pool, state.maintenance_lock.clone());
    match maintenance.run_pass().await {
        Ok(report) => {
            if report.total_writes > 0 {
                info!(total_writes = report.total_writes, "Startup maintenance pass corrected roster data");
            } else {
                info!("Startup maintenance pass found consistent roster data");
            }
        }
        Err(e) => error!("Startup maintenance pass failed: {}", e),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("atms-re listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
