use anyhow::{Context, Result};
use booking_service::config::{Args, LogFormat, StoreKind};
use booking_service::handlers::BookingManager;
use booking_service::memory::MemoryStore;
use booking_service::store::{BookingStore, Fixtures, PgStore};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match args.log_format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let store: Arc<dyn BookingStore> = match args.store {
        StoreKind::Postgres => {
            info!("Running database migrations...");
            let database_url = args.database_url.clone();
            tokio::task::spawn_blocking(move || booking_service::run_migrations(&database_url))
                .await??;
            info!("Migrations completed successfully");

            Arc::new(PgStore::connect(&args.database_url, args.pool_size).await?)
        }
        StoreKind::Memory => {
            warn!("Using the in-memory store; bookings are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(path) = &args.seed_file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let fixtures: Fixtures = serde_json::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        info!(
            "Seeding {} laundromats and {} machines",
            fixtures.laundromats.len(),
            fixtures.machines.len()
        );
        store.load_fixtures(fixtures).await?;
    }

    let manager = BookingManager::new(store, args.status_policy);
    info!("Admission status policy: {:?}", manager.policy());

    let app = booking_service::app(manager);
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", args.bind_address, args.port)).await?;

    info!("Booking service listening on {}:{}", args.bind_address, args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
