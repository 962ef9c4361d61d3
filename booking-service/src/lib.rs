pub mod api;
pub mod config;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod schema;
pub mod store;

use axum::Router;
use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::Arc;

use crate::api::AppState;
use crate::handlers::BookingManager;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Blocking; call from `spawn_blocking` inside the runtime.
pub fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let mut conn = PgConnection::establish(database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    Ok(())
}

pub fn app(manager: BookingManager) -> Router {
    api::create_router(AppState {
        manager: Arc::new(manager),
    })
}
