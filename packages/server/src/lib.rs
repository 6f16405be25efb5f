#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the siting map.
//!
//! Serves point sampling over the raster layers, region metrics by name or
//! point, the boundary feature collection, and the hub towns. Raster layers
//! are opened once at startup and shared by every worker; the boundary and
//! statistics store is read through a pool of read-only `DuckDB`
//! connections.

mod handlers;
pub mod interactive;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use siting_map_database::{DbError, DuckDbPool, paths, schema};
use siting_map_raster::{PointSampler, RasterCatalog};
use siting_map_region_models::NameReconciliationMap;
use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The boundary and statistics store could not be opened.
    #[error("Store error: {0}")]
    Database(#[from] DbError),

    /// Binding or running the HTTP server failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Directory holding the layer `GeoTIFF`s (`RASTER_DIR`).
    pub raster_dir: PathBuf,
    /// Boundary and statistics store (`DATABASE_PATH`).
    pub database_path: PathBuf,
    /// Read-only connections in the pool (`DB_POOL_SIZE`).
    pub pool_size: usize,
    /// Static frontend served at `/` if it exists (`FRONTEND_DIR`).
    pub frontend_dir: PathBuf,
}

impl ServerConfig {
    /// Reads the configuration from environment variables, falling back to
    /// defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let pool_size: usize = std::env::var("DB_POOL_SIZE")
            .ok()
            .and_then(|p| p.parse().ok())
            .filter(|&size| size > 0)
            .unwrap_or(4);

        Self {
            bind_addr,
            port,
            raster_dir: paths::from_env_or("RASTER_DIR", paths::raster_dir),
            database_path: paths::from_env_or("DATABASE_PATH", paths::database_path),
            pool_size,
            frontend_dir: paths::from_env_or("FRONTEND_DIR", || PathBuf::from("frontend")),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Samples every raster layer at a point.
    pub sampler: Arc<PointSampler>,
    /// Aliases tried when a region name does not match exactly.
    pub aliases: NameReconciliationMap,
    /// Read-only connections to the boundary and statistics store.
    pub db_pool: Arc<DuckDbPool>,
}

impl AppState {
    /// Opens the raster layers in `config.raster_dir` and the connection
    /// pool on `config.database_path`.
    ///
    /// A missing store is created empty first so the server can start
    /// before the first sync.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be created or opened.
    pub fn open(config: &ServerConfig) -> Result<Self, DbError> {
        log::info!("Opening raster layers in {}", config.raster_dir.display());
        let catalog = RasterCatalog::open(&config.raster_dir);
        if catalog.is_empty() {
            log::warn!("No raster layers available; pixel reports will be empty");
        }

        ensure_store(&config.database_path)?;
        let db_pool = DuckDbPool::open_read_only(&config.database_path, config.pool_size)?;

        Ok(Self {
            sampler: Arc::new(PointSampler::new(Arc::new(catalog))),
            aliases: NameReconciliationMap::default(),
            db_pool: Arc::new(db_pool),
        })
    }
}

/// Creates the store with an empty schema if it does not exist yet.
fn ensure_store(path: &Path) -> Result<(), DbError> {
    if !path.exists() {
        log::warn!(
            "No store at {}, creating an empty one; run `siting_map_cli sync` to load data",
            path.display()
        );
        drop(schema::open(path)?);
    }
    Ok(())
}

/// Registers the API routes.
///
/// Malformed query strings are answered with a JSON 400 like every other
/// API error.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(handlers::query_error))
        .route("/health", web::get().to(handlers::health))
        .route("/state_metrics", web::get().to(handlers::state_metrics))
        .route("/states", web::get().to(handlers::states))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/report/pixel", web::get().to(handlers::pixel))
                .route("/towns", web::get().to(handlers::towns)),
        );
}

/// Starts the siting map API server.
///
/// Resolves [`ServerConfig`] from the environment, opens the raster layers
/// and the store, and runs the Actix-Web HTTP server. The caller provides
/// the async runtime (e.g. via `#[actix_web::main]`) and installs the
/// logger.
///
/// # Errors
///
/// Returns [`ServerError::Database`] if the store cannot be opened, or
/// [`ServerError::Io`] if the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    let config = ServerConfig::from_env();
    let state = web::Data::new(AppState::open(&config)?);

    let frontend_dir = config.frontend_dir.is_dir().then(|| config.frontend_dir.clone());
    match &frontend_dir {
        Some(dir) => log::info!("Serving frontend from {}", dir.display()),
        None => log::info!(
            "Frontend directory {} not found, serving the API only",
            config.frontend_dir.display()
        ),
    }

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();
        let frontend_dir = frontend_dir.clone();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_api)
            .configure(move |cfg| {
                // Registered last so API routes take precedence.
                if let Some(dir) = frontend_dir {
                    cfg.service(Files::new("/", dir).index_file("index.html"));
                }
            })
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await?;

    Ok(())
}
