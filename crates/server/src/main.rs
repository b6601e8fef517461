use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use vitrine_blob_postgres::Database;
use vitrine_catalog::PostgresCatalog;
use vitrine_migrate::{MigrationConfig, MigrationOptions, run_with_database};
use vitrine_server::api::{self, AppState};
use vitrine_server::config::VitrineConfig;
use vitrine_server::storage_factory::{self, create_storage};

/// Vitrine product image server.
#[derive(Parser, Debug)]
#[command(name = "vitrine-server", about = "Store, serve and migrate product images")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "vitrine.toml")]
    config: PathBuf,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default).
    Serve,
    /// Create the blob and product tables, then exit.
    Migrate,
    /// Move legacy on-disk product images into the blob store.
    MigrateImages {
        /// Directory legacy image names are relative to.
        #[arg(long)]
        uploads_dir: Option<PathBuf>,
        /// Report what would be migrated without writing anything.
        #[arg(long)]
        dry_run: bool,
        /// Delete each legacy file after it was migrated.
        #[arg(long)]
        remove_source: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = VitrineConfig::load(&cli.config)?;
    vitrine_server::telemetry::init(&config.telemetry)?;

    if !cli.config.exists() {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    match cli.command {
        None | Some(Commands::Serve) => {
            if let Some(host) = cli.host {
                config.server.host = host;
            }
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            serve(config).await
        }
        Some(Commands::Migrate) => run_migrate(&config).await,
        Some(Commands::MigrateImages {
            uploads_dir,
            dry_run,
            remove_source,
        }) => {
            let section = &config.migration;
            let options = MigrationOptions {
                uploads_dir: uploads_dir.unwrap_or_else(|| PathBuf::from(&section.uploads_dir)),
                dry_run: dry_run || section.dry_run,
                remove_source: remove_source || section.remove_source,
            };
            run_migrate_images(&config, options).await
        }
    }
}

async fn serve(config: VitrineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let storage = create_storage(&config.storage)?;

    let state = AppState::new(&storage, config.images.clone(), &config.server.base_url());
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "vitrine-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    if tokio::time::timeout(shutdown_timeout, storage.close())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            "shutdown timeout exceeded while closing storage"
        );
    }

    served?;
    info!("vitrine-server shut down");
    Ok(())
}

/// Run the `migrate` subcommand: create the database schema and exit.
async fn run_migrate(config: &VitrineConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.storage.backend == "memory" {
        info!(backend = %config.storage.backend, "backend has no schema, nothing to migrate");
        return Ok(());
    }

    let db_config = storage_factory::postgres_blob_config(&config.storage)?;
    info!("running blob store migrations...");
    let db = Database::connect(db_config).await?;

    info!("running product table migrations...");
    let catalog = PostgresCatalog::new(
        db.pool().clone(),
        storage_factory::catalog_config(&config.storage),
    );
    let result = catalog.run_migrations().await;
    db.close().await;
    result?;

    info!("all migrations complete");
    Ok(())
}

/// Run the `migrate-images` subcommand and print the report.
async fn run_migrate_images(
    config: &VitrineConfig,
    options: MigrationOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let migration = MigrationConfig {
        database: storage_factory::postgres_blob_config(&config.storage)?,
        catalog: storage_factory::catalog_config(&config.storage),
        options,
    };

    let report = run_with_database(migration).await?;
    println!("{report}");

    if report.is_clean() {
        Ok(())
    } else {
        Err(format!("{} product image(s) failed to migrate", report.failed()).into())
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
