use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::PostgresBlobConfig;
use crate::migrations;
use crate::store::PostgresBlobStore;

/// Errors establishing or preparing the database connection.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The connection URL or SSL settings are invalid.
    #[error("invalid database configuration: {0}")]
    Config(String),

    /// The database could not be reached.
    #[error("database connection failed: {0}")]
    Connect(String),

    /// The database did not answer within the configured timeout.
    #[error("database connection timed out after {0:?}")]
    Timeout(Duration),

    /// Schema migrations failed.
    #[error("database migration failed: {0}")]
    Migration(String),
}

/// Current connection binding as seen by subscribers: `Some` while the
/// database is reachable, `None` otherwise.
pub type ConnectionState = Option<PgPool>;

/// Build `PgConnectOptions` from a [`PostgresBlobConfig`], applying SSL
/// settings when configured.
pub(crate) fn build_connect_options(
    config: &PostgresBlobConfig,
) -> Result<PgConnectOptions, DatabaseError> {
    let mut options: PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| DatabaseError::Config(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => PgSslMode::Disable,
            "prefer" => PgSslMode::Prefer,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            other => {
                return Err(DatabaseError::Config(format!("unknown ssl_mode: {other}")));
            }
        };
        options = options.ssl_mode(ssl_mode);
    }

    if let Some(ref path) = config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }

    Ok(options)
}

/// Owner of the `PostgreSQL` connection pool and its lifecycle events.
///
/// Stores subscribe through [`Database::subscribe`] and see `Some(pool)` once
/// the database is connected and migrated. A background health monitor
/// flips the state to `None` when the database stops answering and back to
/// `Some(pool)` when it recovers, so subscribers rebind on every reconnect.
pub struct Database {
    pool: PgPool,
    config: Arc<PostgresBlobConfig>,
    state: Arc<watch::Sender<ConnectionState>>,
    migrated: Arc<AtomicBool>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Database {
    /// Connect, run migrations and publish the connected state.
    ///
    /// The whole attempt is bounded by `config.connect_timeout`; an
    /// unreachable database fails here instead of hanging.
    pub async fn connect(config: PostgresBlobConfig) -> Result<Self, DatabaseError> {
        let options = build_connect_options(&config)?;
        let timeout = config.connect_timeout;

        let pool = tokio::time::timeout(
            timeout,
            PgPoolOptions::new()
                .max_connections(config.pool_size)
                .acquire_timeout(timeout)
                .connect_with(options),
        )
        .await
        .map_err(|_| DatabaseError::Timeout(timeout))?
        .map_err(|e| DatabaseError::Connect(e.to_string()))?;

        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!(
            schema = %config.schema,
            table_prefix = %config.table_prefix,
            "database connected"
        );

        let (state, _) = watch::channel(Some(pool.clone()));
        Ok(Self {
            pool,
            config: Arc::new(config),
            state: Arc::new(state),
            migrated: Arc::new(AtomicBool::new(true)),
            monitor: Mutex::new(None),
        })
    }

    /// Build the pool without touching the network.
    ///
    /// Subscribers start out unbound. Once [`Database::start_health_monitor`]
    /// reaches the database it runs the migrations and publishes the pool.
    /// Only configuration errors fail here.
    pub fn connect_lazy(config: PostgresBlobConfig) -> Result<Self, DatabaseError> {
        let options = build_connect_options(&config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.connect_timeout)
            .connect_lazy_with(options);

        let (state, _) = watch::channel(None);
        Ok(Self {
            pool,
            config: Arc::new(config),
            state: Arc::new(state),
            migrated: Arc::new(AtomicBool::new(false)),
            monitor: Mutex::new(None),
        })
    }

    /// Whether subscribers are currently bound.
    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Subscribe to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Build a blob store bound to this database.
    pub fn blob_store(&self) -> PostgresBlobStore {
        PostgresBlobStore::new(self.subscribe(), (*self.config).clone())
    }

    /// Start the background health monitor. Calling this more than once has
    /// no further effect.
    pub fn start_health_monitor(&self) {
        let Ok(mut slot) = self.monitor.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }

        let pool = self.pool.clone();
        let config = Arc::clone(&self.config);
        let state = Arc::clone(&self.state);
        let migrated = Arc::clone(&self.migrated);

        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.health_check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let healthy = probe(&pool, &config, &migrated).await;
                publish_health(&state, &pool, healthy);
            }
        }));
    }

    /// Stop the monitor, publish the disconnected state and close the pool.
    pub async fn close(self) {
        if let Ok(mut slot) = self.monitor.lock()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
        self.state.send_replace(None);
        self.pool.close().await;
        info!("database connection closed");
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.monitor.lock()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
    }
}

/// Ping the database, running the pending migrations on the first success.
async fn probe(pool: &PgPool, config: &PostgresBlobConfig, migrated: &AtomicBool) -> bool {
    let timeout = config.connect_timeout;
    let reachable = matches!(
        tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool)).await,
        Ok(Ok(_))
    );
    if !reachable || migrated.load(Ordering::Acquire) {
        return reachable;
    }

    match migrations::run_migrations(pool, config).await {
        Ok(()) => {
            migrated.store(true, Ordering::Release);
            true
        }
        Err(e) => {
            warn!(error = %e, "database reachable but migrations failed");
            false
        }
    }
}

/// Publish a health probe result, logging only on transitions.
fn publish_health(state: &watch::Sender<ConnectionState>, pool: &PgPool, healthy: bool) {
    state.send_if_modified(|current| match (current.is_some(), healthy) {
        (true, false) => {
            warn!("database unreachable, blob store unbound");
            *current = None;
            true
        }
        (false, true) => {
            info!("database reachable again, blob store rebound");
            *current = Some(pool.clone());
            true
        }
        _ => false,
    });
}
