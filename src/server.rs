//! Reusable members API server runtime.
//!
//! Provides [`ServerHandle`] that encapsulates the full server lifecycle:
//! database init, migrations, admin seeding, REST API, metrics and
//! graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::domain::{ImageStorage, NewUser, RepositoryProvider, Role};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, CloudinaryImageHost, SeaOrmRepositoryProvider};
use crate::interfaces::http::{create_api_router, ApiContext};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the members API.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Create default admin user if no user exists (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running members API.
///
/// # Examples
///
/// ```rust,no_run
/// use members_api::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     // ... wait for shutdown signal ...
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// API port the server is listening on.
    pub api_port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the members API with the given options.
    ///
    /// This will:
    /// 1. Install Prometheus metrics recorder
    /// 2. Connect to database and run migrations
    /// 3. Create default admin user (if enabled)
    /// 4. Start REST API server (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;

        info!("Starting members API...");

        // ── Prometheus metrics recorder ────────────────────────
        // The global recorder can only be installed once per process;
        // a restart within the same process reuses it.
        use std::sync::OnceLock;
        static PROM_HANDLE: OnceLock<Option<metrics_exporter_prometheus::PrometheusHandle>> =
            OnceLock::new();

        let prometheus_handle = PROM_HANDLE
            .get_or_init(|| {
                match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
                    Ok(h) => {
                        info!("📊 Prometheus metrics recorder installed");
                        Some(h)
                    }
                    Err(e) => {
                        warn!("Prometheus recorder unavailable, /metrics disabled: {}", e);
                        None
                    }
                }
            })
            .clone();

        // ── Sub-configs ────────────────────────────────────────
        let db_config = app_cfg.database_config();
        let jwt_config = app_cfg.jwt_config();
        info!(
            "JWT configured with {}h token expiration",
            jwt_config.expiration_hours
        );

        // ── Database ───────────────────────────────────────────
        let db = init_database(&db_config).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

        if opts.create_default_admin {
            create_default_admin(repos.as_ref(), &app_cfg).await;
        }

        // ── Image host ─────────────────────────────────────────
        let cloudinary = app_cfg.cloudinary_config();
        if cloudinary.cloud_name.is_empty() {
            warn!("image_host.cloud_name is empty; photo uploads will fail");
        }
        let images: Arc<dyn ImageStorage> = Arc::new(CloudinaryImageHost::new(cloudinary)?);

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(ApiContext {
            repos: repos.clone(),
            images,
            jwt_config,
            shutdown: shutdown_signal.clone(),
            db: Some(db.clone()),
            max_upload_bytes: app_cfg.photos.max_upload_bytes,
            metrics: prometheus_handle,
        });

        let api_port = app_cfg.server.api_port;
        let api_addr = app_cfg.api_address();
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Server started.");

        Ok(Self {
            repos,
            config: app_cfg,
            api_port,
            db,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    ///
    /// Call [`ServerHandle::wait`] to block until everything has stopped.
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered.
    /// In-flight requests get `server.shutdown_timeout` seconds to drain.
    pub async fn wait(self) {
        info!("⏳ Waiting for in-flight requests to complete...");

        let timeout = Duration::from_secs(self.shutdown.timeout_secs());
        let mut api_task = self.api_task;
        match tokio::time::timeout(timeout, &mut api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server task panicked: {}", e),
            Err(_) => {
                warn!("Shutdown timed out after {}s, aborting", timeout.as_secs());
                api_task.abort();
            }
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 Members API shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down members API...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Check if the server is still running.
    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Create the configured admin account if the user table is empty.
/// Failures are logged; the server still starts.
pub async fn create_default_admin(repos: &dyn RepositoryProvider, app_cfg: &AppConfig) {
    let users_count = match repos.users().count_users().await {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to count users: {}", e);
            return;
        }
    };
    if users_count > 0 {
        return;
    }

    info!("Creating default admin user...");
    let admin = &app_cfg.admin;
    let new_user = NewUser {
        username: admin.username.clone(),
        known_as: admin.known_as.clone(),
        gender: admin.gender.clone(),
        date_of_birth: admin.date_of_birth,
        city: admin.city.clone(),
        country: admin.country.clone(),
        roles: vec![Role::Member, Role::Moderator, Role::Admin],
    };

    match repos.users().create_user(new_user).await {
        Ok(user) => info!(username = %user.username, "Default admin created"),
        Err(e) => error!("Failed to create admin user: {}", e),
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryStore;

    #[tokio::test]
    async fn admin_is_seeded_once() {
        let store = InMemoryStore::new();
        let cfg = AppConfig::default();

        create_default_admin(&store, &cfg).await;
        create_default_admin(&store, &cfg).await;

        assert_eq!(store.users().count_users().await.unwrap(), 1);
        let admin = store.users().get_user_by_username("admin").await.unwrap().unwrap();
        assert!(admin.has_role(Role::Admin));
        assert!(admin.has_role(Role::Moderator));
    }
}
