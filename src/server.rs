//! Server runtime
//!
//! [`ServerHandle`] owns the whole lifecycle: metrics recorder, storage and
//! migrations, gateway client, application services, the pending-booking
//! sweeper, the REST API and graceful shutdown.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    BookingQueries, CheckoutService, PaymentReconciler, PendingSweeper, RetryService,
    SharedPaymentGateway, SlotCatalogService,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::{init_database, SeaOrmRepositoryProvider};
use crate::infrastructure::payments::HttpPaymentGateway;
use crate::infrastructure::storage::InMemoryRepositoryProvider;
use crate::interfaces::http::{create_api_router, ApiServices};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Options for starting the service.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

/// Handle to a running booking service.
pub struct ServerHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    pub api_port: u16,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    sweeper_task: Option<JoinHandle<()>>,
}

/// The global recorder can only be installed once per process.
fn prometheus_handle() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("📊 Prometheus metrics recorder installed");
    Ok(HANDLE.get_or_init(|| handle).clone())
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting slot booking service...");
        let prometheus_handle = prometheus_handle()?;

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            if app_cfg.database.in_memory {
                warn!("Using in-memory storage, data is lost on restart");
                let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
                for seed in &app_cfg.catalog.sub_venues {
                    repos.sub_venues().save(&seed.to_sub_venue()).await?;
                }
                info!(
                    sub_venues = app_cfg.catalog.sub_venues.len(),
                    "In-memory catalog seeded"
                );
                (repos, None)
            } else {
                let db = init_database(&app_cfg.database_config()).await?;
                if opts.auto_migrate {
                    info!("Running database migrations...");
                    Migrator::up(&db, None).await?;
                    info!("Migrations completed");
                }
                (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
            };

        // ── Payment gateway & services ─────────────────────────
        let gateway: SharedPaymentGateway =
            Arc::new(HttpPaymentGateway::new(app_cfg.gateway_config())?);
        info!(api_base = %app_cfg.payments.api_base, "💳 Payment gateway client ready");

        let checkout_config = app_cfg.checkout_config();
        let reconciler = Arc::new(PaymentReconciler::new(repos.clone(), gateway.clone()));
        let services = ApiServices {
            checkout: Arc::new(CheckoutService::new(
                repos.clone(),
                gateway.clone(),
                checkout_config.clone(),
            )),
            retry: Arc::new(RetryService::new(
                repos.clone(),
                gateway.clone(),
                checkout_config,
            )),
            reconciler: reconciler.clone(),
            queries: Arc::new(BookingQueries::new(repos.clone())),
            catalog: Arc::new(SlotCatalogService::new(repos.clone())),
        };

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        let sweeper_task = if app_cfg.sweeper.enabled {
            let sweeper = Arc::new(PendingSweeper::new(
                repos.clone(),
                gateway,
                reconciler,
                app_cfg.sweeper_config(),
            ));
            Some(sweeper.start(shutdown_signal.clone()))
        } else {
            warn!("Pending booking sweeper disabled");
            None
        };

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(
            services,
            app_cfg.jwt_config(),
            app_cfg.webhook_verifier(),
            db.clone(),
            prometheus_handle,
        );

        let api_addr = app_cfg.api_address();
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        let local_addr = listener.local_addr()?;
        let api_port = local_addr.port();
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Slot booking service started.");

        Ok(Self {
            repos,
            config: app_cfg,
            api_port,
            db,
            shutdown,
            api_task,
            sweeper_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for all tasks to stop after shutdown has been triggered.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        let grace = Duration::from_secs(self.shutdown.timeout_secs());
        match tokio::time::timeout(grace, self.api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server task panicked: {}", e),
            Err(_) => warn!(
                timeout_secs = grace.as_secs(),
                "REST API server did not drain in time"
            ),
        }
        if let Some(task) = self.sweeper_task {
            if let Err(e) = task.await {
                error!("Sweeper task panicked: {}", e);
            }
        }

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("✅ Database connection closed");
            }
        }

        info!("👋 Slot booking service shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("🛑 Shutting down slot booking service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the logging section.
///
/// `RUST_LOG` takes precedence over `logging.level`.
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
