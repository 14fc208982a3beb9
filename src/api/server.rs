//! Server bootstrap: composition root, background tasks, graceful shutdown.

use std::sync::Arc;

use tracing::{error, info};

use crate::audit::{AuditLogger, ComplianceEngine};
use crate::cache::{AnalysisCache, CacheClient, PricingCache};
use crate::config::Settings;
use crate::domain::Result;
use crate::engine::{AnalysisOrchestrator, PolicyEngine};
use crate::pricing::PricingFactory;
use crate::storage::{AnalysisStore, AuditStore, DatabasePool, PolicyStore, WebhookStore};
use crate::usage::UsageFactory;
use crate::webhooks::{WebhookEventService, WebhookTaskService};

use super::handlers::AppState;
use super::routes::create_router;

/// Everything the process owns, wired once at startup.
pub struct Application {
    pub state: AppState,
    pub settings: Settings,
    webhook_tasks: WebhookTaskService,
}

impl Application {
    /// Build the composition root from settings. External backends that
    /// fail to connect degrade to in-memory operation.
    pub async fn build(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let cache = CacheClient::connect(&settings.redis).await;

        let database = if settings.database.enabled {
            match DatabasePool::connect(&settings.database).await {
                Ok(pool) => Some(pool),
                Err(err) => {
                    error!(error = %err, "database unavailable, using in-memory stores");
                    None
                }
            }
        } else {
            None
        };

        let policy_store = Arc::new(PolicyStore::new(database.clone()).await);
        let analysis_store = Arc::new(AnalysisStore::new(database.clone()));
        let webhook_store = Arc::new(WebhookStore::new(database.clone()).await);
        let audit_store = Arc::new(AuditStore::new(database.clone()));

        let audit = Arc::new(AuditLogger::new(&settings.audit, audit_store.clone()));
        let compliance = Arc::new(ComplianceEngine::new(audit_store));
        let webhook_events = Arc::new(WebhookEventService::new(webhook_store.clone()));

        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            PolicyEngine::new(policy_store),
            analysis_store.clone(),
            AnalysisCache::new(cache.clone()),
            webhook_events.clone(),
            audit.clone(),
        ));

        let pricing = PricingFactory::new(&settings.pricing, PricingCache::new(cache.clone()));
        let usage = Arc::new(UsageFactory::new(&settings.usage));

        let webhook_tasks = WebhookTaskService::new(webhook_store.clone(), settings.webhooks.clone());

        let state = AppState {
            orchestrator,
            analysis_store,
            webhook_store,
            webhook_events,
            audit,
            compliance,
            pricing,
            usage,
            cache,
            database,
        };

        Ok(Self {
            state,
            settings,
            webhook_tasks,
        })
    }

    /// Serve until ctrl-c. Spawns the webhook retry loop for the lifetime
    /// of the server and cancels it on shutdown.
    pub async fn serve(mut self) -> Result<()> {
        self.webhook_tasks.start();

        let bind_addr = self.settings.bind_addr();
        let router = create_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        info!(addr = %listener.local_addr()?, "FinOpsGuard listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        self.webhook_tasks.stop();
        info!("shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

/// Convenience used by tests: a fully in-memory application state.
pub async fn build_test_state() -> AppState {
    let settings = Settings::for_tests();
    Application::build(settings)
        .await
        .expect("test state construction cannot fail")
        .state
}
