//! Service wiring: verifier, policy, registry, partition store and event bus.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use carehub_auth::{
    AuthorizationGate, CredentialVerifier, Hs256JwtVerifier, KeySet, PermissionPolicy,
};
use carehub_events::{EventBus, InMemoryEventBus, LifecycleEvent, LifecycleNotifier};
use carehub_infra::{
    AppConfig, DataAccess, InMemoryOrganizationRegistry, InMemoryPartitionStore,
    OrganizationRegistry, PartitionStore, PgOrganizationRegistry, PgPartitionStore, load_policy,
};

/// Everything a handler needs, shared across requests.
#[derive(Clone)]
pub struct AppServices {
    pub gate: AuthorizationGate,
    pub data: DataAccess,
    pub request_timeout: Duration,
}

impl AppServices {
    pub fn new<R>(
        verifier: Arc<dyn CredentialVerifier>,
        policy: Arc<PermissionPolicy>,
        registry: Arc<R>,
        partitions: Arc<dyn PartitionStore>,
        notifier: Arc<dyn LifecycleNotifier>,
        request_timeout: Duration,
    ) -> Self
    where
        R: OrganizationRegistry + 'static,
    {
        let gate = AuthorizationGate::new(verifier, policy, registry.clone());
        let data = DataAccess::new(registry, partitions, notifier);
        Self {
            gate,
            data,
            request_timeout,
        }
    }

    /// In-memory backends (dev and tests).
    pub fn in_memory(
        verifier: Arc<dyn CredentialVerifier>,
        policy: Arc<PermissionPolicy>,
        notifier: Arc<dyn LifecycleNotifier>,
        request_timeout: Duration,
    ) -> Self {
        Self::new(
            verifier,
            policy,
            Arc::new(InMemoryOrganizationRegistry::new()),
            Arc::new(InMemoryPartitionStore::new()),
            notifier,
            request_timeout,
        )
    }
}

pub fn verifier_from_config(config: &AppConfig) -> Hs256JwtVerifier {
    let keys = config
        .jwt_keys
        .iter()
        .fold(KeySet::new().with_default_secret(config.jwt_secret.as_bytes()), |keys, (kid, secret)| {
            keys.with_secret(kid.clone(), secret.as_bytes())
        });
    Hs256JwtVerifier::new(keys).with_leeway(chrono::Duration::seconds(config.jwt_leeway_secs))
}

/// Build services from configuration: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise.
pub async fn build_services(
    config: &AppConfig,
    notifier: Arc<dyn LifecycleNotifier>,
) -> anyhow::Result<AppServices> {
    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let policy = Arc::new(load_policy(config.policy_path.as_deref())?);
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(verifier_from_config(config));

    let Some(url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set; using in-memory storage");
        return Ok(AppServices::in_memory(
            verifier,
            policy,
            notifier,
            config.request_timeout,
        ));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.request_timeout)
        .connect(url)
        .await?;

    let registry = Arc::new(PgOrganizationRegistry::new(pool.clone()));
    registry.ensure_schema().await?;
    tracing::info!("using postgres storage");

    Ok(AppServices::new(
        verifier,
        policy,
        registry,
        Arc::new(PgPartitionStore::new(pool)),
        notifier,
        config.request_timeout,
    ))
}

/// Drain lifecycle events into the log on a background thread.
pub fn spawn_event_logger(bus: &InMemoryEventBus<LifecycleEvent>) -> std::thread::JoinHandle<()> {
    let subscription = bus.subscribe();
    std::thread::spawn(move || {
        while let Ok(event) = subscription.recv() {
            tracing::info!(
                event_id = %event.event_id(),
                event_type = %event.event_type(),
                organization_id = %event.organization_id(),
                entity_id = ?event.entity_id(),
                occurred_at = %event.occurred_at(),
                "lifecycle event"
            );
        }
    })
}
