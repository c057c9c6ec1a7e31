use std::sync::Arc;

use anyhow::Context;

use carehub_api::app::{build_app, services};
use carehub_events::{InMemoryEventBus, LifecycleEvent};
use carehub_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    carehub_observability::init();

    let config = AppConfig::from_env()?;

    let bus: Arc<InMemoryEventBus<LifecycleEvent>> = Arc::new(InMemoryEventBus::new());
    let _event_logger = services::spawn_event_logger(&bus);

    let services = services::build_services(&config, bus).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
