//! Event cancellation HTTP API server.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use event_cancellation::adapters::http::{app, CancellationAppState};
use event_cancellation::adapters::{
    CatalogCancellationListener, InMemoryCancellationRepository, InMemoryEventBus,
    InMemoryEventCatalog, InMemoryMessagingProvider, InMemoryPaymentLedger,
    CANCELLATION_COMPLETED,
};
use event_cancellation::config::AppConfig;
use event_cancellation::domain::cancellation::ImpactCalculator;
use event_cancellation::domain::catalog::{Event, TicketType};
use event_cancellation::domain::foundation::{EventId, Money, Timestamp, UserId};
use event_cancellation::ports::EventSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server.log_level, config.server.log_json);

    let catalog = Arc::new(InMemoryEventCatalog::new());
    let ledger = Arc::new(InMemoryPaymentLedger::new());
    let messaging = Arc::new(InMemoryMessagingProvider::new());
    let repository = Arc::new(InMemoryCancellationRepository::new());
    let bus = Arc::new(InMemoryEventBus::new());

    bus.subscribe(
        CANCELLATION_COMPLETED,
        Arc::new(CatalogCancellationListener::new(catalog.clone())),
    );

    if config.features.seed_demo_data {
        let event = demo_event()?;
        let tickets = ledger.seed_for_event(&event);
        tracing::info!(
            event_id = %event.id,
            title = %event.title,
            tickets = tickets.len(),
            "Seeded demo event"
        );
        catalog.add_event(event);
    }

    let calculator = ImpactCalculator::new(config.policy.to_impact_policy()?);
    let state = CancellationAppState::new(catalog, ledger, messaging, repository, bus, calculator)
        .with_processing(
            config.processing.settings(),
            config.processing.progress_channel_capacity,
        )
        .with_verbose_errors(config.features.verbose_errors || !config.is_production());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Server listening");

    axum::serve(listener, app(state, &config.server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` takes precedence over the configured filter.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn demo_event() -> Result<Event, Box<dyn std::error::Error>> {
    Ok(Event {
        id: EventId::new(),
        title: "Summer Festival".to_string(),
        organizer_id: UserId::new("organizer-1")?,
        start_date: Timestamp::now().add_days(30),
        end_date: Timestamp::now().add_days(31),
        venue: "Riverside Park".to_string(),
        ticket_types: vec![
            TicketType::new("General", Money::new(50_000), 500, 40),
            TicketType::new("VIP", Money::new(200_000), 50, 8),
        ],
        is_cancelled: false,
    })
}
