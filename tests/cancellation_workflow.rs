//! Integration tests for the cancellation workflow.
//!
//! These tests drive the application handlers end to end over the in-memory
//! adapters:
//! 1. Staged flow: create, plan, confirm, process
//! 2. Processor outage, storage failure and retry
//! 3. Access and one-cancellation-per-event rules
//! 4. Wizard flow submitted through confirm-and-process

use std::sync::Arc;

use tokio::sync::watch;

use event_cancellation::adapters::http::CancellationAppState;
use event_cancellation::adapters::{
    CatalogCancellationListener, InMemoryCancellationRepository, InMemoryEventBus,
    InMemoryEventCatalog, InMemoryMessagingProvider, InMemoryPaymentLedger,
    CANCELLATION_COMPLETED,
};
use event_cancellation::application::{
    ConfirmAndProcessCommand, ConfirmCancellationCommand, CreateCancellationCommand,
    ProcessCancellationCommand, ProgressReporter, UpdateCompensationPlanCommand,
};
use event_cancellation::domain::cancellation::{
    CancellationError, CancellationReason, CancellationStatus, CompensationRequest,
    ImpactCalculator, ProcessingMethod, ProcessingPhase,
};
use event_cancellation::domain::catalog::{Event, TicketType};
use event_cancellation::domain::foundation::{
    CommandMetadata, EventId, Money, Timestamp, UserId,
};
use event_cancellation::ports::{EventCatalog, EventSubscriber};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct World {
    catalog: Arc<InMemoryEventCatalog>,
    ledger: Arc<InMemoryPaymentLedger>,
    messaging: Arc<InMemoryMessagingProvider>,
    bus: Arc<InMemoryEventBus>,
    repository: Arc<InMemoryCancellationRepository>,
    state: CancellationAppState,
}

impl World {
    fn new() -> Self {
        let catalog = Arc::new(InMemoryEventCatalog::new());
        let ledger = Arc::new(InMemoryPaymentLedger::new());
        let messaging = Arc::new(InMemoryMessagingProvider::new());
        let bus = Arc::new(InMemoryEventBus::new());
        bus.subscribe(
            CANCELLATION_COMPLETED,
            Arc::new(CatalogCancellationListener::new(catalog.clone())),
        );

        let repository = Arc::new(InMemoryCancellationRepository::new());
        let state = CancellationAppState::new(
            catalog.clone(),
            ledger.clone(),
            messaging.clone(),
            repository.clone(),
            bus.clone(),
            ImpactCalculator::default(),
        );

        Self {
            catalog,
            ledger,
            messaging,
            bus,
            repository,
            state,
        }
    }

    /// Registers an event with `sold` tickets at 100,000 each.
    fn add_event(&self, sold: u32) -> Event {
        let event = Event {
            id: EventId::new(),
            title: "Harbour Lights Concert".to_string(),
            organizer_id: organizer(),
            start_date: Timestamp::now().add_days(14),
            end_date: Timestamp::now().add_days(14),
            venue: "Pier 4".to_string(),
            ticket_types: vec![TicketType::new("Standing", Money::new(100_000), 300, sold)],
            is_cancelled: false,
        };
        self.ledger.seed_for_event(&event);
        self.catalog.add_event(event.clone());
        event
    }

    /// Creates, plans and confirms a full refund for `event`.
    async fn confirmed_cancellation(
        &self,
        event: &Event,
        method: ProcessingMethod,
    ) -> event_cancellation::domain::foundation::CancellationId {
        let created = self
            .state
            .create_handler()
            .handle(
                CreateCancellationCommand {
                    event_id: event.id,
                    reason: CancellationReason::WeatherConditions,
                    reason_note: Some("Storm warning for the weekend".to_string()),
                },
                metadata(),
            )
            .await
            .unwrap();

        let request = CompensationRequest {
            processing_method: method,
            ..CompensationRequest::full_refund(event.id)
        };
        self.state
            .update_plan_handler()
            .handle(
                UpdateCompensationPlanCommand {
                    cancellation_id: created.id,
                    request,
                },
                metadata(),
            )
            .await
            .unwrap();

        self.state
            .confirm_handler()
            .handle(
                ConfirmCancellationCommand {
                    cancellation_id: created.id,
                    confirmation_code: " confirm ".to_string(),
                },
                metadata(),
            )
            .await
            .unwrap();

        created.id
    }
}

fn organizer() -> UserId {
    UserId::new("organizer-1").unwrap()
}

fn metadata() -> CommandMetadata {
    CommandMetadata::new(organizer()).with_source("integration-test")
}

// =============================================================================
// Staged Flow
// =============================================================================

#[tokio::test]
async fn staged_flow_refunds_everyone_and_cancels_event() {
    let world = World::new();
    let event = world.add_event(10);

    let id = world
        .confirmed_cancellation(&event, ProcessingMethod::Automatic)
        .await;
    let result = world
        .state
        .process_handler()
        .handle(
            ProcessCancellationCommand { cancellation_id: id },
            metadata(),
            ProgressReporter::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(result.cancellation.status, CancellationStatus::Completed);
    assert_eq!(result.results.refunds_processed, 10);
    assert_eq!(result.results.notifications_sent, 10);
    assert!(!result.results.has_errors);
    assert_eq!(result.cancellation.refunded_amount(), Money::new(1_000_000));
    assert_eq!(world.ledger.receipt_count(), 10);
    assert_eq!(world.messaging.sent_messages().len(), 10);

    let stored = world.catalog.get_event(&event.id).await.unwrap().unwrap();
    assert!(stored.is_cancelled);
    assert!(world.bus.has_event(CANCELLATION_COMPLETED));
}

#[tokio::test]
async fn cancelled_event_cannot_be_cancelled_again() {
    let world = World::new();
    let event = world.add_event(2);
    let id = world
        .confirmed_cancellation(&event, ProcessingMethod::Automatic)
        .await;
    world
        .state
        .process_handler()
        .handle(
            ProcessCancellationCommand { cancellation_id: id },
            metadata(),
            ProgressReporter::disabled(),
        )
        .await
        .unwrap();

    let result = world
        .state
        .create_handler()
        .handle(
            CreateCancellationCommand {
                event_id: event.id,
                reason: CancellationReason::Other,
                reason_note: None,
            },
            metadata(),
        )
        .await;

    assert!(matches!(result, Err(CancellationError::EventAlreadyCancelled(_))));
}

#[tokio::test]
async fn progress_stream_closes_after_final_update() {
    let world = World::new();
    let event = world.add_event(6);
    let id = world
        .confirmed_cancellation(&event, ProcessingMethod::Hybrid)
        .await;

    let (reporter, mut rx) = ProgressReporter::channel(4);
    let collector = tokio::spawn(async move {
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        updates
    });

    world
        .state
        .process_handler()
        .handle(ProcessCancellationCommand { cancellation_id: id }, metadata(), reporter)
        .await
        .unwrap();
    let updates = collector.await.unwrap();

    assert!(updates.windows(2).all(|w| w[0].progress <= w[1].progress));
    let last = updates.last().unwrap();
    assert_eq!(last.phase, ProcessingPhase::Finalizing);
    assert!((last.progress - 1.0).abs() < f64::EPSILON);
}

// =============================================================================
// Outage and Retry
// =============================================================================

#[tokio::test]
async fn processor_outage_fails_then_retry_completes() {
    let world = World::new();
    let event = world.add_event(5);
    let id = world
        .confirmed_cancellation(&event, ProcessingMethod::Automatic)
        .await;

    world.ledger.set_unavailable("maintenance window");
    let failed = world
        .state
        .process_handler()
        .handle(
            ProcessCancellationCommand { cancellation_id: id },
            metadata(),
            ProgressReporter::disabled(),
        )
        .await;
    assert!(matches!(failed, Err(CancellationError::ProcessorUnavailable(_))));

    let stored = world
        .state
        .get_handler()
        .handle(event_cancellation::application::GetCancellationQuery { cancellation_id: id })
        .await
        .unwrap();
    assert_eq!(stored.status, CancellationStatus::Failed);
    assert!(stored.failure_reason.is_some());

    world.ledger.restore();
    let retried = world
        .state
        .process_handler()
        .handle(
            ProcessCancellationCommand { cancellation_id: id },
            metadata(),
            ProgressReporter::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(retried.cancellation.status, CancellationStatus::Completed);
    assert_eq!(retried.results.refunds_processed, 5);
    assert_eq!(world.ledger.receipt_count(), 5);
    // Notifications went out on the first attempt and are not repeated
    assert_eq!(world.messaging.sent_messages().len(), 5);
}

#[tokio::test]
async fn storage_failure_mid_run_is_retryable_without_repeats() {
    let world = World::new();
    let event = world.add_event(5);
    let id = world
        .confirmed_cancellation(&event, ProcessingMethod::Automatic)
        .await;

    // Claim succeeds, the write after notifications fails
    world.repository.fail_update_after(1);
    let failed = world
        .state
        .process_handler()
        .handle(
            ProcessCancellationCommand { cancellation_id: id },
            metadata(),
            ProgressReporter::disabled(),
        )
        .await;
    assert!(matches!(failed, Err(CancellationError::Persistence(_))));

    let stored = world
        .state
        .get_handler()
        .handle(event_cancellation::application::GetCancellationQuery { cancellation_id: id })
        .await
        .unwrap();
    assert_eq!(stored.status, CancellationStatus::Failed);

    let retried = world
        .state
        .process_handler()
        .handle(
            ProcessCancellationCommand { cancellation_id: id },
            metadata(),
            ProgressReporter::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(retried.cancellation.status, CancellationStatus::Completed);
    assert_eq!(world.ledger.receipt_count(), 5);
    assert_eq!(world.messaging.sent_messages().len(), 5);
}

// =============================================================================
// Access and Exclusivity
// =============================================================================

#[tokio::test]
async fn stranger_cannot_cancel_someone_elses_event() {
    let world = World::new();
    let event = world.add_event(3);
    let stranger = UserId::new("stranger-99").unwrap();

    let result = world
        .state
        .create_handler()
        .handle(
            CreateCancellationCommand {
                event_id: event.id,
                reason: CancellationReason::Other,
                reason_note: None,
            },
            CommandMetadata::new(stranger.clone()),
        )
        .await;

    assert_eq!(
        result.unwrap_err(),
        CancellationError::NotOrganizer {
            user_id: stranger,
            event_id: event.id,
        }
    );
    assert!(world.repository.is_empty());
    assert!(world.ledger.refund_requests().is_empty());
}

#[tokio::test]
async fn two_drafts_refund_each_ticket_once() {
    let world = World::new();
    let event = world.add_event(5);
    let rival = world
        .state
        .create_handler()
        .handle(
            CreateCancellationCommand {
                event_id: event.id,
                reason: CancellationReason::VenueIssue,
                reason_note: None,
            },
            metadata(),
        )
        .await
        .unwrap();
    world
        .state
        .update_plan_handler()
        .handle(
            UpdateCompensationPlanCommand {
                cancellation_id: rival.id,
                request: CompensationRequest::full_refund(event.id),
            },
            metadata(),
        )
        .await
        .unwrap();
    let id = world
        .confirmed_cancellation(&event, ProcessingMethod::Automatic)
        .await;

    let rival_confirm = world
        .state
        .confirm_handler()
        .handle(
            ConfirmCancellationCommand {
                cancellation_id: rival.id,
                confirmation_code: "CONFIRM".to_string(),
            },
            metadata(),
        )
        .await;
    assert!(matches!(
        rival_confirm,
        Err(CancellationError::CancellationInProgress { .. })
    ));

    for cancellation_id in [id, rival.id] {
        let _ = world
            .state
            .process_handler()
            .handle(
                ProcessCancellationCommand { cancellation_id },
                metadata(),
                ProgressReporter::disabled(),
            )
            .await;
    }

    assert_eq!(world.ledger.receipt_count(), 5);
    assert_eq!(world.messaging.sent_messages().len(), 5);
}

// =============================================================================
// Wizard Flow
// =============================================================================

#[tokio::test]
async fn wizard_submission_completes_cancellation() {
    let world = World::new();
    let event = world.add_event(4);
    let workflow = world.state.workflow();

    let mut wizard = workflow.start(event.id);
    wizard
        .select_reason(CancellationReason::ArtistUnavailable, None)
        .unwrap();
    for _ in 0..4 {
        wizard = workflow.advance(wizard).await.unwrap();
    }
    wizard.acknowledge_financial_impact(true).unwrap();
    wizard = workflow.advance(wizard).await.unwrap();
    wizard.set_confirmation_text("CONFIRM").unwrap();

    let (_tx, cancel) = watch::channel(false);
    let result = world
        .state
        .confirm_and_process_handler()
        .handle(
            ConfirmAndProcessCommand { wizard },
            metadata(),
            ProgressReporter::disabled(),
            cancel,
        )
        .await
        .unwrap();

    assert_eq!(result.cancellation.status, CancellationStatus::Completed);
    assert_eq!(result.cancellation.reason, CancellationReason::ArtistUnavailable);
    assert_eq!(result.results.refunds_processed, 4);
    assert!(world.catalog.get_event(&event.id).await.unwrap().unwrap().is_cancelled);
}
