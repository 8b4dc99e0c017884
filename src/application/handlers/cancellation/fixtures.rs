//! Shared wiring for handler tests.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{
    InMemoryCancellationRepository, InMemoryEventBus, InMemoryEventCatalog,
    InMemoryMessagingProvider, InMemoryPaymentLedger,
};
use crate::domain::cancellation::{
    CancellationReason, CancellationWizard, CompensationRequest, EventCancellation,
    ImpactCalculator, ImpactPolicy,
};
use crate::domain::catalog::{Event, SoldTicket, TicketType};
use crate::domain::foundation::{CommandMetadata, EventId, Money, Rate, Timestamp, UserId};

use super::{
    CalculateImpactHandler, CancellationWorkflow, ConfirmAndProcessHandler,
    ConfirmCancellationCommand, ConfirmCancellationHandler, CreateCancellationCommand,
    CreateCancellationHandler, GetCancellationHandler, PreviewNotificationHandler,
    ProcessCancellationHandler, ProcessingSettings, UpdateCompensationPlanCommand,
    UpdateCompensationPlanHandler,
};

/// How long a `processing` claim stays owned in handler tests.
pub const STALE_CLAIM_AFTER: Duration = Duration::from_secs(600);

pub fn organizer() -> UserId {
    UserId::new("organizer-1").unwrap()
}

pub fn metadata() -> CommandMetadata {
    CommandMetadata::new(organizer()).with_source("test")
}

/// Policy with every fee switched off so refund totals equal revenue.
pub fn no_fee_policy() -> ImpactPolicy {
    ImpactPolicy {
        platform_fee_rate: Rate::ZERO,
        processing_fee_rate: Rate::ZERO,
        ..ImpactPolicy::default()
    }
}

/// "General" 100 × 50,000 and "VIP" 10 × 200,000.
pub fn festival() -> Event {
    Event {
        id: EventId::new(),
        title: "Summer Festival".to_string(),
        organizer_id: organizer(),
        start_date: Timestamp::now().add_days(30),
        end_date: Timestamp::now().add_days(31),
        venue: "Riverside Park".to_string(),
        ticket_types: vec![
            TicketType::new("General", Money::new(50_000), 500, 100),
            TicketType::new("VIP", Money::new(200_000), 50, 10),
        ],
        is_cancelled: false,
    }
}

/// One ticket type with `sold` tickets at 100,000.
pub fn small_event(sold: u32) -> Event {
    Event {
        id: EventId::new(),
        title: "Jazz Night".to_string(),
        organizer_id: organizer(),
        start_date: Timestamp::now().add_days(7),
        end_date: Timestamp::now().add_days(7),
        venue: "Blue Room".to_string(),
        ticket_types: vec![TicketType::new("General", Money::new(100_000), 200, sold)],
        is_cancelled: false,
    }
}

/// In-memory collaborators plus every handler wired to them.
pub struct Harness {
    pub catalog: Arc<InMemoryEventCatalog>,
    pub ledger: Arc<InMemoryPaymentLedger>,
    pub messaging: Arc<InMemoryMessagingProvider>,
    pub repository: Arc<InMemoryCancellationRepository>,
    pub bus: Arc<InMemoryEventBus>,
    pub impact: Arc<CalculateImpactHandler>,
    pub preview: Arc<PreviewNotificationHandler>,
    pub create: Arc<CreateCancellationHandler>,
    pub get: GetCancellationHandler,
    pub update_plan: Arc<UpdateCompensationPlanHandler>,
    pub confirm: Arc<ConfirmCancellationHandler>,
    pub process: Arc<ProcessCancellationHandler>,
    pub confirm_and_process: ConfirmAndProcessHandler,
    pub workflow: CancellationWorkflow,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(no_fee_policy())
    }

    pub fn with_policy(policy: ImpactPolicy) -> Self {
        let catalog = Arc::new(InMemoryEventCatalog::new());
        let ledger = Arc::new(InMemoryPaymentLedger::new());
        let messaging = Arc::new(InMemoryMessagingProvider::new());
        let repository = Arc::new(InMemoryCancellationRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let impact = Arc::new(CalculateImpactHandler::new(
            catalog.clone(),
            ledger.clone(),
            repository.clone(),
            ImpactCalculator::new(policy),
        ));
        let preview = Arc::new(PreviewNotificationHandler::new(ledger.clone()));
        let create = Arc::new(CreateCancellationHandler::new(
            impact.clone(),
            repository.clone(),
            bus.clone(),
        ));
        let get = GetCancellationHandler::new(repository.clone());
        let update_plan = Arc::new(UpdateCompensationPlanHandler::new(
            repository.clone(),
            bus.clone(),
        ));
        let confirm = Arc::new(ConfirmCancellationHandler::new(repository.clone(), bus.clone()));
        let process = Arc::new(ProcessCancellationHandler::new(
            repository.clone(),
            ledger.clone(),
            messaging.clone(),
            bus.clone(),
            ProcessingSettings {
                refund_concurrency: 3,
                notification_concurrency: 4,
                stale_claim_after: STALE_CLAIM_AFTER,
            },
        ));
        let confirm_and_process = ConfirmAndProcessHandler::new(
            create.clone(),
            update_plan.clone(),
            confirm.clone(),
            process.clone(),
        );
        let workflow = CancellationWorkflow::new(impact.clone(), preview.clone());

        Self {
            catalog,
            ledger,
            messaging,
            repository,
            bus,
            impact,
            preview,
            create,
            get,
            update_plan,
            confirm,
            process,
            confirm_and_process,
            workflow,
        }
    }

    /// Adds the event to the catalog and seeds its sold tickets.
    pub fn add_event(&self, event: &Event) -> Vec<SoldTicket> {
        self.catalog.add_event(event.clone());
        self.ledger.seed_for_event(event)
    }
}

/// Creates, plans and confirms a full refund of `event`, which must already
/// be added.
pub async fn confirmed_full_refund(harness: &Harness, event: &Event) -> EventCancellation {
    let created = harness
        .create
        .handle(
            CreateCancellationCommand {
                event_id: event.id,
                reason: CancellationReason::SafetyConcern,
                reason_note: None,
            },
            metadata(),
        )
        .await
        .unwrap();
    harness
        .update_plan
        .handle(
            UpdateCompensationPlanCommand {
                cancellation_id: created.id,
                request: CompensationRequest::full_refund(event.id),
            },
            metadata(),
        )
        .await
        .unwrap();
    harness
        .confirm
        .handle(
            ConfirmCancellationCommand {
                cancellation_id: created.id,
                confirmation_code: "CONFIRM".to_string(),
            },
            metadata(),
        )
        .await
        .unwrap()
}

/// Walks a fresh wizard for `event` to the confirm step with "CONFIRM" typed.
pub async fn ready_wizard(harness: &Harness, event: &Event) -> CancellationWizard {
    let mut wizard = harness.workflow.start(event.id);
    wizard
        .select_reason(CancellationReason::VenueIssue, None)
        .unwrap();
    let wizard = harness.workflow.advance(wizard).await.unwrap();
    let wizard = harness.workflow.advance(wizard).await.unwrap();
    let wizard = harness.workflow.advance(wizard).await.unwrap();
    let mut wizard = harness.workflow.advance(wizard).await.unwrap();
    wizard.acknowledge_financial_impact(true).unwrap();
    let mut wizard = harness.workflow.advance(wizard).await.unwrap();
    wizard.set_confirmation_text("CONFIRM").unwrap();
    wizard
}
