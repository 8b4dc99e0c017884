//! Integration tests for the cancellation HTTP API.
//!
//! Requests go through the full router built by `adapters::http::app`, so
//! the request-id, tracing, CORS and timeout layers are all in place.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use event_cancellation::adapters::http::{app, CancellationAppState};
use event_cancellation::adapters::{
    CatalogCancellationListener, InMemoryCancellationRepository, InMemoryEventBus,
    InMemoryEventCatalog, InMemoryMessagingProvider, InMemoryPaymentLedger,
    CANCELLATION_COMPLETED,
};
use event_cancellation::config::ServerConfig;
use event_cancellation::domain::cancellation::ImpactCalculator;
use event_cancellation::domain::catalog::{Event, TicketType};
use event_cancellation::domain::foundation::{EventId, Money, Timestamp, UserId};
use event_cancellation::ports::EventSubscriber;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    ledger: Arc<InMemoryPaymentLedger>,
    event_id: EventId,
}

impl TestApp {
    /// App with one event: 3 "General" at 100,000 and 1 "VIP" at 300,000.
    fn new() -> Self {
        let catalog = Arc::new(InMemoryEventCatalog::new());
        let ledger = Arc::new(InMemoryPaymentLedger::new());
        let bus = Arc::new(InMemoryEventBus::new());
        bus.subscribe(
            CANCELLATION_COMPLETED,
            Arc::new(CatalogCancellationListener::new(catalog.clone())),
        );

        let event = Event {
            id: EventId::new(),
            title: "Autumn Gala".to_string(),
            organizer_id: UserId::new("organizer-1").unwrap(),
            start_date: Timestamp::now().add_days(21),
            end_date: Timestamp::now().add_days(21),
            venue: "Grand Hall".to_string(),
            ticket_types: vec![
                TicketType::new("General", Money::new(100_000), 100, 3),
                TicketType::new("VIP", Money::new(300_000), 10, 1),
            ],
            is_cancelled: false,
        };
        ledger.seed_for_event(&event);
        let event_id = event.id;
        catalog.add_event(event);

        let state = CancellationAppState::new(
            catalog,
            ledger.clone(),
            Arc::new(InMemoryMessagingProvider::new()),
            Arc::new(InMemoryCancellationRepository::new()),
            bus,
            ImpactCalculator::default(),
        );

        Self {
            router: app(state, &ServerConfig::default()),
            ledger,
            event_id,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as("organizer-1", method, uri, body).await
    }

    async fn send_as(
        &self,
        user_id: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("X-User-Id", user_id);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn full_refund(&self) -> Value {
        json!({
            "event_id": self.event_id,
            "compensation_type": "full_refund",
            "processing_method": "automatic",
            "notification_template": "standard"
        })
    }
}

// =============================================================================
// Staged API
// =============================================================================

#[tokio::test]
async fn impact_reports_revenue_and_vip_tickets() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/cancellations/events/{}/impact", app.event_id),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tickets_sold"], 4);
    assert_eq!(body["vip_tickets"], 1);
    assert_eq!(body["gross_revenue"], 600_000);
}

#[tokio::test]
async fn preview_does_not_persist_anything() {
    let app = TestApp::new();
    let request = json!({
        "event_id": app.event_id,
        "reason": "venue_issue",
        "compensation": app.full_refund()
    });

    let (status, body) = app.send("POST", "/api/cancellations/preview", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["subject"].as_str().unwrap().contains("Autumn Gala"));
    assert_eq!(body["recipient_count"], 4);
    assert_eq!(app.ledger.receipt_count(), 0);
}

#[tokio::test]
async fn staged_flow_over_http() {
    let app = TestApp::new();

    let (status, created) = app
        .send(
            "POST",
            "/api/cancellations",
            Some(json!({ "event_id": app.event_id, "reason": "low_ticket_sales" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, planned) = app
        .send("PUT", &format!("/api/cancellations/{}/plan", id), Some(app.full_refund()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(planned["plan"]["total_refund_amount"], 600_000);

    let (status, error) = app
        .send(
            "POST",
            &format!("/api/cancellations/{}/confirm", id),
            Some(json!({ "confirmation_code": "yes" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error_code"], "INVALID_CONFIRMATION_CODE");

    let (status, confirmed) = app
        .send(
            "POST",
            &format!("/api/cancellations/{}/confirm", id),
            Some(json!({ "confirmation_code": "CONFIRM" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, processed) = app
        .send("POST", &format!("/api/cancellations/{}/process", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["cancellation"]["status"], "completed");
    assert_eq!(processed["results"]["refunds_processed"], 4);
    assert_eq!(processed["cancellation"]["refunded_amount"], 600_000);
    let progress = processed["progress"].as_array().unwrap();
    assert_eq!(progress.last().unwrap()["phase"], "finalizing");

    let (status, fetched) = app
        .send("GET", &format!("/api/cancellations/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "completed");
    assert_eq!(fetched["refunds"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn plan_is_frozen_after_confirmation() {
    let app = TestApp::new();
    let (_, created) = app
        .send(
            "POST",
            "/api/cancellations",
            Some(json!({ "event_id": app.event_id, "reason": "force_majeure" })),
        )
        .await;
    let id = created["id"].as_str().unwrap().to_string();
    app.send("PUT", &format!("/api/cancellations/{}/plan", id), Some(app.full_refund()))
        .await;
    app.send(
        "POST",
        &format!("/api/cancellations/{}/confirm", id),
        Some(json!({ "confirmation_code": "confirm" })),
    )
    .await;

    let (status, error) = app
        .send("PUT", &format!("/api/cancellations/{}/plan", id), Some(app.full_refund()))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error_code"], "PLAN_ALREADY_FINALIZED");
}

#[tokio::test]
async fn processor_outage_returns_service_unavailable() {
    let app = TestApp::new();
    let (_, created) = app
        .send(
            "POST",
            "/api/cancellations",
            Some(json!({ "event_id": app.event_id, "reason": "safety_concern" })),
        )
        .await;
    let id = created["id"].as_str().unwrap().to_string();
    app.send("PUT", &format!("/api/cancellations/{}/plan", id), Some(app.full_refund()))
        .await;
    app.send(
        "POST",
        &format!("/api/cancellations/{}/confirm", id),
        Some(json!({ "confirmation_code": "CONFIRM" })),
    )
    .await;
    app.ledger.set_unavailable("gateway timeout");

    let (status, error) = app
        .send("POST", &format!("/api/cancellations/{}/process", id), None)
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["error_code"], "PROCESSOR_UNAVAILABLE");
    assert_eq!(error["details"]["retryable"], true);

    let (_, fetched) = app
        .send("GET", &format!("/api/cancellations/{}", id), None)
        .await;
    assert_eq!(fetched["status"], "failed");
}

#[tokio::test]
async fn non_organizer_is_forbidden() {
    let app = TestApp::new();

    let (status, error) = app
        .send_as(
            "stranger-99",
            "POST",
            "/api/cancellations",
            Some(json!({ "event_id": app.event_id, "reason": "other" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["error_code"], "FORBIDDEN");

    let (_, created) = app
        .send(
            "POST",
            "/api/cancellations",
            Some(json!({ "event_id": app.event_id, "reason": "other" })),
        )
        .await;
    let id = created["id"].as_str().unwrap().to_string();
    app.send("PUT", &format!("/api/cancellations/{}/plan", id), Some(app.full_refund()))
        .await;

    let (status, _) = app
        .send_as(
            "stranger-99",
            "POST",
            &format!("/api/cancellations/{}/confirm", id),
            Some(json!({ "confirmation_code": "CONFIRM" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, fetched) = app
        .send("GET", &format!("/api/cancellations/{}", id), None)
        .await;
    assert_eq!(fetched["status"], "pending");
}

#[tokio::test]
async fn second_confirmation_for_an_event_conflicts() {
    let app = TestApp::new();
    let mut ids = Vec::new();
    for _ in 0..2 {
        let (_, created) = app
            .send(
                "POST",
                "/api/cancellations",
                Some(json!({ "event_id": app.event_id, "reason": "venue_issue" })),
            )
            .await;
        let id = created["id"].as_str().unwrap().to_string();
        app.send("PUT", &format!("/api/cancellations/{}/plan", id), Some(app.full_refund()))
            .await;
        ids.push(id);
    }

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/cancellations/{}/confirm", ids[0]),
            Some(json!({ "confirmation_code": "CONFIRM" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = app
        .send(
            "POST",
            &format!("/api/cancellations/{}/confirm", ids[1]),
            Some(json!({ "confirmation_code": "CONFIRM" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error_code"], "CANCELLATION_IN_PROGRESS");

    let (status, error) = app
        .send(
            "GET",
            &format!("/api/cancellations/events/{}/impact", app.event_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error_code"], "CANCELLATION_IN_PROGRESS");
}

#[tokio::test]
async fn unknown_cancellation_returns_not_found() {
    let app = TestApp::new();

    let (status, error) = app
        .send(
            "GET",
            "/api/cancellations/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error_code"], "CANCELLATION_NOT_FOUND");
}

// =============================================================================
// Wizard
// =============================================================================

#[tokio::test]
async fn wizard_walkthrough_and_submit() {
    let app = TestApp::new();

    let (status, started) = app
        .send(
            "POST",
            "/api/cancellations/wizard",
            Some(json!({ "event_id": app.event_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["can_proceed"], false);

    // Advancing without a reason is rejected
    let mut wizard = started["wizard"].clone();
    let (status, error) = app
        .send(
            "POST",
            "/api/cancellations/wizard/advance",
            Some(json!({ "wizard": wizard })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error_code"], "MISSING_REASON");

    wizard["reason"] = json!("weather_conditions");
    for expected in ["impact", "compensation", "notification", "financial_review"] {
        let (status, body) = app
            .send(
                "POST",
                "/api/cancellations/wizard/advance",
                Some(json!({ "wizard": wizard })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "advancing to {}", expected);
        assert_eq!(body["wizard"]["current_step"], expected);
        wizard = body["wizard"].clone();
    }
    assert_eq!(wizard["plan"]["total_refund_amount"], 600_000);

    wizard["acknowledged_financial_impact"] = json!(true);
    let (_, body) = app
        .send(
            "POST",
            "/api/cancellations/wizard/advance",
            Some(json!({ "wizard": wizard })),
        )
        .await;
    wizard = body["wizard"].clone();
    assert_eq!(wizard["current_step"], "confirm");

    wizard["confirmation_text"] = json!("CONFIRM");
    let (status, submitted) = app
        .send(
            "POST",
            "/api/cancellations/wizard/submit",
            Some(json!({ "wizard": wizard })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submitted["cancellation"]["status"], "completed");
    assert_eq!(submitted["cancellation"]["reason"], "weather_conditions");
    assert_eq!(app.ledger.receipt_count(), 4);
}

#[tokio::test]
async fn wizard_back_from_first_step_conflicts() {
    let app = TestApp::new();
    let (_, started) = app
        .send(
            "POST",
            "/api/cancellations/wizard",
            Some(json!({ "event_id": app.event_id })),
        )
        .await;

    let (status, error) = app
        .send(
            "POST",
            "/api/cancellations/wizard/back",
            Some(json!({ "wizard": started["wizard"] })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error_code"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn requests_without_user_are_unauthorized() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/cancellations")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "event_id": app.event_id, "reason": "other" }).to_string(),
        ))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
