mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use carepay::application::engine::PaymentWorkflow;
use carepay::application::verification::VerificationSession;
use carepay::config::ApiConfig;
use carepay::domain::marker::PendingPaymentMarker;
use carepay::domain::payment::{AppointmentId, PaymentStatus};
use carepay::domain::ports::{MarkerStore, PaymentGateway};
use carepay::error::PaymentError;
use carepay::infrastructure::in_memory::InMemoryMarkerStore;
use carepay::interfaces::http::client::{ApiClient, StaticToken};
use carepay::interfaces::http::gateway::HttpPaymentGateway;
use common::{RecordingRedirector, appointment, spawn_api};
use serde_json::{Value, json};

#[derive(Default)]
struct PaymentApi {
    init_bodies: Mutex<Vec<Value>>,
    auth_headers: Mutex<Vec<Option<String>>>,
    verified: Mutex<Vec<String>>,
    settled: Mutex<bool>,
}

async fn init_payment(
    State(api): State<Arc<PaymentApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.auth_headers.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    let appointment_id = body["appointment_id"].clone();
    api.init_bodies.lock().unwrap().push(body);
    Json(json!({
        "authorization_url": "https://checkout.example/abc",
        "payment_reference": "abc",
        "appointment_id": appointment_id,
        "status": "pending"
    }))
}

async fn payment_callback(
    State(api): State<Arc<PaymentApi>>,
    Path(reference): Path<String>,
) -> Json<Value> {
    api.verified.lock().unwrap().push(reference.clone());
    let status = if *api.settled.lock().unwrap() {
        "completed"
    } else {
        "pending"
    };
    Json(json!({
        "payment": { "status": status, "payment_reference": reference, "amount": 5000 }
    }))
}

fn payment_router(api: Arc<PaymentApi>) -> Router {
    Router::new()
        .route("/api/payments/init", post(init_payment))
        .route("/api/payments/callback/{reference}", get(payment_callback))
        .with_state(api)
}

fn gateway(base: &str, token: Option<&str>) -> HttpPaymentGateway {
    let config = ApiConfig::new(base, Duration::from_secs(5)).unwrap();
    let tokens = Arc::new(StaticToken::new(token.map(str::to_string)));
    let api = ApiClient::new(&config, tokens).unwrap();
    HttpPaymentGateway::new(api)
}

fn intent() -> carepay::domain::payment::PaymentIntent {
    carepay::domain::payment::PaymentIntent::for_appointment(
        &appointment(12, PaymentStatus::Unpaid),
        "patient@example.com",
    )
}

#[tokio::test]
async fn test_init_posts_intent_with_bearer_token() {
    let api = Arc::new(PaymentApi::default());
    let base = spawn_api(payment_router(api.clone())).await;
    let gateway = gateway(&format!("{base}/api"), Some("t0k"));

    let payment = gateway.init(&intent()).await.unwrap();

    assert_eq!(payment.authorization_url, "https://checkout.example/abc");
    assert_eq!(payment.payment_reference, "abc");
    assert_eq!(payment.appointment_id, AppointmentId(12));

    let body = api.init_bodies.lock().unwrap()[0].clone();
    assert_eq!(body["appointment_id"], 12);
    assert_eq!(body["email"], "patient@example.com");
    assert_eq!(body["payment_method"], "paystack");
    assert_eq!(body["status"], "pending");
    assert_eq!(
        api.auth_headers.lock().unwrap()[0].as_deref(),
        Some("Bearer t0k")
    );
}

#[tokio::test]
async fn test_missing_token_sends_no_authorization_header() {
    let api = Arc::new(PaymentApi::default());
    let base = spawn_api(payment_router(api.clone())).await;

    gateway(&format!("{base}/api"), None)
        .init(&intent())
        .await
        .unwrap();
    assert_eq!(api.auth_headers.lock().unwrap()[0], None);
}

#[tokio::test]
async fn test_verify_reads_callback_endpoint() {
    let api = Arc::new(PaymentApi::default());
    let base = spawn_api(payment_router(api.clone())).await;
    let gateway = gateway(&format!("{base}/api/"), Some("t0k"));

    let pending = gateway.verify("abc").await.unwrap();
    assert_eq!(pending.status(), &PaymentStatus::Pending);

    *api.settled.lock().unwrap() = true;
    let completed = gateway.verify("abc").await.unwrap();
    assert!(completed.is_completed());
    assert_eq!(*api.verified.lock().unwrap(), vec!["abc", "abc"]);
}

#[tokio::test]
async fn test_non_success_status_is_network_error() {
    let router = Router::new()
        .route(
            "/payments/init",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        )
        .route(
            "/payments/callback/{reference}",
            get(|| async { StatusCode::NOT_FOUND }),
        );
    let base = spawn_api(router).await;
    let gateway = gateway(&base, Some("t0k"));

    let err = gateway.init(&intent()).await.unwrap_err();
    assert!(matches!(err, PaymentError::Network { status: Some(502), .. }));
    assert!(err.to_string().contains("upstream down"));

    let err = gateway.verify("abc").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_unusable_success_payload_is_rejected() {
    let router = Router::new()
        .route(
            "/payments/init",
            post(|| async { Json(json!({ "message": "intent invalid" })) }),
        )
        .route(
            "/payments/callback/{reference}",
            get(|| async { "<html>not json</html>" }),
        );
    let base = spawn_api(router).await;
    let gateway = gateway(&base, Some("t0k"));

    assert!(matches!(
        gateway.init(&intent()).await,
        Err(PaymentError::RemoteRejected(_))
    ));
    assert!(matches!(
        gateway.verify("abc").await,
        Err(PaymentError::RemoteRejected(_))
    ));
}

#[tokio::test]
async fn test_unreachable_api_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(&format!("http://{addr}"), None)
        .verify("abc")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Network { status: None, .. }));
}

#[tokio::test]
async fn test_workflow_over_http_settles_payment() {
    let api = Arc::new(PaymentApi::default());
    let base = spawn_api(payment_router(api.clone())).await;
    let markers = InMemoryMarkerStore::new();
    let redirector = Arc::new(RecordingRedirector::default());
    let workflow = PaymentWorkflow::new(
        Arc::new(gateway(&format!("{base}/api"), Some("t0k"))),
        Arc::new(markers.clone()),
        redirector.clone(),
    );

    let appt = appointment(12, PaymentStatus::Unpaid);
    let mut session = PaymentWorkflow::session_for(&appt);
    workflow
        .pay(&mut session, &appt, "patient@example.com")
        .await
        .unwrap();
    assert!(markers.get(AppointmentId(12)).await.unwrap().is_some());
    assert_eq!(redirector.opened(), vec!["https://checkout.example/abc"]);

    // The user completes payment on the hosted page and comes back.
    *api.settled.lock().unwrap() = true;
    let mut remounted = PaymentWorkflow::session_for(&appt);
    let result = workflow.resume(&mut remounted).await.unwrap().unwrap();

    assert!(result.is_completed());
    assert!(remounted.is_completed());
    assert!(markers.all().await.unwrap().is_empty());
    assert_eq!(*api.verified.lock().unwrap(), vec!["abc", "abc"]);
}

#[tokio::test]
async fn test_completed_callback_with_odd_amount_settles_payment() {
    let router = Router::new().route(
        "/payments/callback/{reference}",
        get(|| async {
            Json(json!({
                "payment": {
                    "status": "completed",
                    "payment_reference": 12345,
                    "amount": { "value": 5000, "currency": "KES" }
                }
            }))
        }),
    );
    let base = spawn_api(router).await;
    let markers = InMemoryMarkerStore::new();
    markers
        .put(PendingPaymentMarker::new("abc", AppointmentId(12)))
        .await
        .unwrap();
    let workflow = PaymentWorkflow::new(
        Arc::new(gateway(&base, Some("t0k"))),
        Arc::new(markers.clone()),
        Arc::new(RecordingRedirector::default()),
    );

    let mut session = VerificationSession::new(AppointmentId(12));
    let result = workflow.verify(&mut session).await.unwrap();

    assert!(result.is_completed());
    assert_eq!(result.payment.amount, None);
    assert!(session.is_completed());
    assert!(markers.get(AppointmentId(12)).await.unwrap().is_none());
}
