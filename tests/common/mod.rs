#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use carepay::domain::payment::{
    Appointment, AppointmentId, InitiatedPayment, PaymentIntent, PaymentStatus,
    VerificationResult, VerifiedPayment,
};
use carepay::domain::ports::{PaymentGateway, Redirector, SharedObserver};
use carepay::error::{PaymentError, Result};

/// What the scripted gateway answers to `init`.
#[derive(Clone)]
pub enum InitReply {
    Created { reference: String, url: String },
    NetworkFailure,
    Rejected,
}

/// What the scripted gateway answers to one `verify`.
#[derive(Clone)]
pub enum VerifyReply {
    Status(PaymentStatus),
    NetworkFailure,
}

/// In-process payment API with canned answers that records every call.
pub struct ScriptedGateway {
    init_reply: Mutex<InitReply>,
    verify_replies: Mutex<VecDeque<VerifyReply>>,
    default_verify: Mutex<VerifyReply>,
    echoed_appointment: Mutex<Option<AppointmentId>>,
    pub init_calls: Mutex<Vec<PaymentIntent>>,
    pub verify_calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(reference: &str) -> Self {
        Self {
            init_reply: Mutex::new(InitReply::Created {
                reference: reference.to_string(),
                url: format!("https://checkout.example/{reference}"),
            }),
            verify_replies: Mutex::new(VecDeque::new()),
            default_verify: Mutex::new(VerifyReply::Status(PaymentStatus::Pending)),
            echoed_appointment: Mutex::new(None),
            init_calls: Mutex::new(Vec::new()),
            verify_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_init(self, reply: InitReply) -> Self {
        *self.init_reply.lock().unwrap() = reply;
        self
    }

    /// Makes `init` answer with `id` instead of the intent's appointment.
    pub fn echoing_appointment(self, id: AppointmentId) -> Self {
        *self.echoed_appointment.lock().unwrap() = Some(id);
        self
    }

    /// Answer used once the queued replies run out.
    pub fn always_verify(self, reply: VerifyReply) -> Self {
        *self.default_verify.lock().unwrap() = reply;
        self
    }

    pub fn then_verify(self, reply: VerifyReply) -> Self {
        self.verify_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn init_count(&self) -> usize {
        self.init_calls.lock().unwrap().len()
    }

    pub fn verified_references(&self) -> Vec<String> {
        self.verify_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn init(&self, intent: &PaymentIntent) -> Result<InitiatedPayment> {
        self.init_calls.lock().unwrap().push(intent.clone());
        match self.init_reply.lock().unwrap().clone() {
            InitReply::Created { reference, url } => Ok(InitiatedPayment {
                authorization_url: url,
                payment_reference: reference,
                appointment_id: self
                    .echoed_appointment
                    .lock()
                    .unwrap()
                    .unwrap_or(intent.appointment_id),
            }),
            InitReply::NetworkFailure => Err(PaymentError::http_status(
                500,
                "Failed to create payment",
            )),
            InitReply::Rejected => Err(PaymentError::RemoteRejected(
                "response has no authorization_url".to_string(),
            )),
        }
    }

    async fn verify(&self, reference: &str) -> Result<VerificationResult> {
        self.verify_calls.lock().unwrap().push(reference.to_string());
        let reply = self
            .verify_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_verify.lock().unwrap().clone());
        match reply {
            VerifyReply::Status(status) => Ok(VerificationResult {
                payment: VerifiedPayment {
                    status,
                    payment_reference: Some(reference.to_string()),
                    amount: None,
                },
            }),
            VerifyReply::NetworkFailure => Err(PaymentError::network("connection reset")),
        }
    }
}

/// Records the pages the user was sent to.
#[derive(Default)]
pub struct RecordingRedirector {
    pub opened: Mutex<Vec<String>>,
}

impl RecordingRedirector {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Redirector for RecordingRedirector {
    fn open(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Collects the appointments reported as paid.
pub fn recording_observer() -> (SharedObserver, Arc<Mutex<Vec<AppointmentId>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let observer: SharedObserver =
        Arc::new(move |id: AppointmentId| sink.lock().unwrap().push(id));
    (observer, seen)
}

pub fn appointment(id: u64, payment_status: PaymentStatus) -> Appointment {
    Appointment {
        appointment_id: AppointmentId(id),
        patient_id: 3,
        doctor_id: 7,
        appointment_time: Some("2025-03-01T10:00:00Z".to_string()),
        payment_status,
        status: Some("scheduled".to_string()),
        reason: Some("checkup".to_string()),
        authorization_url: None,
        payment_reference: None,
        join_url: None,
        payment_id: None,
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_api(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
