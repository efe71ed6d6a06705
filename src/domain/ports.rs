use super::marker::PendingPaymentMarker;
use super::payment::{AppointmentId, InitiatedPayment, PaymentIntent, VerificationResult};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable client-side storage for pending-payment markers.
///
/// Stores are keyed by appointment: `put` replaces any marker already held for
/// the same appointment.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn put(&self, marker: PendingPaymentMarker) -> Result<()>;
    async fn get(&self, appointment_id: AppointmentId) -> Result<Option<PendingPaymentMarker>>;
    /// Returns whether a marker was present. Removing a missing marker is not an error.
    async fn remove(&self, appointment_id: AppointmentId) -> Result<bool>;
    async fn all(&self) -> Result<Vec<PendingPaymentMarker>>;
}

/// The remote payment API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote payment for `intent` and returns its hosted page.
    async fn init(&self, intent: &PaymentIntent) -> Result<InitiatedPayment>;
    /// Reads the settlement state of a payment. Read-only, so safe to repeat.
    async fn verify(&self, reference: &str) -> Result<VerificationResult>;
}

/// Hands the hosted payment page to the user without blocking the caller.
pub trait Redirector: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Source of the bearer token attached to API requests.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// Notified when a verification observes a completed payment, so the caller
/// can refresh whatever it shows for that appointment.
pub trait PaymentObserver: Send + Sync {
    fn payment_verified(&self, appointment_id: AppointmentId);
}

impl<F> PaymentObserver for F
where
    F: Fn(AppointmentId) + Send + Sync,
{
    fn payment_verified(&self, appointment_id: AppointmentId) {
        self(appointment_id)
    }
}

pub type MarkerStoreBox = Box<dyn MarkerStore>;

pub type SharedMarkerStore = Arc<dyn MarkerStore>;
pub type SharedGateway = Arc<dyn PaymentGateway>;
pub type SharedRedirector = Arc<dyn Redirector>;
pub type SharedObserver = Arc<dyn PaymentObserver>;
