use crate::application::initiation::{Initiation, PaymentInitiator};
use crate::application::verification::{PaymentVerifier, VerificationSession};
use crate::domain::payment::{Appointment, PaymentIntent, PaymentStatus, VerificationResult};
use crate::domain::ports::{SharedGateway, SharedMarkerStore, SharedObserver, SharedRedirector};
use crate::error::Result;

/// Result of the "pay" action for one appointment.
#[derive(Debug, Clone, PartialEq)]
pub enum PayOutcome {
    /// The appointment was already paid for; nothing was sent.
    AlreadyPaid,
    /// The payment was already pending, so it was only verified.
    Verified(VerificationResult),
    /// The user was sent to a hosted page and one verification was attempted.
    /// `verification` is `None` when that attempt failed; the session carries
    /// the message.
    Redirected {
        initiation: Initiation,
        verification: Option<VerificationResult>,
    },
}

/// The patient-facing payment workflow for appointments.
///
/// Owns an initiator and a verifier sharing the same gateway and marker store.
/// Verification state lives in the caller's [`VerificationSession`], one per
/// appointment being shown.
pub struct PaymentWorkflow {
    initiator: PaymentInitiator,
    verifier: PaymentVerifier,
}

impl PaymentWorkflow {
    /// Creates a new `PaymentWorkflow`.
    ///
    /// # Arguments
    ///
    /// * `gateway` - The remote payment API.
    /// * `markers` - Durable store for pending-payment markers.
    /// * `redirector` - Where hosted payment pages are sent.
    pub fn new(
        gateway: SharedGateway,
        markers: SharedMarkerStore,
        redirector: SharedRedirector,
    ) -> Self {
        Self {
            initiator: PaymentInitiator::new(gateway.clone(), markers.clone(), redirector),
            verifier: PaymentVerifier::new(gateway, markers),
        }
    }

    /// Registers the callback run when a payment is confirmed, typically a
    /// refetch of the appointment list.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.verifier = self.verifier.with_observer(observer);
        self
    }

    pub fn verifier(&self) -> &PaymentVerifier {
        &self.verifier
    }

    /// Starts a session for `appointment`, seeded with its known reference.
    pub fn session_for(appointment: &Appointment) -> VerificationSession {
        let session = VerificationSession::new(appointment.appointment_id);
        match appointment
            .payment_reference
            .as_deref()
            .filter(|r| !r.trim().is_empty())
        {
            Some(reference) => session.with_reference(reference),
            None => session,
        }
    }

    /// Handles the appointment's payment button.
    ///
    /// Completed appointments are left alone, pending ones are verified, and
    /// anything else is sent to a hosted payment page (reusing an existing one
    /// if the appointment already has it) followed by one verification.
    pub async fn pay(
        &self,
        session: &mut VerificationSession,
        appointment: &Appointment,
        email: &str,
    ) -> Result<PayOutcome> {
        match appointment.payment_status {
            PaymentStatus::Completed => return Ok(PayOutcome::AlreadyPaid),
            PaymentStatus::Pending => {
                return self.verifier.verify(session).await.map(PayOutcome::Verified);
            }
            _ => {}
        }

        let intent = PaymentIntent::for_appointment(appointment, email);
        session.set_initiating(true);
        let started = self.initiator.start(&intent).await;
        session.set_initiating(false);
        let initiation = started?;

        // The hosted page is open; check once in case the payment settled already.
        let verification = match self.verifier.verify(session).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!(error = %e, "Verification right after redirect failed");
                None
            }
        };

        Ok(PayOutcome::Redirected {
            initiation,
            verification,
        })
    }

    /// Verification on mount. See [`PaymentVerifier::resume`].
    pub async fn resume(
        &self,
        session: &mut VerificationSession,
    ) -> Result<Option<VerificationResult>> {
        self.verifier.resume(session).await
    }

    /// Explicit "Verify Payment" action.
    pub async fn verify(&self, session: &mut VerificationSession) -> Result<VerificationResult> {
        self.verifier.verify(session).await
    }
}

/// Text of the payment control for `appointment` given its session.
pub fn button_label(appointment: &Appointment, session: &VerificationSession) -> &'static str {
    if session.is_initiating() {
        return "Initializing Payment...";
    }
    if session.is_verifying() {
        return "Verifying Payment...";
    }
    if session.is_completed() {
        return "Payment Completed";
    }
    if session.attempts() > 0 && appointment.payment_status != PaymentStatus::Completed {
        // A previous attempt left the payment unsettled.
        return "Verify Payment";
    }
    match appointment.payment_status {
        PaymentStatus::Completed => "Payment Completed",
        PaymentStatus::Pending => "Verify Payment",
        _ => "Make Payment",
    }
}
