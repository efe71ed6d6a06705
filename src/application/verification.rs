use crate::domain::payment::{AppointmentId, VerificationResult};
use crate::domain::ports::{SharedGateway, SharedMarkerStore, SharedObserver};
use crate::error::{PaymentError, Result};

/// Shown when the verification call itself fails.
pub const VERIFICATION_FAILED_MESSAGE: &str =
    "Payment verification failed. Please refresh to check status.";

/// Where a single appointment's payment verification stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    /// Nothing in flight. `last_error` is what the user should see next to the
    /// "Verify Payment" control, if the previous attempt did not succeed.
    Idle { last_error: Option<String> },
    Verifying { attempt: u64 },
    Completed,
}

impl Default for VerificationState {
    fn default() -> Self {
        Self::Idle { last_error: None }
    }
}

/// What an attempt observed, before it is applied to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Completed,
    NotCompleted { status: String },
    Failed,
}

/// Per-appointment verification state held by whoever shows the appointment.
///
/// Not persisted. Each attempt is tagged with a sequence number and only the
/// most recently started attempt may change the state; responses for older
/// attempts are dropped.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    appointment_id: AppointmentId,
    payment_reference: Option<String>,
    state: VerificationState,
    latest_attempt: u64,
    initiating: bool,
    resumed: bool,
}

impl VerificationSession {
    pub fn new(appointment_id: AppointmentId) -> Self {
        Self {
            appointment_id,
            payment_reference: None,
            state: VerificationState::default(),
            latest_attempt: 0,
            initiating: false,
            resumed: false,
        }
    }

    /// Reference to fall back to when no marker is stored for the appointment.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    pub fn appointment_id(&self) -> AppointmentId {
        self.appointment_id
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    pub fn is_verifying(&self) -> bool {
        matches!(self.state, VerificationState::Verifying { .. })
    }

    pub fn is_completed(&self) -> bool {
        self.state == VerificationState::Completed
    }

    /// Number of verification attempts started in this session.
    pub fn attempts(&self) -> u64 {
        self.latest_attempt
    }

    pub fn is_initiating(&self) -> bool {
        self.initiating
    }

    pub(crate) fn set_initiating(&mut self, initiating: bool) {
        self.initiating = initiating;
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            VerificationState::Idle { last_error } => last_error.as_deref(),
            _ => None,
        }
    }

    /// Starts a new attempt and returns its sequence number.
    pub fn begin(&mut self) -> u64 {
        self.latest_attempt += 1;
        self.state = VerificationState::Verifying {
            attempt: self.latest_attempt,
        };
        self.latest_attempt
    }

    /// Applies the outcome of `attempt`. Returns `false` if a newer attempt
    /// has started since, in which case the session is left untouched.
    pub fn resolve(&mut self, attempt: u64, outcome: &VerificationOutcome) -> bool {
        if attempt != self.latest_attempt {
            tracing::debug!(
                appointment_id = %self.appointment_id,
                attempt,
                latest = self.latest_attempt,
                "Discarding stale verification result"
            );
            return false;
        }

        self.state = match outcome {
            VerificationOutcome::Completed => VerificationState::Completed,
            VerificationOutcome::NotCompleted { status } => VerificationState::Idle {
                last_error: Some(format!(
                    "Payment not completed yet (status: {status}). Use Verify Payment to check again."
                )),
            },
            VerificationOutcome::Failed => VerificationState::Idle {
                last_error: Some(VERIFICATION_FAILED_MESSAGE.to_string()),
            },
        };
        true
    }
}

/// Confirms with the payment API whether a redirected payment has settled.
pub struct PaymentVerifier {
    gateway: SharedGateway,
    markers: SharedMarkerStore,
    observer: Option<SharedObserver>,
}

impl PaymentVerifier {
    pub fn new(gateway: SharedGateway, markers: SharedMarkerStore) -> Self {
        Self {
            gateway,
            markers,
            observer: None,
        }
    }

    /// Registers the callback invoked whenever a payment is seen as completed.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Reference used to look the appointment's payment up.
    ///
    /// The stored marker wins. Without one, the session's known reference is
    /// used, and failing that the appointment id itself, which the callback
    /// endpoint also accepts.
    pub async fn reference_for(&self, session: &VerificationSession) -> Result<String> {
        let appointment_id = session.appointment_id();
        if let Some(marker) = self.markers.get(appointment_id).await? {
            return Ok(marker.payment_reference);
        }
        Ok(session
            .payment_reference
            .clone()
            .unwrap_or_else(|| appointment_id.to_string()))
    }

    /// Performs one verification call for `appointment_id` using `reference`.
    ///
    /// On `completed` the marker is removed and the observer notified. Any
    /// other status, and any failure, leaves the marker in place so the user
    /// can retry.
    pub async fn check(
        &self,
        appointment_id: AppointmentId,
        reference: &str,
    ) -> Result<VerificationResult> {
        let result = self
            .gateway
            .verify(reference)
            .await
            .map_err(|e| PaymentError::Verification(Box::new(e)))?;

        if result.is_completed() {
            if self.markers.remove(appointment_id).await? {
                tracing::debug!(%appointment_id, "Pending payment marker removed");
            }
            tracing::info!(%appointment_id, reference, "Payment verified");
            if let Some(observer) = &self.observer {
                observer.payment_verified(appointment_id);
            }
        } else {
            tracing::info!(
                %appointment_id,
                reference,
                status = %result.status(),
                "Payment not completed yet"
            );
        }
        Ok(result)
    }

    /// Runs one full attempt against `session`: Idle → Verifying → Completed or Idle.
    ///
    /// A network failure is returned as [`PaymentError::Verification`] after the
    /// session has been moved back to Idle with a generic message.
    pub async fn verify(&self, session: &mut VerificationSession) -> Result<VerificationResult> {
        let attempt = session.begin();
        let appointment_id = session.appointment_id();

        let checked = match self.reference_for(session).await {
            Ok(reference) => self.check(appointment_id, &reference).await,
            Err(e) => Err(e),
        };

        match checked {
            Ok(result) => {
                let outcome = if result.is_completed() {
                    VerificationOutcome::Completed
                } else {
                    VerificationOutcome::NotCompleted {
                        status: result.status().to_string(),
                    }
                };
                session.resolve(attempt, &outcome);
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(%appointment_id, error = %e, "Payment verification failed");
                session.resolve(attempt, &VerificationOutcome::Failed);
                Err(e)
            }
        }
    }

    /// Verification on mount: runs exactly once per session, and only when a
    /// pending marker exists for the session's appointment.
    ///
    /// Returns `None` when nothing was attempted.
    pub async fn resume(
        &self,
        session: &mut VerificationSession,
    ) -> Result<Option<VerificationResult>> {
        if session.resumed {
            return Ok(None);
        }
        session.resumed = true;

        if self.markers.get(session.appointment_id()).await?.is_none() {
            return Ok(None);
        }
        tracing::info!(
            appointment_id = %session.appointment_id(),
            "Resuming verification of pending payment"
        );
        self.verify(session).await.map(Some)
    }
}
