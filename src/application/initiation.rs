use crate::domain::marker::PendingPaymentMarker;
use crate::domain::payment::{AppointmentId, InitiatedPayment, PaymentIntent};
use crate::domain::ports::{SharedGateway, SharedMarkerStore, SharedRedirector};
use crate::error::Result;

/// How an initiation request was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initiation {
    /// A new remote payment was created.
    Created(InitiatedPayment),
    /// The intent already pointed at a hosted page, which was reused.
    Reused {
        appointment_id: AppointmentId,
        authorization_url: String,
        payment_reference: Option<String>,
    },
}

impl Initiation {
    pub fn authorization_url(&self) -> &str {
        match self {
            Self::Created(payment) => &payment.authorization_url,
            Self::Reused {
                authorization_url, ..
            } => authorization_url,
        }
    }

    pub fn payment_reference(&self) -> Option<&str> {
        match self {
            Self::Created(payment) => Some(&payment.payment_reference),
            Self::Reused {
                payment_reference, ..
            } => payment_reference.as_deref(),
        }
    }
}

/// Requests hosted payment pages and records where the user was sent.
pub struct PaymentInitiator {
    gateway: SharedGateway,
    markers: SharedMarkerStore,
    redirector: SharedRedirector,
}

impl PaymentInitiator {
    pub fn new(
        gateway: SharedGateway,
        markers: SharedMarkerStore,
        redirector: SharedRedirector,
    ) -> Self {
        Self {
            gateway,
            markers,
            redirector,
        }
    }

    /// Creates a remote payment for `intent`, persists the pending marker and
    /// opens the hosted page.
    ///
    /// The marker is written before the redirect so that a user who never
    /// comes back to this view still has their payment verified on next mount.
    pub async fn initiate(&self, intent: &PaymentIntent) -> Result<InitiatedPayment> {
        tracing::info!(appointment_id = %intent.appointment_id, "Initializing payment");
        let payment = self.gateway.init(intent).await?;

        // Keyed by the appointment being paid, whatever id the API echoes.
        self.markers
            .put(PendingPaymentMarker::new(
                payment.payment_reference.clone(),
                intent.appointment_id,
            ))
            .await?;
        tracing::debug!(
            appointment_id = %intent.appointment_id,
            reference = %payment.payment_reference,
            "Pending payment marker written"
        );

        self.redirector.open(&payment.authorization_url)?;
        Ok(payment)
    }

    /// Like [`initiate`](Self::initiate), but reuses the hosted page of an
    /// earlier attempt instead of creating a duplicate remote payment.
    pub async fn start(&self, intent: &PaymentIntent) -> Result<Initiation> {
        let Some(url) = intent.existing_authorization_url() else {
            return self.initiate(intent).await.map(Initiation::Created);
        };

        tracing::info!(
            appointment_id = %intent.appointment_id,
            "Reusing existing payment page"
        );
        let reference = intent
            .payment_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned);
        if let Some(reference) = &reference {
            self.markers
                .put(PendingPaymentMarker::new(
                    reference.clone(),
                    intent.appointment_id,
                ))
                .await?;
        }

        self.redirector.open(url)?;
        Ok(Initiation::Reused {
            appointment_id: intent.appointment_id,
            authorization_url: url.to_owned(),
            payment_reference: reference,
        })
    }
}
