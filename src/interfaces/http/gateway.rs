use async_trait::async_trait;
use reqwest::Method;

use super::client::ApiClient;
use crate::domain::payment::{InitResponse, InitiatedPayment, PaymentIntent, VerificationResult};
use crate::domain::ports::PaymentGateway;
use crate::error::Result;

/// Payment gateway adapter over `POST /payments/init` and
/// `GET /payments/callback/{reference}`.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    api: ApiClient,
}

impl HttpPaymentGateway {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn init(&self, intent: &PaymentIntent) -> Result<InitiatedPayment> {
        let url = self.api.endpoint(["payments", "init"])?;
        let request = self.api.request(Method::POST, url).json(intent);
        let response: InitResponse = self
            .api
            .send_json(request, "Failed to create payment")
            .await?;
        InitiatedPayment::from_response(response, intent.appointment_id)
    }

    async fn verify(&self, reference: &str) -> Result<VerificationResult> {
        let url = self.api.endpoint(["payments", "callback", reference])?;
        let request = self.api.request(Method::GET, url);
        self.api
            .send_json(request, "Failed to verify payment")
            .await
    }
}
