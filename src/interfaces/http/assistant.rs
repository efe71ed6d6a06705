use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use crate::error::{PaymentError, Result};

#[derive(Debug, Serialize)]
struct AssistantRequest<'a> {
    role: &'static str,
    message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssistantReply {
    pub reply: String,
}

/// The portal's patient assistant, `POST /ai/ava`.
#[derive(Clone)]
pub struct AssistantClient {
    api: ApiClient,
}

impl AssistantClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Sends one patient message and returns the assistant's reply.
    pub async fn ask(&self, message: &str) -> Result<AssistantReply> {
        if message.trim().is_empty() {
            return Err(PaymentError::Validation("message is empty".to_string()));
        }
        let url = self.api.endpoint(["ai", "ava"])?;
        let request = self.api.request(Method::POST, url).json(&AssistantRequest {
            role: "patient",
            message,
        });
        self.api
            .send_json(request, "Failed to fetch from Ava API")
            .await
    }
}
