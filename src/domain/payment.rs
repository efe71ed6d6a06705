use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PaymentError;

/// Identifier of an appointment in the portal.
///
/// Serialized as a JSON number. Deserialization also accepts a numeric string,
/// since the portal hands ids around as strings in a few places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AppointmentId(pub u64);

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AppointmentId {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| PaymentError::Validation(format!("invalid appointment id: {s:?}")))
    }
}

impl From<u64> for AppointmentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for AppointmentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Payment state of an appointment as reported by the remote API.
///
/// Unknown wire values are kept in `Other` so that an unexpected status reads
/// as "not completed" instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Completed,
    Failed,
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == Self::Completed
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "unpaid" => Self::Unpaid,
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Paystack,
}

/// An appointment as returned by the portal's appointment endpoints.
///
/// Only the fields the payment workflow reads are typed; the rest of the
/// record is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: AppointmentId,
    pub patient_id: u64,
    pub doctor_id: u64,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<u64>,
}

/// A client-side request to begin paying for an appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub appointment_id: AppointmentId,
    pub patient_id: u64,
    pub doctor_id: u64,
    pub email: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: PaymentStatus,
    /// Appointment payments carry no pharmacy order.
    #[serde(default)]
    pub pharmacy_order_id: u64,
    /// Hosted page of an earlier attempt. When set, no new remote intent is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

impl PaymentIntent {
    /// Builds the intent the portal sends when a patient pays for `appointment`.
    pub fn for_appointment(appointment: &Appointment, email: impl Into<String>) -> Self {
        Self {
            appointment_id: appointment.appointment_id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            email: email.into(),
            payment_method: PaymentMethod::Paystack,
            status: PaymentStatus::Pending,
            pharmacy_order_id: 0,
            authorization_url: appointment.authorization_url.clone(),
            payment_reference: appointment.payment_reference.clone(),
        }
    }

    /// The hosted page of a prior attempt, if it is non-empty.
    pub fn existing_authorization_url(&self) -> Option<&str> {
        self.authorization_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// What `POST /payments/init` hands back: where to send the user and how to
/// look the payment up afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiatedPayment {
    pub authorization_url: String,
    pub payment_reference: String,
    pub appointment_id: AppointmentId,
}

impl InitiatedPayment {
    /// Validates a decoded init response.
    ///
    /// `fallback_appointment` is used when the API omits `appointment_id`.
    pub fn from_response(
        response: InitResponse,
        fallback_appointment: AppointmentId,
    ) -> Result<Self, PaymentError> {
        let authorization_url = response
            .authorization_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                PaymentError::RemoteRejected("response has no authorization_url".to_string())
            })?;
        let payment_reference = response
            .payment_reference
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                PaymentError::RemoteRejected("response has no payment_reference".to_string())
            })?;

        Ok(Self {
            authorization_url,
            payment_reference,
            appointment_id: response.appointment_id.unwrap_or(fallback_appointment),
        })
    }
}

/// Raw shape of the init response before validation. Extra fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitResponse {
    #[serde(default)]
    pub authorization_url: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
}

/// Result of `GET /payments/callback/{reference}`. Consumed once per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub payment: VerifiedPayment,
}

/// Only `status` is required. The other fields are informational and read as
/// `None` when the API sends them in a shape we don't understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub status: PaymentStatus,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_reference: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

impl VerificationResult {
    pub fn status(&self) -> &PaymentStatus {
        &self.payment.status
    }

    pub fn is_completed(&self) -> bool {
        self.payment.status.is_completed()
    }
}
