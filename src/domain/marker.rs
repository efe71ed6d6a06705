use serde::{Deserialize, Serialize, Serializer};

use super::payment::AppointmentId;

/// Durable record linking an in-flight payment reference to its appointment.
///
/// Written when the user is sent to the hosted payment page, removed once a
/// verification observes `completed`. The serialized field names are the
/// portal's legacy storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPaymentMarker {
    #[serde(rename = "pending_payment_ref")]
    pub payment_reference: String,
    #[serde(serialize_with = "serialize_id_as_string")]
    pub appointment_id: AppointmentId,
}

impl PendingPaymentMarker {
    pub fn new(payment_reference: impl Into<String>, appointment_id: AppointmentId) -> Self {
        Self {
            payment_reference: payment_reference.into(),
            appointment_id,
        }
    }

    /// Key under which a store keeps the marker. One marker per appointment.
    pub fn key(&self) -> String {
        marker_key(self.appointment_id)
    }
}

pub fn marker_key(appointment_id: AppointmentId) -> String {
    appointment_id.to_string()
}

fn serialize_id_as_string<S>(id: &AppointmentId, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&id.to_string())
}
