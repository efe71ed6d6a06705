use thiserror::Error;

/// Every failure the payment workflow and the portal API client can report.
///
/// None of these are fatal to the application: they are scoped to a single
/// payment action and the user can retry it.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// The request never produced a successful response: transport failure or non-2xx status.
    #[error("Network error{}: {message}", status_suffix(.status))]
    Network {
        status: Option<u16>,
        message: String,
    },
    /// The API answered 2xx but the payload was not a usable payment.
    #[error("Payment rejected by remote API: {0}")]
    RemoteRejected(String),
    /// A verification call failed. The pending marker is kept so the caller can retry.
    #[error("Payment verification failed: {0}")]
    Verification(#[source] Box<PaymentError>),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status carried by a network failure, looking through verification wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            Self::Verification(inner) => inner.status(),
            _ => None,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, PaymentError>;
