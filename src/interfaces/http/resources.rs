use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::client::{ApiClient, decode};
use crate::error::{PaymentError, Result};

/// Collections exposed by the portal API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Patients,
    Doctors,
    Prescriptions,
    Appointments,
    Users,
    Payments,
    PharmacyOrders,
}

impl Resource {
    pub const ALL: [Self; 7] = [
        Self::Patients,
        Self::Doctors,
        Self::Prescriptions,
        Self::Appointments,
        Self::Users,
        Self::Payments,
        Self::PharmacyOrders,
    ];

    /// Top-level collection path.
    pub fn path(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Doctors => "doctors",
            Self::Prescriptions => "prescriptions",
            Self::Appointments => "appointments",
            Self::Users => "users",
            Self::Payments => "payments",
            Self::PharmacyOrders => "pharmacy-orders",
        }
    }

    /// Segment used under `/patients/{segment}/{patient_id}`.
    fn patient_scope(self) -> &'static str {
        match self {
            Self::PharmacyOrders => "pharmacy_orders",
            other => other.path(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Resource {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|r| r.path() == normalized)
            .ok_or_else(|| PaymentError::Validation(format!("unknown resource: {s}")))
    }
}

/// Paging parameters for list calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: String::new(),
        }
    }
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct Count {
    total: u64,
}

/// Generic CRUD access to the portal collections.
#[derive(Clone)]
pub struct ResourceClient {
    api: ApiClient,
}

impl ResourceClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &ListQuery,
    ) -> Result<Page<T>> {
        let url = self.api.endpoint([resource.path()])?;
        let request = self.api.request(Method::GET, url).query(query);
        self.api
            .send_json(request, &format!("Failed to fetch {resource}"))
            .await
    }

    pub async fn get<T: DeserializeOwned>(&self, resource: Resource, id: u64) -> Result<T> {
        let url = self.api.endpoint([resource.path(), id.to_string().as_str()])?;
        let request = self.api.request(Method::GET, url);
        self.api
            .send_json(request, &format!("Failed to fetch {resource} {id}"))
            .await
    }

    pub async fn create<B, T>(&self, resource: Resource, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.api.endpoint([resource.path()])?;
        let request = self.api.request(Method::POST, url).json(body);
        self.api
            .send_json(request, &format!("Failed to create {resource}"))
            .await
    }

    pub async fn update<B, T>(&self, resource: Resource, id: u64, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.api.endpoint([resource.path(), id.to_string().as_str()])?;
        let request = self.api.request(Method::PUT, url).json(body);
        self.api
            .send_json(request, &format!("Failed to update {resource} {id}"))
            .await
    }

    pub async fn delete(&self, resource: Resource, id: u64) -> Result<()> {
        let url = self.api.endpoint([resource.path(), id.to_string().as_str()])?;
        let request = self.api.request(Method::DELETE, url);
        self.api
            .send(request, &format!("Failed to delete {resource} {id}"))
            .await?;
        Ok(())
    }

    pub async fn count(&self, resource: Resource) -> Result<u64> {
        let url = self.api.endpoint([resource.path(), "count"])?;
        let request = self.api.request(Method::GET, url);
        let count: Count = self
            .api
            .send_json(request, &format!("Failed to count {resource}"))
            .await?;
        Ok(count.total)
    }

    /// Records of `resource` belonging to one patient.
    ///
    /// Some endpoints answer with a bare object when there is a single record;
    /// that is returned as a one-element list.
    pub async fn for_patient<T: DeserializeOwned>(
        &self,
        resource: Resource,
        patient_id: u64,
    ) -> Result<Vec<T>> {
        let url = self.api.endpoint([
            Resource::Patients.path(),
            resource.patient_scope(),
            patient_id.to_string().as_str(),
        ])?;
        let request = self.api.request(Method::GET, url);
        let response = self
            .api
            .send(
                request,
                &format!("Failed to fetch {resource} for patient {patient_id}"),
            )
            .await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let value: serde_json::Value = decode(&body)?;
        let items = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Null => Vec::new(),
            single => vec![single],
        };
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| {
                    PaymentError::RemoteRejected(format!("unexpected {resource} record: {e}"))
                })
            })
            .collect()
    }
}
