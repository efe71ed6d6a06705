use crate::domain::marker::PendingPaymentMarker;
use crate::domain::payment::AppointmentId;
use crate::domain::ports::MarkerStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory marker store.
///
/// Markers live only as long as the process. Clones share the same map, so a
/// clone handed to a verifier sees what an initiator wrote.
#[derive(Default, Clone)]
pub struct InMemoryMarkerStore {
    markers: Arc<RwLock<BTreeMap<AppointmentId, PendingPaymentMarker>>>,
}

impl InMemoryMarkerStore {
    /// Creates a new, empty in-memory marker store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarkerStore for InMemoryMarkerStore {
    async fn put(&self, marker: PendingPaymentMarker) -> Result<()> {
        let mut markers = self.markers.write().await;
        markers.insert(marker.appointment_id, marker);
        Ok(())
    }

    async fn get(&self, appointment_id: AppointmentId) -> Result<Option<PendingPaymentMarker>> {
        let markers = self.markers.read().await;
        Ok(markers.get(&appointment_id).cloned())
    }

    async fn remove(&self, appointment_id: AppointmentId) -> Result<bool> {
        let mut markers = self.markers.write().await;
        Ok(markers.remove(&appointment_id).is_some())
    }

    async fn all(&self) -> Result<Vec<PendingPaymentMarker>> {
        let markers = self.markers.read().await;
        Ok(markers.values().cloned().collect())
    }
}
