use crate::domain::marker::PendingPaymentMarker;
use crate::domain::payment::AppointmentId;
use crate::domain::ports::MarkerStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding pending-payment markers.
pub const CF_PENDING_PAYMENTS: &str = "pending_payments";

/// A persistent marker store backed by RocksDB.
///
/// Markers are keyed by the big-endian appointment id and stored as JSON.
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBMarkerStore {
    db: Arc<DB>,
}

impl RocksDBMarkerStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures the "pending_payments" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_PENDING_PAYMENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_PENDING_PAYMENTS).ok_or_else(|| {
            PaymentError::Storage("pending_payments column family not found".to_string())
        })
    }
}

fn decode(bytes: &[u8]) -> Result<PendingPaymentMarker> {
    serde_json::from_slice(bytes)
        .map_err(|e| PaymentError::Storage(format!("Failed to deserialize marker: {e}")))
}

#[async_trait]
impl MarkerStore for RocksDBMarkerStore {
    async fn put(&self, marker: PendingPaymentMarker) -> Result<()> {
        let key = marker.appointment_id.0.to_be_bytes();
        let value = serde_json::to_vec(&marker)?;
        self.db.put_cf(self.cf()?, key, value)?;
        Ok(())
    }

    async fn get(&self, appointment_id: AppointmentId) -> Result<Option<PendingPaymentMarker>> {
        let key = appointment_id.0.to_be_bytes();
        self.db
            .get_cf(self.cf()?, key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    async fn remove(&self, appointment_id: AppointmentId) -> Result<bool> {
        let cf = self.cf()?;
        let key = appointment_id.0.to_be_bytes();
        let present = self.db.get_pinned_cf(cf, key)?.is_some();
        if present {
            self.db.delete_cf(cf, key)?;
        }
        Ok(present)
    }

    async fn all(&self) -> Result<Vec<PendingPaymentMarker>> {
        let cf = self.cf()?;
        let mut markers = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            markers.push(decode(&value)?);
        }
        Ok(markers)
    }
}
