use crate::domain::marker::{PendingPaymentMarker, marker_key};
use crate::domain::payment::AppointmentId;
use crate::domain::ports::MarkerStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

type MarkerMap = BTreeMap<String, PendingPaymentMarker>;

/// A marker store persisted as a single JSON document.
///
/// The document is an object keyed by appointment id. Every mutation rewrites
/// the whole file through a temporary sibling and a rename, so a crash never
/// leaves a half-written document behind. A missing file reads as empty.
pub struct JsonFileMarkerStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileMarkerStore {
    /// Opens the store at `path`, creating parent directories if needed.
    ///
    /// The file itself is only created on the first write.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<MarkerMap> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(MarkerMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                PaymentError::Storage(format!(
                    "marker file {} is corrupt: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(MarkerMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, markers: &MarkerMap) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(markers)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl MarkerStore for JsonFileMarkerStore {
    async fn put(&self, marker: PendingPaymentMarker) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut markers = self.load().await?;
        markers.insert(marker.key(), marker);
        self.save(&markers).await
    }

    async fn get(&self, appointment_id: AppointmentId) -> Result<Option<PendingPaymentMarker>> {
        let _guard = self.lock.lock().await;
        let mut markers = self.load().await?;
        Ok(markers.remove(&marker_key(appointment_id)))
    }

    async fn remove(&self, appointment_id: AppointmentId) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut markers = self.load().await?;
        if markers.remove(&marker_key(appointment_id)).is_none() {
            return Ok(false);
        }
        self.save(&markers).await?;
        Ok(true)
    }

    async fn all(&self) -> Result<Vec<PendingPaymentMarker>> {
        let _guard = self.lock.lock().await;
        let mut markers: Vec<_> = self.load().await?.into_values().collect();
        markers.sort_by_key(|m| m.appointment_id);
        Ok(markers)
    }
}
