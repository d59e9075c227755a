//! Minimal in-memory collaborators for scheduler and network tests.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::collection::{
    CarRepositoryTrait, CollectibleCar, Photo, PhotoRepositoryTrait,
};
use crate::errors::Result;
use crate::sync::remote::{BarcodeAsset, ObjectPath, RemoteCatalogTrait, RemoteObjectStoreTrait};
use crate::sync::sync_service::SyncService;
use crate::sync::{SyncChannel, SyncEngineStatus, SyncStateRepositoryTrait};

#[derive(Default)]
struct EmptyStores;

#[async_trait]
impl CarRepositoryTrait for EmptyStores {
    fn get_car(&self, _car_id: &str) -> Result<Option<CollectibleCar>> {
        Ok(None)
    }

    fn list_unsynced_cars(&self, _owner_id: &str) -> Result<Vec<CollectibleCar>> {
        Ok(Vec::new())
    }

    fn list_cars_needing_channel_retry(
        &self,
        _channel: SyncChannel,
    ) -> Result<Vec<CollectibleCar>> {
        Ok(Vec::new())
    }

    async fn upsert_car(&self, _car: CollectibleCar) -> Result<()> {
        Ok(())
    }

    async fn mark_car_deleted(&self, _car_id: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_car(&self, _car_id: &str) -> Result<()> {
        Ok(())
    }

    async fn begin_channel_attempt(
        &self,
        _car_id: &str,
        _channel: SyncChannel,
        _attempted_at: i64,
    ) -> Result<()> {
        Ok(())
    }

    async fn complete_channel(
        &self,
        _car_id: &str,
        _channel: SyncChannel,
        _remote_url: Option<String>,
    ) -> Result<()> {
        Ok(())
    }

    async fn fail_channel(
        &self,
        _car_id: &str,
        _channel: SyncChannel,
        _error: String,
        _failed_at: i64,
    ) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl PhotoRepositoryTrait for EmptyStores {
    fn get_photo(&self, _photo_id: &str) -> Result<Option<Photo>> {
        Ok(None)
    }

    fn photos_for_car(&self, _car_id: &str) -> Result<Vec<Photo>> {
        Ok(Vec::new())
    }

    fn list_unsynced_photos(&self, _owner_id: &str) -> Result<Vec<Photo>> {
        Ok(Vec::new())
    }

    async fn upsert_photo(&self, _photo: Photo) -> Result<()> {
        Ok(())
    }

    async fn mark_photo_synced(&self, _photo_id: &str, _remote_path: String) -> Result<()> {
        Ok(())
    }

    async fn mark_photo_deleted(&self, _photo_id: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_photo(&self, _photo_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct EphemeralSyncState {
    last_sync: StdMutex<i64>,
}

#[async_trait]
impl SyncStateRepositoryTrait for EphemeralSyncState {
    fn last_sync_time(&self) -> Result<i64> {
        Ok(*self.last_sync.lock().unwrap_or_else(|p| p.into_inner()))
    }

    async fn set_last_sync_time(&self, at_ms: i64) -> Result<()> {
        *self.last_sync.lock().unwrap_or_else(|p| p.into_inner()) = at_ms;
        Ok(())
    }

    async fn mark_cycle_success(&self, _duration_ms: i64) -> Result<()> {
        Ok(())
    }

    async fn mark_cycle_error(&self, _message: String, _duration_ms: i64) -> Result<()> {
        Ok(())
    }

    fn engine_status(&self) -> Result<SyncEngineStatus> {
        Ok(SyncEngineStatus {
            last_sync_at: self.last_sync_time()?,
            last_error: None,
            consecutive_failures: 0,
            last_cycle_status: None,
            last_cycle_duration_ms: None,
        })
    }
}

#[derive(Default)]
struct QuietCatalog {
    sync_started: Option<mpsc::UnboundedSender<()>>,
}

#[async_trait]
impl RemoteCatalogTrait for QuietCatalog {
    async fn records_changed_since(
        &self,
        _owner_id: &str,
        _since_ms: i64,
    ) -> Result<Vec<CollectibleCar>> {
        if let Some(signal) = &self.sync_started {
            let _ = signal.send(());
        }
        Ok(Vec::new())
    }

    async fn upsert_record(&self, _car: &CollectibleCar) -> Result<()> {
        Ok(())
    }

    async fn delete_record(&self, _owner_id: &str, _car_id: &str) -> Result<()> {
        Ok(())
    }

    async fn find_barcode_asset(&self, _barcode: &str) -> Result<Option<BarcodeAsset>> {
        Ok(None)
    }

    async fn register_barcode_asset(&self, _asset: &BarcodeAsset) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct QuietObjects;

#[async_trait]
impl RemoteObjectStoreTrait for QuietObjects {
    async fn upload_object(
        &self,
        path: &ObjectPath,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String> {
        Ok(format!("https://cdn.test/{}", path.to_path()))
    }

    async fn delete_object(&self, _path: &ObjectPath) -> Result<()> {
        Ok(())
    }
}

fn build_service(catalog: Arc<QuietCatalog>) -> Arc<SyncService> {
    let stores = Arc::new(EmptyStores);
    Arc::new(SyncService::new(
        "owner-test",
        stores.clone(),
        stores,
        Arc::new(EphemeralSyncState::default()),
        catalog,
        Arc::new(QuietObjects),
    ))
}

/// Service over empty stores; every operation is a cheap no-op.
pub(crate) fn noop_service() -> Arc<SyncService> {
    build_service(Arc::new(QuietCatalog::default()))
}

/// Service that signals every started full pass.
pub(crate) fn signalling_service() -> (Arc<SyncService>, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let catalog = Arc::new(QuietCatalog {
        sync_started: Some(tx),
    });
    (build_service(catalog), rx)
}
