//! Sync orchestration: the full synchronization pass and the per-record
//! incremental (priority) path.
//!
//! The pass is at-least-once rather than transactional: every step is an
//! idempotent upsert or status transition, so re-running from any partial
//! state converges. Partial progress is never rolled back.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};

use crate::collection::{CarRepositoryTrait, CollectibleCar, PhotoRepositoryTrait};
use crate::errors::{Error, Result};
use crate::sync::conflict_resolver::{resolve, Resolution};
use crate::sync::remote::{
    photo_object_path, BarcodeAsset, ObjectPath, RemoteCatalogTrait, RemoteObjectStoreTrait,
};
use crate::sync::{
    SyncChannel, SyncReport, SyncState, SyncStateRepositoryTrait, SyncStatus,
};
use crate::utils::time::now_millis;

/// Unforced full passes younger than this are skipped.
pub const MIN_FULL_SYNC_INTERVAL_MS: i64 = 60 * 60 * 1000;

const THUMBNAIL_ASSET: &str = "thumbnail.jpg";
const FULL_PHOTO_ASSET: &str = "full.jpg";
const BARCODE_ASSET: &str = "barcode.jpg";
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Orchestrates synchronization between the local store and the remote
/// catalog/object services for one owner. All collaborators are injected;
/// nothing here touches ambient state.
pub struct SyncService {
    owner_id: String,
    cars: Arc<dyn CarRepositoryTrait>,
    photos: Arc<dyn PhotoRepositoryTrait>,
    state: Arc<dyn SyncStateRepositoryTrait>,
    catalog: Arc<dyn RemoteCatalogTrait>,
    objects: Arc<dyn RemoteObjectStoreTrait>,
    sync_state_tx: watch::Sender<SyncState>,
    /// One incremental pass per record at a time.
    incremental_in_flight: Mutex<HashSet<String>>,
}

impl SyncService {
    pub fn new(
        owner_id: impl Into<String>,
        cars: Arc<dyn CarRepositoryTrait>,
        photos: Arc<dyn PhotoRepositoryTrait>,
        state: Arc<dyn SyncStateRepositoryTrait>,
        catalog: Arc<dyn RemoteCatalogTrait>,
        objects: Arc<dyn RemoteObjectStoreTrait>,
    ) -> Self {
        let (sync_state_tx, _) = watch::channel(SyncState::Idle);
        Self {
            owner_id: owner_id.into(),
            cars,
            photos,
            state,
            catalog,
            objects,
            sync_state_tx,
            incremental_in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Coarse engine state for UI display.
    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.sync_state_tx.subscribe()
    }

    /// One full synchronization pass. Local pushes run strictly before
    /// remote application, and the checkpoint advances only on overall
    /// success.
    pub async fn sync(&self, force: bool) -> Result<SyncReport> {
        let last_sync = self.state.last_sync_time()?;
        if !force && now_millis().saturating_sub(last_sync) < MIN_FULL_SYNC_INTERVAL_MS {
            debug!("Skipping full sync, checkpoint is fresh enough");
            self.sync_state_tx.send_replace(SyncState::Idle);
            return Ok(SyncReport::skipped());
        }

        self.sync_state_tx.send_replace(SyncState::Syncing);
        let started = Instant::now();

        match self.run_full_pass(last_sync).await {
            Ok(mut report) => {
                report.duration_ms = started.elapsed().as_millis() as i64;
                self.state.set_last_sync_time(now_millis()).await?;
                self.state.mark_cycle_success(report.duration_ms).await?;
                self.sync_state_tx.send_replace(SyncState::Success);
                info!(
                    "Full sync done: {} pushed, {} deleted, {} photos up, {} photos gone, {} applied ({} ms)",
                    report.pushed_records,
                    report.deleted_records,
                    report.uploaded_photos,
                    report.deleted_photos,
                    report.applied_records,
                    report.duration_ms
                );
                Ok(report)
            }
            Err(err) => {
                let message = err.to_string();
                let duration_ms = started.elapsed().as_millis() as i64;
                if let Err(state_err) = self
                    .state
                    .mark_cycle_error(message.clone(), duration_ms)
                    .await
                {
                    warn!("Failed to record sync cycle error: {state_err}");
                }
                self.sync_state_tx.send_replace(SyncState::Error(message));
                Err(err)
            }
        }
    }

    async fn run_full_pass(&self, since_ms: i64) -> Result<SyncReport> {
        let local_changes = self.cars.list_unsynced_cars(&self.owner_id)?;
        let photo_changes = self.photos.list_unsynced_photos(&self.owner_id)?;
        let remote_changes = self
            .catalog
            .records_changed_since(&self.owner_id, since_ms)
            .await?;
        debug!(
            "Full pass: {} local, {} photos, {} remote since {}",
            local_changes.len(),
            photo_changes.len(),
            remote_changes.len(),
            since_ms
        );

        let Resolution { to_push, to_apply } = resolve(local_changes, remote_changes);
        let mut report = SyncReport::default();

        // Push before pull application, so a record pushed by this pass is
        // not clobbered by a stale remote read from the same pass.
        for car in &to_push {
            if car.is_deleted {
                self.catalog.delete_record(&self.owner_id, &car.id).await?;
                self.delete_remote_assets(car).await?;
                self.cars.delete_car(&car.id).await?;
                report.deleted_records += 1;
            } else {
                self.catalog.upsert_record(car).await?;
                self.cars
                    .complete_channel(&car.id, SyncChannel::Metadata, None)
                    .await?;
                report.pushed_records += 1;
            }
        }

        for photo in &photo_changes {
            match photo.sync_status {
                SyncStatus::PendingDelete => {
                    // Shared barcode assets stay; only owned objects go.
                    if photo.remote_path.is_some() && !photo.contributes_globally() {
                        self.objects
                            .delete_object(&photo_object_path(photo, &self.owner_id))
                            .await?;
                    }
                    self.photos.delete_photo(&photo.id).await?;
                    report.deleted_photos += 1;
                }
                SyncStatus::Synced => {}
                _ => {
                    let path = photo_object_path(photo, &self.owner_id);
                    let bytes = tokio::fs::read(&photo.local_path).await?;
                    let content_type = photo.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME);
                    let url = self.objects.upload_object(&path, bytes, content_type).await?;
                    self.photos.mark_photo_synced(&photo.id, url).await?;
                    report.uploaded_photos += 1;
                }
            }
        }

        for car in to_apply {
            if car.is_deleted {
                self.cars.delete_car(&car.id).await?;
            } else {
                self.cars.upsert_car(car.into_adopted()).await?;
            }
            report.applied_records += 1;
        }

        Ok(report)
    }

    /// Delete the owned remote objects of a record being torn down. The
    /// shared barcode namespace is left alone.
    async fn delete_remote_assets(&self, car: &CollectibleCar) -> Result<()> {
        for (channel, asset) in [
            (SyncChannel::Thumbnail, THUMBNAIL_ASSET),
            (SyncChannel::FullPhoto, FULL_PHOTO_ASSET),
        ] {
            if car.channel(channel).remote_url.is_some() {
                self.objects
                    .delete_object(&ObjectPath::owned(
                        self.owner_id.as_str(),
                        car.id.as_str(),
                        asset,
                    ))
                    .await?;
            }
        }
        for photo in self.photos.photos_for_car(&car.id)? {
            if photo.remote_path.is_some() && !photo.contributes_globally() {
                self.objects
                    .delete_object(&photo_object_path(&photo, &self.owner_id))
                    .await?;
            }
        }
        Ok(())
    }

    /// Per-record priority sync: thumbnail, then metadata, then the full
    /// photo, then the barcode image. A channel failure is recorded on that
    /// channel and never blocks the later steps.
    pub async fn sync_incremental(&self, car_id: &str) -> Result<()> {
        {
            let mut in_flight = self.incremental_in_flight.lock().await;
            if !in_flight.insert(car_id.to_string()) {
                debug!("Incremental sync already in flight for {car_id}, skipping");
                return Ok(());
            }
        }
        let result = self.run_incremental(car_id).await;
        self.incremental_in_flight.lock().await.remove(car_id);
        result
    }

    async fn run_incremental(&self, car_id: &str) -> Result<()> {
        let Some(car) = self.cars.get_car(car_id)? else {
            warn!("Record {car_id} not found locally, nothing to sync");
            return Ok(());
        };
        if car.is_deleted {
            debug!("Record {car_id} is tombstoned; deletions go through the full pass");
            return Ok(());
        }

        // Step 1: thumbnail, the cheapest asset. Landing it (plus the
        // document below) makes the record visible in shared list views.
        if !car.thumbnail.is_synced() {
            if let Err(err) = self.upload_record_asset(&car, SyncChannel::Thumbnail).await {
                self.record_channel_failure(car_id, SyncChannel::Thumbnail, &err)
                    .await?;
            }
        }

        // Step 2: metadata document, re-read so it carries the thumbnail URL.
        let Some(car) = self.cars.get_car(car_id)? else {
            return Ok(());
        };
        if !car.metadata.is_synced() {
            self.cars
                .begin_channel_attempt(car_id, SyncChannel::Metadata, now_millis())
                .await?;
            match self.catalog.upsert_record(&car).await {
                Ok(()) => {
                    self.cars
                        .complete_channel(car_id, SyncChannel::Metadata, None)
                        .await?;
                    debug!("Record {car_id} is now browse-visible");
                }
                Err(err) => {
                    self.record_channel_failure(car_id, SyncChannel::Metadata, &err)
                        .await?;
                }
            }
        }

        // Step 3: full-resolution photo, uploaded lazily. A fresh upload also
        // refreshes the remote document with the new URL.
        let Some(car) = self.cars.get_car(car_id)? else {
            return Ok(());
        };
        if !car.full_photo.is_synced() {
            match self.upload_record_asset(&car, SyncChannel::FullPhoto).await {
                Ok(true) => {
                    if let Some(updated) = self.cars.get_car(car_id)? {
                        if let Err(err) = self.catalog.upsert_record(&updated).await {
                            warn!(
                                "Document refresh after full photo upload failed for {car_id}: {err}"
                            );
                        }
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    self.record_channel_failure(car_id, SyncChannel::FullPhoto, &err)
                        .await?;
                }
            }
        }

        // Step 4: barcode image, skipped entirely when the barcode already
        // exists in the shared dataset.
        let Some(car) = self.cars.get_car(car_id)? else {
            return Ok(());
        };
        if car.has_barcode() && !car.barcode_image.is_synced() {
            if let Err(err) = self.sync_barcode_asset(&car).await {
                self.record_channel_failure(car_id, SyncChannel::BarcodeImage, &err)
                    .await?;
            }
        }

        Ok(())
    }

    /// Upload one owned record asset (thumbnail or full photo). Returns
    /// whether bytes were actually uploaded.
    async fn upload_record_asset(
        &self,
        car: &CollectibleCar,
        channel: SyncChannel,
    ) -> Result<bool> {
        let (local_path, asset) = match channel {
            SyncChannel::Thumbnail => (car.thumbnail_path.as_deref(), THUMBNAIL_ASSET),
            SyncChannel::FullPhoto => (car.full_photo_path.as_deref(), FULL_PHOTO_ASSET),
            SyncChannel::Metadata | SyncChannel::BarcodeImage => {
                return Err(Error::sync("not an owned record asset channel"));
            }
        };
        let Some(local_path) = local_path else {
            // No local file means nothing to upload; the channel is satisfied.
            self.cars.complete_channel(&car.id, channel, None).await?;
            return Ok(false);
        };

        self.cars
            .begin_channel_attempt(&car.id, channel, now_millis())
            .await?;
        let bytes = tokio::fs::read(local_path).await?;
        let path = ObjectPath::owned(self.owner_id.as_str(), car.id.as_str(), asset);
        let url = self
            .objects
            .upload_object(&path, bytes, DEFAULT_IMAGE_MIME)
            .await?;
        self.cars
            .complete_channel(&car.id, channel, Some(url))
            .await?;
        Ok(true)
    }

    async fn sync_barcode_asset(&self, car: &CollectibleCar) -> Result<()> {
        self.cars
            .begin_channel_attempt(&car.id, SyncChannel::BarcodeImage, now_millis())
            .await?;

        if let Some(existing) = self.catalog.find_barcode_asset(&car.barcode).await? {
            debug!(
                "Barcode {} already known remotely, reusing the shared asset",
                car.barcode
            );
            self.cars
                .complete_channel(
                    &car.id,
                    SyncChannel::BarcodeImage,
                    existing.barcode_image_url,
                )
                .await?;
            return Ok(());
        }

        let url = match car.barcode_photo_path.as_deref() {
            Some(local_path) => {
                let bytes = tokio::fs::read(local_path).await?;
                let path = ObjectPath::global(car.barcode.as_str(), BARCODE_ASSET);
                Some(
                    self.objects
                        .upload_object(&path, bytes, DEFAULT_IMAGE_MIME)
                        .await?,
                )
            }
            None => None,
        };
        self.catalog
            .register_barcode_asset(&BarcodeAsset::from_car(car, url.clone()))
            .await?;
        self.cars
            .complete_channel(&car.id, SyncChannel::BarcodeImage, url)
            .await?;
        Ok(())
    }

    async fn record_channel_failure(
        &self,
        car_id: &str,
        channel: SyncChannel,
        error: &Error,
    ) -> Result<()> {
        warn!("{channel:?} sync failed for {car_id}: {error}");
        self.cars
            .fail_channel(car_id, channel, error.to_string(), now_millis())
            .await
    }

    /// Failure sweep: re-run the incremental path for every record stuck
    /// short of the per-channel attempt bound. Transient failures self-heal
    /// here without user action.
    pub async fn retry_failed_channels(&self) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for channel in SyncChannel::ALL {
            for car in self.cars.list_cars_needing_channel_retry(channel)? {
                if car.owner_id == self.owner_id && !car.is_deleted && seen.insert(car.id.clone()) {
                    pending.push(car.id);
                }
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }

        info!(
            "Failure sweep: retrying incremental sync for {} records",
            pending.len()
        );
        let count = pending.len();
        for car_id in pending {
            self.sync_incremental(&car_id).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use crate::collection::{Photo, PhotoKind};
    use crate::errors::RemoteError;
    use crate::sync::{ChannelState, ChannelStatus, SyncEngineStatus, MAX_CHANNEL_ATTEMPTS};

    #[derive(Default)]
    struct MemoryCarStore {
        cars: StdMutex<HashMap<String, CollectibleCar>>,
    }

    impl MemoryCarStore {
        fn seed(&self, car: CollectibleCar) {
            self.cars.lock().unwrap().insert(car.id.clone(), car);
        }

        fn snapshot(&self, car_id: &str) -> Option<CollectibleCar> {
            self.cars.lock().unwrap().get(car_id).cloned()
        }
    }

    #[async_trait]
    impl CarRepositoryTrait for MemoryCarStore {
        fn get_car(&self, car_id: &str) -> Result<Option<CollectibleCar>> {
            Ok(self.cars.lock().unwrap().get(car_id).cloned())
        }

        fn list_unsynced_cars(&self, owner_id: &str) -> Result<Vec<CollectibleCar>> {
            let mut cars: Vec<_> = self
                .cars
                .lock()
                .unwrap()
                .values()
                .filter(|car| {
                    car.owner_id == owner_id && (car.is_deleted || !car.metadata.is_synced())
                })
                .cloned()
                .collect();
            cars.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(cars)
        }

        fn list_cars_needing_channel_retry(
            &self,
            channel: SyncChannel,
        ) -> Result<Vec<CollectibleCar>> {
            let mut cars: Vec<_> = self
                .cars
                .lock()
                .unwrap()
                .values()
                .filter(|car| !car.is_deleted && car.channel(channel).needs_retry())
                .filter(|car| channel != SyncChannel::BarcodeImage || car.has_barcode())
                .cloned()
                .collect();
            cars.sort_by(|a, b| b.sync_priority.cmp(&a.sync_priority));
            Ok(cars)
        }

        async fn upsert_car(&self, car: CollectibleCar) -> Result<()> {
            self.cars.lock().unwrap().insert(car.id.clone(), car);
            Ok(())
        }

        async fn mark_car_deleted(&self, car_id: &str) -> Result<()> {
            if let Some(car) = self.cars.lock().unwrap().get_mut(car_id) {
                car.mark_deleted();
            }
            Ok(())
        }

        async fn delete_car(&self, car_id: &str) -> Result<()> {
            self.cars.lock().unwrap().remove(car_id);
            Ok(())
        }

        async fn begin_channel_attempt(
            &self,
            car_id: &str,
            channel: SyncChannel,
            attempted_at: i64,
        ) -> Result<()> {
            if let Some(car) = self.cars.lock().unwrap().get_mut(car_id) {
                let state = car.channel_mut(channel);
                state.status = ChannelStatus::InFlight;
                state.last_attempt_at = Some(attempted_at);
            }
            Ok(())
        }

        async fn complete_channel(
            &self,
            car_id: &str,
            channel: SyncChannel,
            remote_url: Option<String>,
        ) -> Result<()> {
            if let Some(car) = self.cars.lock().unwrap().get_mut(car_id) {
                *car.channel_mut(channel) = ChannelState::synced(remote_url);
            }
            Ok(())
        }

        async fn fail_channel(
            &self,
            car_id: &str,
            channel: SyncChannel,
            error: String,
            failed_at: i64,
        ) -> Result<()> {
            if let Some(car) = self.cars.lock().unwrap().get_mut(car_id) {
                let state = car.channel_mut(channel);
                state.attempts += 1;
                state.last_error = Some(error);
                state.last_attempt_at = Some(failed_at);
                state.status = if state.attempts < MAX_CHANNEL_ATTEMPTS {
                    ChannelStatus::Retrying
                } else {
                    ChannelStatus::Failed
                };
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryPhotoStore {
        photos: StdMutex<HashMap<String, Photo>>,
    }

    impl MemoryPhotoStore {
        fn seed(&self, photo: Photo) {
            self.photos.lock().unwrap().insert(photo.id.clone(), photo);
        }

        fn snapshot(&self, photo_id: &str) -> Option<Photo> {
            self.photos.lock().unwrap().get(photo_id).cloned()
        }
    }

    #[async_trait]
    impl PhotoRepositoryTrait for MemoryPhotoStore {
        fn get_photo(&self, photo_id: &str) -> Result<Option<Photo>> {
            Ok(self.photos.lock().unwrap().get(photo_id).cloned())
        }

        fn photos_for_car(&self, car_id: &str) -> Result<Vec<Photo>> {
            Ok(self
                .photos
                .lock()
                .unwrap()
                .values()
                .filter(|photo| photo.car_id == car_id)
                .cloned()
                .collect())
        }

        fn list_unsynced_photos(&self, _owner_id: &str) -> Result<Vec<Photo>> {
            let mut photos: Vec<_> = self
                .photos
                .lock()
                .unwrap()
                .values()
                .filter(|photo| photo.sync_status != SyncStatus::Synced)
                .cloned()
                .collect();
            photos.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(photos)
        }

        async fn upsert_photo(&self, photo: Photo) -> Result<()> {
            self.photos.lock().unwrap().insert(photo.id.clone(), photo);
            Ok(())
        }

        async fn mark_photo_synced(&self, photo_id: &str, remote_path: String) -> Result<()> {
            if let Some(photo) = self.photos.lock().unwrap().get_mut(photo_id) {
                photo.remote_path = Some(remote_path);
                photo.sync_status = SyncStatus::Synced;
            }
            Ok(())
        }

        async fn mark_photo_deleted(&self, photo_id: &str) -> Result<()> {
            if let Some(photo) = self.photos.lock().unwrap().get_mut(photo_id) {
                photo.mark_deleted();
            }
            Ok(())
        }

        async fn delete_photo(&self, photo_id: &str) -> Result<()> {
            self.photos.lock().unwrap().remove(photo_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySyncState {
        last_sync: StdMutex<i64>,
        errors: StdMutex<Vec<String>>,
        successes: AtomicUsize,
    }

    #[async_trait]
    impl SyncStateRepositoryTrait for MemorySyncState {
        fn last_sync_time(&self) -> Result<i64> {
            Ok(*self.last_sync.lock().unwrap())
        }

        async fn set_last_sync_time(&self, at_ms: i64) -> Result<()> {
            *self.last_sync.lock().unwrap() = at_ms;
            Ok(())
        }

        async fn mark_cycle_success(&self, _duration_ms: i64) -> Result<()> {
            self.successes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn mark_cycle_error(&self, message: String, _duration_ms: i64) -> Result<()> {
            self.errors.lock().unwrap().push(message);
            Ok(())
        }

        fn engine_status(&self) -> Result<SyncEngineStatus> {
            Ok(SyncEngineStatus {
                last_sync_at: *self.last_sync.lock().unwrap(),
                last_error: self.errors.lock().unwrap().last().cloned(),
                consecutive_failures: self.errors.lock().unwrap().len() as i32,
                last_cycle_status: None,
                last_cycle_duration_ms: None,
            })
        }
    }

    #[derive(Default)]
    struct MockCatalog {
        changed: StdMutex<Vec<CollectibleCar>>,
        barcode_assets: StdMutex<HashMap<String, BarcodeAsset>>,
        upserted: StdMutex<Vec<String>>,
        deleted: StdMutex<Vec<String>>,
        registered: StdMutex<Vec<String>>,
        fail_upserts: StdMutex<bool>,
        fail_changed_since: StdMutex<bool>,
    }

    #[async_trait]
    impl RemoteCatalogTrait for MockCatalog {
        async fn records_changed_since(
            &self,
            _owner_id: &str,
            _since_ms: i64,
        ) -> Result<Vec<CollectibleCar>> {
            if *self.fail_changed_since.lock().unwrap() {
                return Err(Error::Remote(RemoteError::transport("connection reset")));
            }
            Ok(self.changed.lock().unwrap().clone())
        }

        async fn upsert_record(&self, car: &CollectibleCar) -> Result<()> {
            if *self.fail_upserts.lock().unwrap() {
                return Err(Error::Remote(RemoteError::api(503, "catalog unavailable")));
            }
            self.upserted.lock().unwrap().push(car.id.clone());
            Ok(())
        }

        async fn delete_record(&self, _owner_id: &str, car_id: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(car_id.to_string());
            Ok(())
        }

        async fn find_barcode_asset(&self, barcode: &str) -> Result<Option<BarcodeAsset>> {
            Ok(self.barcode_assets.lock().unwrap().get(barcode).cloned())
        }

        async fn register_barcode_asset(&self, asset: &BarcodeAsset) -> Result<()> {
            self.registered.lock().unwrap().push(asset.barcode.clone());
            self.barcode_assets
                .lock()
                .unwrap()
                .insert(asset.barcode.clone(), asset.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockObjects {
        uploads: StdMutex<Vec<String>>,
        deletes: StdMutex<Vec<String>>,
        fail_fragments: StdMutex<Vec<String>>,
    }

    impl MockObjects {
        fn fail_paths_containing(&self, fragment: &str) {
            self.fail_fragments
                .lock()
                .unwrap()
                .push(fragment.to_string());
        }

        fn uploaded(&self) -> Vec<String> {
            self.uploads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteObjectStoreTrait for MockObjects {
        async fn upload_object(
            &self,
            path: &ObjectPath,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String> {
            let rendered = path.to_path();
            if self
                .fail_fragments
                .lock()
                .unwrap()
                .iter()
                .any(|fragment| rendered.contains(fragment.as_str()))
            {
                return Err(Error::Remote(RemoteError::api(500, "storage unavailable")));
            }
            self.uploads.lock().unwrap().push(rendered.clone());
            Ok(format!("https://cdn.example/{rendered}"))
        }

        async fn delete_object(&self, path: &ObjectPath) -> Result<()> {
            self.deletes.lock().unwrap().push(path.to_path());
            Ok(())
        }
    }

    struct Fixture {
        cars: Arc<MemoryCarStore>,
        photos: Arc<MemoryPhotoStore>,
        state: Arc<MemorySyncState>,
        catalog: Arc<MockCatalog>,
        objects: Arc<MockObjects>,
        service: SyncService,
        _dir: tempfile::TempDir,
        dir_path: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let cars = Arc::new(MemoryCarStore::default());
        let photos = Arc::new(MemoryPhotoStore::default());
        let state = Arc::new(MemorySyncState::default());
        let catalog = Arc::new(MockCatalog::default());
        let objects = Arc::new(MockObjects::default());
        let service = SyncService::new(
            "owner-1",
            cars.clone(),
            photos.clone(),
            state.clone(),
            catalog.clone(),
            objects.clone(),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let dir_path = dir.path().to_path_buf();
        Fixture {
            cars,
            photos,
            state,
            catalog,
            objects,
            service,
            _dir: dir,
            dir_path,
        }
    }

    impl Fixture {
        fn write_file(&self, name: &str) -> String {
            let path = self.dir_path.join(name);
            let mut file = std::fs::File::create(&path).expect("create fixture file");
            file.write_all(b"jpeg-bytes").expect("write fixture file");
            path.to_string_lossy().into_owned()
        }

        fn car_with_assets(&self, id: &str, barcode: &str) -> CollectibleCar {
            let mut car = CollectibleCar::new(id, "owner-1");
            car.model = "Bone Shaker".to_string();
            car.brand = "Hot Wheels".to_string();
            car.series = "Mainline".to_string();
            car.barcode = barcode.to_string();
            car.thumbnail_path = Some(self.write_file(&format!("{id}-thumb.jpg")));
            car.full_photo_path = Some(self.write_file(&format!("{id}-full.jpg")));
            if !barcode.is_empty() {
                car.barcode_photo_path = Some(self.write_file(&format!("{id}-barcode.jpg")));
            }
            car
        }
    }

    #[tokio::test]
    async fn incremental_sync_lands_every_channel() {
        let fx = fixture();
        let car = fx.car_with_assets("car-1", "0657084");
        fx.cars.seed(car);

        fx.service.sync_incremental("car-1").await.unwrap();

        let car = fx.cars.snapshot("car-1").unwrap();
        assert_eq!(car.sync_status(), SyncStatus::Synced);
        assert!(car.thumbnail.remote_url.as_deref().unwrap().contains("thumbnail.jpg"));
        assert!(car.full_photo.remote_url.as_deref().unwrap().contains("full.jpg"));
        assert_eq!(fx.catalog.registered.lock().unwrap().as_slice(), ["0657084"]);
        // Metadata pushed once on step 2 and refreshed once after the full
        // photo landed.
        assert_eq!(fx.catalog.upserted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn record_is_partial_while_full_photo_is_stuck() {
        let fx = fixture();
        let car = fx.car_with_assets("car-1", "");
        fx.cars.seed(car);
        fx.objects.fail_paths_containing("full.jpg");

        fx.service.sync_incremental("car-1").await.unwrap();

        let car = fx.cars.snapshot("car-1").unwrap();
        assert_eq!(car.sync_status(), SyncStatus::Partial);
        assert_eq!(car.full_photo.status, ChannelStatus::Retrying);
        assert_eq!(car.full_photo.attempts, 1);
        assert!(car.full_photo.last_error.is_some());
        assert!(car.full_photo.last_attempt_at.is_some());
    }

    #[tokio::test]
    async fn thumbnail_failure_does_not_block_other_channels() {
        let fx = fixture();
        let car = fx.car_with_assets("car-1", "0657084");
        fx.cars.seed(car);
        fx.objects.fail_paths_containing("thumbnail.jpg");

        fx.service.sync_incremental("car-1").await.unwrap();

        let car = fx.cars.snapshot("car-1").unwrap();
        assert_eq!(car.thumbnail.status, ChannelStatus::Retrying);
        assert!(car.metadata.is_synced());
        assert!(car.full_photo.is_synced());
        assert!(car.barcode_image.is_synced());
    }

    #[tokio::test]
    async fn existing_barcode_asset_is_reused_without_upload() {
        let fx = fixture();
        let car = fx.car_with_assets("car-1", "0657084");
        fx.cars.seed(car);
        fx.catalog.barcode_assets.lock().unwrap().insert(
            "0657084".to_string(),
            BarcodeAsset {
                barcode: "0657084".to_string(),
                model: "Twin Mill".to_string(),
                brand: "Hot Wheels".to_string(),
                series: "Mainline".to_string(),
                year: 2024,
                thumbnail_url: None,
                full_photo_url: None,
                barcode_image_url: Some("https://cdn.example/barcodes/0657084/barcode.jpg".into()),
            },
        );

        fx.service.sync_incremental("car-1").await.unwrap();

        let car = fx.cars.snapshot("car-1").unwrap();
        assert!(car.barcode_image.is_synced());
        assert_eq!(
            car.barcode_image.remote_url.as_deref(),
            Some("https://cdn.example/barcodes/0657084/barcode.jpg")
        );
        assert!(fx.catalog.registered.lock().unwrap().is_empty());
        assert!(!fx
            .objects
            .uploaded()
            .iter()
            .any(|path| path.starts_with("barcodes/")));
    }

    #[tokio::test]
    async fn missing_local_assets_satisfy_their_channels() {
        let fx = fixture();
        let mut car = CollectibleCar::new("car-1", "owner-1");
        car.model = "Rodger Dodger".to_string();
        fx.cars.seed(car);

        fx.service.sync_incremental("car-1").await.unwrap();

        let car = fx.cars.snapshot("car-1").unwrap();
        assert_eq!(car.sync_status(), SyncStatus::Synced);
        assert!(car.thumbnail.remote_url.is_none());
        assert!(fx.objects.uploaded().is_empty());
    }

    #[tokio::test]
    async fn full_sync_adopts_remote_winner_on_timestamp_tie_break() {
        let fx = fixture();
        let mut local = CollectibleCar::new("car-a", "owner-1");
        local.version = 2;
        local.updated_at = 100;
        local.notes = "local edit".to_string();
        fx.cars.seed(local);

        let mut remote = CollectibleCar::new("car-a", "owner-1");
        remote.version = 2;
        remote.updated_at = 150;
        remote.notes = "remote edit".to_string();
        fx.catalog.changed.lock().unwrap().push(remote);

        fx.service.sync(true).await.unwrap();

        let adopted = fx.cars.snapshot("car-a").unwrap();
        assert_eq!(adopted.version, 2);
        assert_eq!(adopted.updated_at, 150);
        assert_eq!(adopted.notes, "remote edit");
        assert_eq!(adopted.sync_status(), SyncStatus::Synced);
        // The local loser was never pushed.
        assert!(fx.catalog.upserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_sync_local_tombstone_beats_higher_remote_version() {
        let fx = fixture();
        let mut local = CollectibleCar::new("car-b", "owner-1");
        local.version = 4;
        local.is_deleted = true;
        local.deleted_at = Some(500);
        fx.cars.seed(local);

        let mut remote = CollectibleCar::new("car-b", "owner-1");
        remote.version = 6;
        fx.catalog.changed.lock().unwrap().push(remote);

        fx.service.sync(true).await.unwrap();

        assert_eq!(fx.catalog.deleted.lock().unwrap().as_slice(), ["car-b"]);
        assert!(fx.cars.snapshot("car-b").is_none());
    }

    #[tokio::test]
    async fn full_sync_applies_remote_tombstone_locally() {
        let fx = fixture();
        let mut local = CollectibleCar::new("car-c", "owner-1");
        local.version = 2;
        local.metadata = ChannelState::synced(None);
        fx.cars.seed(local);

        let mut remote = CollectibleCar::new("car-c", "owner-1");
        remote.version = 3;
        remote.is_deleted = true;
        fx.catalog.changed.lock().unwrap().push(remote);

        fx.service.sync(true).await.unwrap();

        assert!(fx.cars.snapshot("car-c").is_none());
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op_for_synced_state() {
        let fx = fixture();
        let mut car = CollectibleCar::new("car-a", "owner-1");
        car.notes = "needs push".to_string();
        fx.cars.seed(car);

        fx.service.sync(true).await.unwrap();
        let upserts_after_first = fx.catalog.upserted.lock().unwrap().len();
        assert_eq!(upserts_after_first, 1);

        fx.service.sync(true).await.unwrap();
        assert_eq!(fx.catalog.upserted.lock().unwrap().len(), upserts_after_first);
    }

    #[tokio::test]
    async fn fresh_checkpoint_throttles_unforced_pass() {
        let fx = fixture();
        fx.state.set_last_sync_time(now_millis()).await.unwrap();
        let mut car = CollectibleCar::new("car-a", "owner-1");
        car.notes = "pending".to_string();
        fx.cars.seed(car);

        let report = fx.service.sync(false).await.unwrap();

        assert!(report.skipped);
        assert!(fx.catalog.upserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_sync_uploads_and_deletes_photos() {
        let fx = fixture();
        let mut pending = Photo::new(
            "photo-1",
            "car-1",
            PhotoKind::Front,
            fx.write_file("photo-1.jpg"),
        );
        pending.mime_type = Some("image/jpeg".to_string());
        fx.photos.seed(pending);

        let mut doomed = Photo::new("photo-2", "car-1", PhotoKind::Back, "/gone.jpg");
        doomed.remote_path = Some("https://cdn.example/owners/owner-1/car-1/photo-2.jpg".into());
        doomed.mark_deleted();
        fx.photos.seed(doomed);

        // Tombstoned global contribution: the shared object must survive.
        let mut shared = Photo::new("photo-3", "car-1", PhotoKind::Other, "/gone-too.jpg");
        shared.is_global = true;
        shared.barcode = Some("0657084".to_string());
        shared.remote_path = Some("https://cdn.example/barcodes/0657084/photo-3.jpg".into());
        shared.mark_deleted();
        fx.photos.seed(shared);

        let report = fx.service.sync(true).await.unwrap();

        assert_eq!(report.uploaded_photos, 1);
        assert_eq!(report.deleted_photos, 2);
        let photo = fx.photos.snapshot("photo-1").unwrap();
        assert_eq!(photo.sync_status, SyncStatus::Synced);
        assert!(photo.remote_path.as_deref().unwrap().contains("photo-1.jpg"));
        assert!(fx.photos.snapshot("photo-2").is_none());
        assert!(fx.photos.snapshot("photo-3").is_none());
        assert_eq!(
            fx.objects.deletes.lock().unwrap().as_slice(),
            ["owners/owner-1/car-1/photo-2.jpg"]
        );
    }

    #[tokio::test]
    async fn failed_pass_keeps_checkpoint_and_reports_error() {
        let fx = fixture();
        *fx.catalog.fail_changed_since.lock().unwrap() = true;
        let mut state_rx = fx.service.sync_state();

        let result = fx.service.sync(true).await;

        assert!(result.is_err());
        assert_eq!(fx.state.last_sync_time().unwrap(), 0);
        assert_eq!(fx.state.errors.lock().unwrap().len(), 1);
        assert!(matches!(
            state_rx.borrow_and_update().clone(),
            SyncState::Error(_)
        ));
    }

    #[tokio::test]
    async fn failure_sweep_heals_stuck_channels() {
        let fx = fixture();
        let mut car = fx.car_with_assets("car-1", "");
        car.metadata = ChannelState::synced(None);
        car.full_photo.status = ChannelStatus::Retrying;
        car.full_photo.attempts = 1;
        car.thumbnail = ChannelState::synced(Some("https://cdn.example/t.jpg".into()));
        fx.cars.seed(car);

        let retried = fx.service.retry_failed_channels().await.unwrap();

        assert_eq!(retried, 1);
        let car = fx.cars.snapshot("car-1").unwrap();
        assert!(car.full_photo.is_synced());
        assert_eq!(car.sync_status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn exhausted_channel_is_left_for_manual_retry() {
        let fx = fixture();
        let mut car = fx.car_with_assets("car-1", "");
        car.metadata = ChannelState::synced(None);
        car.thumbnail = ChannelState::synced(None);
        car.full_photo.status = ChannelStatus::Failed;
        car.full_photo.attempts = MAX_CHANNEL_ATTEMPTS;
        fx.cars.seed(car);

        let retried = fx.service.retry_failed_channels().await.unwrap();

        assert_eq!(retried, 0);
        let car = fx.cars.snapshot("car-1").unwrap();
        assert_eq!(car.full_photo.status, ChannelStatus::Failed);
    }

    #[tokio::test]
    async fn metadata_failure_is_recorded_but_later_steps_still_run() {
        let fx = fixture();
        let car = fx.car_with_assets("car-1", "0657084");
        fx.cars.seed(car);
        *fx.catalog.fail_upserts.lock().unwrap() = true;

        fx.service.sync_incremental("car-1").await.unwrap();

        let car = fx.cars.snapshot("car-1").unwrap();
        assert_eq!(car.metadata.status, ChannelStatus::Retrying);
        assert!(car.metadata.last_error.is_some());
        assert!(car.thumbnail.is_synced());
        assert!(car.full_photo.is_synced());
        assert!(car.barcode_image.is_synced());
    }
}
