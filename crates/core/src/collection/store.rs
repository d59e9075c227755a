//! Local persistent-store contracts consumed by the sync services.
//!
//! Reads are synchronous (pooled connections); mutations go through the
//! store's single-writer path and are therefore async.

use async_trait::async_trait;

use crate::collection::{CollectibleCar, Photo};
use crate::errors::Result;
use crate::sync::SyncChannel;

/// Store contract for collectible records.
#[async_trait]
pub trait CarRepositoryTrait: Send + Sync {
    fn get_car(&self, car_id: &str) -> Result<Option<CollectibleCar>>;

    /// Records a full pass must consider: tombstones plus records whose
    /// metadata document has not been pushed yet. Asset channels are the
    /// incremental path's business.
    fn list_unsynced_cars(&self, owner_id: &str) -> Result<Vec<CollectibleCar>>;

    /// Records whose given channel is stuck short of the attempt bound,
    /// highest priority first, oldest first within a priority.
    fn list_cars_needing_channel_retry(&self, channel: SyncChannel)
        -> Result<Vec<CollectibleCar>>;

    /// Insert-or-update by id. Callers decide what the row should look like
    /// (local mutation vs. remote adoption) via the model helpers.
    async fn upsert_car(&self, car: CollectibleCar) -> Result<()>;

    /// Tombstone; the remote delete and the physical removal happen later,
    /// during a sync pass.
    async fn mark_car_deleted(&self, car_id: &str) -> Result<()>;

    /// Physical removal, used only once the remote delete is confirmed (or
    /// when adopting a remote tombstone). Child photos go with the record.
    async fn delete_car(&self, car_id: &str) -> Result<()>;

    async fn begin_channel_attempt(
        &self,
        car_id: &str,
        channel: SyncChannel,
        attempted_at: i64,
    ) -> Result<()>;

    async fn complete_channel(
        &self,
        car_id: &str,
        channel: SyncChannel,
        remote_url: Option<String>,
    ) -> Result<()>;

    /// Record a channel failure: attempts + 1, error + timestamp stored,
    /// status `Retrying` below the attempt bound and `Failed` at it.
    async fn fail_channel(
        &self,
        car_id: &str,
        channel: SyncChannel,
        error: String,
        failed_at: i64,
    ) -> Result<()>;
}

/// Store contract for photo assets.
#[async_trait]
pub trait PhotoRepositoryTrait: Send + Sync {
    fn get_photo(&self, photo_id: &str) -> Result<Option<Photo>>;

    fn photos_for_car(&self, car_id: &str) -> Result<Vec<Photo>>;

    /// Photos pending upload or delete for the owner's records.
    fn list_unsynced_photos(&self, owner_id: &str) -> Result<Vec<Photo>>;

    async fn upsert_photo(&self, photo: Photo) -> Result<()>;

    async fn mark_photo_synced(&self, photo_id: &str, remote_path: String) -> Result<()>;

    async fn mark_photo_deleted(&self, photo_id: &str) -> Result<()>;

    /// Physical removal after the remote object is gone.
    async fn delete_photo(&self, photo_id: &str) -> Result<()>;
}
