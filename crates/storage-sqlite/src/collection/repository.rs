//! Diesel-backed repositories for cars and photos.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use diecast_core::collection::{
    CarRepositoryTrait, CollectibleCar, Photo, PhotoRepositoryTrait,
};
use diecast_core::errors::Result;
use diecast_core::sync::{ChannelStatus, SyncChannel, SyncStatus, MAX_CHANNEL_ATTEMPTS};
use diecast_core::utils::time::now_millis;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{cars, photos};

use super::model::{
    car_from_db, car_to_db, enum_to_db, photo_from_db, photo_to_db, CarDB, PhotoDB,
};

fn retryable_statuses() -> Result<Vec<String>> {
    Ok(vec![
        enum_to_db(&ChannelStatus::Pending)?,
        enum_to_db(&ChannelStatus::Retrying)?,
        enum_to_db(&ChannelStatus::Failed)?,
    ])
}

pub struct CarRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CarRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl CarRepositoryTrait for CarRepository {
    fn get_car(&self, car_id: &str) -> Result<Option<CollectibleCar>> {
        let mut conn = get_connection(&self.pool)?;
        let row = cars::table
            .find(car_id)
            .first::<CarDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(car_from_db).transpose()
    }

    fn list_unsynced_cars(&self, owner_id: &str) -> Result<Vec<CollectibleCar>> {
        let mut conn = get_connection(&self.pool)?;
        let synced = enum_to_db(&ChannelStatus::Synced)?;
        let rows = cars::table
            .filter(cars::owner_id.eq(owner_id))
            .filter(
                cars::is_deleted
                    .eq(true)
                    .or(cars::metadata_sync_status.ne(synced)),
            )
            .order((cars::sync_priority.desc(), cars::created_at.asc()))
            .load::<CarDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(car_from_db).collect()
    }

    fn list_cars_needing_channel_retry(
        &self,
        channel: SyncChannel,
    ) -> Result<Vec<CollectibleCar>> {
        let mut conn = get_connection(&self.pool)?;
        let retryable = retryable_statuses()?;
        let rows = match channel {
            SyncChannel::Thumbnail => cars::table
                .filter(cars::is_deleted.eq(false))
                .filter(cars::thumbnail_sync_status.eq_any(&retryable))
                .filter(cars::thumbnail_sync_attempts.lt(MAX_CHANNEL_ATTEMPTS))
                .order((cars::sync_priority.desc(), cars::created_at.asc()))
                .load::<CarDB>(&mut conn),
            SyncChannel::Metadata => cars::table
                .filter(cars::is_deleted.eq(false))
                .filter(cars::metadata_sync_status.eq_any(&retryable))
                .filter(cars::metadata_sync_attempts.lt(MAX_CHANNEL_ATTEMPTS))
                .order((cars::sync_priority.desc(), cars::created_at.asc()))
                .load::<CarDB>(&mut conn),
            SyncChannel::FullPhoto => cars::table
                .filter(cars::is_deleted.eq(false))
                .filter(cars::full_photo_sync_status.eq_any(&retryable))
                .filter(cars::full_photo_sync_attempts.lt(MAX_CHANNEL_ATTEMPTS))
                .order((cars::sync_priority.desc(), cars::created_at.asc()))
                .load::<CarDB>(&mut conn),
            SyncChannel::BarcodeImage => cars::table
                .filter(cars::is_deleted.eq(false))
                .filter(cars::barcode.ne(""))
                .filter(cars::barcode_sync_status.eq_any(&retryable))
                .filter(cars::barcode_sync_attempts.lt(MAX_CHANNEL_ATTEMPTS))
                .order((cars::sync_priority.desc(), cars::created_at.asc()))
                .load::<CarDB>(&mut conn),
        }
        .map_err(StorageError::from)?;
        rows.into_iter().map(car_from_db).collect()
    }

    async fn upsert_car(&self, car: CollectibleCar) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row = car_to_db(&car)?;
                diesel::insert_into(cars::table)
                    .values(&row)
                    .on_conflict(cars::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_car_deleted(&self, car_id: &str) -> Result<()> {
        let car_id = car_id.to_string();
        self.writer
            .exec(move |conn| {
                let now = now_millis();
                diesel::update(cars::table.find(car_id))
                    .set((
                        cars::is_deleted.eq(true),
                        cars::deleted_at.eq(Some(now)),
                        cars::version.eq(cars::version + 1),
                        cars::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_car(&self, car_id: &str) -> Result<()> {
        let car_id = car_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(photos::table.filter(photos::car_id.eq(&car_id)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                diesel::delete(cars::table.find(&car_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn begin_channel_attempt(
        &self,
        car_id: &str,
        channel: SyncChannel,
        attempted_at: i64,
    ) -> Result<()> {
        let car_id = car_id.to_string();
        self.writer
            .exec(move |conn| {
                let in_flight = enum_to_db(&ChannelStatus::InFlight)?;
                let target = cars::table.find(&car_id);
                match channel {
                    SyncChannel::Thumbnail => diesel::update(target)
                        .set((
                            cars::thumbnail_sync_status.eq(in_flight),
                            cars::thumbnail_last_attempt_at.eq(Some(attempted_at)),
                        ))
                        .execute(conn),
                    SyncChannel::Metadata => diesel::update(target)
                        .set((
                            cars::metadata_sync_status.eq(in_flight),
                            cars::metadata_last_attempt_at.eq(Some(attempted_at)),
                        ))
                        .execute(conn),
                    SyncChannel::FullPhoto => diesel::update(target)
                        .set((
                            cars::full_photo_sync_status.eq(in_flight),
                            cars::full_photo_last_attempt_at.eq(Some(attempted_at)),
                        ))
                        .execute(conn),
                    SyncChannel::BarcodeImage => diesel::update(target)
                        .set((
                            cars::barcode_sync_status.eq(in_flight),
                            cars::barcode_last_attempt_at.eq(Some(attempted_at)),
                        ))
                        .execute(conn),
                }
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn complete_channel(
        &self,
        car_id: &str,
        channel: SyncChannel,
        remote_url: Option<String>,
    ) -> Result<()> {
        let car_id = car_id.to_string();
        self.writer
            .exec(move |conn| {
                let synced = enum_to_db(&ChannelStatus::Synced)?;
                let target = cars::table.find(&car_id);
                match channel {
                    SyncChannel::Thumbnail => diesel::update(target)
                        .set((
                            cars::thumbnail_sync_status.eq(synced),
                            cars::thumbnail_remote_url.eq(remote_url),
                            cars::thumbnail_last_error.eq::<Option<String>>(None),
                        ))
                        .execute(conn),
                    SyncChannel::Metadata => diesel::update(target)
                        .set((
                            cars::metadata_sync_status.eq(synced),
                            cars::metadata_last_error.eq::<Option<String>>(None),
                        ))
                        .execute(conn),
                    SyncChannel::FullPhoto => diesel::update(target)
                        .set((
                            cars::full_photo_sync_status.eq(synced),
                            cars::full_photo_remote_url.eq(remote_url),
                            cars::full_photo_last_error.eq::<Option<String>>(None),
                        ))
                        .execute(conn),
                    SyncChannel::BarcodeImage => diesel::update(target)
                        .set((
                            cars::barcode_sync_status.eq(synced),
                            cars::barcode_remote_url.eq(remote_url),
                            cars::barcode_last_error.eq::<Option<String>>(None),
                        ))
                        .execute(conn),
                }
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn fail_channel(
        &self,
        car_id: &str,
        channel: SyncChannel,
        error: String,
        failed_at: i64,
    ) -> Result<()> {
        let car_id = car_id.to_string();
        self.writer
            .exec(move |conn| {
                let row = cars::table
                    .find(&car_id)
                    .first::<CarDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                let Some(row) = row else {
                    return Ok(());
                };

                let attempts = match channel {
                    SyncChannel::Thumbnail => row.thumbnail_sync_attempts,
                    SyncChannel::Metadata => row.metadata_sync_attempts,
                    SyncChannel::FullPhoto => row.full_photo_sync_attempts,
                    SyncChannel::BarcodeImage => row.barcode_sync_attempts,
                } + 1;
                let status = if attempts < MAX_CHANNEL_ATTEMPTS {
                    enum_to_db(&ChannelStatus::Retrying)?
                } else {
                    enum_to_db(&ChannelStatus::Failed)?
                };

                let target = cars::table.find(&car_id);
                match channel {
                    SyncChannel::Thumbnail => diesel::update(target)
                        .set((
                            cars::thumbnail_sync_status.eq(status),
                            cars::thumbnail_sync_attempts.eq(attempts),
                            cars::thumbnail_last_error.eq(Some(error)),
                            cars::thumbnail_last_attempt_at.eq(Some(failed_at)),
                        ))
                        .execute(conn),
                    SyncChannel::Metadata => diesel::update(target)
                        .set((
                            cars::metadata_sync_status.eq(status),
                            cars::metadata_sync_attempts.eq(attempts),
                            cars::metadata_last_error.eq(Some(error)),
                            cars::metadata_last_attempt_at.eq(Some(failed_at)),
                        ))
                        .execute(conn),
                    SyncChannel::FullPhoto => diesel::update(target)
                        .set((
                            cars::full_photo_sync_status.eq(status),
                            cars::full_photo_sync_attempts.eq(attempts),
                            cars::full_photo_last_error.eq(Some(error)),
                            cars::full_photo_last_attempt_at.eq(Some(failed_at)),
                        ))
                        .execute(conn),
                    SyncChannel::BarcodeImage => diesel::update(target)
                        .set((
                            cars::barcode_sync_status.eq(status),
                            cars::barcode_sync_attempts.eq(attempts),
                            cars::barcode_last_error.eq(Some(error)),
                            cars::barcode_last_attempt_at.eq(Some(failed_at)),
                        ))
                        .execute(conn),
                }
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

pub struct PhotoRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PhotoRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl PhotoRepositoryTrait for PhotoRepository {
    fn get_photo(&self, photo_id: &str) -> Result<Option<Photo>> {
        let mut conn = get_connection(&self.pool)?;
        let row = photos::table
            .find(photo_id)
            .first::<PhotoDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(photo_from_db).transpose()
    }

    fn photos_for_car(&self, car_id: &str) -> Result<Vec<Photo>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = photos::table
            .filter(photos::car_id.eq(car_id))
            .order(photos::position.asc())
            .load::<PhotoDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(photo_from_db).collect()
    }

    fn list_unsynced_photos(&self, owner_id: &str) -> Result<Vec<Photo>> {
        let mut conn = get_connection(&self.pool)?;
        let synced = enum_to_db(&SyncStatus::Synced)?;
        let rows = photos::table
            .inner_join(cars::table.on(cars::id.eq(photos::car_id)))
            .filter(cars::owner_id.eq(owner_id))
            .filter(photos::sync_status.ne(synced))
            .select(PhotoDB::as_select())
            .order(photos::created_at.asc())
            .load::<PhotoDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(photo_from_db).collect()
    }

    async fn upsert_photo(&self, photo: Photo) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row = photo_to_db(&photo)?;
                diesel::insert_into(photos::table)
                    .values(&row)
                    .on_conflict(photos::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_photo_synced(&self, photo_id: &str, remote_path: String) -> Result<()> {
        let photo_id = photo_id.to_string();
        self.writer
            .exec(move |conn| {
                let synced = enum_to_db(&SyncStatus::Synced)?;
                diesel::update(photos::table.find(&photo_id))
                    .set((
                        photos::sync_status.eq(synced),
                        photos::remote_path.eq(Some(remote_path)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_photo_deleted(&self, photo_id: &str) -> Result<()> {
        let photo_id = photo_id.to_string();
        self.writer
            .exec(move |conn| {
                let pending_delete = enum_to_db(&SyncStatus::PendingDelete)?;
                diesel::update(photos::table.find(&photo_id))
                    .set((
                        photos::sync_status.eq(pending_delete),
                        photos::is_deleted.eq(true),
                        photos::deleted_at.eq(Some(now_millis())),
                        photos::version.eq(photos::version + 1),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_photo(&self, photo_id: &str) -> Result<()> {
        let photo_id = photo_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(photos::table.find(&photo_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
