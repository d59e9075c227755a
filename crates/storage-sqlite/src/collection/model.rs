//! Database rows for cars and photos, plus domain conversions.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use diecast_core::collection::{CollectibleCar, Photo, PhotoKind};
use diecast_core::errors::Result;
use diecast_core::sync::{ChannelState, ChannelStatus, SyncStatus};

/// Store an enum as its snake_case wire tag.
pub(crate) fn enum_to_db<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

pub(crate) fn enum_from_db<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&format!("\"{}\"", value))?)
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::cars)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CarDB {
    pub id: String,
    pub owner_id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub series: String,
    pub subseries: String,
    pub color: String,
    pub model_number: String,
    pub barcode: String,
    pub tags: String,
    pub notes: String,
    pub purchase_price: f64,
    pub current_value: f64,
    pub is_treasure_hunt: bool,
    pub is_super_treasure_hunt: bool,
    pub is_favorite: bool,
    pub thumbnail_path: Option<String>,
    pub full_photo_path: Option<String>,
    pub barcode_photo_path: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    pub version: i64,
    pub updated_at: i64,
    pub created_at: i64,
    pub sync_priority: i32,
    pub thumbnail_sync_status: String,
    pub thumbnail_remote_url: Option<String>,
    pub thumbnail_sync_attempts: i32,
    pub thumbnail_last_error: Option<String>,
    pub thumbnail_last_attempt_at: Option<i64>,
    pub metadata_sync_status: String,
    pub metadata_sync_attempts: i32,
    pub metadata_last_error: Option<String>,
    pub metadata_last_attempt_at: Option<i64>,
    pub full_photo_sync_status: String,
    pub full_photo_remote_url: Option<String>,
    pub full_photo_sync_attempts: i32,
    pub full_photo_last_error: Option<String>,
    pub full_photo_last_attempt_at: Option<i64>,
    pub barcode_sync_status: String,
    pub barcode_remote_url: Option<String>,
    pub barcode_sync_attempts: i32,
    pub barcode_last_error: Option<String>,
    pub barcode_last_attempt_at: Option<i64>,
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::photos)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PhotoDB {
    pub id: String,
    pub car_id: String,
    pub kind: String,
    pub position: i32,
    pub local_path: String,
    pub remote_path: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub byte_size: Option<i64>,
    pub mime_type: Option<String>,
    pub sync_status: String,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    pub version: i64,
    pub created_at: i64,
    pub barcode: Option<String>,
    pub is_global: bool,
}

fn channel_to_columns(
    state: &ChannelState,
) -> Result<(String, Option<String>, i32, Option<String>, Option<i64>)> {
    Ok((
        enum_to_db(&state.status)?,
        state.remote_url.clone(),
        state.attempts,
        state.last_error.clone(),
        state.last_attempt_at,
    ))
}

fn channel_from_columns(
    status: &str,
    remote_url: Option<String>,
    attempts: i32,
    last_error: Option<String>,
    last_attempt_at: Option<i64>,
) -> Result<ChannelState> {
    Ok(ChannelState {
        status: enum_from_db::<ChannelStatus>(status)?,
        remote_url,
        attempts,
        last_error,
        last_attempt_at,
    })
}

pub(crate) fn car_to_db(car: &CollectibleCar) -> Result<CarDB> {
    let (thumbnail_sync_status, thumbnail_remote_url, thumbnail_sync_attempts, thumbnail_last_error, thumbnail_last_attempt_at) =
        channel_to_columns(&car.thumbnail)?;
    let (metadata_sync_status, _, metadata_sync_attempts, metadata_last_error, metadata_last_attempt_at) =
        channel_to_columns(&car.metadata)?;
    let (full_photo_sync_status, full_photo_remote_url, full_photo_sync_attempts, full_photo_last_error, full_photo_last_attempt_at) =
        channel_to_columns(&car.full_photo)?;
    let (barcode_sync_status, barcode_remote_url, barcode_sync_attempts, barcode_last_error, barcode_last_attempt_at) =
        channel_to_columns(&car.barcode_image)?;

    Ok(CarDB {
        id: car.id.clone(),
        owner_id: car.owner_id.clone(),
        brand: car.brand.clone(),
        model: car.model.clone(),
        year: car.year,
        series: car.series.clone(),
        subseries: car.subseries.clone(),
        color: car.color.clone(),
        model_number: car.model_number.clone(),
        barcode: car.barcode.clone(),
        tags: serde_json::to_string(&car.tags)?,
        notes: car.notes.clone(),
        purchase_price: car.purchase_price,
        current_value: car.current_value,
        is_treasure_hunt: car.is_treasure_hunt,
        is_super_treasure_hunt: car.is_super_treasure_hunt,
        is_favorite: car.is_favorite,
        thumbnail_path: car.thumbnail_path.clone(),
        full_photo_path: car.full_photo_path.clone(),
        barcode_photo_path: car.barcode_photo_path.clone(),
        is_deleted: car.is_deleted,
        deleted_at: car.deleted_at,
        version: car.version,
        updated_at: car.updated_at,
        created_at: car.created_at,
        sync_priority: car.sync_priority,
        thumbnail_sync_status,
        thumbnail_remote_url,
        thumbnail_sync_attempts,
        thumbnail_last_error,
        thumbnail_last_attempt_at,
        metadata_sync_status,
        metadata_sync_attempts,
        metadata_last_error,
        metadata_last_attempt_at,
        full_photo_sync_status,
        full_photo_remote_url,
        full_photo_sync_attempts,
        full_photo_last_error,
        full_photo_last_attempt_at,
        barcode_sync_status,
        barcode_remote_url,
        barcode_sync_attempts,
        barcode_last_error,
        barcode_last_attempt_at,
    })
}

pub(crate) fn car_from_db(row: CarDB) -> Result<CollectibleCar> {
    Ok(CollectibleCar {
        id: row.id,
        owner_id: row.owner_id,
        brand: row.brand,
        model: row.model,
        year: row.year,
        series: row.series,
        subseries: row.subseries,
        color: row.color,
        model_number: row.model_number,
        barcode: row.barcode,
        tags: serde_json::from_str(&row.tags)?,
        notes: row.notes,
        purchase_price: row.purchase_price,
        current_value: row.current_value,
        is_treasure_hunt: row.is_treasure_hunt,
        is_super_treasure_hunt: row.is_super_treasure_hunt,
        is_favorite: row.is_favorite,
        thumbnail_path: row.thumbnail_path,
        full_photo_path: row.full_photo_path,
        barcode_photo_path: row.barcode_photo_path,
        is_deleted: row.is_deleted,
        deleted_at: row.deleted_at,
        version: row.version,
        updated_at: row.updated_at,
        created_at: row.created_at,
        sync_priority: row.sync_priority,
        thumbnail: channel_from_columns(
            &row.thumbnail_sync_status,
            row.thumbnail_remote_url,
            row.thumbnail_sync_attempts,
            row.thumbnail_last_error,
            row.thumbnail_last_attempt_at,
        )?,
        metadata: channel_from_columns(
            &row.metadata_sync_status,
            None,
            row.metadata_sync_attempts,
            row.metadata_last_error,
            row.metadata_last_attempt_at,
        )?,
        full_photo: channel_from_columns(
            &row.full_photo_sync_status,
            row.full_photo_remote_url,
            row.full_photo_sync_attempts,
            row.full_photo_last_error,
            row.full_photo_last_attempt_at,
        )?,
        barcode_image: channel_from_columns(
            &row.barcode_sync_status,
            row.barcode_remote_url,
            row.barcode_sync_attempts,
            row.barcode_last_error,
            row.barcode_last_attempt_at,
        )?,
    })
}

pub(crate) fn photo_to_db(photo: &Photo) -> Result<PhotoDB> {
    Ok(PhotoDB {
        id: photo.id.clone(),
        car_id: photo.car_id.clone(),
        kind: enum_to_db(&photo.kind)?,
        position: photo.position,
        local_path: photo.local_path.clone(),
        remote_path: photo.remote_path.clone(),
        width: photo.width,
        height: photo.height,
        byte_size: photo.byte_size,
        mime_type: photo.mime_type.clone(),
        sync_status: enum_to_db(&photo.sync_status)?,
        is_deleted: photo.is_deleted,
        deleted_at: photo.deleted_at,
        version: photo.version,
        created_at: photo.created_at,
        barcode: photo.barcode.clone(),
        is_global: photo.is_global,
    })
}

pub(crate) fn photo_from_db(row: PhotoDB) -> Result<Photo> {
    Ok(Photo {
        id: row.id,
        car_id: row.car_id,
        kind: enum_from_db::<PhotoKind>(&row.kind)?,
        position: row.position,
        local_path: row.local_path,
        remote_path: row.remote_path,
        width: row.width,
        height: row.height,
        byte_size: row.byte_size,
        mime_type: row.mime_type,
        sync_status: enum_from_db::<SyncStatus>(&row.sync_status)?,
        is_deleted: row.is_deleted,
        deleted_at: row.deleted_at,
        version: row.version,
        created_at: row.created_at,
        barcode: row.barcode,
        is_global: row.is_global,
    })
}
