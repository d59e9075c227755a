//! Wire types for the cloud catalog and object APIs.

use serde::{Deserialize, Serialize};

use diecast_core::collection::CollectibleCar;
use diecast_core::sync::ChannelState;

/// Catalog document for one collectible record. Local-only fields (file
/// paths, per-channel attempt bookkeeping) never cross the wire; asset URLs
/// do, so list views on other devices can render without extra lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCarRecord {
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
    pub tags: Vec<String>,
    pub notes: String,
    pub purchase_price: f64,
    pub current_value: f64,
    pub is_treasure_hunt: bool,
    pub is_super_treasure_hunt: bool,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    pub version: i64,
    pub updated_at: i64,
    pub created_at: i64,
    pub thumbnail_url: Option<String>,
    pub full_photo_url: Option<String>,
    pub barcode_image_url: Option<String>,
}

impl RemoteCarRecord {
    pub fn from_car(car: &CollectibleCar) -> Self {
        Self {
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
            tags: car.tags.clone(),
            notes: car.notes.clone(),
            purchase_price: car.purchase_price,
            current_value: car.current_value,
            is_treasure_hunt: car.is_treasure_hunt,
            is_super_treasure_hunt: car.is_super_treasure_hunt,
            is_favorite: car.is_favorite,
            is_deleted: car.is_deleted,
            deleted_at: car.deleted_at,
            version: car.version,
            updated_at: car.updated_at,
            created_at: car.created_at,
            thumbnail_url: car.thumbnail.remote_url.clone(),
            full_photo_url: car.full_photo.remote_url.clone(),
            barcode_image_url: car.barcode_image.remote_url.clone(),
        }
    }

    /// Materialize a local record from the document. Channel states carry
    /// the remote URLs; callers decide whether to adopt them as synced.
    pub fn into_car(self) -> CollectibleCar {
        let with_url = |remote_url: Option<String>| ChannelState {
            remote_url,
            ..ChannelState::default()
        };
        let mut car = CollectibleCar::new(self.id, self.owner_id);
        car.brand = self.brand;
        car.model = self.model;
        car.year = self.year;
        car.series = self.series;
        car.subseries = self.subseries;
        car.color = self.color;
        car.model_number = self.model_number;
        car.barcode = self.barcode;
        car.tags = self.tags;
        car.notes = self.notes;
        car.purchase_price = self.purchase_price;
        car.current_value = self.current_value;
        car.is_treasure_hunt = self.is_treasure_hunt;
        car.is_super_treasure_hunt = self.is_super_treasure_hunt;
        car.is_favorite = self.is_favorite;
        car.is_deleted = self.is_deleted;
        car.deleted_at = self.deleted_at;
        car.version = self.version;
        car.updated_at = self.updated_at;
        car.created_at = self.created_at;
        car.thumbnail = with_url(self.thumbnail_url);
        car.full_photo = with_url(self.full_photo_url);
        car.barcode_image = with_url(self.barcode_image_url);
        car
    }
}

/// Response of the changed-since query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedRecordsResponse {
    pub records: Vec<RemoteCarRecord>,
}

/// Response of an object upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadObjectResponse {
    pub url: String,
}

/// Structured error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}
