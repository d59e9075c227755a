//! Remote service contracts: the document catalog and the binary object
//! store, plus the path routing between the per-owner and the shared
//! barcode-keyed namespaces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collection::{CollectibleCar, Photo};
use crate::errors::Result;

/// Destination of one uploaded object. The namespace decision is made once,
/// at upload time, and never revisited for the asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectPath {
    /// `owners/{owner_id}/{car_id}/{asset}` — private to one account.
    Owned {
        owner_id: String,
        car_id: String,
        asset: String,
    },
    /// `barcodes/{barcode}/{asset}` — shared lookup-by-barcode dataset.
    Global { barcode: String, asset: String },
}

impl ObjectPath {
    pub fn owned(
        owner_id: impl Into<String>,
        car_id: impl Into<String>,
        asset: impl Into<String>,
    ) -> Self {
        Self::Owned {
            owner_id: owner_id.into(),
            car_id: car_id.into(),
            asset: asset.into(),
        }
    }

    pub fn global(barcode: impl Into<String>, asset: impl Into<String>) -> Self {
        Self::Global {
            barcode: barcode.into(),
            asset: asset.into(),
        }
    }

    pub fn to_path(&self) -> String {
        match self {
            Self::Owned {
                owner_id,
                car_id,
                asset,
            } => format!("owners/{owner_id}/{car_id}/{asset}"),
            Self::Global { barcode, asset } => format!("barcodes/{barcode}/{asset}"),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global { .. })
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_path())
    }
}

/// Route a photo to its upload destination.
pub fn photo_object_path(photo: &Photo, owner_id: &str) -> ObjectPath {
    let asset = format!("{}.jpg", photo.id);
    match photo.barcode.as_deref() {
        Some(barcode) if photo.contributes_globally() => ObjectPath::global(barcode, asset),
        _ => ObjectPath::owned(owner_id, photo.car_id.clone(), asset),
    }
}

/// Entry in the shared lookup-by-barcode dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeAsset {
    pub barcode: String,
    pub model: String,
    pub brand: String,
    pub series: String,
    pub year: i32,
    pub thumbnail_url: Option<String>,
    pub full_photo_url: Option<String>,
    pub barcode_image_url: Option<String>,
}

impl BarcodeAsset {
    /// Seed a barcode entry from a local record and the (optional) uploaded
    /// barcode image.
    pub fn from_car(car: &CollectibleCar, barcode_image_url: Option<String>) -> Self {
        Self {
            barcode: car.barcode.clone(),
            model: car.model.clone(),
            brand: car.brand.clone(),
            series: car.series.clone(),
            year: car.year,
            thumbnail_url: car.thumbnail.remote_url.clone(),
            full_photo_url: car.full_photo.remote_url.clone(),
            barcode_image_url,
        }
    }
}

/// Document API keyed by owner then record id.
#[async_trait]
pub trait RemoteCatalogTrait: Send + Sync {
    /// Every record of the owner mutated strictly after `since_ms`.
    async fn records_changed_since(
        &self,
        owner_id: &str,
        since_ms: i64,
    ) -> Result<Vec<CollectibleCar>>;

    async fn upsert_record(&self, car: &CollectibleCar) -> Result<()>;

    async fn delete_record(&self, owner_id: &str, car_id: &str) -> Result<()>;

    /// Point read of the shared barcode dataset; `None` when the barcode is
    /// not known remotely.
    async fn find_barcode_asset(&self, barcode: &str) -> Result<Option<BarcodeAsset>>;

    async fn register_barcode_asset(&self, asset: &BarcodeAsset) -> Result<()>;
}

/// Binary object API: upload-by-path and delete-by-path.
#[async_trait]
pub trait RemoteObjectStoreTrait: Send + Sync {
    /// Upload bytes and return the public download URL.
    async fn upload_object(
        &self,
        path: &ObjectPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;

    async fn delete_object(&self, path: &ObjectPath) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::PhotoKind;

    #[test]
    fn owned_and_global_namespaces_render_distinctly() {
        let owned = ObjectPath::owned("owner-1", "car-1", "thumbnail.jpg");
        assert_eq!(owned.to_path(), "owners/owner-1/car-1/thumbnail.jpg");

        let global = ObjectPath::global("0657084", "barcode.jpg");
        assert_eq!(global.to_path(), "barcodes/0657084/barcode.jpg");
        assert!(global.is_global());
    }

    #[test]
    fn photo_routing_honors_the_global_contribution_flag() {
        let mut photo = Photo::new("p1", "car-1", PhotoKind::Front, "/tmp/p1.jpg");
        assert_eq!(
            photo_object_path(&photo, "owner-1").to_path(),
            "owners/owner-1/car-1/p1.jpg"
        );

        photo.is_global = true;
        photo.barcode = Some("0657084".to_string());
        assert_eq!(
            photo_object_path(&photo, "owner-1").to_path(),
            "barcodes/0657084/p1.jpg"
        );
    }
}
