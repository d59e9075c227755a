//! Photo assets owned by collectible records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync::SyncStatus;
use crate::utils::time::now_millis;

/// What the shot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoKind {
    Front,
    Back,
    CardFront,
    CardBack,
    Other,
}

/// Leaf asset of a [`super::CollectibleCar`]. Photos carry a single coarse
/// sync status rather than per-channel state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub car_id: String,
    pub kind: PhotoKind,
    /// Display ordering within the record.
    pub position: i32,
    pub local_path: String,
    /// Public URL once uploaded.
    pub remote_path: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub byte_size: Option<i64>,
    pub mime_type: Option<String>,

    pub sync_status: SyncStatus,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    pub version: i64,
    pub created_at: i64,

    /// When set together with `is_global`, the photo uploads to the shared
    /// barcode-keyed namespace instead of the owner's. Decided once at upload
    /// time and immutable for the asset afterwards.
    pub barcode: Option<String>,
    pub is_global: bool,
}

impl Photo {
    pub fn new(
        id: impl Into<String>,
        car_id: impl Into<String>,
        kind: PhotoKind,
        local_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            car_id: car_id.into(),
            kind,
            position: 0,
            local_path: local_path.into(),
            remote_path: None,
            width: None,
            height: None,
            byte_size: None,
            mime_type: None,
            sync_status: SyncStatus::PendingUpload,
            is_deleted: false,
            deleted_at: None,
            version: 1,
            created_at: now_millis(),
            barcode: None,
            is_global: false,
        }
    }

    /// Fresh photo with a generated client id.
    pub fn create(
        car_id: impl Into<String>,
        kind: PhotoKind,
        local_path: impl Into<String>,
    ) -> Self {
        Self::new(Uuid::new_v4().to_string(), car_id, kind, local_path)
    }

    /// Whether this asset belongs in the shared barcode namespace.
    pub fn contributes_globally(&self) -> bool {
        self.is_global && self.barcode.as_deref().is_some_and(|b| !b.is_empty())
    }

    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.deleted_at = Some(now_millis());
        self.sync_status = SyncStatus::PendingDelete;
        self.version += 1;
    }
}
