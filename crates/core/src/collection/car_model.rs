//! Collectible car record: payload fields plus the sync metadata that the
//! conflict resolver and sync services operate on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync::{ChannelState, SyncChannel, SyncStatus};
use crate::utils::time::now_millis;

/// The core synchronizable entity. The descriptive fields are payload; the
/// tombstone/version/channel fields drive the sync machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleCar {
    /// Client-generated UUID, immutable after creation.
    pub id: String,
    /// Account that owns the record; partitions queries and cloud paths.
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

    pub thumbnail_path: Option<String>,
    pub full_photo_path: Option<String>,
    pub barcode_photo_path: Option<String>,

    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    /// Monotonically increasing; bumped on every conflict-relevant local
    /// mutation, adopted wholesale when a remote winner is applied.
    pub version: i64,
    pub updated_at: i64,
    pub created_at: i64,
    /// 0-100, highest first in the failure sweep.
    pub sync_priority: i32,

    pub thumbnail: ChannelState,
    pub metadata: ChannelState,
    pub full_photo: ChannelState,
    pub barcode_image: ChannelState,
}

impl CollectibleCar {
    /// Fresh record as produced by a completed capture flow: version 1, all
    /// channels pending.
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            brand: String::new(),
            model: String::new(),
            year: 0,
            series: String::new(),
            subseries: String::new(),
            color: String::new(),
            model_number: String::new(),
            barcode: String::new(),
            tags: Vec::new(),
            notes: String::new(),
            purchase_price: 0.0,
            current_value: 0.0,
            is_treasure_hunt: false,
            is_super_treasure_hunt: false,
            is_favorite: false,
            thumbnail_path: None,
            full_photo_path: None,
            barcode_photo_path: None,
            is_deleted: false,
            deleted_at: None,
            version: 1,
            updated_at: now,
            created_at: now,
            sync_priority: 100,
            thumbnail: ChannelState::default(),
            metadata: ChannelState::default(),
            full_photo: ChannelState::default(),
            barcode_image: ChannelState::default(),
        }
    }

    /// Fresh record with a generated client id.
    pub fn create(owner_id: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), owner_id)
    }

    pub fn has_barcode(&self) -> bool {
        !self.barcode.trim().is_empty()
    }

    pub fn channel(&self, channel: SyncChannel) -> &ChannelState {
        match channel {
            SyncChannel::Thumbnail => &self.thumbnail,
            SyncChannel::Metadata => &self.metadata,
            SyncChannel::FullPhoto => &self.full_photo,
            SyncChannel::BarcodeImage => &self.barcode_image,
        }
    }

    pub fn channel_mut(&mut self, channel: SyncChannel) -> &mut ChannelState {
        match channel {
            SyncChannel::Thumbnail => &mut self.thumbnail,
            SyncChannel::Metadata => &mut self.metadata,
            SyncChannel::FullPhoto => &mut self.full_photo,
            SyncChannel::BarcodeImage => &mut self.barcode_image,
        }
    }

    /// Coarse status, derived. `Synced` iff every applicable channel is
    /// synced; a record without a barcode treats the barcode channel as
    /// trivially satisfied.
    pub fn sync_status(&self) -> SyncStatus {
        if self.is_deleted {
            return SyncStatus::PendingDelete;
        }
        let browse_ready = self.thumbnail.is_synced() && self.metadata.is_synced();
        let barcode_done = !self.has_barcode() || self.barcode_image.is_synced();
        if browse_ready && self.full_photo.is_synced() && barcode_done {
            SyncStatus::Synced
        } else if browse_ready {
            SyncStatus::Partial
        } else {
            SyncStatus::PendingUpload
        }
    }

    /// Record a local edit: bump version/updated_at and flip the metadata
    /// channel back to pending so the next pass pushes the new document.
    pub fn mark_locally_modified(&mut self) {
        self.version += 1;
        self.updated_at = now_millis();
        self.metadata = ChannelState::default();
    }

    /// Tombstone the record. Deletion propagates through sync like any other
    /// change, so the version still bumps.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.deleted_at = Some(now_millis());
        self.version += 1;
        self.updated_at = now_millis();
    }

    /// Adopt this record as the remote source of truth: every channel is
    /// forced synced (keeping whatever URLs the wire carried), the version
    /// and timestamps stay exactly as the remote sent them.
    pub fn into_adopted(mut self) -> Self {
        self.is_deleted = false;
        self.deleted_at = None;
        for channel in SyncChannel::ALL {
            let state = self.channel_mut(channel);
            let remote_url = state.remote_url.take();
            *state = ChannelState::synced(remote_url);
        }
        self
    }
}
