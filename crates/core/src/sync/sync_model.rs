//! Sync domain models: per-channel state machines, derived record status,
//! engine bookkeeping contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Upper bound on upload attempts per channel before it parks in `Failed`.
pub const MAX_CHANNEL_ATTEMPTS: i32 = 3;

/// The four independent sync channels carried by every collectible record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncChannel {
    Thumbnail,
    Metadata,
    FullPhoto,
    BarcodeImage,
}

impl SyncChannel {
    /// All channels, in upload-priority order.
    pub const ALL: [SyncChannel; 4] = [
        SyncChannel::Thumbnail,
        SyncChannel::Metadata,
        SyncChannel::FullPhoto,
        SyncChannel::BarcodeImage,
    ];
}

/// Lifecycle of one sync channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Pending,
    InFlight,
    Synced,
    Failed,
    Retrying,
}

/// State tracked per (record, channel) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelState {
    pub status: ChannelStatus,
    /// Download URL once the asset landed. Stays `None` for the metadata
    /// channel, which syncs a document rather than bytes.
    pub remote_url: Option<String>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<i64>,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            status: ChannelStatus::Pending,
            remote_url: None,
            attempts: 0,
            last_error: None,
            last_attempt_at: None,
        }
    }
}

impl ChannelState {
    pub fn synced(remote_url: Option<String>) -> Self {
        Self {
            status: ChannelStatus::Synced,
            remote_url,
            ..Self::default()
        }
    }

    pub fn is_synced(&self) -> bool {
        self.status == ChannelStatus::Synced
    }

    /// Whether the failure sweep should pick this channel up again.
    pub fn needs_retry(&self) -> bool {
        matches!(
            self.status,
            ChannelStatus::Pending | ChannelStatus::Retrying | ChannelStatus::Failed
        ) && self.attempts < MAX_CHANNEL_ATTEMPTS
    }
}

/// Coarse record status, derived from the tombstone flag and the four
/// channel states. Never stored independently, so it cannot drift from the
/// fine-grained state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    /// Thumbnail and metadata landed, so the record is browse-visible, but
    /// the full-resolution photo is still on its way.
    Partial,
    PendingUpload,
    PendingDelete,
}

/// Coarse engine state surfaced to UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "message")]
pub enum SyncState {
    Idle,
    Syncing,
    Success,
    Error(String),
}

/// Outcome summary of one full sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub pushed_records: usize,
    pub deleted_records: usize,
    pub uploaded_photos: usize,
    pub deleted_photos: usize,
    pub applied_records: usize,
    /// True when the pass was throttled away without touching the network.
    pub skipped: bool,
    pub duration_ms: i64,
}

impl SyncReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Persistent sync-engine bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEngineStatus {
    /// Checkpoint: everything remote mutated after this instant is still
    /// unseen by this device.
    pub last_sync_at: i64,
    pub last_error: Option<String>,
    pub consecutive_failures: i32,
    pub last_cycle_status: Option<String>,
    pub last_cycle_duration_ms: Option<i64>,
}

/// Checkpoint and cycle-outcome bookkeeping, backed by a single-row table.
#[async_trait]
pub trait SyncStateRepositoryTrait: Send + Sync {
    fn last_sync_time(&self) -> Result<i64>;
    async fn set_last_sync_time(&self, at_ms: i64) -> Result<()>;
    async fn mark_cycle_success(&self, duration_ms: i64) -> Result<()>;
    async fn mark_cycle_error(&self, message: String, duration_ms: i64) -> Result<()>;
    fn engine_status(&self) -> Result<SyncEngineStatus>;
}
