//! Single-row sync-engine bookkeeping: checkpoint, cycle outcomes, failures.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use diecast_core::errors::Result;
use diecast_core::sync::{SyncEngineStatus, SyncStateRepositoryTrait};
use serde::{Deserialize, Serialize};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_state;

const STATE_ROW_ID: i32 = 1;

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
#[diesel(table_name = crate::schema::sync_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncStateDB {
    pub id: i32,
    pub last_sync_at: i64,
    pub last_error: Option<String>,
    pub consecutive_failures: i32,
    pub last_cycle_status: Option<String>,
    pub last_cycle_duration_ms: Option<i64>,
}

fn default_row() -> SyncStateDB {
    SyncStateDB {
        id: STATE_ROW_ID,
        last_sync_at: 0,
        last_error: None,
        consecutive_failures: 0,
        last_cycle_status: None,
        last_cycle_duration_ms: None,
    }
}

pub struct SyncStateRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncStateRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn load_row(&self) -> Result<Option<SyncStateDB>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(sync_state::table
            .find(STATE_ROW_ID)
            .first::<SyncStateDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?)
    }
}

#[async_trait]
impl SyncStateRepositoryTrait for SyncStateRepository {
    fn last_sync_time(&self) -> Result<i64> {
        Ok(self.load_row()?.map(|row| row.last_sync_at).unwrap_or(0))
    }

    async fn set_last_sync_time(&self, at_ms: i64) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row = SyncStateDB {
                    last_sync_at: at_ms,
                    ..default_row()
                };
                diesel::insert_into(sync_state::table)
                    .values(&row)
                    .on_conflict(sync_state::id)
                    .do_update()
                    .set(sync_state::last_sync_at.eq(at_ms))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_cycle_success(&self, duration_ms: i64) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row = SyncStateDB {
                    last_cycle_status: Some("ok".to_string()),
                    last_cycle_duration_ms: Some(duration_ms),
                    ..default_row()
                };
                diesel::insert_into(sync_state::table)
                    .values(&row)
                    .on_conflict(sync_state::id)
                    .do_update()
                    .set((
                        sync_state::last_error.eq::<Option<String>>(None),
                        sync_state::consecutive_failures.eq(0),
                        sync_state::last_cycle_status.eq(Some("ok")),
                        sync_state::last_cycle_duration_ms.eq(Some(duration_ms)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_cycle_error(&self, message: String, duration_ms: i64) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row = SyncStateDB {
                    last_error: Some(message.clone()),
                    consecutive_failures: 1,
                    last_cycle_status: Some("error".to_string()),
                    last_cycle_duration_ms: Some(duration_ms),
                    ..default_row()
                };
                diesel::insert_into(sync_state::table)
                    .values(&row)
                    .on_conflict(sync_state::id)
                    .do_update()
                    .set((
                        sync_state::last_error.eq(Some(message)),
                        sync_state::consecutive_failures
                            .eq(sync_state::consecutive_failures + 1),
                        sync_state::last_cycle_status.eq(Some("error")),
                        sync_state::last_cycle_duration_ms.eq(Some(duration_ms)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn engine_status(&self) -> Result<SyncEngineStatus> {
        let row = self.load_row()?.unwrap_or_else(default_row);
        Ok(SyncEngineStatus {
            last_sync_at: row.last_sync_at,
            last_error: row.last_error,
            consecutive_failures: row.consecutive_failures,
            last_cycle_status: row.last_cycle_status,
            last_cycle_duration_ms: row.last_cycle_duration_ms,
        })
    }
}
