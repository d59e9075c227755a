//! Connection pooling and the single-writer actor.
//!
//! Reads come straight off the pool; all mutations funnel through
//! [`WriteHandle`], a dedicated thread that runs each job inside an immediate
//! transaction. That serializes writes at the application level while reads
//! stay freely concurrent.

use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::error;
use tokio::sync::{mpsc, oneshot};

use diecast_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Build the shared connection pool for a SQLite database file.
pub fn create_pool(database_url: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(8)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::Pool(e.to_string())))?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &Arc<DbPool>) -> Result<DbConnection> {
    pool.get()
        .map_err(|e| Error::Database(DatabaseError::Pool(e.to_string())))
}

/// Apply any pending embedded migrations.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Database(DatabaseError::Internal(format!("Migration failed: {e}"))))?;
    Ok(())
}

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Handle to the writer actor. Cheap to clone; closing every clone stops the
/// writer thread.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteJob>,
}

/// Start the writer thread over the given pool.
pub fn spawn_writer(pool: Arc<DbPool>) -> Result<WriteHandle> {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
    std::thread::Builder::new()
        .name("db-writer".to_string())
        .spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                match pool.get() {
                    Ok(mut conn) => job(&mut conn),
                    Err(err) => error!("Writer could not obtain a connection: {err}"),
                }
            }
        })?;
    Ok(WriteHandle { tx })
}

enum TxError {
    Db(diesel::result::Error),
    App(Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Db(err)
    }
}

fn run_in_transaction<T>(
    conn: &mut SqliteConnection,
    job: impl FnOnce(&mut SqliteConnection) -> Result<T>,
) -> Result<T> {
    conn.immediate_transaction::<T, TxError, _>(|tx| job(tx).map_err(TxError::App))
        .map_err(|err| match err {
            TxError::Db(e) => Error::from(StorageError::from(e)),
            TxError::App(e) => e,
        })
}

impl WriteHandle {
    /// Run a job on the writer thread, wrapped in an immediate transaction.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let boxed: WriteJob = Box::new(move |conn| {
            let result = run_in_transaction(conn, job);
            let _ = done_tx.send(result);
        });
        self.tx.send(boxed).map_err(|_| {
            Error::Database(DatabaseError::Internal("Database writer is gone".to_string()))
        })?;
        done_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Database writer dropped the job".to_string(),
            ))
        })?
    }
}
