#[macro_use]
mod clock;

pub mod error;
pub mod migrations;
pub mod sessions;
pub mod snippets;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::{DomainError, ModelError, ModelResult, StoreError};
pub use sessions::{SessionStore, SqliteSessionStore};
pub use snippets::{LATEST_LIMIT, SnippetModel, SqliteSnippetModel};
pub use users::{SqliteUserModel, UserModel};

use rusqlite::{Connection, OpenFlags};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_READER_POOL_SIZE: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type Slot = Mutex<Option<Connection>>;

/// Store handle: one writer connection plus a small pool of read-only
/// readers, each behind its own mutex.
///
/// The handle is shared by every model for the life of the process. After
/// [`Database::close`] every call fails with [`StoreError::Closed`].
pub struct Database {
    writer: Slot,
    readers: Vec<Slot>,
    reader_idx: AtomicUsize,
    closed: AtomicBool,
}

impl Database {
    /// Open the store at `dsn` (a path or a `file:` URI), run migrations and
    /// check that every pooled connection answers.
    ///
    /// An in-memory DSN gets no readers: separate connections would see
    /// separate databases, so reads go through the writer instead.
    pub fn open(dsn: &str, reader_pool_size: usize) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let writer = Connection::open_with_flags(dsn, flags)?;
        writer.busy_timeout(BUSY_TIMEOUT)?;
        writer.pragma_update(None, "foreign_keys", "ON")?;

        let in_memory = is_in_memory(dsn);
        if !in_memory {
            // WAL mode for concurrent reads
            writer.pragma_update(None, "journal_mode", "WAL")?;
            writer.pragma_update(None, "synchronous", "NORMAL")?;
        }

        migrations::run(&writer)?;

        let reader_count = if in_memory { 0 } else { reader_pool_size.max(1) };
        let mut readers = Vec::with_capacity(reader_count);
        for _ in 0..reader_count {
            let conn = Connection::open_with_flags(
                dsn,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(Some(conn)));
        }

        let db = Self {
            writer: Mutex::new(Some(writer)),
            readers,
            reader_idx: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };
        db.ping()?;

        info!(
            "Database opened at {} (1 writer + {} readers)",
            dsn, reader_count
        );
        Ok(db)
    }

    /// Liveness check against every pooled connection.
    pub fn ping(&self) -> Result<(), StoreError> {
        let ping = |conn: &Connection| -> Result<(), StoreError> {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        };

        self.with_conn_mut(ping)?;
        for slot in &self.readers {
            let guard = lock(slot)?;
            ping(guard.as_ref().ok_or(StoreError::Closed)?)?;
        }
        Ok(())
    }

    /// Run `f` on a reader connection, round-robin.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        if self.readers.is_empty() {
            return self.with_conn_mut(f);
        }
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        run_on(&self.readers[idx], &self.closed, f)
    }

    /// Run `f` on the single writer connection.
    pub fn with_conn_mut<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        run_on(&self.writer, &self.closed, f)
    }

    /// Drop every pooled connection. Calls already holding a connection
    /// finish first; everything after sees [`StoreError::Closed`].
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for slot in std::iter::once(&self.writer).chain(self.readers.iter()) {
            let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.take();
        }
        info!("Database closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn reader_pool_size(&self) -> usize {
        self.readers.len()
    }
}

fn run_on<F, T, E>(slot: &Slot, closed: &AtomicBool, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<StoreError>,
{
    if closed.load(Ordering::SeqCst) {
        return Err(StoreError::Closed.into());
    }
    let guard = lock(slot)?;
    let conn = guard.as_ref().ok_or(StoreError::Closed)?;
    f(conn)
}

fn lock(slot: &Slot) -> Result<MutexGuard<'_, Option<Connection>>, StoreError> {
    slot.lock().map_err(|_| StoreError::Poisoned)
}

fn is_in_memory(dsn: &str) -> bool {
    dsn == ":memory:" || dsn.is_empty() || dsn.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_routes_reads_to_writer() {
        let db = Database::open(":memory:", 4).unwrap();
        assert_eq!(db.reader_pool_size(), 0);

        let n: i64 = db
            .with_conn(|conn| {
                Ok::<_, StoreError>(conn.query_row("SELECT count(*) FROM snippets", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn closed_store_refuses_calls() {
        let db = Database::open(":memory:", 1).unwrap();
        db.close();
        db.close();

        assert!(db.is_closed());
        assert!(matches!(db.ping(), Err(StoreError::Closed)));
        let res: Result<i64, StoreError> =
            db.with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |r| r.get(0))?));
        assert!(matches!(res, Err(StoreError::Closed)));
    }

    #[test]
    fn in_memory_dsn_detection() {
        assert!(is_in_memory(":memory:"));
        assert!(is_in_memory("file:snips?mode=memory&cache=shared"));
        assert!(!is_in_memory("/var/lib/snippetbox/snippetbox.db"));
        assert!(!is_in_memory("file:snippetbox.db"));
    }
}
