//! SQLite cache backend for persistent storage.

use super::{CacheBackend, CacheEntry};
use crate::core::hasher::ContentHash;
use crate::core::metadata::MetadataResult;
use crate::error::CacheError;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// SQLite-backed persistent cache
///
/// Writes go through one connection guarded by a mutex. Lookups use a pool
/// of read-only connections, grown on demand up to one per concurrent
/// caller, so workers read in parallel. WAL mode lets those readers and
/// other processes proceed while a write is in flight.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
    db_path: PathBuf,
}

impl SqliteCache {
    /// Open or create a cache database at the given path
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| Self::open_error(path, e))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Self::open_error(path, e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                hash TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                device TEXT NOT NULL,
                year TEXT NOT NULL,
                date TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| Self::open_error(path, e))?;

        Ok(Self {
            conn: Mutex::new(conn),
            readers: Mutex::new(Vec::new()),
            db_path: path.to_path_buf(),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Close the connections, reporting any error from the final flush
    pub fn close(self) -> Result<(), CacheError> {
        drop(self.readers);
        let conn = self.conn.into_inner().map_err(|_| CacheError::Corrupted {
            path: self.db_path.clone(),
        })?;
        conn.close()
            .map_err(|(_, e)| CacheError::QueryFailed(e.to_string()))
    }

    fn open_error(path: &Path, error: rusqlite::Error) -> CacheError {
        match error {
            rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::NotADatabase => {
                CacheError::Corrupted {
                    path: path.to_path_buf(),
                }
            }
            other => CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    /// Run `read` on an idle reader, opening a new one if none is free
    fn with_reader<T>(
        &self,
        read: impl FnOnce(&Connection) -> Result<T, CacheError>,
    ) -> Result<T, CacheError> {
        let idle = self
            .readers
            .lock()
            .map_err(|_| CacheError::Corrupted {
                path: self.db_path.clone(),
            })?
            .pop();
        let conn = match idle {
            Some(conn) => conn,
            None => {
                debug!(path = %self.db_path.display(), "opening cache reader");
                Connection::open_with_flags(
                    &self.db_path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(|e| Self::open_error(&self.db_path, e))?
            }
        };

        let result = read(&conn);
        if let Ok(mut readers) = self.readers.lock() {
            readers.push(conn);
        }
        result
    }

    fn upsert(conn: &Connection, entry: &CacheEntry) -> Result<(), CacheError> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (hash, path, device, year, date)
             VALUES (?, ?, ?, ?, ?)",
            params![
                entry.hash.as_str(),
                entry.path.to_string_lossy(),
                entry.metadata.device,
                entry.metadata.year,
                entry.metadata.date,
            ],
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        Ok(())
    }
}

impl CacheBackend for SqliteCache {
    fn lookup(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, CacheError> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT path, device, year, date FROM metadata WHERE hash = ?",
                [hash.as_str()],
                |row| {
                    Ok(CacheEntry {
                        hash: hash.clone(),
                        path: PathBuf::from(row.get::<_, String>(0)?),
                        metadata: MetadataResult {
                            device: row.get(1)?,
                            year: row.get(2)?,
                            date: row.get(3)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))
        })
    }

    fn store(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let conn = self.lock()?;
        Self::upsert(&conn, entry)
    }

    fn store_batch(&self, entries: &[CacheEntry]) -> Result<(), CacheError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        for entry in entries {
            Self::upsert(&tx, entry)?;
        }

        tx.commit()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))
    }

    fn len(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM metadata", [], |row| {
            row.get::<_, i64>(0).map(|v| v as usize)
        })
        .map_err(|e| CacheError::QueryFailed(e.to_string()))
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM metadata", [])
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        Ok(())
    }
}
