//! Round-robin pool of `DuckDB` connections for request handlers.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use duckdb::Connection;

use crate::DbError;

/// Simple round-robin pool of `DuckDB` connections.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so each connection is
/// wrapped in a `Mutex`. The guard returned by [`Self::acquire`] releases
/// the connection when dropped, whether or not the request succeeded.
pub struct DuckDbPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl std::fmt::Debug for DuckDbPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbPool")
            .field("size", &self.connections.len())
            .finish_non_exhaustive()
    }
}

impl DuckDbPool {
    /// Opens `size` read-only connections to the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any connection fails to open.
    pub fn open_read_only(path: &Path, size: usize) -> Result<Self, DbError> {
        let connections = (0..size.max(1))
            .map(|_| crate::schema::open_read_only(path))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Opened {} read-only connections to {}",
            connections.len(),
            path.display()
        );

        Ok(Self::from_connections(connections))
    }

    /// Wraps already-open connections.
    ///
    /// # Panics
    ///
    /// Panics if `connections` is empty.
    #[must_use]
    pub fn from_connections(connections: Vec<Connection>) -> Self {
        assert!(!connections.is_empty(), "DuckDbPool needs at least one connection");
        Self {
            connections: connections.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// Number of connections in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.connections.len()
    }

    /// Acquires the next connection from the pool (round-robin).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::PoolPoisoned`] if the connection's lock was
    /// poisoned by a panicking holder.
    pub fn acquire(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[idx]
            .lock()
            .map_err(|_| DbError::PoolPoisoned)
    }
}
