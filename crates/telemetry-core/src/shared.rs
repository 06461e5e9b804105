//! Mutually exclusive access to a [`HistoryStore`] across tasks.
//!
//! A serialize request from an HTTP handler must never observe a half-written
//! row from the snapshot task. [`SharedHistory`] puts the store behind one
//! async mutex and holds the guard for the whole duration of each operation,
//! so snapshot and serialize never interleave. The guard is dropped on every
//! exit path, including the error path of a rejected snapshot.
//!
//! # Example
//!
//! ```
//! use telemetry_core::{HistoryStore, SharedHistory};
//!
//! #[tokio::main]
//! async fn main() {
//!     let history = SharedHistory::new(HistoryStore::new(["a"], 8).unwrap());
//!
//!     let writer = history.clone();
//!     tokio::spawn(async move {
//!         writer.snapshot(&[1.0], 1).await.unwrap();
//!     })
//!     .await
//!     .unwrap();
//!
//!     assert_eq!(history.serialize().await, "1,1,");
//! }
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::history::{HistoryColumns, HistoryStore, HistorySummary};

/// Cloneable handle to a history store guarded by a single mutex.
#[derive(Debug, Clone)]
pub struct SharedHistory {
    inner: Arc<Mutex<HistoryStore>>,
}

impl SharedHistory {
    /// Wrap a store for shared use.
    pub fn new(store: HistoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Append one row while holding the lock.
    pub async fn snapshot(&self, values: &[f32], timestamp: u64) -> Result<()> {
        let mut store = self.inner.lock().await;
        store.snapshot(values, timestamp)
    }

    /// Serialize the whole history while holding the lock.
    pub async fn serialize(&self) -> String {
        let store = self.inner.lock().await;
        store.serialize()
    }

    /// Copy the history out column-wise while holding the lock.
    pub async fn columns(&self) -> HistoryColumns {
        let store = self.inner.lock().await;
        store.columns()
    }

    /// Shape and fill level of the store.
    pub async fn summary(&self) -> HistorySummary {
        let store = self.inner.lock().await;
        store.summary()
    }

    /// Run a read-only closure against the store while holding the lock.
    ///
    /// The closure must not block; the snapshot task waits on the same lock.
    pub async fn read<R>(&self, f: impl FnOnce(&HistoryStore) -> R) -> R {
        let store = self.inner.lock().await;
        f(&store)
    }
}
