//! Durable snapshot persistence: the sled backend and the typed
//! `PersistentStore` used by each coordinator

use async_trait::async_trait;
use hirebase_core::{HirebaseError, HirebaseResult, StorageBackend};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::snapshot;

const SNAPSHOT_TREE: &str = "snapshots";

/// Storage backend backed by a sled database
pub struct SledBackend {
    db: Db,
    snapshots: Tree,
}

impl SledBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> HirebaseResult<Self> {
        let db = sled::open(path).map_err(unavailable)?;
        let snapshots = db.open_tree(SNAPSHOT_TREE).map_err(unavailable)?;
        Ok(Self { db, snapshots })
    }
    
    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

fn unavailable(err: sled::Error) -> HirebaseError {
    HirebaseError::StorageUnavailable(err.to_string())
}

fn write_failed(err: sled::Error) -> HirebaseError {
    match err {
        sled::Error::Io(io) => HirebaseError::StorageUnavailable(io.to_string()),
        other => HirebaseError::StorageWrite(other.to_string()),
    }
}

#[async_trait]
impl StorageBackend for SledBackend {
    fn name(&self) -> &str {
        "sled"
    }
    
    async fn get(&self, key: &str) -> HirebaseResult<Option<String>> {
        match self.snapshots.get(key.as_bytes()).map_err(unavailable)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| HirebaseError::Deserialization(e.to_string())),
            None => Ok(None),
        }
    }
    
    async fn put(&self, key: &str, value: &str) -> HirebaseResult<()> {
        self.snapshots
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(write_failed)?;
        self.db.flush_async().await.map_err(write_failed)?;
        Ok(())
    }
    
    async fn remove(&self, key: &str) -> HirebaseResult<()> {
        self.snapshots.remove(key.as_bytes()).map_err(write_failed)?;
        self.db.flush_async().await.map_err(write_failed)?;
        Ok(())
    }
}

/// Create a shared sled backend
pub fn create_sled_backend<P: AsRef<Path>>(path: P) -> HirebaseResult<Arc<SledBackend>> {
    Ok(Arc::new(SledBackend::open(path)?))
}

/// Typed snapshot slot: one aggregate under one key of a backend
pub struct PersistentStore<A> {
    backend: Arc<dyn StorageBackend>,
    key: String,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: Serialize + DeserializeOwned> PersistentStore<A> {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            _aggregate: PhantomData,
        }
    }
    
    pub fn key(&self) -> &str {
        &self.key
    }
    
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }
    
    /// Read the snapshot. Missing, unreadable or corrupt snapshots yield
    /// `None` so the caller can fall back to defaults.
    pub async fn load(&self) -> Option<A> {
        let text = match self.backend.get(&self.key).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(key = %self.key, backend = self.backend.name(), "no snapshot stored");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, backend = self.backend.name(), error = %e, "snapshot read failed");
                return None;
            }
        };
        
        match snapshot::decode(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding corrupt snapshot");
                None
            }
        }
    }
    
    /// Serialize and write the snapshot
    pub async fn save(&self, value: &A) -> HirebaseResult<()> {
        let text = snapshot::encode(value)?;
        self.backend.put(&self.key, &text).await
    }
    
    /// Delete the snapshot
    pub async fn clear(&self) -> HirebaseResult<()> {
        self.backend.remove(&self.key).await
    }
}

impl<A> Clone for PersistentStore<A> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            key: self.key.clone(),
            _aggregate: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::store::tests::Counter;
    use tempfile::TempDir;
    
    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PersistentStore::<Counter>::new(backend, "counter");
        let counter = Counter {
            label: "views".into(),
            count: 7,
        };
        
        assert_eq!(store.load().await, None);
        store.save(&counter).await.unwrap();
        assert_eq!(store.load().await, Some(counter));
        
        store.clear().await.unwrap();
        assert_eq!(store.load().await, None);
    }
    
    #[tokio::test]
    async fn test_corrupt_snapshot_loads_as_none() {
        let backend = Arc::new(MemoryBackend::with_data(vec![(
            "counter".into(),
            "{\"count\": [".into(),
        )]));
        let store = PersistentStore::<Counter>::new(backend, "counter");
        
        assert_eq!(store.load().await, None);
    }
    
    #[tokio::test]
    async fn test_save_failure_is_returned() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_writes(true);
        let store = PersistentStore::<Counter>::new(backend, "counter");
        
        let err = store.save(&Counter::default()).await.unwrap_err();
        assert!(err.is_storage());
    }
    
    #[tokio::test]
    async fn test_sled_backend_reopen() {
        let tmp = TempDir::new().unwrap();
        
        // Write data
        {
            let backend = SledBackend::open(tmp.path()).unwrap();
            backend.put("employerSettings", "{\"a\":1}").await.unwrap();
            backend.put("wishlist", "[]").await.unwrap();
            backend.remove("wishlist").await.unwrap();
        }
        
        // Reopen and verify
        {
            let backend = SledBackend::open(tmp.path()).unwrap();
            assert_eq!(
                backend.get("employerSettings").await.unwrap(),
                Some("{\"a\":1}".to_string())
            );
            assert_eq!(backend.get("wishlist").await.unwrap(), None);
            assert_eq!(backend.len(), 1);
        }
    }
}
