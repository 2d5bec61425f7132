//! In-memory storage backend for tests and session-only deployments

use async_trait::async_trait;
use dashmap::DashMap;
use hirebase_core::{HirebaseError, HirebaseResult, StorageBackend};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory key/value backend
///
/// Supports an optional byte quota and a switch that makes every write fail,
/// which is how storage outages are simulated.
pub struct MemoryBackend {
    data: DashMap<String, String>,
    quota_bytes: Option<usize>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
    /// Held across the quota check and the insert
    quota_lock: Mutex<()>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            quota_bytes: None,
            fail_writes: AtomicBool::new(false),
            writes: AtomicU64::new(0),
            quota_lock: Mutex::new(()),
        }
    }
    
    /// Reject writes that would push the total stored bytes over `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }
    
    pub fn with_data(data: Vec<(String, String)>) -> Self {
        let backend = Self::new();
        for (key, value) in data {
            backend.data.insert(key, value);
        }
        backend
    }
    
    /// Make every subsequent write fail with `StorageUnavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
    
    /// Number of successful writes
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
    
    /// Bytes used by keys and values
    pub fn used_bytes(&self) -> usize {
        self.data
            .iter()
            .map(|entry| entry.key().len() + entry.value().len())
            .sum()
    }
    
    /// Raw stored value, bypassing the async interface
    pub fn raw(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|v| v.value().clone())
    }
    
    /// Fail when storing `value` under `key` would exceed `quota` bytes.
    /// The current value of `key` does not count, since it gets replaced.
    fn check_quota(&self, quota: usize, key: &str, value: &str) -> HirebaseResult<()> {
        let others: usize = self
            .data
            .iter()
            .filter(|entry| entry.key() != key)
            .map(|entry| entry.key().len() + entry.value().len())
            .sum();
        let needed = others + key.len() + value.len();
        if needed > quota {
            return Err(HirebaseError::QuotaExceeded {
                needed,
                available: quota,
            });
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }
    
    async fn get(&self, key: &str) -> HirebaseResult<Option<String>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }
    
    async fn put(&self, key: &str, value: &str) -> HirebaseResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HirebaseError::StorageUnavailable(format!(
                "writes to '{}' are disabled",
                key
            )));
        }
        
        let _quota_guard = match self.quota_bytes {
            Some(quota) => {
                let guard = self.quota_lock.lock();
                self.check_quota(quota, key, value)?;
                Some(guard)
            }
            None => None,
        };
        
        self.data.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    
    async fn remove(&self, key: &str) -> HirebaseResult<()> {
        self.data.remove(key);
        Ok(())
    }
}

/// Thread-safe memory backend wrapper
pub type SharedMemoryBackend = Arc<MemoryBackend>;

/// Create a shared memory backend
pub fn create_memory_backend() -> SharedMemoryBackend {
    Arc::new(MemoryBackend::new())
}
