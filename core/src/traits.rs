//! Core traits defining HIREBASE interfaces
//! 
//! These traits define the seams between the generic store machinery and
//! the storage media and domain items plugged into it.

use async_trait::async_trait;

/// Result type for HIREBASE operations
pub type HirebaseResult<T> = Result<T, crate::error::HirebaseError>;

/// Durable key/value medium holding serialized snapshots
///
/// Values are UTF-8 text. Implementations must be safe to share between
/// stores; each store only touches its own key.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &str;
    
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> HirebaseResult<Option<String>>;
    
    /// Write `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &str) -> HirebaseResult<()>;
    
    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> HirebaseResult<()>;
    
    /// Check if a key exists
    async fn contains(&self, key: &str) -> HirebaseResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Item of a list aggregate, identified by a stable id
pub trait Identified {
    fn id(&self) -> &str;
}
