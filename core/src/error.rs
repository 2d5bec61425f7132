//! Error types for HIREBASE

use thiserror::Error;

/// Main error type for HIREBASE
#[derive(Error, Debug)]
pub enum HirebaseError {
    // ============ Storage Errors ============
    #[error("Storage write failed: {0}")]
    StorageWrite(String),
    
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },
    
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    
    // ============ Snapshot Errors ============
    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),
    
    #[error("Snapshot deserialization failed: {0}")]
    Deserialization(String),
    
    // ============ Store Errors ============
    #[error("Store closed: {0}")]
    StoreClosed(String),
    
    #[error("Timeout: {0}")]
    Timeout(String),
    
    // ============ Domain Errors ============
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    
    #[error("Message delivery failed: {0}")]
    DeliveryFailed(String),
    
    // ============ Collaborator Errors ============
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    
    #[error("Not found: {0}")]
    NotFound(String),
    
    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    Config(String),
    
    // ============ General Errors ============
    #[error("Internal error: {0}")]
    Internal(String),
    
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HirebaseError {
    /// True for failures of the durable medium that leave in-memory state usable
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            HirebaseError::StorageWrite(_)
                | HirebaseError::QuotaExceeded { .. }
                | HirebaseError::StorageUnavailable(_)
                | HirebaseError::Serialization(_)
        )
    }
}

impl From<std::io::Error> for HirebaseError {
    fn from(err: std::io::Error) -> Self {
        HirebaseError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for HirebaseError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            HirebaseError::StorageUnavailable(err.to_string())
        } else {
            HirebaseError::Deserialization(err.to_string())
        }
    }
}
