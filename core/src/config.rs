//! Configuration types for HIREBASE

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::HirebaseError;
use crate::traits::HirebaseResult;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name for logging
    pub name: String,
    
    /// Data directory for the on-disk backend
    pub data_dir: PathBuf,
    
    /// Logging level (an `EnvFilter` directive)
    pub log_level: String,
    
    /// Storage configuration
    pub storage: StorageConfig,
    
    /// Storage keys for each store
    pub keys: StoreKeys,
    
    /// Messaging configuration
    pub messaging: MessagingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "hirebase".to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            keys: StoreKeys::default(),
            messaging: MessagingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a configuration from JSON. Missing sections fall back to defaults.
    pub fn from_json(json: &str) -> HirebaseResult<Self> {
        serde_json::from_str(json).map_err(|e| HirebaseError::Config(e.to_string()))
    }
    
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> HirebaseResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| HirebaseError::Config(e.to_string()))
    }
    
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> HirebaseResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| HirebaseError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }
}

/// Which durable medium backs the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Process-local map; state lasts for the process only
    Memory,
    /// sled database under `data_dir`
    #[default]
    Sled,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: BackendKind,
    
    /// Total bytes the memory backend accepts before reporting quota errors
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sled,
            quota_bytes: None,
        }
    }
}

/// Storage key per domain store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreKeys {
    pub settings: String,
    pub wishlist: String,
    pub messages: String,
    pub profiles: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            settings: "employerSettings".to_string(),
            wishlist: "wishlist".to_string(),
            messages: "messages".to_string(),
            profiles: "profiles".to_string(),
        }
    }
}

/// Messaging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Simulated delivery latency in milliseconds
    pub send_latency_ms: u64,
    
    /// Maximum message length in characters
    pub max_message_len: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            send_latency_ms: 500,
            max_message_len: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_partial_config_uses_defaults() {
        let config = AppConfig::from_json(r#"{"messaging": {"send_latency_ms": 0}}"#).unwrap();
        assert_eq!(config.messaging.send_latency_ms, 0);
        assert_eq!(config.messaging.max_message_len, 2000);
        assert_eq!(config.keys.settings, "employerSettings");
        assert_eq!(config.storage.backend, BackendKind::Sled);
    }
    
    #[test]
    fn test_invalid_config_is_config_error() {
        let err = AppConfig::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, HirebaseError::Config(_)));
    }
    
    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig {
            log_level: "debug".into(),
            ..Default::default()
        };
        let parsed = AppConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed.log_level, "debug");
    }
}
