//! Application runtime owning every store of a session

use hirebase_core::{
    AppConfig, BackendKind, HirebaseResult, PersistenceStatus, StorageBackend,
};
use hirebase_marketplace::{
    MessageGateway, MessagingStore, OfflineProfileSource, ProfileDirectory, ProfileSource,
    SettingsStore, SimulatedGateway, WishlistStore,
};
use hirebase_state::{MemoryBackend, SledBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// All stores of one application session
///
/// Built once at start-up and passed to consumers by reference; cloning a
/// store handle shares the same store.
pub struct AppRuntime {
    config: AppConfig,
    backend: Arc<dyn StorageBackend>,
    settings: SettingsStore,
    wishlist: WishlistStore,
    messaging: MessagingStore,
    profiles: ProfileDirectory,
}

impl AppRuntime {
    /// Open every store over `backend`
    pub async fn open(
        config: AppConfig,
        backend: Arc<dyn StorageBackend>,
        gateway: Arc<dyn MessageGateway>,
        profile_source: Arc<dyn ProfileSource>,
    ) -> Self {
        let keys = &config.keys;
        
        let settings = SettingsStore::open(backend.clone(), &keys.settings).await;
        let wishlist = WishlistStore::open(backend.clone(), &keys.wishlist).await;
        let messaging =
            MessagingStore::open(backend.clone(), &keys.messages, gateway, &config.messaging).await;
        let profiles = ProfileDirectory::open(backend.clone(), &keys.profiles, profile_source).await;
        
        info!(
            app = %config.name,
            backend = backend.name(),
            wishlist = wishlist.len(),
            messages = messaging.read().len(),
            "stores opened"
        );
        
        Self {
            config,
            backend,
            settings,
            wishlist,
            messaging,
            profiles,
        }
    }
    
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }
    
    pub fn wishlist(&self) -> &WishlistStore {
        &self.wishlist
    }
    
    pub fn messaging(&self) -> &MessagingStore {
        &self.messaging
    }
    
    pub fn profiles(&self) -> &ProfileDirectory {
        &self.profiles
    }
    
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
    
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }
    
    /// Persistence status of every store, by storage key
    pub fn persistence_report(&self) -> Vec<(String, PersistenceStatus)> {
        let keys = &self.config.keys;
        vec![
            (keys.settings.clone(), self.settings.persistence_status()),
            (keys.wishlist.clone(), self.wishlist.persistence_status()),
            (keys.messages.clone(), self.messaging.persistence_status()),
            (keys.profiles.clone(), self.profiles.persistence_status()),
        ]
    }
}

/// Builder for [`AppRuntime`]
pub struct AppBuilder {
    config: AppConfig,
    backend: Option<Arc<dyn StorageBackend>>,
    gateway: Option<Arc<dyn MessageGateway>>,
    profile_source: Option<Arc<dyn ProfileSource>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            backend: None,
            gateway: None,
            profile_source: None,
        }
    }
    
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }
    
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }
    
    /// Use the memory backend instead of sled
    pub fn in_memory(mut self) -> Self {
        self.config.storage.backend = BackendKind::Memory;
        self
    }
    
    /// Use an existing backend; overrides the configured backend kind
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }
    
    pub fn gateway(mut self, gateway: Arc<dyn MessageGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }
    
    pub fn profile_source(mut self, source: Arc<dyn ProfileSource>) -> Self {
        self.profile_source = Some(source);
        self
    }
    
    pub async fn build(self) -> HirebaseResult<AppRuntime> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => open_backend(&self.config)?,
        };
        let gateway: Arc<dyn MessageGateway> = match self.gateway {
            Some(gateway) => gateway,
            None => Arc::new(SimulatedGateway::from_config(&self.config.messaging)),
        };
        let profile_source: Arc<dyn ProfileSource> = match self.profile_source {
            Some(source) => source,
            None => Arc::new(OfflineProfileSource),
        };
        
        Ok(AppRuntime::open(self.config, backend, gateway, profile_source).await)
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn open_backend(config: &AppConfig) -> HirebaseResult<Arc<dyn StorageBackend>> {
    match config.storage.backend {
        BackendKind::Memory => {
            let backend = match config.storage.quota_bytes {
                Some(quota) => MemoryBackend::with_quota(quota),
                None => MemoryBackend::new(),
            };
            Ok(Arc::new(backend))
        }
        BackendKind::Sled => {
            std::fs::create_dir_all(&config.data_dir)?;
            let backend = SledBackend::open(&config.data_dir)?;
            info!(path = %config.data_dir.display(), "opened sled backend");
            Ok(Arc::new(backend))
        }
    }
}
