//! Profile cache over the injected profile service

use async_trait::async_trait;
use hirebase_core::{
    HirebaseError, HirebaseResult, Identified, PersistenceStatus, StorageBackend, Timestamp, UserId,
};
use hirebase_state::{IdList, ListItem, ListUpdate, PersistentStore, Subscription, SyncCoordinator};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dashboard a user belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Employer,
    Freelancer,
    Jobseeker,
}

/// Public profile of a marketplace user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub fetched_at: Timestamp,
}

impl Profile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            headline: String::new(),
            skills: Vec::new(),
            fetched_at: Timestamp::default(),
        }
    }
}

impl Identified for Profile {
    fn id(&self) -> &str {
        &self.id
    }
}

impl ListItem for Profile {
    const KIND: &'static str = "profiles";
}

pub type ProfileCache = IdList<Profile>;

/// Remote profile service
///
/// An unreachable service must be reported as
/// [`HirebaseError::BackendUnavailable`] so callers can fall back to cache.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, user_id: &UserId) -> HirebaseResult<Profile>;
}

/// Source for sessions without a profile service
pub struct OfflineProfileSource;

#[async_trait]
impl ProfileSource for OfflineProfileSource {
    async fn fetch_profile(&self, user_id: &UserId) -> HirebaseResult<Profile> {
        Err(HirebaseError::BackendUnavailable(format!(
            "no profile service configured for {}",
            user_id
        )))
    }
}

/// Fixed set of profiles with a switchable outage
#[derive(Default)]
pub struct StaticProfileSource {
    profiles: RwLock<HashMap<UserId, Profile>>,
    offline: AtomicBool,
}

impl StaticProfileSource {
    pub fn new(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let source = Self::default();
        for profile in profiles {
            source.insert(profile);
        }
        source
    }
    
    pub fn insert(&self, profile: Profile) {
        self.profiles
            .write()
            .insert(UserId::new(profile.id.clone()), profile);
    }
    
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileSource for StaticProfileSource {
    async fn fetch_profile(&self, user_id: &UserId) -> HirebaseResult<Profile> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(HirebaseError::BackendUnavailable("profile service offline".into()));
        }
        self.profiles
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| HirebaseError::NotFound(format!("profile {}", user_id)))
    }
}

/// Profiles fetched during this and earlier sessions
#[derive(Clone)]
pub struct ProfileDirectory {
    coordinator: SyncCoordinator<ProfileCache>,
    source: Arc<dyn ProfileSource>,
}

impl ProfileDirectory {
    pub async fn open(
        backend: Arc<dyn StorageBackend>,
        key: &str,
        source: Arc<dyn ProfileSource>,
    ) -> Self {
        let coordinator = SyncCoordinator::open(PersistentStore::new(backend, key)).await;
        Self::from_coordinator(coordinator, source)
    }
    
    pub fn from_coordinator(
        coordinator: SyncCoordinator<ProfileCache>,
        source: Arc<dyn ProfileSource>,
    ) -> Self {
        Self { coordinator, source }
    }
    
    pub fn read(&self) -> Arc<ProfileCache> {
        self.coordinator.read()
    }
    
    /// Fetch a profile and cache it
    ///
    /// When the service is unavailable the cached copy is returned instead;
    /// without one the unavailability error is returned.
    pub async fn refresh(&self, user_id: &UserId) -> HirebaseResult<Profile> {
        match self.source.fetch_profile(user_id).await {
            Ok(mut profile) => {
                profile.fetched_at = Timestamp::now();
                self.coordinator
                    .update(ListUpdate::Upsert(profile.clone()))
                    .await?;
                debug!(user = %user_id, "profile refreshed");
                Ok(profile)
            }
            Err(HirebaseError::BackendUnavailable(reason)) => {
                warn!(user = %user_id, reason = %reason, "profile service unavailable, using cache");
                self.cached(user_id)
                    .ok_or(HirebaseError::BackendUnavailable(reason))
            }
            Err(e) => Err(e),
        }
    }
    
    pub fn cached(&self, user_id: &UserId) -> Option<Profile> {
        self.read().get(user_id.as_str()).cloned()
    }
    
    pub async fn evict(&self, user_id: &UserId) -> HirebaseResult<Arc<ProfileCache>> {
        self.coordinator
            .update(ListUpdate::Remove(user_id.as_str().to_string()))
            .await
    }
    
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.coordinator.subscribe(listener)
    }
    
    pub fn persistence_status(&self) -> PersistenceStatus {
        self.coordinator.persistence_status()
    }
}
