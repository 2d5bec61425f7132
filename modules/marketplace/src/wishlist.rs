//! Jobseeker wishlist store

use hirebase_core::{HirebaseResult, Identified, PersistenceStatus, StorageBackend, Timestamp};
use hirebase_state::{IdList, ListItem, ListUpdate, PersistentStore, Subscription, SyncCoordinator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A saved job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistJob {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default)]
    pub saved_at: Timestamp,
}

impl WishlistJob {
    pub fn new(id: impl Into<String>, title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            location: String::new(),
            salary: None,
            job_type: None,
            saved_at: Timestamp::now(),
        }
    }
    
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
    
    pub fn with_salary(mut self, salary: impl Into<String>) -> Self {
        self.salary = Some(salary.into());
        self
    }
    
    pub fn with_job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }
}

impl Identified for WishlistJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl ListItem for WishlistJob {
    const KIND: &'static str = "wishlist";
}

/// Saved jobs in the order they were saved
pub type Wishlist = IdList<WishlistJob>;

/// Wishlist store shared by job cards, the wishlist page and the header badge
#[derive(Clone)]
pub struct WishlistStore {
    coordinator: SyncCoordinator<Wishlist>,
}

impl WishlistStore {
    pub async fn open(backend: Arc<dyn StorageBackend>, key: &str) -> Self {
        Self::from_coordinator(SyncCoordinator::open(PersistentStore::new(backend, key)).await)
    }
    
    pub fn from_coordinator(coordinator: SyncCoordinator<Wishlist>) -> Self {
        Self { coordinator }
    }
    
    pub fn read(&self) -> Arc<Wishlist> {
        self.coordinator.read()
    }
    
    /// Save a job. Saving an already saved id changes nothing.
    pub async fn add(&self, job: WishlistJob) -> HirebaseResult<Arc<Wishlist>> {
        self.coordinator.update(ListUpdate::Insert(job)).await
    }
    
    /// Unsave a job. Unknown ids are ignored.
    pub async fn remove(&self, id: &str) -> HirebaseResult<Arc<Wishlist>> {
        self.coordinator.update(ListUpdate::Remove(id.to_string())).await
    }
    
    /// Save the job if it is not saved, unsave it otherwise. Returns whether
    /// the job is saved afterwards.
    pub async fn toggle(&self, job: WishlistJob) -> HirebaseResult<bool> {
        let id = job.id.clone();
        let wishlist = self.coordinator.update(ListUpdate::Toggle(job)).await?;
        Ok(wishlist.contains(&id))
    }
    
    pub async fn clear(&self) -> HirebaseResult<Arc<Wishlist>> {
        self.coordinator.update(ListUpdate::Clear).await
    }
    
    pub fn is_member(&self, id: &str) -> bool {
        self.read().contains(id)
    }
    
    /// Saved jobs, oldest first
    pub fn items(&self) -> Vec<WishlistJob> {
        self.read().items().to_vec()
    }
    
    pub fn len(&self) -> usize {
        self.read().len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
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
    
    pub fn coordinator(&self) -> &SyncCoordinator<Wishlist> {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirebase_state::MemoryBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    
    async fn open_store() -> (Arc<MemoryBackend>, WishlistStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = WishlistStore::open(backend.clone(), "wishlist").await;
        (backend, store)
    }
    
    #[tokio::test]
    async fn test_duplicate_add_keeps_one_entry() {
        let (_backend, store) = open_store().await;
        
        store.add(WishlistJob::new("42", "X", "Acme")).await.unwrap();
        store.add(WishlistJob::new("42", "X again", "Acme")).await.unwrap();
        
        let wishlist = store.read();
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist.get("42").unwrap().title, "X");
    }
    
    #[tokio::test]
    async fn test_remove_twice_is_harmless() {
        let (_backend, store) = open_store().await;
        
        store.add(WishlistJob::new("7", "Designer", "Studio")).await.unwrap();
        store.remove("7").await.unwrap();
        store.remove("7").await.unwrap();
        
        assert!(store.is_empty());
        assert!(store.items().is_empty());
    }
    
    #[tokio::test]
    async fn test_toggle_and_membership() {
        let (_backend, store) = open_store().await;
        let job = WishlistJob::new("3", "Backend Engineer", "TechCorp")
            .with_location("Remote")
            .with_salary("$120k")
            .with_job_type("full-time");
        
        assert!(store.toggle(job.clone()).await.unwrap());
        assert!(store.is_member("3"));
        assert!(!store.toggle(job).await.unwrap());
        assert!(!store.is_member("3"));
    }
    
    #[tokio::test]
    async fn test_snapshot_is_a_json_array() {
        let (backend, store) = open_store().await;
        store.add(WishlistJob::new("1", "QA", "Acme")).await.unwrap();
        
        let raw = backend.raw("wishlist").unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["id"], "1");
        assert!(value[0].get("salary").is_none());
    }
    
    #[tokio::test]
    async fn test_clear_notifies_once() {
        let (_backend, store) = open_store().await;
        store.add(WishlistJob::new("1", "a", "b")).await.unwrap();
        store.add(WishlistJob::new("2", "c", "d")).await.unwrap();
        
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        
        let ids: Vec<String> = store.items().into_iter().map(|job| job.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
        
        store.clear().await.unwrap();
        assert_eq!(store.len(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
