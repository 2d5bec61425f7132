//! Change listeners and the handles that keep them registered

use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::error;

/// Callback run after every committed mutation. Carries no payload:
/// listeners re-read the store.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identity of one `subscribe` call
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<SubscriptionId, Listener>>,
}

/// Set of listeners for one store
///
/// Registration is per call: subscribing the same callback twice yields two
/// subscriptions and two invocations per notify.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_shared(Arc::new(listener))
    }
    
    /// Register an already shared listener
    pub fn subscribe_shared(&self, listener: Listener) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().insert(id, listener);
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }
    
    pub fn len(&self) -> usize {
        self.inner.listeners.lock().len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    
    /// Run every registered listener and return how many completed normally
    ///
    /// The listener set is captured before the first call, so listeners may
    /// subscribe or unsubscribe from inside a callback; the change applies
    /// from the next cycle. A panicking listener is logged and skipped.
    pub fn notify_all(&self) -> usize {
        let listeners: Vec<(SubscriptionId, Listener)> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();
        
        let mut completed = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener())) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    error!(subscription = %id, reason = panic_message(&*payload), "listener panicked");
                }
            }
        }
        completed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Keeps a listener registered; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
    
    /// True while the listener is still registered
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|inner| inner.listeners.lock().contains_key(&self.id))
            .unwrap_or(false)
    }
    
    /// Remove the listener now
    pub fn unsubscribe(self) {
        drop(self);
    }
    
    /// Keep the listener registered for the registry's whole lifetime
    ///
    /// A detached listener that owns a strong store handle keeps that store
    /// alive forever. Capture a weak handle
    /// ([`SyncCoordinator::downgrade`](crate::SyncCoordinator::downgrade)) instead.
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.listeners.lock().remove(&self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    
    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
    
    #[test]
    fn test_notify_reaches_every_listener() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        
        let _a = registry.subscribe(counting(&hits));
        let _b = registry.subscribe(counting(&hits));
        
        assert_eq!(registry.notify_all(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
    
    #[test]
    fn test_same_callback_registered_twice_runs_twice() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let listener: Listener = Arc::new(counting(&hits));
        
        let first = registry.subscribe_shared(listener.clone());
        let second = registry.subscribe_shared(listener);
        assert_ne!(first.id(), second.id());
        
        registry.notify_all();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        
        first.unsubscribe();
        registry.notify_all();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(second.is_active());
    }
    
    #[test]
    fn test_drop_unsubscribes() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        
        {
            let _sub = registry.subscribe(counting(&hits));
            assert_eq!(registry.len(), 1);
        }
        
        assert!(registry.is_empty());
        registry.notify_all();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
    
    #[test]
    fn test_detached_listener_stays_registered() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        
        registry.subscribe(counting(&hits)).detach();
        registry.notify_all();
        
        assert_eq!(registry.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
    
    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        
        let _before = registry.subscribe(counting(&hits));
        let _bad = registry.subscribe(|| panic!("render failed"));
        let _after = registry.subscribe(counting(&hits));
        
        assert_eq!(registry.notify_all(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        
        // The panicking listener stays registered and keeps being isolated
        assert_eq!(registry.notify_all(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }
    
    #[test]
    fn test_listener_may_unsubscribe_during_notify() {
        let registry = SubscriptionRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));
        
        let inner_slot = slot.clone();
        let inner_hits = hits.clone();
        let sub = registry.subscribe(move || {
            inner_hits.fetch_add(1, Ordering::SeqCst);
            inner_slot.lock().take();
        });
        *slot.lock() = Some(sub);
        
        registry.notify_all();
        registry.notify_all();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }
}
