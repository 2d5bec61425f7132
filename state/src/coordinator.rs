//! Sync coordinator: the single write path of a store
//!
//! Every store is driven by one worker task that owns its `PersistentStore`
//! and processes updates from an unbounded channel, one at a time:
//!
//! ```text
//! Idle -> Merging -> Persisting -> Notifying -> Idle
//! ```
//!
//! Updates are enqueued when `update` is called, not when its future is
//! polled, so call order is commit order. Dropping the returned future only
//! discards the result; the mutation still completes.

use hirebase_core::{HirebaseError, HirebaseResult, PersistenceStatus, StateVersion};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::persistent::PersistentStore;
use crate::store::{Aggregate, StateContainer};
use crate::subscription::{Subscription, SubscriptionRegistry};

/// Messages sent from handles to the store worker
enum Command<A: Aggregate> {
    Update {
        update: A::Update,
        reply: oneshot::Sender<Arc<A>>,
    },
}

/// State shared between handles and the worker
struct Shared<A: Aggregate> {
    container: StateContainer<A>,
    subscribers: SubscriptionRegistry,
    version: RwLock<StateVersion>,
    status: RwLock<PersistenceStatus>,
    key: String,
}

/// Cloneable handle to one store
pub struct SyncCoordinator<A: Aggregate> {
    shared: Arc<Shared<A>>,
    tx: mpsc::UnboundedSender<Command<A>>,
}

impl<A: Aggregate> SyncCoordinator<A> {
    /// Open a store, seeding it from its snapshot or from `A::default()`
    ///
    /// Must be called inside a tokio runtime; the worker is spawned on it.
    pub async fn open(persistent: PersistentStore<A>) -> Self {
        let initial = match persistent.load().await {
            Some(value) => {
                info!(store = A::NAME, key = persistent.key(), "restored from snapshot");
                value
            }
            None => {
                info!(store = A::NAME, key = persistent.key(), "starting from defaults");
                A::default()
            }
        };
        Self::start(initial, persistent)
    }
    
    /// Start a store from an explicit initial value without reading the backend
    pub fn start(initial: A, persistent: PersistentStore<A>) -> Self {
        let shared = Arc::new(Shared {
            container: StateContainer::new(initial),
            subscribers: SubscriptionRegistry::new(),
            version: RwLock::new(StateVersion::new(0)),
            status: RwLock::new(PersistenceStatus::Durable),
            key: persistent.key().to_string(),
        });
        
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(shared.clone(), persistent, rx));
        
        Self { shared, tx }
    }
    
    /// Queue an update and wait for it to be committed
    ///
    /// Resolves to the aggregate as it was right after this update. Storage
    /// failures are logged and reflected in [`persistence_status`], not
    /// returned; the only error is a closed store.
    ///
    /// [`persistence_status`]: SyncCoordinator::persistence_status
    pub fn update(
        &self,
        update: A::Update,
    ) -> impl Future<Output = HirebaseResult<Arc<A>>> + Send + 'static {
        let (reply, committed) = oneshot::channel();
        let queued = self.tx.send(Command::Update { update, reply }).is_ok();
        if queued {
            debug!(store = A::NAME, "update queued");
        }
        
        async move {
            if !queued {
                return Err(HirebaseError::StoreClosed(A::NAME.to_string()));
            }
            committed
                .await
                .map_err(|_| HirebaseError::StoreClosed(A::NAME.to_string()))
        }
    }
    
    /// Like [`update`](SyncCoordinator::update), but stop waiting after
    /// `timeout`. The update is still applied when the caller gives up.
    pub async fn update_within(
        &self,
        update: A::Update,
        timeout: Duration,
    ) -> HirebaseResult<Arc<A>> {
        match tokio::time::timeout(timeout, self.update(update)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(store = A::NAME, ?timeout, "gave up waiting for update, it will still be applied");
                Err(HirebaseError::Timeout(format!(
                    "{} update not committed within {:?}",
                    A::NAME,
                    timeout
                )))
            }
        }
    }
    
    /// Current aggregate
    pub fn read(&self) -> Arc<A> {
        self.shared.container.get()
    }
    
    /// Number of updates committed since the store was opened
    pub fn version(&self) -> StateVersion {
        *self.shared.version.read()
    }
    
    /// Whether the backend holds the latest committed value
    pub fn persistence_status(&self) -> PersistenceStatus {
        *self.shared.status.read()
    }
    
    /// Register a listener run after every committed update
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(listener)
    }
    
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }
    
    /// Storage key of this store
    pub fn key(&self) -> &str {
        &self.shared.key
    }
    
    /// Handle that does not keep the store open
    ///
    /// Listeners live inside the store, so a listener holding a strong
    /// handle keeps the worker running for as long as it stays registered.
    /// Capture a weak handle instead and upgrade it inside the callback.
    pub fn downgrade(&self) -> WeakCoordinator<A> {
        WeakCoordinator {
            shared: Arc::downgrade(&self.shared),
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning handle created by [`SyncCoordinator::downgrade`]
pub struct WeakCoordinator<A: Aggregate> {
    shared: Weak<Shared<A>>,
    tx: mpsc::WeakUnboundedSender<Command<A>>,
}

impl<A: Aggregate> WeakCoordinator<A> {
    /// Strong handle, or `None` once every strong handle has been dropped
    pub fn upgrade(&self) -> Option<SyncCoordinator<A>> {
        Some(SyncCoordinator {
            shared: self.shared.upgrade()?,
            tx: self.tx.upgrade()?,
        })
    }
}

impl<A: Aggregate> Clone for WeakCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<A: Aggregate> Clone for SyncCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            tx: self.tx.clone(),
        }
    }
}

/// Worker loop. Exits once every handle has been dropped.
async fn run_worker<A: Aggregate>(
    shared: Arc<Shared<A>>,
    persistent: PersistentStore<A>,
    mut rx: mpsc::UnboundedReceiver<Command<A>>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Update { update, reply } => {
                let committed = commit(&shared, &persistent, update).await;
                // The caller may have stopped waiting; the commit stands either way.
                let _ = reply.send(committed);
            }
        }
    }
    debug!(store = A::NAME, "all handles dropped, worker exiting");
}

async fn commit<A: Aggregate>(
    shared: &Shared<A>,
    persistent: &PersistentStore<A>,
    update: A::Update,
) -> Arc<A> {
    let next = shared.container.merge(update);
    
    let status = match persistent.save(&next).await {
        Ok(()) => PersistenceStatus::Durable,
        Err(e) => {
            warn!(
                store = A::NAME,
                key = persistent.key(),
                error = %e,
                "snapshot write failed, keeping change for this session only"
            );
            PersistenceStatus::SessionOnly
        }
    };
    
    let previous = std::mem::replace(&mut *shared.status.write(), status);
    if previous == PersistenceStatus::SessionOnly && status == PersistenceStatus::Durable {
        info!(store = A::NAME, "snapshot writes recovered");
    }
    
    let version = {
        let mut version = shared.version.write();
        *version = version.next();
        *version
    };
    
    let notified = shared.subscribers.notify_all();
    debug!(store = A::NAME, %version, notified, "update committed");
    
    next
}
