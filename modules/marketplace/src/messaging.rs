//! Messaging store
//!
//! Sends are delivered through a [`MessageGateway`] and appended to the log
//! strictly in call order: each send waits for the previous one to finish
//! before it is stamped, delivered and committed.

use async_trait::async_trait;
use hirebase_core::{
    new_entity_id, HirebaseError, HirebaseResult, Identified, MessagingConfig, PersistenceStatus,
    StorageBackend, Timestamp, UserId,
};
use hirebase_state::{Aggregate, IdList, PersistentStore, Subscription, SyncCoordinator};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// A direct message between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// True if the message was exchanged between `a` and `b`, in either direction
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        (&self.sender_id == a && &self.receiver_id == b)
            || (&self.sender_id == b && &self.receiver_id == a)
    }
    
    /// The other participant, seen from `user`
    pub fn partner_of(&self, user: &UserId) -> Option<&UserId> {
        if &self.sender_id == user {
            Some(&self.receiver_id)
        } else if &self.receiver_id == user {
            Some(&self.sender_id)
        } else {
            None
        }
    }
}

impl Identified for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Change to the message log
#[derive(Debug, Clone, PartialEq)]
pub enum MessageUpdate {
    /// Append unless a message with the same id exists
    Append(Message),
    /// Delete a message by id
    Remove(String),
    /// Mark every message from `partner` to `reader` as read
    MarkRead { reader: UserId, partner: UserId },
}

/// Every message known to this session, in commit order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MessageLog {
    messages: IdList<Message>,
}

impl MessageLog {
    pub fn messages(&self) -> &[Message] {
        self.messages.items()
    }
    
    pub fn len(&self) -> usize {
        self.messages.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
    
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }
    
    /// Messages between `a` and `b`, oldest first
    pub fn conversation_between(&self, a: &UserId, b: &UserId) -> Vec<Message> {
        let mut conversation: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.is_between(a, b))
            .cloned()
            .collect();
        conversation.sort_by_key(|m| m.timestamp);
        conversation
    }
    
    /// Messages addressed to `user` that are still unread
    pub fn unread_count_for(&self, user: &UserId) -> usize {
        self.messages
            .iter()
            .filter(|m| &m.receiver_id == user && !m.read)
            .count()
    }
    
    /// One summary per conversation partner of `user`, most recent first
    pub fn conversations_for(&self, user: &UserId) -> Vec<ConversationSummary> {
        let mut by_partner: BTreeMap<UserId, ConversationSummary> = BTreeMap::new();
        
        for message in self.messages.iter() {
            let Some(partner) = message.partner_of(user) else {
                continue;
            };
            let unread = usize::from(&message.receiver_id == user && !message.read);
            
            by_partner
                .entry(partner.clone())
                .and_modify(|summary| {
                    summary.unread += unread;
                    if message.timestamp >= summary.last_message.timestamp {
                        summary.last_message = message.clone();
                    }
                })
                .or_insert_with(|| ConversationSummary {
                    partner: partner.clone(),
                    last_message: message.clone(),
                    unread,
                });
        }
        
        let mut summaries: Vec<ConversationSummary> = by_partner.into_values().collect();
        summaries.sort_by(|a, b| b.last_message.timestamp.cmp(&a.last_message.timestamp));
        summaries
    }
}

impl Aggregate for MessageLog {
    type Update = MessageUpdate;
    const NAME: &'static str = "messages";
    
    fn apply(&mut self, update: MessageUpdate) {
        match update {
            MessageUpdate::Append(message) => {
                if !self.messages.insert(message) {
                    debug!("message already in log");
                }
            }
            MessageUpdate::Remove(id) => {
                self.messages.remove(&id);
            }
            MessageUpdate::MarkRead { reader, partner } => {
                for message in self.messages.items_mut() {
                    if message.receiver_id == reader && message.sender_id == partner {
                        message.read = true;
                    }
                }
            }
        }
    }
}

/// Latest state of one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub partner: UserId,
    pub last_message: Message,
    pub unread: usize,
}

/// Transport that delivers a message before it is committed to the log
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn deliver(&self, message: &Message) -> HirebaseResult<()>;
}

/// Gateway that only waits, standing in for a round trip to a server
pub struct SimulatedGateway {
    latency: Duration,
}

impl SimulatedGateway {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
    
    pub fn from_config(config: &MessagingConfig) -> Self {
        Self::new(Duration::from_millis(config.send_latency_ms))
    }
}

#[async_trait]
impl MessageGateway for SimulatedGateway {
    async fn deliver(&self, message: &Message) -> HirebaseResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        debug!(id = %message.id, "message delivered");
        Ok(())
    }
}

/// Messaging store shared by the inbox, conversation views and unread badges
#[derive(Clone)]
pub struct MessagingStore {
    coordinator: SyncCoordinator<MessageLog>,
    gateway: Arc<dyn MessageGateway>,
    /// Completion signal of the most recently issued send
    last_send: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
    max_message_len: usize,
}

impl MessagingStore {
    pub async fn open(
        backend: Arc<dyn StorageBackend>,
        key: &str,
        gateway: Arc<dyn MessageGateway>,
        config: &MessagingConfig,
    ) -> Self {
        let coordinator = SyncCoordinator::open(PersistentStore::new(backend, key)).await;
        Self::from_coordinator(coordinator, gateway, config)
    }
    
    pub fn from_coordinator(
        coordinator: SyncCoordinator<MessageLog>,
        gateway: Arc<dyn MessageGateway>,
        config: &MessagingConfig,
    ) -> Self {
        Self {
            coordinator,
            gateway,
            last_send: Arc::new(Mutex::new(None)),
            max_message_len: config.max_message_len,
        }
    }
    
    pub fn read(&self) -> Arc<MessageLog> {
        self.coordinator.read()
    }
    
    /// Send a message from `sender` to `receiver`
    ///
    /// The send takes its place in line and starts running when this is
    /// called, so it completes even if the returned future is dropped or
    /// awaited after later sends. The id is assigned here; once every
    /// earlier send has finished, the message is timestamped, delivered and
    /// appended to the log. Validation and delivery failures are returned
    /// and nothing is appended.
    ///
    /// Must be called inside a tokio runtime.
    pub fn send_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: impl Into<String>,
    ) -> impl Future<Output = HirebaseResult<Message>> + Send + 'static {
        let content = content.into();
        let task = self.validate(&sender, &receiver, &content).map(|()| {
            let (previous, done) = self.take_turn();
            tokio::spawn(deliver_in_turn(
                self.coordinator.clone(),
                self.gateway.clone(),
                previous,
                done,
                Message {
                    id: new_entity_id(),
                    sender_id: sender,
                    receiver_id: receiver,
                    content,
                    timestamp: Timestamp::default(),
                    read: false,
                },
            ))
        });
        
        async move {
            match task?.await {
                Ok(result) => result,
                Err(e) => Err(HirebaseError::Internal(format!("send task failed: {}", e))),
            }
        }
    }
    
    fn validate(&self, sender: &UserId, receiver: &UserId, content: &str) -> HirebaseResult<()> {
        if sender == receiver {
            return Err(HirebaseError::InvalidMessage(
                "sender and receiver must differ".into(),
            ));
        }
        if content.trim().is_empty() {
            return Err(HirebaseError::InvalidMessage("message is empty".into()));
        }
        let len = content.chars().count();
        if len > self.max_message_len {
            return Err(HirebaseError::InvalidMessage(format!(
                "message is {} characters, limit is {}",
                len, self.max_message_len
            )));
        }
        Ok(())
    }
    
    /// Reserve the next slot in the send line
    fn take_turn(&self) -> (Option<oneshot::Receiver<()>>, oneshot::Sender<()>) {
        let (done, finished) = oneshot::channel();
        let previous = self.last_send.lock().replace(finished);
        (previous, done)
    }
    
    pub fn conversation_between(&self, a: &UserId, b: &UserId) -> Vec<Message> {
        self.read().conversation_between(a, b)
    }
    
    pub fn unread_count_for(&self, user: &UserId) -> usize {
        self.read().unread_count_for(user)
    }
    
    pub fn conversations_for(&self, user: &UserId) -> Vec<ConversationSummary> {
        self.read().conversations_for(user)
    }
    
    pub async fn mark_conversation_read(
        &self,
        reader: &UserId,
        partner: &UserId,
    ) -> HirebaseResult<Arc<MessageLog>> {
        self.coordinator
            .update(MessageUpdate::MarkRead {
                reader: reader.clone(),
                partner: partner.clone(),
            })
            .await
    }
    
    pub async fn delete_message(&self, id: &str) -> HirebaseResult<Arc<MessageLog>> {
        self.coordinator
            .update(MessageUpdate::Remove(id.to_string()))
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
    
    pub fn coordinator(&self) -> &SyncCoordinator<MessageLog> {
        &self.coordinator
    }
}

/// Body of one send, run on its own task
async fn deliver_in_turn(
    coordinator: SyncCoordinator<MessageLog>,
    gateway: Arc<dyn MessageGateway>,
    previous: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
    mut message: Message,
) -> HirebaseResult<Message> {
    if let Some(previous) = previous {
        // An error only means the earlier send failed before signalling
        let _ = previous.await;
    }
    
    message.timestamp = Timestamp::now();
    
    if let Err(e) = gateway.deliver(&message).await {
        warn!(id = %message.id, error = %e, "message delivery failed");
        return Err(match e {
            HirebaseError::DeliveryFailed(_) => e,
            other => HirebaseError::DeliveryFailed(other.to_string()),
        });
    }
    
    coordinator
        .update(MessageUpdate::Append(message.clone()))
        .await?;
    info!(id = %message.id, from = %message.sender_id, to = %message.receiver_id, "message sent");
    
    let _ = done.send(());
    Ok(message)
}
