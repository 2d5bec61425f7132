//! HIREBASE State Management
//! 
//! Provides the generic reactive store: an in-memory aggregate, a durable
//! JSON snapshot, a listener registry, and the coordinator that ties them
//! together so every mutation is merged, persisted and announced in order.

pub mod store;
pub mod list;
pub mod snapshot;
pub mod memory;
pub mod persistent;
pub mod subscription;
pub mod coordinator;

pub use store::*;
pub use list::*;
pub use memory::*;
pub use persistent::*;
pub use subscription::*;
pub use coordinator::*;
