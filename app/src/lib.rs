//! HIREBASE Application Runtime
//! 
//! Composition root that opens every marketplace store once at start-up
//! and hands out shared handles:
//! - Employer settings
//! - Wishlist
//! - Messaging
//! - Profile cache

mod runtime;

pub use runtime::*;
