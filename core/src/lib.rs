//! HIREBASE Core Library
//! 
//! Core types, traits, and errors shared by the HIREBASE state stores.
//! This crate provides the foundation for all other HIREBASE components.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
