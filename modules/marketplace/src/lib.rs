//! HIREBASE Marketplace Stores
//! 
//! Domain stores built on the generic reactive store:
//! - Employer settings (company profile and recruitment preferences)
//! - Jobseeker wishlist
//! - Messaging between marketplace users
//! - Cache of profiles fetched from the profile service

pub mod settings;
pub mod wishlist;
pub mod messaging;
pub mod profile;

pub use settings::*;
pub use wishlist::*;
pub use messaging::*;
pub use profile::*;
