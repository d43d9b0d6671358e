//! Collaborator clients
//!
//! The engine reads configuration owned by other services through
//! plain synchronous fetches - return the current value or a default,
//! no stronger contract.

pub mod settings;

pub use settings::SettingsClient;
