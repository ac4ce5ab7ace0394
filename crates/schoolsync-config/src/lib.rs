//! schoolsync-config
//!
//! Installation settings and the persisted backup preferences.
//! Owns the data structures plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;
pub mod paths;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{BackendPreference, Config, Preferences};
