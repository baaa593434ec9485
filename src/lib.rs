pub mod api;
pub mod config;
pub mod core;

// Re-export commonly used items for convenience
pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, ConfigError};
pub use core::*;
