pub mod filter;
pub mod log;

// Re-export commonly used types for convenience
pub use filter::{FilterConfig, TurnFilter};
pub use log::{ChatRole, ChatTurn, TranscriptLog};
