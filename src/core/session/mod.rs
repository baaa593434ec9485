pub mod driver;
pub mod events;

// Re-export commonly used types for convenience
pub use driver::{
    SessionDriver, SessionError, SessionHandle, SessionMachine, SessionOptions, SourceFactory,
};
pub use events::{SessionAction, SessionEvent, SessionState};
