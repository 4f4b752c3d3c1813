//! Server Module
//!
//! HTTP server wiring: configuration loading, shared application state, and
//! router initialization.
//!
//! - **`config`** - environment-driven settings with logged defaults
//! - **`state`** - `AppState` and its `FromRef` extractions
//! - **`init`** - `create_app()` wiring plus the periodic cleanup task

/// Server configuration loading
pub mod config;

/// Server initialization and setup
pub mod init;

/// Application state management
pub mod state;

pub use config::Settings;
pub use init::create_app;
pub use state::{AppState, RateLimiters};
