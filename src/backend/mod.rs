//! Backend Module
//!
//! Server-side code for the gemflow coordination layer: the Axum HTTP
//! surface and the realtime core it exposes.
//!
//! # Architecture
//!
//! - **`server`** - initialization, application state, configuration
//! - **`routes`** - route configuration and handlers
//! - **`realtime`** - the coordination core (rate limiting, delivery
//!   tracking, presence/typing, notification fan-out, subscriptions)
//! - **`middleware`** - per-surface rate-limit middleware
//! - **`error`** - backend error types with HTTP mapping
//!
//! # State Management
//!
//! All shared state lives in `AppState` and is `Arc`-shared across
//! handlers; the realtime stores synchronize internally (mutex-guarded
//! maps, lock-striped limiter records, broadcast channels).

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Realtime coordination core
pub mod realtime;

/// Middleware for request processing
pub mod middleware;

/// Backend error types
pub mod error;

pub use error::BackendError;
pub use server::{create_app, AppState, Settings};
