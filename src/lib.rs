//! Gemflow - Realtime Coordination Core
//!
//! Gemflow is the realtime coordination layer of a jewelry-retail business
//! platform: admission control with sliding-window rate limiting, ephemeral
//! shared state (typing indicators, presence) over a publish/subscribe
//! transport, per-message delivery tracking, and notification fan-out with
//! reconnect/backoff semantics. The CRUD application around it (customers,
//! orders, inventory, quotes, repairs) is an external collaborator.
//!
//! # Module Structure
//!
//! - **`shared`** - serializable types shared with collaborators: the
//!   realtime event union, messages, notifications, presence, errors
//! - **`backend`** - the Axum server and the coordination core itself
//!
//! # Usage
//!
//! ```rust,no_run
//! use gemflow::backend::server::init::create_app;
//! use gemflow::backend::server::config::Settings;
//!
//! # async fn example() {
//! let app = create_app(Settings::from_env()).await;
//! // Use app with axum::serve
//! # }
//! ```

/// Types shared between the core and its collaborators
pub mod shared;

/// Server-side code (HTTP surface + realtime core)
pub mod backend;
