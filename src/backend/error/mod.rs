//! Backend Error Module
//!
//! Error types used in HTTP handlers, convertible to HTTP responses.
//!
//! - **`types`** - Error type definitions and constructors
//! - **`conversion`** - `IntoResponse` implementation
//!
//! All backend errors implement `IntoResponse`, so handlers return them
//! directly and get a JSON body with the mapped status code.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;
