//! Middleware Module
//!
//! Request middleware applied per route group. Currently only admission
//! control; identity extraction lives with it because the rate limiter is
//! its only consumer.

/// Rate-limit middleware and client identifier extraction
pub mod rate_limit;

pub use rate_limit::{client_identifier, with_rate_limit};
