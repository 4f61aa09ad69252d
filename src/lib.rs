//! Minimal items REST API over PostgreSQL.
//!
//! A single-binary HTTP service exposing an `items` table through a handful
//! of JSON endpoints. The interesting parts are the plumbing that keeps it
//! upright under load:
//!
//! - a bounded connection pool with an explicit lease/release/invalidate
//!   lifecycle and acquisition timeouts,
//! - a one-time startup readiness gate that retries idempotent schema
//!   initialization with bounded exponential backoff before the listener
//!   binds,
//! - per-endpoint request counters scraped through a Prometheus text
//!   endpoint.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`db`]: Connection pool, readiness gate, and item repository
//! - [`api`]: HTTP routes and handlers
//! - [`metrics`]: Request counters and the Prometheus recorder
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, Result};
