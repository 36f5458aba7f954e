//! Core library for `SchoolDesk`.
//!
//! Holds the rules the marketing site's API routes apply around the school
//! store: how a path identifier is classified, how a trial signup becomes a
//! guarded store mutation, per-client rate limiting, best-effort audit
//! sinks, and scrubbing of personal data before it reaches the logs. This
//! crate knows nothing about HTTP.

pub mod audit;
pub mod audit_file;
#[cfg(feature = "postgres")]
pub mod audit_postgres;
pub mod error;
pub mod identifier;
pub mod ratelimit;
pub mod redact;
pub mod trial;
