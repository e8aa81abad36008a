//! lifecycle-core — client lifecycle event analytics.
//!
//! A batch pipeline: a flat file of lifecycle events is staged into an
//! immutable [`event::EventStore`], from which three independent feature
//! components derive analytical tables — funnel progression, churn risk
//! and data-quality inconsistencies. Results persist to CSV and SQLite;
//! rendering lives in the runner, not here.

pub mod churn;
pub mod config;
pub mod error;
pub mod event;
pub mod funnel;
pub mod inconsistency;
pub mod ingest;
pub mod pipeline;
pub mod staging;
pub mod store;
pub mod types;
