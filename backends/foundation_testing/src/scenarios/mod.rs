//! Common synchronization patterns and scenarios.
//!
//! Provides reusable implementations of classic concurrency patterns:
//! - Producer-consumer pipelines over a bounded queue

pub mod producer_consumer;

pub use producer_consumer::{Pipeline, PipelineReport};
