//! Kubernetes monitoring library
//!
//! This crate provides the core functionality for:
//! - Resource aggregation over pods, controllers, nodes and the cluster
//! - CPU rate computation from persisted counter samples
//! - Classification of containers, jobs and node conditions
//! - Temporal state evaluation with durable per-object value stores
//! - Resource quota scope matching and node partitioning
//! - Piggyback routing of sections to monitored hosts
//! - Check evaluation and observability

pub mod aggregation;
pub mod checks;
pub mod classify;
pub mod compose;
pub mod error;
pub mod models;
pub mod observability;
pub mod performance;
pub mod piggyback;
pub mod render;
pub mod schemata;
pub mod selection;
pub mod temporal;
pub mod verdict;

pub use compose::{compose_sections, ComposeOptions, MonitoredObject};
pub use error::{EvalError, EvalResult, StoreError};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use piggyback::{route, PiggybackBatch, SectionRecord};
pub use schemata::api::ApiData;
pub use verdict::{CheckOutput, State};
