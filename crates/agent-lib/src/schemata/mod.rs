//! Typed schemata
//!
//! - [`api`]: Kubernetes objects as delivered by the API client
//! - [`section`]: payloads the agent writes per monitored host

pub mod api;
pub mod section;
