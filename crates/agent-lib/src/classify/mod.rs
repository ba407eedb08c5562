//! Object classifiers
//!
//! Pure functions reducing raw object state to one categorical status and an
//! explanation.

pub mod container_status;
pub mod job_status;
pub mod node_conditions;

pub use container_status::{container_message, pod_status_message, pod_status_message_of};
pub use job_status::job_status;
pub use node_conditions::{classify_node_condition, default_states, ConditionStates};
