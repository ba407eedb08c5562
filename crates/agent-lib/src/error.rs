//! Error types for the monitoring library
//!
//! - [`EvalError`]: failures while composing sections or evaluating checks
//! - [`StoreError`]: failures of the durable value and counter stores
//!
//! Inconsistent object state (a job without pod and without a definitive
//! condition, an unsupported quota scope) is reported as an error instead of
//! being mapped to a verdict.

use std::path::PathBuf;

use thiserror::Error;

use crate::schemata::api::{QuotaScope, ScopeOperator};

/// Top-level error for section composition and check evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    /// Scope/operator combination of a ResourceQuota that is not supported
    #[error("resource quota scope {scope:?} with operator {operator:?} is not implemented")]
    UnsupportedScope {
        scope: QuotaScope,
        operator: Option<ScopeOperator>,
    },

    /// Job has neither a pod nor a condition that decides its status
    #[error("job {job} has no pod and no completion or failure condition")]
    InconsistentJob { job: String },

    /// Namespace filter or status group pattern failed to compile
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A section required by a check is absent
    #[error("section {0} is missing")]
    MissingSection(String),

    /// A section payload could not be decoded
    #[error("failed to decode section {section}: {source}")]
    SectionDecode {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    /// A section payload could not be encoded
    #[error("failed to encode section {section}: {source}")]
    SectionEncode {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    /// Persistent store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors of the file backed value and counter stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize store {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type EvalResult<T> = Result<T, EvalError>;
