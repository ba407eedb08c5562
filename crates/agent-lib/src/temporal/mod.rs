//! Temporal state evaluation
//!
//! Checks that judge how long an object has been in an undesired state keep
//! a [`DurationTracker`] per state in the object's [`ValueStore`] and compare
//! the elapsed time against [`Levels`].

pub mod levels;
pub mod store;
pub mod tracker;

pub use levels::{
    check_levels, check_levels_lower, check_levels_result, render_with_levels, Levels,
};
pub use store::{
    object_store_path, sanitize_file_name, FileValueStore, MemoryValueStore, ValueStore,
};
pub use tracker::DurationTracker;

pub use crate::render::timespan as render_timespan;
