//! Durable storage for the set of tracked validators.

pub mod tracked_set;

pub use tracked_set::TrackedSetStore;
