//! Workflow store
//!
//! Owns the live workflow and navigation cursor for one session, serializes
//! calls through an in-flight guard, and fronts the persistence service with
//! a two-phase apply: stage locally, persist, then commit or roll back.

#![warn(missing_docs)]

mod guard;
pub mod store;

pub use store::{StoreConfig, WorkflowStore};
