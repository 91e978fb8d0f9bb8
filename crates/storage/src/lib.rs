//! Persistence for dayflow workflows.
//!
//! This crate provides the `WorkflowService` trait the store talks to, with
//! a JSON-file backend and an in-memory backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{WorkflowService, StorageError, Result, Ack};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
