//! Execution layer - dependency resolution, pillar gating and navigation.
//!
//! Everything here is synchronous and operates on a `Workflow` and a
//! `NavigationCursor` passed in by the caller. Persistence and call
//! serialization live in `dayflow-store`.

#![warn(missing_docs)]

pub mod dependency;
pub mod gating;
pub mod navigation;

pub use dependency::{DependencyResolver, Resolution, BlockedTask, Inconsistency};
pub use gating::PillarGate;
pub use navigation::{NavigationController, Changeset, TaskChange, WorkflowChange};
