//! Task registry and workflow builder.
//!
//! The registry is the authoring-time catalog of task templates per pillar.
//! All structural invariants (contiguous pillar order, known dependencies,
//! acyclicity) are checked here once, so the runtime never has to.

#![warn(missing_docs)]

pub mod registry;
pub mod builder;
pub mod defaults;

pub use registry::{TaskRegistry, TaskTemplate, RegistryError, RegistryFile};
pub use builder::{WorkflowBuilder, OwnerContext};
pub use defaults::default_registry;
