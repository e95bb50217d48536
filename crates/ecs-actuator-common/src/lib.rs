//! ecs-actuator-common - Shared types and constants
//!
//! This crate holds the vocabulary shared by the actuator library and its
//! CLI, without any async or provider dependencies.
//!
//! ## Modules
//!
//! - [`defaults`]: Default timings and well-known label keys
//! - [`status`]: ECS instance lifecycle states and instance tenancy
//! - [`tags`]: Ownership tag schema, tag generation and deduplication

pub mod defaults;
pub mod status;
pub mod tags;

// Re-export commonly used types
pub use status::{InstanceStatus, Tenancy};
pub use tags::Tag;
