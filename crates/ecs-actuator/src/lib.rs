//! ecs-actuator - Alibaba Cloud ECS instance lifecycle for machine objects
//!
//! Given a machine and its provider spec, the [`Actuator`] resolves network
//! and image references, launches exactly one ECS instance, waits for it to
//! run, and on later reconciles finds it again by tags, stops duplicates and
//! repairs ownership tags.
//!
//! The provider itself is reached through [`EcsOperations`]; this crate
//! contains no SDK or transport code.

pub mod config;
pub mod ecs;
pub mod error;
pub mod machine;
pub mod metrics;
pub mod wait;

pub use config::{ActuatorSettings, Machine, MachineProviderConfig};
pub use ecs::EcsOperations;
pub use error::ActuatorError;
pub use machine::Actuator;
pub use metrics::{
    FailureReporter, MachineLabels, PrometheusFailureReporter, TracingFailureReporter,
};
