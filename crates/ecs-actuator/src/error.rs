//! Actuator error classification
//!
//! Errors fall into two kinds. Configuration errors mean the machine spec
//! itself needs fixing and retrying will not help. Everything else is an
//! infrastructure error the orchestrator should retry on its own schedule.

use ecs_actuator_common::InstanceStatus;
use std::time::Duration;
use thiserror::Error;

/// Boxed error from the provider API seam
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by actuator operations
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// The machine spec is incomplete or invalid (not retryable)
    #[error("invalid machine configuration: {0}")]
    InvalidConfiguration(String),

    /// A provider API call failed
    #[error("{context}: {source}")]
    Provider {
        context: String,
        #[source]
        source: BoxError,
    },

    /// A state poll ran out of time without a more specific error
    #[error("timed out after {waited:?} waiting for {description}")]
    Timeout {
        description: String,
        waited: Duration,
    },

    /// The provider returned a result with an unexpected shape
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),

    /// A resource expected to exist was not returned by the provider
    #[error("not found: {0}")]
    NotFound(String),

    /// Instances exist but are not (yet) in the requested state
    #[error("instances [{instance_ids}] are not in the expected state {expected}")]
    UnexpectedState {
        instance_ids: String,
        expected: InstanceStatus,
    },

    /// A lookup by ID was given no IDs
    #[error("instance IDs not specified")]
    MissingInstanceIds,

    /// An instance is in a lifecycle state the actuator does not manage
    #[error("instance {instance_id} state {status:?} is not supported")]
    UnsupportedState { instance_id: String, status: String },
}

impl ActuatorError {
    /// Wrap a provider API error with the operation and target it concerned
    pub fn provider(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Provider {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Check if this error needs a spec change rather than a retry
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }

    /// Check if the orchestrator should requeue the reconcile
    pub fn is_retryable(&self) -> bool {
        !self.is_configuration()
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for actuator operations
pub type Result<T, E = ActuatorError> = std::result::Result<T, E>;
