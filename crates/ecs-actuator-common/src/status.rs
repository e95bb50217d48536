//! ECS instance lifecycle states and placement tenancy
//!
//! The provider reports status as free-form strings. Only the states listed
//! in [`InstanceStatus`] are understood; anything else (for example
//! `Deleted`) is treated as unsupported by the actuator.

use serde::{Deserialize, Serialize};

/// Lifecycle states of an ECS instance the actuator can work with
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
pub enum InstanceStatus {
    /// Accepted by the provider, not yet scheduled
    Pending,
    /// Booting
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl InstanceStatus {
    /// Every state an existing instance may be in and still count as
    /// belonging to a machine.
    pub const SUPPORTED: [InstanceStatus; 5] = [
        Self::Pending,
        Self::Starting,
        Self::Running,
        Self::Stopping,
        Self::Stopped,
    ];

    /// Parse a provider status string, returning None for unknown values.
    ///
    /// Status strings are matched case-sensitively, as the provider returns them.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

/// Instance placement mode
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tenancy {
    /// Shared hardware
    #[default]
    Default,
    /// Dedicated host
    Host,
}

impl Tenancy {
    /// Parse a configured tenancy value. An empty or missing value yields
    /// the default tenancy; unknown values yield None.
    pub fn from_config(value: Option<&str>) -> Option<Self> {
        match value {
            None | Some("") => Some(Self::Default),
            Some(v) => v.parse().ok(),
        }
    }
}
