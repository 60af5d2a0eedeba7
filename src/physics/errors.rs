//! Error types surfaced by the simulation's public API.

use super::handles::{BodyHandle, ConstraintHandle};
use thiserror::Error;

/// Errors from simulation-level operations: handle lookups and constraint creation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// The handle does not refer to a live body.
    #[error("unknown body: {0}")]
    UnknownBody(BodyHandle),

    /// The handle does not refer to a live constraint.
    #[error("unknown constraint: {0}")]
    UnknownConstraint(ConstraintHandle),

    /// A constraint was requested between a body and itself.
    #[error("constraint needs two distinct bodies, got {0} twice")]
    SameBody(BodyHandle),

    /// Both bodies of a constraint have infinite mass, so it can never do anything.
    #[error("constraint between two static bodies {0} and {1}")]
    StaticPair(BodyHandle, BodyHandle),

    /// Invalid configuration supplied.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// A count that must be positive was zero.
    #[error("{field} must be at least 1")]
    ZeroCount {
        /// The offending setting.
        field: &'static str,
    },

    /// A value that must be positive and finite was not.
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive {
        /// The offending setting.
        field: &'static str,
        /// The rejected value.
        value: f32,
    },
}
