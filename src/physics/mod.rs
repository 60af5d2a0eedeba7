//! Rigid body dynamics: bodies and shapes, collision detection, constraints and the step driver.

pub mod bodies;
pub mod body;
pub mod body_description;
pub mod body_properties;
pub mod collidables;
pub mod collision_detection;
pub mod constraints;
pub mod errors;
pub mod handles;
pub mod simulation;
pub mod simulation_config;

pub use bodies::Bodies;
pub use body::Body;
pub use body_description::BodyDescription;
pub use body_properties::{BodyVelocity, RigidPose};
pub use errors::{ConfigError, SimulationError};
pub use handles::{BodyHandle, ConstraintHandle};
pub use simulation::{Simulation, StepStats};
pub use simulation_config::{SimulationConfig, SolverSettings};
