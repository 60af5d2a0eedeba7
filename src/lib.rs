//! Real-time rigid body physics.
//!
//! Bodies carry convex shapes and are stepped by [`physics::Simulation`]: sweep-and-prune finds
//! candidate pairs, GJK and EPA turn them into contacts, persistent manifolds and joints are
//! solved with warm-started projected Gauss-Seidel, and fast bodies are swept for a time of
//! impact.
//!
//! ```
//! use std::sync::Arc;
//! use glam::Vec3;
//! use rust_rigidphysics::physics::collidables::{Cuboid, Shape};
//! use rust_rigidphysics::physics::{BodyDescription, RigidPose, Simulation, SimulationConfig};
//!
//! let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
//! let shape = Arc::new(Shape::from(Cuboid::new(Vec3::splat(0.5)).unwrap()));
//! let falling = simulation.add_body(&BodyDescription::create_dynamic(
//!     RigidPose::from_position(Vec3::new(0.0, 5.0, 0.0)),
//!     shape,
//!     1.0,
//! ));
//! simulation.step(1.0 / 60.0);
//! assert!(simulation.body(falling).unwrap().position().y < 5.0);
//! ```

pub mod physics;
pub mod utilities;
