//! Collision detection: sweep-and-prune pair finding, GJK/EPA contact generation, continuous
//! time of impact, and the persistent contact manifolds fed to the solver.

pub mod broad_phase;
pub mod contact;
pub mod contact_manifold;
pub mod epa;
pub mod gjk;
pub mod narrow_phase;
pub mod signed_volumes;

pub use broad_phase::{BroadPhase, CollisionPair};
pub use contact::Contact;
pub use contact_manifold::{Manifold, ManifoldCollector, ManifoldPoint};
pub use gjk::{GjkPoint, Simplex};
pub use narrow_phase::NarrowPhase;
