use std::sync::Arc;

use glam::Vec3;

use crate::physics::body_properties::{BodyVelocity, RigidPose};
use crate::physics::collidables::Shape;

/// Describes a body's initial state.
#[derive(Debug, Clone)]
pub struct BodyDescription {
    /// Position and orientation of the body origin.
    pub pose: RigidPose,
    /// Linear and angular velocity of the body.
    pub velocity: BodyVelocity,
    /// Mass of the body. Zero makes the body static.
    pub mass: f32,
    /// Coefficient of restitution in `[0, 1]`.
    pub restitution: f32,
    /// Coefficient of friction. Pairs combine by product.
    pub friction: f32,
    /// Render scale, carried through untouched.
    pub scale: Vec3,
    /// Shape shared between any bodies built from it.
    pub shape: Arc<Shape>,
}

impl BodyDescription {
    pub const DEFAULT_RESTITUTION: f32 = 0.5;
    pub const DEFAULT_FRICTION: f32 = 0.5;

    /// Creates a dynamic body description with zero initial velocity.
    #[inline(always)]
    pub fn create_dynamic(pose: RigidPose, shape: Arc<Shape>, mass: f32) -> Self {
        Self {
            pose,
            velocity: BodyVelocity::default(),
            mass,
            restitution: Self::DEFAULT_RESTITUTION,
            friction: Self::DEFAULT_FRICTION,
            scale: Vec3::ONE,
            shape,
        }
    }

    /// Creates a static (infinite mass) body description.
    #[inline(always)]
    pub fn create_static(pose: RigidPose, shape: Arc<Shape>) -> Self {
        Self::create_dynamic(pose, shape, 0.0)
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: BodyVelocity) -> Self {
        self.velocity = velocity;
        self
    }

    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}
