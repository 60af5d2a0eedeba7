use glam::{Quat, Vec3};
use std::fmt;

use crate::utilities::quaternion_ex;

/// Represents a rigid transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidPose {
    /// Position of the pose.
    pub position: Vec3,
    /// Orientation of the pose.
    pub orientation: Quat,
}

impl Default for RigidPose {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    /// Returns a pose with a position at (0,0,0) and identity orientation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Creates a rigid pose with the given position and orientation.
    #[inline(always)]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a rigid pose with the given position and identity orientation.
    #[inline(always)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Transforms a local point by the pose: `orientation * v + position`.
    #[inline(always)]
    pub fn transform(&self, v: Vec3) -> Vec3 {
        self.orientation * v + self.position
    }

    /// Transforms a world point by the inverse of the pose: `conjugate(orientation) * (v - position)`.
    #[inline(always)]
    pub fn transform_by_inverse(&self, v: Vec3) -> Vec3 {
        quaternion_ex::conjugate(self.orientation) * (v - self.position)
    }

    /// Rotates a local direction into world space.
    #[inline(always)]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.orientation * v
    }

    /// Rotates a world direction into local space.
    #[inline(always)]
    pub fn rotate_by_inverse(&self, v: Vec3) -> Vec3 {
        quaternion_ex::conjugate(self.orientation) * v
    }

    /// Inverts the rigid transformation of the pose.
    #[inline(always)]
    pub fn invert(&self) -> Self {
        let orientation = quaternion_ex::conjugate(self.orientation);
        Self {
            position: orientation * -self.position,
            orientation,
        }
    }

    /// Concatenates one rigid transform with another. The resulting transform is equivalent
    /// to performing transform a followed by transform b.
    #[inline(always)]
    pub fn multiply(a: &Self, b: &Self) -> Self {
        Self {
            position: b.orientation * a.position + b.position,
            orientation: quaternion_ex::concatenate(a.orientation, b.orientation),
        }
    }
}

impl From<Vec3> for RigidPose {
    fn from(position: Vec3) -> Self {
        Self::from_position(position)
    }
}

impl From<(Vec3, Quat)> for RigidPose {
    fn from((position, orientation): (Vec3, Quat)) -> Self {
        Self::new(position, orientation)
    }
}

impl fmt::Display for RigidPose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.position, self.orientation)
    }
}

/// Linear and angular velocity for a body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyVelocity {
    /// Linear velocity associated with the body.
    pub linear: Vec3,
    /// Angular velocity associated with the body.
    pub angular: Vec3,
}

impl BodyVelocity {
    /// Constructs a new velocity.
    #[inline(always)]
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }

    /// Constructs a velocity with zero angular component.
    #[inline(always)]
    pub fn linear(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }
}

impl fmt::Display for BodyVelocity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Linear: {}, Angular: {}", self.linear, self.angular)
    }
}
