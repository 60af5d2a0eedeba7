use glam::{Quat, Vec3};

use super::shape::{support_direction, IConvexShape, ShapeError, check_extent};
use crate::utilities::{BoundingBox, Matrix3x3};

/// Collision shape representing a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    /// Radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Creates a sphere shape.
    #[inline(always)]
    pub fn new(radius: f32) -> Self {
        debug_assert!(radius > 0.0);
        Self { radius }
    }

    /// Creates a sphere shape, rejecting non-positive or non-finite radii.
    pub fn try_new(radius: f32) -> Result<Self, ShapeError> {
        Ok(Self {
            radius: check_extent("radius", radius)?,
        })
    }
}

impl IConvexShape for Sphere {
    #[inline(always)]
    fn support_point_world_space(
        &self,
        direction: Vec3,
        position: Vec3,
        _orientation: Quat,
        bias: f32,
    ) -> Vec3 {
        position + support_direction(direction) * (self.radius + bias)
    }

    #[inline(always)]
    fn local_bounds(&self) -> BoundingBox {
        BoundingBox::new(Vec3::splat(-self.radius), Vec3::splat(self.radius))
    }

    #[inline(always)]
    fn get_bounds(&self, position: Vec3, _orientation: Quat) -> BoundingBox {
        BoundingBox::new(position - Vec3::splat(self.radius), position + Vec3::splat(self.radius))
    }

    #[inline(always)]
    fn inertia_tensor(&self) -> Matrix3x3 {
        Matrix3x3::from_diagonal(Vec3::splat(0.4 * self.radius * self.radius))
    }

    #[inline(always)]
    fn get_center_of_mass(&self) -> Vec3 {
        Vec3::ZERO
    }

    #[inline(always)]
    fn fastest_linear_speed(&self, _angular_velocity: Vec3, _direction: Vec3) -> f32 {
        // Spinning about its center never moves the surface of a sphere.
        0.0
    }
}
