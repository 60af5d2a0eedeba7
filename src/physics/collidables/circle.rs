use glam::{Quat, Vec3};

use super::shape::{support_direction, check_extent, IConvexShape, ShapeError};
use crate::utilities::{BoundingBox, Matrix3x3};

/// Flat disc of the given radius lying in the local XY plane, centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circle {
    pub radius: f32,
}

impl Circle {
    pub fn new(radius: f32) -> Result<Self, ShapeError> {
        Ok(Self {
            radius: check_extent("radius", radius)?,
        })
    }

    /// Furthest disc point along a local direction.
    #[inline(always)]
    fn local_support(&self, local_direction: Vec3) -> Vec3 {
        let planar = Vec3::new(local_direction.x, local_direction.y, 0.0);
        let length_squared = planar.length_squared();
        if length_squared < 1e-12 {
            // Direction is along the disc normal; every disc point is equally far.
            Vec3::ZERO
        } else {
            planar * (self.radius / length_squared.sqrt())
        }
    }
}

impl IConvexShape for Circle {
    fn support_point_world_space(&self, direction: Vec3, position: Vec3, orientation: Quat, bias: f32) -> Vec3 {
        let direction = support_direction(direction);
        let local = self.local_support(orientation.conjugate() * direction);
        position + orientation * local + direction * bias
    }

    fn local_bounds(&self) -> BoundingBox {
        BoundingBox::new(Vec3::new(-self.radius, -self.radius, 0.0), Vec3::new(self.radius, self.radius, 0.0))
    }

    fn inertia_tensor(&self) -> Matrix3x3 {
        let r2 = self.radius * self.radius;
        Matrix3x3::from_diagonal(Vec3::new(r2 * 0.25, r2 * 0.25, r2 * 0.5))
    }

    fn get_center_of_mass(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn fastest_linear_speed(&self, angular_velocity: Vec3, direction: Vec3) -> f32 {
        // d . (w x p) == p . (d x w), so the fastest rim point is the support along d x w.
        let axis = direction.cross(angular_velocity);
        self.local_support(axis).dot(axis).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_support_stays_in_plane() {
        let circle = Circle::new(2.0).unwrap();
        let p = circle.support_point_world_space(Vec3::new(1.0, 0.0, 5.0), Vec3::ZERO, Quat::IDENTITY, 0.0);
        assert_abs_diff_eq!(p.distance(Vec3::new(2.0, 0.0, 0.0)), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spin_about_normal_moves_rim_tangentially() {
        let circle = Circle::new(1.0).unwrap();
        let speed = circle.fastest_linear_speed(Vec3::new(0.0, 0.0, 3.0), Vec3::X);
        assert_abs_diff_eq!(speed, 3.0, epsilon = 1e-5);
        assert_eq!(circle.fastest_linear_speed(Vec3::new(0.0, 0.0, 3.0), Vec3::Z), 0.0);
    }
}
