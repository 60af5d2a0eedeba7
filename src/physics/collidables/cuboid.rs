use glam::{Quat, Vec3};

use super::shape::{check_extent, point_cloud_fastest_speed, point_cloud_support, IConvexShape, ShapeError};
use crate::utilities::{BoundingBox, Matrix3x3};

/// Solid axis-aligned box in body space, described by its eight corners.
///
/// A cuboid built from arbitrary points spans their local bounding box, so its center (and
/// center of mass) need not sit on the body origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cuboid {
    points: [Vec3; 8],
    bounds: BoundingBox,
}

impl Cuboid {
    /// Cuboid centered on the body origin.
    pub fn new(half_extents: Vec3) -> Result<Self, ShapeError> {
        check_extent("half_extents.x", half_extents.x)?;
        check_extent("half_extents.y", half_extents.y)?;
        check_extent("half_extents.z", half_extents.z)?;
        Ok(Self::from_bounds(BoundingBox::new(-half_extents, half_extents)))
    }

    /// Cuboid spanning the bounds of a point set.
    pub fn from_points(points: &[Vec3]) -> Result<Self, ShapeError> {
        if points.is_empty() {
            return Err(ShapeError::TooFewPoints {
                required: 1,
                actual: 0,
            });
        }
        let bounds = BoundingBox::from_points(points);
        if !bounds.min.is_finite() || !bounds.max.is_finite() {
            return Err(ShapeError::DegenerateHull("non-finite point"));
        }
        Ok(Self::from_bounds(bounds))
    }

    fn from_bounds(bounds: BoundingBox) -> Self {
        Self {
            points: bounds.corners(),
            bounds,
        }
    }

    pub fn points(&self) -> &[Vec3; 8] {
        &self.points
    }

    pub fn half_extents(&self) -> Vec3 {
        self.bounds.extents() * 0.5
    }
}

impl IConvexShape for Cuboid {
    fn support_point_world_space(&self, direction: Vec3, position: Vec3, orientation: Quat, bias: f32) -> Vec3 {
        point_cloud_support(&self.points, direction, position, orientation, bias)
    }

    fn local_bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn inertia_tensor(&self) -> Matrix3x3 {
        let d = self.bounds.extents();
        let (dx2, dy2, dz2) = (d.x * d.x, d.y * d.y, d.z * d.z);
        Matrix3x3::from_diagonal(Vec3::new(dy2 + dz2, dx2 + dz2, dx2 + dy2) / 12.0)
    }

    fn get_center_of_mass(&self) -> Vec3 {
        self.bounds.center()
    }

    fn fastest_linear_speed(&self, angular_velocity: Vec3, direction: Vec3) -> f32 {
        point_cloud_fastest_speed(&self.points, self.bounds.center(), angular_velocity, direction)
    }
}
