use glam::{Quat, Vec3};

use super::shape::{check_extent, point_cloud_fastest_speed, point_cloud_support, IConvexShape, ShapeError};
use crate::utilities::{BoundingBox, Matrix3x3};

/// Flat rectangle of `width` by `height` lying in the local XY plane, centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxShape {
    pub width: f32,
    pub height: f32,
    corners: [Vec3; 4],
}

impl BoxShape {
    pub fn new(width: f32, height: f32) -> Result<Self, ShapeError> {
        let width = check_extent("width", width)?;
        let height = check_extent("height", height)?;
        let (hw, hh) = (width * 0.5, height * 0.5);
        Ok(Self {
            width,
            height,
            corners: [
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
            ],
        })
    }

    /// Corners in counter-clockwise order.
    pub fn corners(&self) -> &[Vec3; 4] {
        &self.corners
    }
}

impl IConvexShape for BoxShape {
    fn support_point_world_space(&self, direction: Vec3, position: Vec3, orientation: Quat, bias: f32) -> Vec3 {
        point_cloud_support(&self.corners, direction, position, orientation, bias)
    }

    fn local_bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.corners)
    }

    fn inertia_tensor(&self) -> Matrix3x3 {
        let w2 = self.width * self.width;
        let h2 = self.height * self.height;
        Matrix3x3::from_diagonal(Vec3::new(h2, w2, w2 + h2) / 12.0)
    }

    fn get_center_of_mass(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn fastest_linear_speed(&self, angular_velocity: Vec3, direction: Vec3) -> f32 {
        point_cloud_fastest_speed(&self.corners, Vec3::ZERO, angular_velocity, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rejects_zero_width() {
        assert!(matches!(BoxShape::new(0.0, 1.0), Err(ShapeError::InvalidExtent { field: "width", .. })));
    }

    #[test]
    fn test_lamina_inertia() {
        let shape = BoxShape::new(2.0, 4.0).unwrap();
        let inertia = shape.inertia_tensor();
        assert_abs_diff_eq!(inertia.get(0, 0), 16.0 / 12.0, epsilon = 1e-6);
        assert_abs_diff_eq!(inertia.get(1, 1), 4.0 / 12.0, epsilon = 1e-6);
        assert_abs_diff_eq!(inertia.get(2, 2), 20.0 / 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_support_picks_corner() {
        let shape = BoxShape::new(2.0, 2.0).unwrap();
        let p = shape.support_point_world_space(Vec3::new(1.0, 1.0, 0.0), Vec3::ZERO, Quat::IDENTITY, 0.0);
        assert_abs_diff_eq!(p.distance(Vec3::new(1.0, 1.0, 0.0)), 0.0, epsilon = 1e-6);
    }
}
