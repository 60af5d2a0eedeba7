use glam::{Quat, Vec2, Vec3};

use super::shape::{point_cloud_fastest_speed, point_cloud_support, IConvexShape, ShapeError};
use crate::utilities::{BoundingBox, Matrix3x3};

/// Flat convex polygon in the local XY plane.
///
/// Vertices are given in order around the boundary (either winding). The body origin stays
/// where the caller put it; the center of mass is the area centroid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    vertices: Vec<Vec3>,
    center_of_mass: Vec3,
    inertia: Matrix3x3,
    bounds: BoundingBox,
}

impl Polygon {
    pub fn new(vertices: &[Vec2]) -> Result<Self, ShapeError> {
        if vertices.len() < 3 {
            return Err(ShapeError::TooFewPoints {
                required: 3,
                actual: vertices.len(),
            });
        }

        // Area moments over the fan of edges from the origin.
        let mut area = 0.0;
        let mut first = Vec2::ZERO;
        let (mut xx, mut yy, mut xy) = (0.0, 0.0, 0.0);
        for (i, a) in vertices.iter().enumerate() {
            let b = vertices[(i + 1) % vertices.len()];
            let cross = a.perp_dot(b);
            area += cross;
            first += (*a + b) * cross;
            xx += cross * (a.x * a.x + a.x * b.x + b.x * b.x);
            yy += cross * (a.y * a.y + a.y * b.y + b.y * b.y);
            xy += cross * (a.x * b.y + 2.0 * a.x * a.y + 2.0 * b.x * b.y + b.x * a.y);
        }
        area *= 0.5;
        if area.abs() < 1e-8 || !area.is_finite() {
            return Err(ShapeError::DegenerateHull("polygon has no area"));
        }

        // The signed area cancels the winding in every ratio below.
        let centroid = first / (6.0 * area);
        let mean_xx = xx / (12.0 * area) - centroid.x * centroid.x;
        let mean_yy = yy / (12.0 * area) - centroid.y * centroid.y;
        let mean_xy = xy / (24.0 * area) - centroid.x * centroid.y;

        let inertia = Matrix3x3::from_rows(
            Vec3::new(mean_yy, -mean_xy, 0.0),
            Vec3::new(-mean_xy, mean_xx, 0.0),
            Vec3::new(0.0, 0.0, mean_xx + mean_yy),
        );

        let vertices: Vec<Vec3> = vertices.iter().map(|v| v.extend(0.0)).collect();
        let bounds = BoundingBox::from_points(&vertices);
        Ok(Self {
            vertices,
            center_of_mass: centroid.extend(0.0),
            inertia,
            bounds,
        })
    }

    /// Regular polygon with `sides` vertices on a circle of the given radius.
    pub fn regular(sides: usize, radius: f32) -> Result<Self, ShapeError> {
        let vertices: Vec<Vec2> = (0..sides)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / sides as f32;
                Vec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();
        Self::new(&vertices)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }
}

impl IConvexShape for Polygon {
    fn support_point_world_space(&self, direction: Vec3, position: Vec3, orientation: Quat, bias: f32) -> Vec3 {
        point_cloud_support(&self.vertices, direction, position, orientation, bias)
    }

    fn local_bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn inertia_tensor(&self) -> Matrix3x3 {
        self.inertia
    }

    fn get_center_of_mass(&self) -> Vec3 {
        self.center_of_mass
    }

    fn fastest_linear_speed(&self, angular_velocity: Vec3, direction: Vec3) -> f32 {
        point_cloud_fastest_speed(&self.vertices, self.center_of_mass, angular_velocity, direction)
    }
}
