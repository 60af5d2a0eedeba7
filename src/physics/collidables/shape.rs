use glam::{Quat, Vec3};
use thiserror::Error;

use super::box_shape::BoxShape;
use super::circle::Circle;
use super::convex_hull::ConvexHull;
use super::cuboid::Cuboid;
use super::polygon::Polygon;
use super::sphere::Sphere;
use crate::utilities::memory::ArenaError;
use crate::utilities::{BoundingBox, Matrix3x3};

/// Errors raised while constructing a shape from user data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShapeError {
    /// Fewer points were supplied than the shape needs.
    #[error("shape needs at least {required} points, got {actual}")]
    TooFewPoints {
        /// Minimum number of points for the shape.
        required: usize,
        /// Number of points supplied.
        actual: usize,
    },

    /// The point set does not span a volume (coincident, collinear, or coplanar points).
    #[error("point set is degenerate: {0}")]
    DegenerateHull(&'static str),

    /// A dimension was zero, negative, or not finite.
    #[error("invalid extent for {field}: {value}")]
    InvalidExtent {
        /// Which dimension was rejected.
        field: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// The hull builder ran out of scratch memory.
    #[error("hull construction ran out of scratch memory: {0}")]
    ArenaExhausted(#[from] ArenaError),

    /// A hull build job died before producing a result.
    #[error("hull build job failed")]
    BuildFailed,
}

pub(crate) fn check_extent(field: &'static str, value: f32) -> Result<f32, ShapeError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ShapeError::InvalidExtent { field, value })
    }
}

/// Capabilities every convex shape provides to the collision pipeline. All geometry is stored in
/// body-local space; world-space queries receive the body's pose.
pub trait IConvexShape {
    /// Point on the shape furthest along `direction`, placed at the given pose and pushed out by
    /// `bias` along the normalized direction.
    fn support_point_world_space(
        &self,
        direction: Vec3,
        position: Vec3,
        orientation: Quat,
        bias: f32,
    ) -> Vec3;

    /// Local-space bounding box.
    fn local_bounds(&self) -> BoundingBox;

    /// World-space bounds of the shape at the given pose.
    fn get_bounds(&self, position: Vec3, orientation: Quat) -> BoundingBox {
        self.local_bounds().transformed(position, orientation)
    }

    /// Inertia tensor per unit mass about the center of mass, in body space.
    fn inertia_tensor(&self) -> Matrix3x3;

    /// Center of mass in body space.
    fn get_center_of_mass(&self) -> Vec3;

    /// Upper bound on how fast any surface point moves along `direction` due to spinning at
    /// `angular_velocity`. Both vectors are in body space.
    fn fastest_linear_speed(&self, angular_velocity: Vec3, direction: Vec3) -> f32;
}

/// Normalizes a support direction, substituting an arbitrary axis for a zero vector.
#[inline(always)]
pub(crate) fn support_direction(direction: Vec3) -> Vec3 {
    crate::utilities::math_helper::normalize_or(direction, Vec3::X)
}

/// Index of the point with the largest projection onto `direction`.
#[inline]
pub(crate) fn furthest_point_index(points: &[Vec3], direction: Vec3) -> usize {
    let mut best = 0;
    let mut best_dot = f32::MIN;
    for (i, p) in points.iter().enumerate() {
        let d = p.dot(direction);
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    best
}

/// Support of a local point set, mapped into world space.
#[inline]
pub(crate) fn point_cloud_support(
    points: &[Vec3],
    direction: Vec3,
    position: Vec3,
    orientation: Quat,
    bias: f32,
) -> Vec3 {
    let direction = support_direction(direction);
    let local_direction = orientation.conjugate() * direction;
    let best = points[furthest_point_index(points, local_direction)];
    orientation * best + position + direction * bias
}

/// Fastest point speed along a direction for a local point set spinning about `center`.
#[inline]
pub(crate) fn point_cloud_fastest_speed(
    points: &[Vec3],
    center: Vec3,
    angular_velocity: Vec3,
    direction: Vec3,
) -> f32 {
    points
        .iter()
        .map(|p| direction.dot(angular_velocity.cross(*p - center)))
        .fold(0.0f32, f32::max)
}

/// Discriminant of [`Shape`]. The narrow phase picks its pair routine from the kinds of both bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    Circle,
    Box,
    Polygon,
    Cuboid,
    ConvexHull,
}

/// The closed set of shapes a body can carry.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Circle(Circle),
    Box(BoxShape),
    Polygon(Polygon),
    Cuboid(Cuboid),
    ConvexHull(ConvexHull),
}

macro_rules! dispatch {
    ($self:ident, $shape:ident => $body:expr) => {
        match $self {
            Shape::Sphere($shape) => $body,
            Shape::Circle($shape) => $body,
            Shape::Box($shape) => $body,
            Shape::Polygon($shape) => $body,
            Shape::Cuboid($shape) => $body,
            Shape::ConvexHull($shape) => $body,
        }
    };
}

impl Shape {
    #[inline(always)]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Box(_) => ShapeKind::Box,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Cuboid(_) => ShapeKind::Cuboid,
            Shape::ConvexHull(_) => ShapeKind::ConvexHull,
        }
    }

    #[inline(always)]
    pub fn as_sphere(&self) -> Option<&Sphere> {
        match self {
            Shape::Sphere(sphere) => Some(sphere),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn support_point_world_space(
        &self,
        direction: Vec3,
        position: Vec3,
        orientation: Quat,
        bias: f32,
    ) -> Vec3 {
        dispatch!(self, s => s.support_point_world_space(direction, position, orientation, bias))
    }

    #[inline(always)]
    pub fn local_bounds(&self) -> BoundingBox {
        dispatch!(self, s => s.local_bounds())
    }

    #[inline(always)]
    pub fn get_bounds(&self, position: Vec3, orientation: Quat) -> BoundingBox {
        dispatch!(self, s => s.get_bounds(position, orientation))
    }

    #[inline(always)]
    pub fn inertia_tensor(&self) -> Matrix3x3 {
        dispatch!(self, s => s.inertia_tensor())
    }

    #[inline(always)]
    pub fn get_center_of_mass(&self) -> Vec3 {
        dispatch!(self, s => s.get_center_of_mass())
    }

    #[inline(always)]
    pub fn fastest_linear_speed(&self, angular_velocity: Vec3, direction: Vec3) -> f32 {
        dispatch!(self, s => s.fastest_linear_speed(angular_velocity, direction))
    }
}

impl From<Sphere> for Shape {
    fn from(shape: Sphere) -> Self {
        Shape::Sphere(shape)
    }
}

impl From<Circle> for Shape {
    fn from(shape: Circle) -> Self {
        Shape::Circle(shape)
    }
}

impl From<BoxShape> for Shape {
    fn from(shape: BoxShape) -> Self {
        Shape::Box(shape)
    }
}

impl From<Polygon> for Shape {
    fn from(shape: Polygon) -> Self {
        Shape::Polygon(shape)
    }
}

impl From<Cuboid> for Shape {
    fn from(shape: Cuboid) -> Self {
        Shape::Cuboid(shape)
    }
}

impl From<ConvexHull> for Shape {
    fn from(shape: ConvexHull) -> Self {
        Shape::ConvexHull(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_dispatch_reaches_variant() {
        let shape = Shape::from(Sphere::new(2.0));
        assert_eq!(shape.kind(), ShapeKind::Sphere);
        let p = shape.support_point_world_space(Vec3::new(0.0, 3.0, 0.0), Vec3::X, Quat::IDENTITY, 0.0);
        assert_abs_diff_eq!(p.distance(Vec3::new(1.0, 2.0, 0.0)), 0.0, epsilon = 1e-6);
        assert_eq!(shape.as_sphere().map(|s| s.radius), Some(2.0));
    }

    #[test]
    fn test_point_cloud_support_respects_orientation() {
        let points = [Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)];
        let q = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        // Local +X is world +Y after rotation.
        let p = point_cloud_support(&points, Vec3::Y, Vec3::ZERO, q, 0.5);
        assert_abs_diff_eq!(p.distance(Vec3::new(0.0, 1.5, 0.0)), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_check_extent_rejects_zero_and_nan() {
        assert!(check_extent("radius", 0.0).is_err());
        assert!(check_extent("radius", f32::NAN).is_err());
        assert_eq!(check_extent("radius", 1.5), Ok(1.5));
    }
}
