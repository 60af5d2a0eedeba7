use glam::{Quat, Vec3};
use std::fmt;

/// Provides simple axis-aligned bounding box functionality.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Location with the lowest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub min: Vec3,
    /// Location with the highest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Inverted box that any expansion replaces.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    /// Constructs a bounding box from the specified minimum and maximum.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates the smallest bounding box containing every point.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.expand_by_point(*p);
        }
        bounds
    }

    /// Whether `min <= max` on every axis.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Grows the box to contain the point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grows the box to contain another box.
    #[inline]
    pub fn expand_by_bounds(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Determines if a bounding box intersects another bounding box.
    #[inline]
    pub fn intersects(a: &Self, b: &Self) -> bool {
        Self::intersects_bounds(a.min, a.max, b.min, b.max)
    }

    /// Determines if a bounding box intersects another bounding box.
    #[inline]
    pub fn intersects_bounds(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> bool {
        let no_intersection_on_axes = max_a.cmplt(min_b) | max_b.cmplt(min_a);
        !no_intersection_on_axes.any()
    }

    /// Computes the volume of the bounding box.
    #[inline]
    pub fn compute_volume(&self) -> f32 {
        let diagonal = self.max - self.min;
        diagonal.x * diagonal.y * diagonal.z
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn create_merged(a: &Self, b: &Self) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Width, height and depth of the box.
    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Midpoint of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The eight corner points.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }

    /// World-space bounds of a local-space box placed at the given pose.
    pub fn transformed(&self, position: Vec3, orientation: Quat) -> Self {
        let mut bounds = Self::EMPTY;
        for corner in self.corners() {
            bounds.expand_by_point(position + orientation * corner);
        }
        bounds
    }

    /// Extends the box along a displacement so that it covers the sweep of the original box.
    #[inline]
    pub fn swept(&self, displacement: Vec3) -> Self {
        let mut bounds = *self;
        bounds.expand_by_point(self.min + displacement);
        bounds.expand_by_point(self.max + displacement);
        bounds
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_intersects_touching_and_disjoint() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::ONE, Vec3::splat(2.0));
        let c = BoundingBox::new(Vec3::splat(1.1), Vec3::splat(2.0));
        assert!(BoundingBox::intersects(&a, &b));
        assert!(!BoundingBox::intersects(&a, &c));
    }

    #[test]
    fn test_transformed_rotated_box() {
        let local = BoundingBox::new(Vec3::new(-1.0, -0.5, -0.5), Vec3::new(1.0, 0.5, 0.5));
        let q = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let world = local.transformed(Vec3::new(0.0, 10.0, 0.0), q);
        assert_abs_diff_eq!(world.min.x, -0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(world.max.y, 11.0, epsilon = 1e-5);
    }

    #[test]
    fn test_swept_covers_both_ends() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE).swept(Vec3::new(-3.0, 0.0, 2.0));
        assert_eq!(a.min, Vec3::new(-3.0, 0.0, 0.0));
        assert_eq!(a.max, Vec3::new(1.0, 1.0, 3.0));
    }
}
