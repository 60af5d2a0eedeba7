use glam::{DVec3, Quat, Vec3};
use tracing::warn;

use super::convex_hull_builder::{self, HullBuildSettings};
use super::shape::{point_cloud_fastest_speed, point_cloud_support, IConvexShape, ShapeError};
use crate::utilities::memory::{ArenaTriangle, MemoryArena};
use crate::utilities::{BoundingBox, Matrix3x3};

/// Convex hull of a point cloud: the hull's own vertices and outward-wound triangles, plus mass
/// properties sampled from its interior.
///
/// Built once, read only afterwards. Use [`ConvexHull::build`] on the calling thread or
/// [`super::HullBuilder`] to build off-thread.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvexHull {
    points: Vec<Vec3>,
    triangles: Vec<ArenaTriangle>,
    bounds: BoundingBox,
    center_of_mass: Vec3,
    inertia: Matrix3x3,
}

impl ConvexHull {
    /// Builds a hull on the calling thread with scratch memory sized for the input.
    pub fn build(points: &[Vec3], settings: &HullBuildSettings) -> Result<Self, ShapeError> {
        let mut arena = MemoryArena::new(convex_hull_builder::capacity_for(points.len()));
        convex_hull_builder::build_in_arena(points, &mut arena, settings)
    }

    /// Assembles a hull from already computed boundary data, sampling its mass properties.
    pub(crate) fn from_parts(
        points: Vec<Vec3>,
        triangles: Vec<ArenaTriangle>,
        samples_per_axis: usize,
    ) -> Self {
        let bounds = BoundingBox::from_points(&points);
        let (center_of_mass, inertia) = sample_mass_properties(&points, &triangles, &bounds, samples_per_axis);
        Self {
            points,
            triangles,
            bounds,
            center_of_mass,
            inertia,
        }
    }

    /// Hull vertices in body space.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Outward-wound triangles indexing [`ConvexHull::points`].
    pub fn triangles(&self) -> &[ArenaTriangle] {
        &self.triangles
    }

    /// Whether a body-space point lies inside or on the hull.
    pub fn contains(&self, point: Vec3) -> bool {
        !convex_hull_builder::is_external(&self.points, &self.triangles, point)
    }
}

impl IConvexShape for ConvexHull {
    fn support_point_world_space(&self, direction: Vec3, position: Vec3, orientation: Quat, bias: f32) -> Vec3 {
        point_cloud_support(&self.points, direction, position, orientation, bias)
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
        point_cloud_fastest_speed(&self.points, self.center_of_mass, angular_velocity, direction)
    }
}

/// Center of mass and unit-mass inertia about it, from a regular grid of samples over the hull's
/// bounds. Samples sit at cell centers; only samples inside the hull count.
fn sample_mass_properties(
    points: &[Vec3],
    triangles: &[ArenaTriangle],
    bounds: &BoundingBox,
    samples_per_axis: usize,
) -> (Vec3, Matrix3x3) {
    let samples = samples_per_axis.max(1);
    let step = bounds.extents() / samples as f32;

    let mut count = 0u64;
    let mut sum = DVec3::ZERO;
    // Second moments: xx, yy, zz, xy, xz, yz.
    let mut second = [0.0f64; 6];
    for i in 0..samples {
        let x = bounds.min.x + (i as f32 + 0.5) * step.x;
        for j in 0..samples {
            let y = bounds.min.y + (j as f32 + 0.5) * step.y;
            for k in 0..samples {
                let z = bounds.min.z + (k as f32 + 0.5) * step.z;
                let p = Vec3::new(x, y, z);
                if convex_hull_builder::is_external(points, triangles, p) {
                    continue;
                }
                let p = p.as_dvec3();
                count += 1;
                sum += p;
                second[0] += p.x * p.x;
                second[1] += p.y * p.y;
                second[2] += p.z * p.z;
                second[3] += p.x * p.y;
                second[4] += p.x * p.z;
                second[5] += p.y * p.z;
            }
        }
    }

    if count == 0 {
        warn!(samples, "no inertia samples landed inside hull; using bounding box approximation");
        let center = points.iter().copied().sum::<Vec3>() / points.len().max(1) as f32;
        let d = bounds.extents();
        let (dx2, dy2, dz2) = (d.x * d.x, d.y * d.y, d.z * d.z);
        return (center, Matrix3x3::from_diagonal(Vec3::new(dy2 + dz2, dx2 + dz2, dx2 + dy2) / 12.0));
    }

    let n = count as f64;
    let c = sum / n;
    // Covariance about the center of mass.
    let cxx = second[0] / n - c.x * c.x;
    let cyy = second[1] / n - c.y * c.y;
    let czz = second[2] / n - c.z * c.z;
    let cxy = second[3] / n - c.x * c.y;
    let cxz = second[4] / n - c.x * c.z;
    let cyz = second[5] / n - c.y * c.z;

    let inertia = Matrix3x3::from_rows(
        Vec3::new((cyy + czz) as f32, -cxy as f32, -cxz as f32),
        Vec3::new(-cxy as f32, (cxx + czz) as f32, -cyz as f32),
        Vec3::new(-cxz as f32, -cyz as f32, (cxx + cyy) as f32),
    );
    (c.as_vec3(), inertia)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cube_points(half: f32) -> Vec<Vec3> {
        let mut points = Vec::new();
        for x in [-half, half] {
            for y in [-half, half] {
                for z in [-half, half] {
                    points.push(Vec3::new(x, y, z));
                }
            }
        }
        points
    }

    fn settings() -> HullBuildSettings {
        HullBuildSettings::default().with_inertia_samples(20)
    }

    #[test]
    fn test_cube_hull_keeps_corners_and_drops_interior() {
        let mut points = cube_points(1.0);
        points.push(Vec3::ZERO);
        points.push(Vec3::new(0.2, -0.3, 0.5));
        let hull = ConvexHull::build(&points, &settings()).unwrap();
        assert_eq!(hull.points().len(), 8);
        assert_eq!(hull.triangles().len(), 12);
        assert!(!hull.points().contains(&Vec3::ZERO));
    }

    #[test]
    fn test_cube_hull_mass_properties() {
        let hull = ConvexHull::build(&cube_points(1.0), &settings()).unwrap();
        assert_abs_diff_eq!(hull.get_center_of_mass().length(), 0.0, epsilon = 1e-4);
        // Solid cube of side 2: (4 + 4) / 12.
        let inertia = hull.inertia_tensor();
        assert_abs_diff_eq!(inertia.get(0, 0), 8.0 / 12.0, epsilon = 0.01);
        assert_abs_diff_eq!(inertia.get(0, 1), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_triangles_face_outward() {
        let hull = ConvexHull::build(&cube_points(1.0), &settings()).unwrap();
        let center = hull.get_center_of_mass();
        for tri in hull.triangles() {
            let [a, b, c] = tri.map(|i| hull.points()[i as usize]);
            let normal = (b - a).cross(c - a);
            assert!(normal.dot(a - center) > 0.0);
        }
        assert!(hull.contains(Vec3::new(0.5, 0.5, -0.5)));
        assert!(!hull.contains(Vec3::new(1.5, 0.0, 0.0)));
    }

    #[test]
    fn test_support_returns_hull_vertex() {
        let hull = ConvexHull::build(&cube_points(1.0), &settings()).unwrap();
        let p = hull.support_point_world_space(Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY, 0.0);
        assert_abs_diff_eq!(p.distance(Vec3::new(1.0, 6.0, 1.0)), 0.0, epsilon = 1e-6);
    }
}
