//! Incremental convex hull construction.
//!
//! Starts from the largest tetrahedron that can be found quickly, then repeatedly adds the most
//! extreme point still outside the hull: every triangle that point can see is removed and the
//! hole's boundary is fanned to the new point. Points that end up inside the hull (or on top of
//! an existing vertex) are discarded between steps. All working storage lives in a
//! [`MemoryArena`] region that is released when construction finishes.

use glam::Vec3;
use std::sync::Arc;
use tracing::{debug, warn};

use super::convex_hull::ConvexHull;
use super::shape::{furthest_point_index, ShapeError};
use crate::utilities::memory::{ArenaCapacity, ArenaEdge, ArenaPool, ArenaStack, ArenaTriangle, MemoryArena};
use crate::utilities::task_scheduling::{TaskHandle, WorkerPool};

/// Signed plane distance beyond which a point counts as in front of a triangle.
const PLANE_EPSILON: f32 = 1e-5;
/// Points closer than this to an existing hull vertex are merged into it.
const DUPLICATE_DISTANCE: f32 = 0.01;
/// Minimum spread for the seed tetrahedron.
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Tuning for hull construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HullBuildSettings {
    /// Samples per axis of the grid used to integrate center of mass and inertia.
    pub inertia_samples_per_axis: usize,
    /// Scratch capacity of each pooled arena used by [`HullBuilder`].
    pub arena_capacity: ArenaCapacity,
}

impl Default for HullBuildSettings {
    fn default() -> Self {
        Self {
            inertia_samples_per_axis: 100,
            arena_capacity: ArenaCapacity {
                points: 1024,
                triangles: 2048,
                edges: 1024,
            },
        }
    }
}

impl HullBuildSettings {
    #[must_use]
    pub fn with_inertia_samples(mut self, samples_per_axis: usize) -> Self {
        self.inertia_samples_per_axis = samples_per_axis;
        self
    }

    #[must_use]
    pub fn with_arena_capacity(mut self, capacity: ArenaCapacity) -> Self {
        self.arena_capacity = capacity;
        self
    }
}

/// Scratch capacity large enough for a hull over `point_count` points.
pub fn capacity_for(point_count: usize) -> ArenaCapacity {
    ArenaCapacity {
        points: point_count + 4,
        triangles: 2 * point_count + 8,
        edges: 2 * point_count + 8,
    }
}

/// Signed distance of `point` from the plane of triangle `(a, b, c)`, positive on the side the
/// counter-clockwise normal points to.
#[inline]
pub fn distance_from_triangle(a: Vec3, b: Vec3, c: Vec3, point: Vec3) -> f32 {
    let normal = (b - a).cross(c - a).normalize_or_zero();
    (point - a).dot(normal)
}

#[inline]
fn triangle_distance(points: &[Vec3], tri: &ArenaTriangle, point: Vec3) -> f32 {
    distance_from_triangle(
        points[tri[0] as usize],
        points[tri[1] as usize],
        points[tri[2] as usize],
        point,
    )
}

/// Whether the point is in front of any triangle of the hull.
pub fn is_external(points: &[Vec3], triangles: &[ArenaTriangle], point: Vec3) -> bool {
    triangles
        .iter()
        .any(|tri| triangle_distance(points, tri, point) > PLANE_EPSILON)
}

fn furthest_from_line(points: &[Vec3], a: Vec3, b: Vec3) -> (usize, f32) {
    let ray = (b - a).normalize_or_zero();
    let mut best = (0, 0.0);
    for (i, p) in points.iter().enumerate() {
        let projected = a + ray * (*p - a).dot(ray);
        let distance = p.distance(projected);
        if distance > best.1 {
            best = (i, distance);
        }
    }
    best
}

fn furthest_from_triangle(points: &[Vec3], a: Vec3, b: Vec3, c: Vec3) -> (usize, f32) {
    let mut best = (0, 0.0);
    for (i, p) in points.iter().enumerate() {
        let distance = distance_from_triangle(a, b, c, *p);
        if distance * distance > best.1 {
            best = (i, distance * distance);
        }
    }
    (best.0, best.1.sqrt())
}

/// Seeds the hull with a tetrahedron whose triangles all face outward.
fn build_tetrahedron(
    input: &[Vec3],
    points: &mut ArenaStack<Vec3>,
    triangles: &mut ArenaStack<ArenaTriangle>,
) -> Result<(), ShapeError> {
    let mut p0 = input[furthest_point_index(input, Vec3::X)];
    let mut p1 = input[furthest_point_index(input, -p0)];
    if p0.distance_squared(p1) < DEGENERATE_EPSILON {
        // All points may sit on the far side of the origin; fall back to the opposite extreme.
        p1 = input[furthest_point_index(input, -Vec3::X)];
        if p0.distance_squared(p1) < DEGENERATE_EPSILON {
            return Err(ShapeError::DegenerateHull("points are coincident"));
        }
    }
    let (i2, line_distance) = furthest_from_line(input, p0, p1);
    if line_distance < DEGENERATE_EPSILON {
        return Err(ShapeError::DegenerateHull("points are collinear"));
    }
    let p2 = input[i2];
    let (i3, plane_distance) = furthest_from_triangle(input, p0, p1, p2);
    if plane_distance < DEGENERATE_EPSILON {
        return Err(ShapeError::DegenerateHull("points are coplanar"));
    }
    let p3 = input[i3];

    // Keep the fourth point behind the first triangle so the winding faces outward.
    if distance_from_triangle(p0, p1, p2, p3) > 0.0 {
        std::mem::swap(&mut p0, &mut p1);
    }

    let base = points.len() as u32;
    for p in [p0, p1, p2, p3] {
        points.push(p)?;
    }
    debug_assert_eq!(base, 0);
    for tri in [[0, 1, 2], [0, 2, 3], [2, 1, 3], [1, 0, 3]] {
        triangles.push(tri)?;
    }
    Ok(())
}

#[inline]
fn has_edge(tri: &ArenaTriangle, a: u32, b: u32) -> bool {
    (0..3).any(|k| {
        let (e0, e1) = (tri[k], tri[(k + 1) % 3]);
        (e0 == a && e1 == b) || (e0 == b && e1 == a)
    })
}

/// Inserts a point outside the hull: removes every triangle it can see and fans the boundary of
/// the resulting hole to the new point.
fn add_point(
    points: &mut ArenaStack<Vec3>,
    triangles: &mut ArenaStack<ArenaTriangle>,
    edges: &mut ArenaStack<ArenaEdge>,
    point: Vec3,
) -> Result<(), ShapeError> {
    let edge_base = edges.len();
    {
        let hull = points.as_slice();
        let facing = |tri: &ArenaTriangle| triangle_distance(hull, tri, point) > PLANE_EPSILON;
        let tris = triangles.as_slice();
        for (i, tri) in tris.iter().enumerate() {
            if !facing(tri) {
                continue;
            }
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                let shared = tris
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && facing(other) && has_edge(other, a, b));
                if !shared {
                    edges.push([a, b])?;
                }
            }
        }
        triangles.retain(|tri| !facing(tri));
    }

    let new_index = points.push(point)? as u32;
    for k in edge_base..edges.len() {
        let [a, b] = edges[k];
        triangles.push([a, b, new_index])?;
    }
    edges.truncate(edge_base);
    Ok(())
}

/// Drops candidate points that are inside the hull or sit on an existing vertex.
fn remove_internal_points(points: &[Vec3], triangles: &[ArenaTriangle], candidates: &mut Vec<Vec3>) {
    candidates.retain(|p| is_external(points, triangles, *p));
    candidates.retain(|p| {
        !points
            .iter()
            .any(|h| p.distance_squared(*h) < DUPLICATE_DISTANCE * DUPLICATE_DISTANCE)
    });
}

/// Removes vertices no triangle refers to, renumbering the triangles.
fn remove_unreferenced_points(points: &mut ArenaStack<Vec3>, triangles: &mut ArenaStack<ArenaTriangle>) {
    let mut i = 0u32;
    while (i as usize) < points.len() {
        let referenced = triangles.iter().any(|tri| tri.contains(&i));
        if referenced {
            i += 1;
            continue;
        }
        points.remove(i as usize);
        for tri in triangles.iter_mut() {
            for index in tri.iter_mut() {
                if *index > i {
                    *index -= 1;
                }
            }
        }
    }
}

/// Builds a hull using `arena` for all intermediate storage. The arena must be empty on entry
/// and is empty again on return.
pub(crate) fn build_in_arena(
    input: &[Vec3],
    arena: &mut MemoryArena<Vec3>,
    settings: &HullBuildSettings,
) -> Result<ConvexHull, ShapeError> {
    if input.len() < 4 {
        return Err(ShapeError::TooFewPoints {
            required: 4,
            actual: input.len(),
        });
    }

    // Triangle indices are stack positions, so the hull must start from an empty arena.
    let mut outer = arena.begin_temporary();
    debug_assert_eq!(outer.first_point(), 0);
    debug_assert_eq!(outer.first_triangle(), 0);
    let MemoryArena {
        points,
        triangles,
        edges,
    } = &mut *outer;

    build_tetrahedron(input, points, triangles)?;

    let mut candidates = input.to_vec();
    remove_internal_points(points, triangles, &mut candidates);
    while !candidates.is_empty() {
        let index = furthest_point_index(&candidates, candidates[0]);
        let point = candidates.remove(index);
        add_point(points, triangles, edges, point)?;
        remove_internal_points(points, triangles, &mut candidates);
    }
    remove_unreferenced_points(points, triangles);

    let hull_points = points.to_vec();
    let hull_triangles = triangles.to_vec();
    drop(outer);

    debug!(
        input = input.len(),
        vertices = hull_points.len(),
        triangles = hull_triangles.len(),
        "convex hull built"
    );
    Ok(ConvexHull::from_parts(
        hull_points,
        hull_triangles,
        settings.inertia_samples_per_axis,
    ))
}

/// Builds convex hulls on worker threads, lending each job a pooled arena.
pub struct HullBuilder {
    workers: WorkerPool,
    arenas: Arc<ArenaPool<Vec3>>,
    settings: HullBuildSettings,
}

impl HullBuilder {
    pub fn new(worker_count: usize, settings: HullBuildSettings) -> Self {
        Self {
            workers: WorkerPool::new("hull-builder", worker_count),
            arenas: ArenaPool::new(settings.arena_capacity),
            settings,
        }
    }

    pub fn settings(&self) -> &HullBuildSettings {
        &self.settings
    }

    /// Queues a hull build. The hull's data must not be used until the handle reports ready.
    pub fn submit(&self, points: Vec<Vec3>) -> TaskHandle<Result<ConvexHull, ShapeError>> {
        let arenas = self.arenas.clone();
        let settings = self.settings;
        self.workers.submit(move || {
            let mut arena = arenas.checkout();
            let result = build_in_arena(&points, &mut arena, &settings);
            arenas.give_back(arena);
            if let Err(error) = &result {
                warn!(%error, "convex hull build failed");
            }
            result
        })
    }

    /// Builds every point cloud on scoped threads and returns results in input order.
    pub fn build_batch(&self, clouds: &[Vec<Vec3>]) -> Vec<Result<ConvexHull, ShapeError>> {
        let thread_count = self.workers.worker_count().max(1).min(clouds.len().max(1));
        let arenas = &self.arenas;
        let settings = &self.settings;
        let scoped = crossbeam_utils::thread::scope(|scope| {
            let jobs: Vec<_> = (0..thread_count)
                .map(|lane| {
                    scope.spawn(move |_| {
                        let mut arena = arenas.checkout();
                        let built: Vec<(usize, Result<ConvexHull, ShapeError>)> = clouds
                            .iter()
                            .enumerate()
                            .skip(lane)
                            .step_by(thread_count)
                            .map(|(i, cloud)| (i, build_in_arena(cloud, &mut arena, settings)))
                            .collect();
                        arenas.give_back(arena);
                        built
                    })
                })
                .collect();
            let mut results: Vec<Option<Result<ConvexHull, ShapeError>>> = vec![None; clouds.len()];
            for job in jobs {
                if let Ok(built) = job.join() {
                    for (i, result) in built {
                        results[i] = Some(result);
                    }
                }
            }
            results
        });

        match scoped {
            Ok(results) => results
                .into_iter()
                .map(|r| r.unwrap_or(Err(ShapeError::BuildFailed)))
                .collect(),
            Err(_) => clouds.iter().map(|_| Err(ShapeError::BuildFailed)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ]
    }

    fn fast() -> HullBuildSettings {
        HullBuildSettings::default().with_inertia_samples(8)
    }

    #[test]
    fn test_too_few_points() {
        let err = ConvexHull::build(&tetrahedron()[..3], &fast()).unwrap_err();
        assert_eq!(err, ShapeError::TooFewPoints { required: 4, actual: 3 });
    }

    #[test]
    fn test_coplanar_points_are_degenerate() {
        let flat = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        assert!(matches!(ConvexHull::build(&flat, &fast()), Err(ShapeError::DegenerateHull(_))));
    }

    #[test]
    fn test_tetrahedron_hull() {
        let hull = ConvexHull::build(&tetrahedron(), &fast()).unwrap();
        assert_eq!(hull.points().len(), 4);
        assert_eq!(hull.triangles().len(), 4);
    }

    #[test]
    fn test_arena_is_released_after_build() {
        let mut arena = MemoryArena::new(capacity_for(8));
        let before = arena.checkpoint();
        build_in_arena(&tetrahedron(), &mut arena, &fast()).unwrap();
        assert_eq!(arena.checkpoint(), before);
    }

    #[test]
    fn test_small_arena_reports_exhaustion() {
        let mut arena = MemoryArena::new(ArenaCapacity {
            points: 3,
            triangles: 4,
            edges: 4,
        });
        let err = build_in_arena(&tetrahedron(), &mut arena, &fast()).unwrap_err();
        assert!(matches!(err, ShapeError::ArenaExhausted(_)));
    }

    #[test]
    fn test_threaded_submit_and_batch() {
        let builder = HullBuilder::new(2, fast());
        let handle = builder.submit(tetrahedron());
        let hull = handle.wait().unwrap().unwrap();
        assert_eq!(hull.points().len(), 4);

        let clouds = vec![tetrahedron(), vec![Vec3::ZERO; 4], tetrahedron()];
        let results = builder.build_batch(&clouds);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
