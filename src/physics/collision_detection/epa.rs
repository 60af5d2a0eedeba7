//! Expanding polytope algorithm: grows the GJK tetrahedron toward the boundary of the Minkowski
//! difference to find the penetration depth and the witness points on each body.

use glam::Vec3;
use tracing::{trace, warn};

use super::gjk::{self, GjkPoint};
use crate::physics::body::Body;
use crate::utilities::math_helper::double_triangle_area_2d;
use crate::utilities::memory::{ArenaEdge, ArenaTriangle, MemoryArena};

/// Squared distance under which a new support point duplicates an existing polytope vertex.
const DUPLICATE_EPSILON_SQUARED: f32 = 0.001 * 0.001;
/// Distances closer than this are ties when choosing the closest face.
const TIE_EPSILON: f32 = 1e-7;

#[inline]
fn face_normal(points: &[GjkPoint], triangle: &ArenaTriangle) -> Option<Vec3> {
    let a = points[triangle[0] as usize].minkowski;
    let b = points[triangle[1] as usize].minkowski;
    let c = points[triangle[2] as usize].minkowski;
    let normal = (b - a).cross(c - a);
    let length_squared = normal.length_squared();
    (length_squared > f32::MIN_POSITIVE).then(|| normal / length_squared.sqrt())
}

/// Signed distance from the face plane to `point`, positive on the outward side. Degenerate
/// faces report zero.
#[inline]
fn signed_distance(points: &[GjkPoint], triangle: &ArenaTriangle, point: Vec3) -> f32 {
    match face_normal(points, triangle) {
        Some(normal) => (point - points[triangle[0] as usize].minkowski).dot(normal),
        None => 0.0,
    }
}

#[inline]
fn centroid(points: &[GjkPoint], triangle: &ArenaTriangle) -> Vec3 {
    (points[triangle[0] as usize].minkowski
        + points[triangle[1] as usize].minkowski
        + points[triangle[2] as usize].minkowski)
        / 3.0
}

/// Index of the face whose plane passes closest to the origin. Ties go to the face whose
/// centroid is nearer the origin.
fn closest_triangle(points: &[GjkPoint], triangles: &[ArenaTriangle]) -> Option<usize> {
    let mut best: Option<(usize, f32, f32)> = None;
    for (index, triangle) in triangles.iter().enumerate() {
        let Some(normal) = face_normal(points, triangle) else {
            continue;
        };
        let distance = points[triangle[0] as usize].minkowski.dot(normal);
        let distance_squared = distance * distance;
        let centroid_squared = centroid(points, triangle).length_squared();
        let better = match best {
            None => true,
            Some((_, best_distance, best_centroid)) => {
                if (distance_squared - best_distance).abs() <= TIE_EPSILON {
                    centroid_squared < best_centroid
                } else {
                    distance_squared < best_distance
                }
            }
        };
        if better {
            best = Some((index, distance_squared, centroid_squared));
        }
    }
    best.map(|(index, _, _)| index)
}

fn has_point(points: &[GjkPoint], triangles: &[ArenaTriangle], candidate: Vec3) -> bool {
    triangles.iter().flatten().any(|&index| {
        (candidate - points[index as usize].minkowski).length_squared() < DUPLICATE_EPSILON_SQUARED
    })
}

#[inline]
fn same_edge(a: &ArenaEdge, b: &ArenaEdge) -> bool {
    (a[0] == b[0] && a[1] == b[1]) || (a[0] == b[1] && a[1] == b[0])
}

#[inline]
fn edges_of(triangle: &ArenaTriangle) -> [ArenaEdge; 3] {
    [
        [triangle[0], triangle[1]],
        [triangle[1], triangle[2]],
        [triangle[2], triangle[0]],
    ]
}

/// Barycentric coordinates of `p` projected onto the plane of `(a, b, c)`. The projection is
/// done in the coordinate plane where the triangle has the largest area. Degenerate triangles
/// return `[1, 0, 0]`.
pub fn barycentric_projection(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> [f32; 3] {
    let m = (b - a).cross(c - a);
    let length_squared = m.length_squared();
    if length_squared <= f32::MIN_POSITIVE {
        return [1.0, 0.0, 0.0];
    }
    let p = p - m * ((p - a).dot(m) / length_squared);

    let (x, y, z) = (m.x.abs(), m.y.abs(), m.z.abs());
    let (nu, nv, ood) = if x >= y && x >= z {
        (
            double_triangle_area_2d(p.y, p.z, b.y, b.z, c.y, c.z),
            double_triangle_area_2d(p.y, p.z, c.y, c.z, a.y, a.z),
            1.0 / m.x,
        )
    } else if y >= x && y >= z {
        (
            double_triangle_area_2d(p.x, p.z, b.x, b.z, c.x, c.z),
            double_triangle_area_2d(p.x, p.z, c.x, c.z, a.x, a.z),
            1.0 / -m.y,
        )
    } else {
        (
            double_triangle_area_2d(p.x, p.y, b.x, b.y, c.x, c.y),
            double_triangle_area_2d(p.x, p.y, c.x, c.y, a.x, a.y),
            1.0 / m.z,
        )
    };
    let u = nu * ood;
    let v = nv * ood;
    [u, v, 1.0 - u - v]
}

/// Expands `simplex` (a tetrahedron enclosing the origin) into the Minkowski difference of `a`
/// and `b`. Returns `(on_a, on_b, depth)`: the deepest point of each body and their distance.
///
/// All scratch storage comes from a temporary region of `arena`, released before returning.
/// Running out of arena capacity stops the expansion early with the best face found so far.
pub fn expand(
    a: &Body,
    b: &Body,
    bias: f32,
    simplex: &[GjkPoint; 4],
    arena: &mut MemoryArena<GjkPoint>,
) -> (Vec3, Vec3, f32) {
    let mut temp = arena.begin_temporary();
    let base = temp.first_point() as u32;
    let triangle_base = temp.first_triangle();
    let edge_base = temp.first_edge();
    let scratch: &mut MemoryArena<GjkPoint> = &mut temp;

    let center = simplex.iter().map(|p| p.minkowski).sum::<Vec3>() * 0.25;
    for point in simplex {
        if scratch.points.push(*point).is_err() {
            return (point.on_a, point.on_b, 0.0);
        }
    }

    for i in 0..4u32 {
        let mut triangle = [base + i, base + (i + 1) % 4, base + (i + 2) % 4];
        let unused = simplex[((i + 3) % 4) as usize].minkowski;
        if signed_distance(&scratch.points, &triangle, unused) > 0.0 {
            triangle.swap(0, 1);
        }
        if scratch.triangles.push(triangle).is_err() {
            let point = simplex[0];
            return (point.on_a, point.on_b, 0.0);
        }
    }

    let mut iterations = 0usize;
    loop {
        let triangles = &scratch.triangles[triangle_base..];
        let Some(closest) = closest_triangle(&scratch.points, triangles) else {
            break;
        };
        let closest = triangles[closest];
        let Some(normal) = face_normal(&scratch.points, &closest) else {
            break;
        };

        let candidate = gjk::support(a, b, normal, bias);
        if has_point(&scratch.points, triangles, candidate.minkowski) {
            break;
        }
        if signed_distance(&scratch.points, &closest, candidate.minkowski) <= 0.0 {
            break;
        }

        let Ok(new_index) = scratch.points.push(candidate) else {
            break;
        };
        let new_index = new_index as u32;
        iterations += 1;

        // Drop every face the new point can see.
        let before = scratch.triangles.len();
        let points = &scratch.points;
        scratch.triangles.retain_from(triangle_base, |triangle| {
            signed_distance(points, triangle, candidate.minkowski) <= 0.0
        });
        if scratch.triangles.len() == before {
            break;
        }

        // The hole left behind is bounded by the edges no remaining face shares.
        scratch.edges.truncate(edge_base);
        let remaining = &scratch.triangles[triangle_base..];
        let mut exhausted = false;
        for (i, triangle) in remaining.iter().enumerate() {
            for edge in edges_of(triangle) {
                let shared = remaining
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && edges_of(other).iter().any(|e| same_edge(&edge, e)));
                if !shared && scratch.edges.push(edge).is_err() {
                    exhausted = true;
                }
            }
        }

        for edge_index in edge_base..scratch.edges.len() {
            let edge = scratch.edges[edge_index];
            let mut triangle = [new_index, edge[1], edge[0]];
            if signed_distance(&scratch.points, &triangle, center) > 0.0 {
                triangle.swap(1, 2);
            }
            if scratch.triangles.push(triangle).is_err() {
                exhausted = true;
                break;
            }
        }
        if exhausted {
            warn!(iterations, "epa: arena exhausted, using best face so far");
            break;
        }
    }
    trace!(iterations, "epa: expansion finished");

    let triangles = &scratch.triangles[triangle_base..];
    let Some(closest) = closest_triangle(&scratch.points, triangles) else {
        let point = simplex[0];
        return (point.on_a, point.on_b, (point.on_b - point.on_a).length());
    };
    let [ia, ib, ic] = triangles[closest];
    let (pa, pb, pc) = (
        scratch.points[ia as usize],
        scratch.points[ib as usize],
        scratch.points[ic as usize],
    );
    let [u, v, w] = barycentric_projection(pa.minkowski, pb.minkowski, pc.minkowski, Vec3::ZERO);
    let on_a = pa.on_a * u + pb.on_a * v + pc.on_a * w;
    let on_b = pa.on_b * u + pb.on_b * v + pc.on_b * w;
    (on_a, on_b, (on_b - on_a).length())
}
