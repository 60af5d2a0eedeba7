//! Projection of the origin onto 1-, 2- and 3-simplices, returned as barycentric weights.
//!
//! The line and triangle cases pick the axis (or coordinate plane) with the largest projected
//! extent before dividing, so near-degenerate simplices never divide by a vanishing length or
//! area along a poorly chosen axis.

use glam::{Vec2, Vec3};

use crate::utilities::math_helper::DEGENERATE_LENGTH_SQUARED;

#[inline(always)]
fn same_sign(a: f32, b: f32) -> bool {
    (a > 0.0 && b > 0.0) || (a < 0.0 && b < 0.0)
}

#[inline(always)]
fn cross_2d(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Weights `(wa, wb)` of the point on segment `ab` closest to the origin.
pub fn signed_volume_1d(a: Vec3, b: Vec3) -> [f32; 2] {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared < DEGENERATE_LENGTH_SQUARED {
        return [1.0, 0.0];
    }
    let projection = a + ab * (-a).dot(ab) / length_squared;

    // Measure along the axis where the segment is longest.
    let mut axis = 0;
    let mut extent = ab.x;
    for i in 1..3 {
        if ab[i] * ab[i] > extent * extent {
            axis = i;
            extent = ab[i];
        }
    }

    let (sa, sb, p) = (a[axis], b[axis], projection[axis]);
    if (p > sa && p < sb) || (p > sb && p < sa) {
        return [(sb - p) / extent, (p - sa) / extent];
    }
    if (sa <= sb && p <= sa) || (sa >= sb && p >= sa) {
        [1.0, 0.0]
    } else {
        [0.0, 1.0]
    }
}

/// Clamped segment projection without the axis selection, used for triangle edges.
#[inline]
fn closest_on_segment(a: Vec3, b: Vec3) -> [f32; 2] {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared < DEGENERATE_LENGTH_SQUARED {
        return [1.0, 0.0];
    }
    let t = ((-a).dot(ab) / length_squared).clamp(0.0, 1.0);
    [1.0 - t, t]
}

/// Weights `(wa, wb, wc)` of the point on triangle `abc` closest to the origin.
pub fn signed_volume_2d(a: Vec3, b: Vec3, c: Vec3) -> [f32; 3] {
    let normal = (b - a).cross(c - a);
    let normal_length_squared = normal.length_squared();

    if normal_length_squared > DEGENERATE_LENGTH_SQUARED {
        let projection = normal * (a.dot(normal) / normal_length_squared);

        // Coordinate plane with the largest projected area.
        let mut plane = 0;
        let mut max_area = 0.0f32;
        for i in 0..3 {
            let (j, k) = ((i + 1) % 3, (i + 2) % 3);
            let pa = Vec2::new(a[j], a[k]);
            let area = cross_2d(Vec2::new(b[j], b[k]) - pa, Vec2::new(c[j], c[k]) - pa);
            if area * area > max_area * max_area {
                plane = i;
                max_area = area;
            }
        }

        let (x, y) = ((plane + 1) % 3, (plane + 2) % 3);
        let vertices = [Vec2::new(a[x], a[y]), Vec2::new(b[x], b[y]), Vec2::new(c[x], c[y])];
        let p = Vec2::new(projection[x], projection[y]);
        let mut areas = [0.0f32; 3];
        for i in 0..3 {
            let (j, k) = ((i + 1) % 3, (i + 2) % 3);
            areas[i] = cross_2d(vertices[j] - p, vertices[k] - p);
        }

        if areas.iter().all(|&area| same_sign(max_area, area)) {
            return areas.map(|area| area / max_area);
        }
    }

    // Outside (or degenerate): best of the three edges.
    let vertices = [a, b, c];
    let mut best = [1.0, 0.0, 0.0];
    let mut best_distance = f32::MAX;
    for i in 0..3 {
        let (k, l) = ((i + 1) % 3, (i + 2) % 3);
        let edge = closest_on_segment(vertices[k], vertices[l]);
        let point = vertices[k] * edge[0] + vertices[l] * edge[1];
        let distance = point.length_squared();
        if distance < best_distance {
            best_distance = distance;
            best = [0.0; 3];
            best[k] = edge[0];
            best[l] = edge[1];
        }
    }
    best
}

/// Region-based closest point on triangle `abc` to the origin, as weights.
pub fn closest_on_triangle(a: Vec3, b: Vec3, c: Vec3) -> [f32; 3] {
    let ab = b - a;
    let ac = c - a;
    let ap = -a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return [1.0, 0.0, 0.0];
    }

    let bp = -b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return [0.0, 1.0, 0.0];
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return [1.0 - t, t, 0.0];
    }

    let cp = -c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return [0.0, 0.0, 1.0];
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return [1.0 - t, 0.0, t];
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return [0.0, 1.0 - t, t];
    }

    let denominator = va + vb + vc;
    if denominator.abs() < f32::MIN_POSITIVE {
        return [1.0, 0.0, 0.0];
    }
    let v = vb / denominator;
    let w = vc / denominator;
    [1.0 - v - w, v, w]
}

/// Weights `(wa, wb, wc, wd)` of the point in tetrahedron `abcd` closest to the origin.
///
/// If every sub-volume shares the sign of the full volume, the origin is inside and the weights
/// are the normalized sub-volumes. Otherwise the origin is projected onto the nearest face.
pub fn signed_volume_3d(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> [f32; 4] {
    // Cofactors of the last row of [a b c d; 1 1 1 1]: volumes with the origin swapped in.
    let cofactors = [
        -b.dot(c.cross(d)),
        a.dot(c.cross(d)),
        -a.dot(b.cross(d)),
        a.dot(b.cross(c)),
    ];
    let determinant: f32 = cofactors.iter().sum();

    if determinant.abs() > f32::EPSILON && cofactors.iter().all(|&v| same_sign(determinant, v)) {
        let inverse = 1.0 / determinant;
        let u = cofactors[0] * inverse;
        let v = cofactors[1] * inverse;
        let w = cofactors[2] * inverse;
        return [u, v, w, 1.0 - u - v - w];
    }

    let vertices = [a, b, c, d];
    let mut best = [0.0f32; 4];
    let mut best_distance = f32::MAX;
    for i in 0..4 {
        let (j, k) = ((i + 1) % 4, (i + 2) % 4);
        let face = closest_on_triangle(vertices[i], vertices[j], vertices[k]);
        let point = vertices[i] * face[0] + vertices[j] * face[1] + vertices[k] * face[2];
        let distance = point.length_squared();
        if distance < best_distance {
            best_distance = distance;
            best = [0.0; 4];
            best[i] = face[0];
            best[j] = face[1];
            best[k] = face[2];
        }
    }
    best
}
