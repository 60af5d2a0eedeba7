//! Gilbert-Johnson-Keerthi distance and intersection queries over the Minkowski difference
//! `A - B` of two convex bodies.

use glam::Vec3;
use tracing::trace;

use super::epa;
use super::signed_volumes::{signed_volume_1d, signed_volume_2d, signed_volume_3d};
use crate::physics::body::Body;
use crate::utilities::math_helper::{self, get_ortho};
use crate::utilities::memory::MemoryArena;

/// Squared projected distance under which the origin counts as inside the simplex.
const CONTAINMENT_EPSILON_SQUARED: f32 = 1e-4 * 1e-4;
/// Squared distance under which two support points are the same point.
const DUPLICATE_EPSILON_SQUARED: f32 = 1e-6 * 1e-6;
/// Barycentric weight at or below which a simplex vertex is dropped.
const WEIGHT_EPSILON: f32 = 1e-6;

/// A support point of the Minkowski difference with the witnesses that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GjkPoint {
    pub on_a: Vec3,
    pub on_b: Vec3,
    pub minkowski: Vec3,
}

impl GjkPoint {
    #[inline(always)]
    pub fn new(on_a: Vec3, on_b: Vec3) -> Self {
        Self {
            on_a,
            on_b,
            minkowski: on_a - on_b,
        }
    }
}

/// Support point of `A - B` along `direction`, each shape pushed out by `bias`.
#[inline]
pub fn support(a: &Body, b: &Body, direction: Vec3, bias: f32) -> GjkPoint {
    let direction = math_helper::normalize_or(direction, Vec3::X);
    GjkPoint::new(a.support(direction, bias), b.support(-direction, bias))
}

/// Up to four simplex vertices. Slots past `count` hold stale data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simplex {
    pub points: [GjkPoint; 4],
    pub count: usize,
}

impl Simplex {
    fn single(point: GjkPoint) -> Self {
        let mut points = [GjkPoint::default(); 4];
        points[0] = point;
        Self { points, count: 1 }
    }

    #[inline]
    fn contains(&self, point: &GjkPoint) -> bool {
        self.points[..self.count]
            .iter()
            .any(|p| (p.minkowski - point.minkowski).length_squared() < DUPLICATE_EPSILON_SQUARED)
    }

    #[inline]
    fn push(&mut self, point: GjkPoint) {
        debug_assert!(self.count < 4);
        self.points[self.count] = point;
        self.count += 1;
    }

    /// Projects the origin onto the simplex. Returns the barycentric weights, the new search
    /// direction (from the projection toward the origin), and whether the projection reached
    /// the origin.
    fn project_origin(&self) -> ([f32; 4], Vec3, bool) {
        let p = &self.points;
        let mut weights = [0.0f32; 4];
        match self.count {
            1 => weights[0] = 1.0,
            2 => {
                let [u, v] = signed_volume_1d(p[0].minkowski, p[1].minkowski);
                weights[..2].copy_from_slice(&[u, v]);
            }
            3 => {
                let w = signed_volume_2d(p[0].minkowski, p[1].minkowski, p[2].minkowski);
                weights[..3].copy_from_slice(&w);
            }
            _ => {
                weights = signed_volume_3d(p[0].minkowski, p[1].minkowski, p[2].minkowski, p[3].minkowski);
            }
        }
        let projection: Vec3 = p.iter().zip(weights.iter()).map(|(point, w)| point.minkowski * *w).sum();
        (weights, -projection, projection.length_squared() < CONTAINMENT_EPSILON_SQUARED)
    }

    /// Drops vertices whose weight vanished, keeping the survivors and their weights in order.
    fn retain_weighted(&mut self, weights: &mut [f32; 4]) {
        let mut kept = 0;
        for i in 0..self.count {
            if weights[i].abs() > WEIGHT_EPSILON {
                self.points[kept] = self.points[i];
                weights[kept] = weights[i];
                kept += 1;
            }
        }
        for weight in weights.iter_mut().skip(kept) {
            *weight = 0.0;
        }
        self.count = kept;
    }

    /// Interpolates the witness points by the weights.
    fn witnesses(&self, weights: &[f32; 4]) -> (Vec3, Vec3) {
        let mut on_a = Vec3::ZERO;
        let mut on_b = Vec3::ZERO;
        for (point, weight) in self.points[..self.count].iter().zip(weights.iter()) {
            on_a += point.on_a * *weight;
            on_b += point.on_b * *weight;
        }
        (on_a, on_b)
    }
}

/// Runs GJK until the simplex encloses the origin. On success the simplex is a tetrahedron whose
/// witness points have been pushed out by `bias` away from its centroid, ready for EPA.
pub fn enclosing_simplex(a: &Body, b: &Body, bias: f32) -> Option<Simplex> {
    let mut simplex = Simplex::single(support(a, b, Vec3::Z, 0.0));
    let mut closest_distance = f32::MAX;
    let mut direction = -simplex.points[0].minkowski;
    let mut contains_origin = false;

    loop {
        let point = support(a, b, direction, 0.0);
        if simplex.contains(&point) {
            trace!("gjk: repeated support point, no intersection");
            break;
        }
        simplex.push(point);

        if direction.dot(point.minkowski) < 0.0 {
            trace!("gjk: support point short of origin, no intersection");
            break;
        }

        let (mut weights, new_direction, reached) = simplex.project_origin();
        direction = new_direction;
        if reached {
            contains_origin = true;
            break;
        }

        let distance = direction.length_squared();
        if distance >= closest_distance {
            trace!("gjk: no progress, no intersection");
            break;
        }
        closest_distance = distance;

        simplex.retain_weighted(&mut weights);
        if simplex.count == 4 {
            contains_origin = true;
            break;
        }
    }

    if !contains_origin {
        return None;
    }

    pad_to_tetrahedron(a, b, &mut simplex);

    let center = simplex.points.iter().map(|p| p.minkowski).sum::<Vec3>() * 0.25;
    for point in simplex.points.iter_mut() {
        let outward = math_helper::normalize_or(point.minkowski - center, Vec3::ZERO);
        point.on_a += outward * bias;
        point.on_b -= outward * bias;
        point.minkowski = point.on_a - point.on_b;
    }
    Some(simplex)
}

/// Grows a 1-, 2- or 3-point simplex into a tetrahedron with extra support queries.
fn pad_to_tetrahedron(a: &Body, b: &Body, simplex: &mut Simplex) {
    if simplex.count == 1 {
        let direction = math_helper::normalize_or(-simplex.points[0].minkowski, Vec3::X);
        let mut point = support(a, b, direction, 0.0);
        if simplex.contains(&point) {
            point = support(a, b, -direction, 0.0);
        }
        simplex.push(point);
    }
    if simplex.count == 2 {
        let ab = simplex.points[1].minkowski - simplex.points[0].minkowski;
        let (u, _) = get_ortho(math_helper::normalize_or(ab, Vec3::X));
        let mut point = support(a, b, u, 0.0);
        if simplex.contains(&point) {
            point = support(a, b, -u, 0.0);
        }
        simplex.push(point);
    }
    if simplex.count == 3 {
        let [p0, p1, p2, _] = simplex.points;
        let normal = (p1.minkowski - p0.minkowski).cross(p2.minkowski - p1.minkowski);
        let mut point = support(a, b, normal, 0.0);
        // Touching contact: the origin lies on the triangle, so search the other side too.
        if normal.dot(point.minkowski - p0.minkowski).abs() < 1e-6 {
            point = support(a, b, -normal, 0.0);
        }
        simplex.push(point);
    }
}

/// Tests two bodies for intersection. On a hit, returns the deepest points of each body inside
/// the other (`(on_a, on_b)`), found by expanding the enclosing simplex with EPA in `arena`.
pub fn does_intersect(
    a: &Body,
    b: &Body,
    bias: f32,
    arena: &mut MemoryArena<GjkPoint>,
) -> Option<(Vec3, Vec3)> {
    let simplex = enclosing_simplex(a, b, bias)?;
    let (on_a, on_b, _depth) = epa::expand(a, b, bias, &simplex.points, arena);
    Some((on_a, on_b))
}

/// Closest points between two separated bodies, as `(on_a, on_b)`.
pub fn closest_points(a: &Body, b: &Body) -> (Vec3, Vec3) {
    let mut simplex = Simplex::single(support(a, b, Vec3::ONE, 0.0));
    let mut weights = [1.0, 0.0, 0.0, 0.0];
    let mut closest_distance = f32::MAX;
    let mut direction = -simplex.points[0].minkowski;

    while simplex.count < 4 {
        let point = support(a, b, direction, 0.0);
        if simplex.contains(&point) {
            break;
        }
        simplex.push(point);

        let (mut new_weights, new_direction, _) = simplex.project_origin();
        simplex.retain_weighted(&mut new_weights);
        weights = new_weights;
        direction = new_direction;

        let distance = direction.length_squared();
        if distance >= closest_distance {
            break;
        }
        closest_distance = distance;
    }

    simplex.witnesses(&weights)
}
