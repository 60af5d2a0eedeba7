//! Exact contact generation for broad phase pairs, with conservative advancement for
//! continuous collision.

use glam::Vec3;
use tracing::trace;

use super::contact::Contact;
use super::gjk::{self, GjkPoint};
use crate::physics::body::Body;
use crate::physics::collidables::ShapeKind;
use crate::physics::handles::BodyHandle;
use crate::utilities::math_helper;
use crate::utilities::memory::{ArenaCapacity, MemoryArena};

/// Relative motion below this is treated as a static overlap test in the sphere sweep.
const MIN_SWEEP_LENGTH_SQUARED: f32 = 0.001 * 0.001;
/// Slack added to the combined radius of swept spheres.
const SWEEP_PADDING: f32 = 0.001;

/// A body paired with its handle.
pub type BodyRef<'a> = (BodyHandle, &'a Body);

/// Generates contacts between body pairs. Owns the scratch arena used by EPA.
#[derive(Debug)]
pub struct NarrowPhase {
    arena: MemoryArena<GjkPoint>,
    bias: f32,
    max_ccd_iterations: usize,
}

impl NarrowPhase {
    pub fn new(arena_capacity: ArenaCapacity, bias: f32, max_ccd_iterations: usize) -> Self {
        Self {
            arena: MemoryArena::new(arena_capacity),
            bias,
            max_ccd_iterations,
        }
    }

    #[inline(always)]
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Tests the bodies at their current poses. The returned contact has `time_of_impact == 0`.
    pub fn intersect(&mut self, a: BodyRef<'_>, b: BodyRef<'_>) -> Option<Contact> {
        match (a.1.shape().kind(), b.1.shape().kind()) {
            (ShapeKind::Sphere, ShapeKind::Sphere) => sphere_sphere(a, b),
            _ => self.convex_convex(a, b),
        }
    }

    /// GJK for the overlap test, EPA for the depth.
    fn convex_convex(&mut self, a: BodyRef<'_>, b: BodyRef<'_>) -> Option<Contact> {
        let (_, body_a) = a;
        let (_, body_b) = b;
        let (on_a, on_b) = gjk::does_intersect(body_a, body_b, self.bias, &mut self.arena)?;
        let depth = on_a.distance(on_b);
        let fallback = math_helper::normalize_or(body_b.center_of_mass_world() - body_a.center_of_mass_world(), Vec3::Y);
        let normal = math_helper::normalize_or(on_a - on_b, fallback);
        let on_a = on_sphere_surface(body_a, on_a, normal);
        let on_b = on_sphere_surface(body_b, on_b, -normal);
        Some(Contact::from_world_points(a, b, on_a, on_b, normal, -depth, 0.0))
    }

    /// Finds the first contact within `dt` by conservative advancement. The bodies are advanced
    /// on private copies; the originals are never moved.
    pub fn intersect_dynamic(&mut self, a: BodyRef<'_>, b: BodyRef<'_>, dt: f32) -> Option<Contact> {
        match (a.1.shape().kind(), b.1.shape().kind()) {
            (ShapeKind::Sphere, ShapeKind::Sphere) => swept_sphere_sphere(a, b, dt),
            _ => self.conservative_advancement(a, b, dt),
        }
    }

    /// Steps private copies of the bodies toward each other by the time their closest points
    /// need to meet, until they touch or the step runs out.
    fn conservative_advancement(&mut self, a: BodyRef<'_>, b: BodyRef<'_>, dt: f32) -> Option<Contact> {
        let (handle_a, body_a) = a;
        let (handle_b, body_b) = b;
        let mut moving_a = body_a.clone();
        let mut moving_b = body_b.clone();
        let mut time_of_impact = 0.0;
        let mut remaining = dt;
        let mut iterations = 0;

        while remaining > 0.0 {
            if let Some(contact) = self.intersect((handle_a, &moving_a), (handle_b, &moving_b)) {
                return Some(Contact {
                    time_of_impact,
                    ..contact
                });
            }

            iterations += 1;
            if iterations > self.max_ccd_iterations {
                trace!(%handle_a, %handle_b, "ccd: iteration limit reached");
                break;
            }

            let (on_a, on_b) = gjk::closest_points(&moving_a, &moving_b);
            let separation = on_a.distance(on_b);
            let axis = math_helper::normalize_or(on_b - on_a, Vec3::ZERO);
            if axis == Vec3::ZERO {
                break;
            }

            let closing_speed = (moving_a.velocity.linear - moving_b.velocity.linear).dot(axis)
                + moving_a.fastest_linear_speed(axis)
                + moving_b.fastest_linear_speed(-axis);
            if closing_speed <= 0.0 {
                break;
            }

            let time_to_go = separation / closing_speed;
            if time_to_go > remaining {
                break;
            }

            remaining -= time_to_go;
            time_of_impact += time_to_go;
            moving_a.update(time_to_go);
            moving_b.update(time_to_go);
        }

        None
    }
}

/// Analytic overlap of two spheres.
/// Moves a sphere's witness point onto its surface along `direction`, so the normal passes
/// through its center. Other shapes keep `point`.
fn on_sphere_surface(body: &Body, point: Vec3, direction: Vec3) -> Vec3 {
    match body.shape().as_sphere() {
        Some(sphere) => body.position() + direction * sphere.radius,
        None => point,
    }
}

fn sphere_sphere(a: BodyRef<'_>, b: BodyRef<'_>) -> Option<Contact> {
    let (_, body_a) = a;
    let (_, body_b) = b;
    let (sphere_a, sphere_b) = (body_a.shape().as_sphere()?, body_b.shape().as_sphere()?);
    let offset = body_b.position() - body_a.position();
    let radii = sphere_a.radius + sphere_b.radius;
    if offset.length_squared() > radii * radii {
        return None;
    }
    let normal = math_helper::normalize_or(offset, Vec3::Y);
    let on_a = body_a.position() + normal * sphere_a.radius;
    let on_b = body_b.position() - normal * sphere_b.radius;
    Some(Contact::from_world_points(a, b, on_a, on_b, normal, offset.length() - radii, 0.0))
}

/// Analytic sweep of two linearly moving spheres, reported at the poses they touch.
fn swept_sphere_sphere(a: BodyRef<'_>, b: BodyRef<'_>, dt: f32) -> Option<Contact> {
    let (handle_a, body_a) = a;
    let (handle_b, body_b) = b;
    let (sphere_a, sphere_b) = (body_a.shape().as_sphere()?, body_b.shape().as_sphere()?);
    let (on_a, on_b, time_of_impact) = sphere_sweep(
        body_a.position(),
        body_a.velocity.linear,
        sphere_a.radius,
        body_b.position(),
        body_b.velocity.linear,
        sphere_b.radius,
        dt,
    )?;
    let normal = math_helper::normalize_or(on_b - on_a, Vec3::Y);
    let moved_a = advanced(body_a, time_of_impact);
    let moved_b = advanced(body_b, time_of_impact);
    let radii = sphere_a.radius + sphere_b.radius;
    let separation = moved_a.position().distance(moved_b.position()) - radii;
    Some(Contact::from_world_points(
        (handle_a, &moved_a),
        (handle_b, &moved_b),
        on_a,
        on_b,
        normal,
        separation.min(0.0),
        time_of_impact,
    ))
}

fn advanced(body: &Body, dt: f32) -> Body {
    let mut copy = body.clone();
    copy.update(dt);
    copy
}

/// Parameters `(t0, t1)` at which the ray `start + t * direction` enters and leaves the sphere.
pub fn ray_sphere(start: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<(f32, f32)> {
    let m = center - start;
    let a = direction.dot(direction);
    let b = m.dot(direction);
    let c = m.dot(m) - radius * radius;

    let discriminant = b * b - a * c;
    if discriminant < 0.0 || a == 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let inverse_a = 1.0 / a;
    Some(((b - root) * inverse_a, (b + root) * inverse_a))
}

/// Analytic sweep of two linearly moving spheres over `dt`. Returns the touching points on each
/// sphere and the time they touch.
pub fn sphere_sweep(
    position_a: Vec3,
    velocity_a: Vec3,
    radius_a: f32,
    position_b: Vec3,
    velocity_b: Vec3,
    radius_b: f32,
    dt: f32,
) -> Option<(Vec3, Vec3, f32)> {
    let sweep = (velocity_a - velocity_b) * dt;
    let radius = radius_a + radius_b + SWEEP_PADDING;

    let (t0, t1) = if sweep.length_squared() < MIN_SWEEP_LENGTH_SQUARED {
        if position_a.distance_squared(position_b) > radius * radius {
            return None;
        }
        (0.0, 0.0)
    } else {
        let (t0, t1) = ray_sphere(position_a, sweep, position_b, radius)?;
        (t0 * dt, t1 * dt)
    };

    if t1 < 0.0 {
        return None;
    }
    let time_of_impact = t0.max(0.0);
    if time_of_impact > dt {
        return None;
    }

    let new_a = position_a + velocity_a * time_of_impact;
    let new_b = position_b + velocity_b * time_of_impact;
    let normal = math_helper::normalize_or(new_b - new_a, Vec3::Y);
    Some((new_a + normal * radius_a, new_b - normal * radius_b, time_of_impact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use crate::physics::body_properties::{BodyVelocity, RigidPose};
    use crate::physics::collidables::{Cuboid, Shape, Sphere};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn narrow_phase() -> NarrowPhase {
        NarrowPhase::new(ArenaCapacity::default(), 0.001, 10)
    }

    fn body(position: Vec3, shape: Shape, velocity: Vec3) -> Body {
        Body::new(
            &BodyDescription::create_dynamic(RigidPose::from_position(position), Arc::new(shape), 1.0)
                .with_velocity(BodyVelocity::new(velocity, Vec3::ZERO)),
        )
    }

    fn cube(position: Vec3, velocity: Vec3) -> Body {
        body(position, Shape::from(Cuboid::new(Vec3::splat(0.5)).unwrap()), velocity)
    }

    #[test]
    fn test_ray_sphere_entry_and_exit() {
        let (t0, t1) = ray_sphere(Vec3::ZERO, Vec3::X, Vec3::new(5.0, 0.0, 0.0), 1.0).unwrap();
        assert_abs_diff_eq!(t0, 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(t1, 6.0, epsilon = 1e-5);
        assert!(ray_sphere(Vec3::ZERO, Vec3::Y, Vec3::new(5.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_sphere_sweep_finds_time_of_impact() {
        let (on_a, on_b, toi) =
            sphere_sweep(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), 0.5, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 0.5, 0.1)
                .unwrap();
        // Centers 5 apart, touching at 1 + padding, closing at 100 units per second.
        assert_abs_diff_eq!(toi, (4.0 - SWEEP_PADDING) / 100.0, epsilon = 1e-5);
        assert_abs_diff_eq!(on_b.x - on_a.x, SWEEP_PADDING, epsilon = 1e-4);
        assert!(sphere_sweep(Vec3::ZERO, Vec3::X, 0.5, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 0.5, 0.1).is_none());
    }

    #[test]
    fn test_overlapping_spheres_contact() {
        let mut narrow_phase = narrow_phase();
        let a = body(Vec3::ZERO, Shape::from(Sphere::new(1.0)), Vec3::ZERO);
        let b = body(Vec3::new(1.5, 0.0, 0.0), Shape::from(Sphere::new(1.0)), Vec3::ZERO);
        let contact = narrow_phase.intersect((BodyHandle(0), &a), (BodyHandle(1), &b)).unwrap();
        assert_abs_diff_eq!(contact.separation, -0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(contact.normal.x, 1.0, epsilon = 1e-5);
        assert_eq!(contact.time_of_impact, 0.0);
    }

    #[test]
    fn test_overlapping_cubes_contact_normal_points_from_a_to_b() {
        let mut narrow_phase = narrow_phase();
        let a = cube(Vec3::ZERO, Vec3::ZERO);
        let b = cube(Vec3::new(0.0, 0.9, 0.0), Vec3::ZERO);
        let contact = narrow_phase.intersect((BodyHandle(0), &a), (BodyHandle(1), &b)).unwrap();
        assert!(contact.normal.y > 0.99);
        assert_abs_diff_eq!(contact.separation, -0.1, epsilon = 0.01);
        assert_eq!(contact.local_point_on_b, b.world_to_local(contact.world_point_on_b));
    }

    #[test]
    fn test_fast_cube_is_caught_by_conservative_advancement() {
        let mut narrow_phase = narrow_phase();
        let bullet = cube(Vec3::ZERO, Vec3::new(300.0, 0.0, 0.0));
        let wall = cube(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO);
        let dt = 1.0 / 60.0;
        assert!(narrow_phase.intersect((BodyHandle(0), &bullet), (BodyHandle(1), &wall)).is_none());

        let contact = narrow_phase
            .intersect_dynamic((BodyHandle(0), &bullet), (BodyHandle(1), &wall), dt)
            .unwrap();
        // The gap of 2 closes at 300 units per second.
        assert_abs_diff_eq!(contact.time_of_impact, 2.0 / 300.0, epsilon = 1e-3);
        assert!(contact.normal.x > 0.9);
        assert_eq!(bullet.position(), Vec3::ZERO);
    }

    #[test]
    fn test_receding_bodies_have_no_impact() {
        let mut narrow_phase = narrow_phase();
        let a = cube(Vec3::ZERO, Vec3::new(-10.0, 0.0, 0.0));
        let b = cube(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO);
        assert!(narrow_phase.intersect_dynamic((BodyHandle(0), &a), (BodyHandle(1), &b), 0.1).is_none());
    }

    #[test]
    fn test_sphere_on_cube_contact_points_at_its_center() {
        let mut narrow_phase = narrow_phase();
        let ground = cube(Vec3::ZERO, Vec3::ZERO);
        let mut ball = body(Vec3::new(0.2, 0.99, -0.1), Shape::from(Sphere::new(0.5)), Vec3::ZERO);
        ball.pose.orientation = glam::Quat::from_rotation_x(1.1);
        let contact = narrow_phase.intersect((BodyHandle(0), &ground), (BodyHandle(1), &ball)).unwrap();
        assert!(contact.normal.y > 0.99);
        assert_abs_diff_eq!(contact.separation, -0.01, epsilon = 0.005);
        let lever = contact.world_point_on_b - ball.position();
        assert_abs_diff_eq!(lever.length(), 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(lever.cross(contact.normal).length(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_coincident_cubes_overlap_by_a_full_width() {
        let mut narrow_phase = narrow_phase();
        let a = cube(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);
        let b = cube(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);
        let contact = narrow_phase.intersect((BodyHandle(0), &a), (BodyHandle(1), &b)).unwrap();
        assert_abs_diff_eq!(contact.separation, -1.0, epsilon = 0.01);
        assert_abs_diff_eq!(contact.normal.length(), 1.0, epsilon = 1e-5);
        assert!(contact.normal.abs().max_element() > 0.99);
    }

    #[test]
    fn test_face_touching_cubes_report_contact() {
        let mut narrow_phase = narrow_phase();
        for axis in [Vec3::X, Vec3::Y, Vec3::NEG_Z] {
            let a = cube(Vec3::ZERO, Vec3::ZERO);
            let b = cube(axis, Vec3::ZERO);
            let contact = narrow_phase.intersect((BodyHandle(0), &a), (BodyHandle(1), &b)).unwrap();
            assert_abs_diff_eq!(contact.separation, 0.0, epsilon = 0.005);
            assert!(contact.normal.dot(axis) > 0.99, "normal {} for {}", contact.normal, axis);
        }
    }
}
