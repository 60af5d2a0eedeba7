use glam::Vec3;

use super::constraint_base::{apply_impulses, JacobianRows};
use super::Constraint;
use crate::physics::body::Body;
use crate::physics::collision_detection::Contact;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;
use crate::utilities::linear_equations_solver::{lcp_gauss_seidel, unbounded};
use crate::utilities::math_helper;

/// Non-penetration and Coulomb friction for one cached contact point.
///
/// Row 0 pushes along the contact normal; rows 1 and 2 resist sliding along two tangents. The
/// accumulated normal impulse stays non-negative and each friction impulse stays within
/// `friction * normal`.
#[derive(Debug, Clone)]
pub struct PenetrationConstraint {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub local_point_a: Vec3,
    pub local_point_b: Vec3,
    /// Contact normal in A's local frame, pointing from A toward B.
    pub local_normal: Vec3,
    friction: f32,
    rows: JacobianRows<3>,
}

impl PenetrationConstraint {
    pub const BETA: f32 = 0.25;
    /// Penetration tolerated before Baumgarte correction kicks in.
    pub const SLOP: f32 = 0.02;
    /// Approach speed below which contacts do not bounce.
    pub const RESTITUTION_THRESHOLD: f32 = 1.0;

    pub fn new(contact: &Contact, body_a: &Body, body_b: &Body) -> Self {
        Self {
            a: contact.a,
            b: contact.b,
            local_point_a: contact.local_point_on_a,
            local_point_b: contact.local_point_on_b,
            local_normal: body_a.orientation().conjugate() * contact.normal,
            friction: body_a.friction * body_b.friction,
            rows: JacobianRows::default(),
        }
    }

    /// Moves the constraint onto a freshly found contact at nearly the same place, keeping the
    /// accumulated impulses for warm starting.
    pub fn refresh(&mut self, contact: &Contact, body_a: &Body) {
        debug_assert!(contact.a == self.a && contact.b == self.b);
        self.local_point_a = contact.local_point_on_a;
        self.local_point_b = contact.local_point_on_b;
        self.local_normal = body_a.orientation().conjugate() * contact.normal;
    }

    /// Accumulated normal impulse.
    #[inline(always)]
    pub fn normal_impulse(&self) -> f32 {
        self.rows.accumulated[0]
    }

    /// Accumulated friction impulses along the two tangents.
    #[inline(always)]
    pub fn friction_impulse(&self) -> (f32, f32) {
        (self.rows.accumulated[1], self.rows.accumulated[2])
    }

    #[inline(always)]
    pub fn friction(&self) -> f32 {
        self.friction
    }
}

impl Constraint for PenetrationConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.a, self.b)
    }

    fn pre_solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings, dt: f32) {
        self.rows.begin(settings);
        let point_a = a.local_to_world(self.local_point_a);
        let point_b = b.local_to_world(self.local_point_b);
        let normal = math_helper::normalize_or(a.orientation() * self.local_normal, Vec3::Y);
        let offset_a = point_a - a.center_of_mass_world();
        let offset_b = point_b - b.center_of_mass_world();
        let (u, v) = math_helper::get_ortho(normal);

        for (row, direction) in [normal, u, v].into_iter().enumerate() {
            self.rows
                .set_row(row, -direction, -offset_a.cross(direction), direction, offset_b.cross(direction));
        }

        // Restitution targets a fraction of the approach speed seen before warm starting.
        let approach = (a.velocity_at_point(point_a) - b.velocity_at_point(point_b)).dot(normal);
        let restitution = a.restitution * b.restitution;
        self.rows.warm_start(a, b, settings);

        let error = ((point_b - point_a).dot(normal) + Self::SLOP).min(0.0);
        self.rows.set_baumgarte(0, Self::BETA, dt, error);
        if approach > Self::RESTITUTION_THRESHOLD {
            self.rows.bias[0] += restitution * approach;
        }
    }

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        let (effective_mass, rhs) = self.rows.system(a, b);
        let (lower, upper) = unbounded::<3>();
        let lambda = lcp_gauss_seidel(&effective_mass, &rhs, &lower, &upper, settings.gauss_seidel_iterations);

        let previous = self.rows.accumulated;
        let mut accumulated = previous + lambda;
        accumulated[0] = accumulated[0].max(0.0);
        let limit = accumulated[0] * self.friction;
        accumulated[1] = accumulated[1].clamp(-limit, limit);
        accumulated[2] = accumulated[2].clamp(-limit, limit);
        self.rows.accumulated = accumulated;

        let delta = accumulated - previous;
        let impulses = self.rows.jacobian.mul_transposed_vector(&delta);
        apply_impulses(a, b, &impulses);
    }

    fn post_solve(&mut self, settings: &SolverSettings) {
        self.rows.clamp_accumulated(3, settings.warm_start_limit);
    }
}
