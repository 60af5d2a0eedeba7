use glam::Vec3;

use super::constraint_base::{JacobianRows, JointFrame};
use super::Constraint;
use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;

/// Keeps two anchor points at a fixed distance, through the squared distance
/// `C = |p_b - p_a|^2 - L^2`.
#[derive(Debug, Clone)]
pub struct DistanceConstraint {
    pub frame: JointFrame,
    pub rest_length: f32,
    rows: JacobianRows<1>,
}

impl DistanceConstraint {
    pub const BETA: f32 = 0.05;
    /// Squared-distance error tolerated before any positional correction.
    pub const SLOP: f32 = 0.01;

    /// Joins `anchor_a` on A to `anchor_b` on B at their current separation.
    pub fn new(a: (BodyHandle, &Body), b: (BodyHandle, &Body), anchor_a: Vec3, anchor_b: Vec3) -> Self {
        let mut frame = JointFrame::new(a, b, anchor_a, Vec3::X);
        frame.local_anchor_b = b.1.world_to_local(anchor_b);
        Self {
            frame,
            rest_length: anchor_a.distance(anchor_b),
            rows: JacobianRows::default(),
        }
    }

    #[inline(always)]
    pub fn accumulated_impulse(&self) -> f32 {
        self.rows.accumulated[0]
    }
}

impl Constraint for DistanceConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.frame.a, self.frame.b)
    }

    fn pre_solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings, dt: f32) {
        self.rows.begin(settings);
        let (anchor_a, anchor_b) = self.frame.world_anchors(a, b);
        let d = anchor_b - anchor_a;
        let offset_a = anchor_a - a.center_of_mass_world();
        let offset_b = anchor_b - b.center_of_mass_world();

        self.rows.set_row(
            0,
            -2.0 * d,
            -2.0 * offset_a.cross(d),
            2.0 * d,
            2.0 * offset_b.cross(d),
        );
        self.rows.warm_start(a, b, settings);

        let error = d.length_squared() - self.rest_length * self.rest_length;
        let error = if error.abs() <= Self::SLOP {
            0.0
        } else {
            error - Self::SLOP.copysign(error)
        };
        self.rows.set_baumgarte(0, Self::BETA, dt, error);
    }

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        self.rows.solve(a, b, settings);
    }

    fn post_solve(&mut self, settings: &SolverSettings) {
        self.rows.clamp_accumulated(1, settings.warm_start_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use crate::physics::body_properties::{BodyVelocity, RigidPose};
    use crate::physics::collidables::{Shape, Sphere};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn sphere(position: Vec3, velocity: Vec3) -> Body {
        Body::new(
            &BodyDescription::create_dynamic(
                RigidPose::from_position(position),
                Arc::new(Shape::from(Sphere::new(0.5))),
                1.0,
            )
            .with_velocity(BodyVelocity::new(velocity, Vec3::ZERO)),
        )
    }

    #[test]
    fn test_stretching_velocity_is_removed() {
        let settings = SolverSettings::default();
        let mut a = sphere(Vec3::ZERO, Vec3::ZERO);
        let mut b = sphere(Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 0.0));
        let mut constraint = DistanceConstraint::new(
            (BodyHandle(0), &a),
            (BodyHandle(1), &b),
            a.position(),
            b.position(),
        );
        assert_abs_diff_eq!(constraint.rest_length, 2.0);

        constraint.pre_solve(&mut a, &mut b, &settings, 1.0 / 60.0);
        constraint.solve(&mut a, &mut b, &settings);
        constraint.post_solve(&settings);

        // Separation along the rod stops; the sideways motion is untouched.
        let relative = b.velocity.linear - a.velocity.linear;
        assert_abs_diff_eq!(relative.x, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(relative.y, 1.0, epsilon = 1e-4);
        // Momentum is conserved.
        assert_abs_diff_eq!((a.velocity.linear + b.velocity.linear).x, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_second_solve_is_a_fixed_point() {
        let settings = SolverSettings::default();
        let mut a = sphere(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0));
        let mut b = sphere(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.5, 2.0, 0.0));
        let mut constraint = DistanceConstraint::new((BodyHandle(0), &a), (BodyHandle(1), &b), Vec3::ZERO, b.position());
        constraint.pre_solve(&mut a, &mut b, &settings, 1.0 / 60.0);
        constraint.solve(&mut a, &mut b, &settings);
        let first = constraint.accumulated_impulse();
        constraint.solve(&mut a, &mut b, &settings);
        assert_abs_diff_eq!(constraint.accumulated_impulse(), first, epsilon = 1e-4);
    }
}
