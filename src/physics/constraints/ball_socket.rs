use glam::Vec3;

use super::constraint_base::{JacobianRows, JointFrame};
use super::Constraint;
use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;

/// Constrains a point on one body to a point on another body.
#[derive(Debug, Clone)]
pub struct BallSocketConstraint {
    pub frame: JointFrame,
    rows: JacobianRows<3>,
}

impl BallSocketConstraint {
    pub const BETA: f32 = 0.2;

    /// Pins both bodies together at a world-space point.
    pub fn new(a: (BodyHandle, &Body), b: (BodyHandle, &Body), world_anchor: Vec3) -> Self {
        Self {
            frame: JointFrame::new(a, b, world_anchor, Vec3::X),
            rows: JacobianRows::default(),
        }
    }

    /// Accumulated impulse per world axis.
    pub fn accumulated_impulse(&self) -> Vec3 {
        self.rows.accumulated.vec3(0)
    }
}

impl Constraint for BallSocketConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.frame.a, self.frame.b)
    }

    fn pre_solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings, dt: f32) {
        self.rows.begin(settings);
        let (anchor_a, anchor_b) = self.frame.world_anchors(a, b);
        self.rows.set_point_rows(
            0,
            anchor_a - a.center_of_mass_world(),
            anchor_b - b.center_of_mass_world(),
        );
        self.rows.warm_start(a, b, settings);

        let error = anchor_b - anchor_a;
        for (row, component) in error.to_array().into_iter().enumerate() {
            self.rows.set_baumgarte(row, Self::BETA, dt, component);
        }
    }

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        self.rows.solve(a, b, settings);
    }

    fn post_solve(&mut self, settings: &SolverSettings) {
        self.rows.clamp_accumulated(3, settings.warm_start_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use crate::physics::body_properties::{BodyVelocity, RigidPose};
    use crate::physics::collidables::{Cuboid, Shape};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn cube(position: Vec3, mass: f32) -> Body {
        let description = BodyDescription::create_dynamic(
            RigidPose::from_position(position),
            Arc::new(Shape::from(Cuboid::new(Vec3::splat(0.5)).unwrap())),
            mass,
        );
        Body::new(&description)
    }

    #[test]
    fn test_anchor_velocities_match_after_solve() {
        let settings = SolverSettings::default();
        let mut anchor = cube(Vec3::ZERO, 0.0);
        let mut pendulum = cube(Vec3::new(0.0, -2.0, 0.0), 1.0);
        pendulum.velocity = BodyVelocity::new(Vec3::new(1.0, -3.0, 0.5), Vec3::new(0.0, 0.0, 2.0));
        let mut joint = BallSocketConstraint::new((BodyHandle(0), &anchor), (BodyHandle(1), &pendulum), Vec3::ZERO);

        joint.pre_solve(&mut anchor, &mut pendulum, &settings, 1.0 / 60.0);
        joint.solve(&mut anchor, &mut pendulum, &settings);

        let pivot_velocity = pendulum.velocity_at_point(Vec3::ZERO);
        assert_abs_diff_eq!(pivot_velocity.length(), 0.0, epsilon = 1e-3);
        assert_eq!(anchor.velocity.linear, Vec3::ZERO);
    }

    #[test]
    fn test_drift_is_pulled_back() {
        let settings = SolverSettings::default();
        let mut a = cube(Vec3::ZERO, 1.0);
        let mut b = cube(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let mut joint = BallSocketConstraint::new((BodyHandle(0), &a), (BodyHandle(1), &b), Vec3::new(0.5, 0.0, 0.0));
        b.pose.position.x += 0.1;

        joint.pre_solve(&mut a, &mut b, &settings, 0.1);
        joint.solve(&mut a, &mut b, &settings);
        // Error 0.1 with beta 0.2 over 0.1s asks for a closing speed of 0.2.
        let closing = b.velocity.linear.x - a.velocity.linear.x;
        assert_abs_diff_eq!(closing, -0.2, epsilon = 1e-3);
    }
}
