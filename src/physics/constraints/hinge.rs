use glam::Vec3;

use super::constraint_base::{rotation_error_rows, JacobianRows, JointFrame};
use super::Constraint;
use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;
use crate::utilities::math_helper;

/// Shares an anchor point between two bodies and only allows relative rotation about the hinge
/// axis.
///
/// Rows 0..3 pin the anchors together. Rows 3 and 4 keep the rotation error perpendicular to the
/// hinge axis at zero, measured in A's local frame.
#[derive(Debug, Clone)]
pub struct HingeConstraint {
    pub frame: JointFrame,
    rows: JacobianRows<5>,
}

impl HingeConstraint {
    pub const LINEAR_BETA: f32 = 0.25;
    pub const ANGULAR_BETA: f32 = 0.2;

    /// Hinges the bodies at `world_anchor`, free to rotate about `world_axis`.
    pub fn new(a: (BodyHandle, &Body), b: (BodyHandle, &Body), world_anchor: Vec3, world_axis: Vec3) -> Self {
        Self {
            frame: JointFrame::new(a, b, world_anchor, world_axis),
            rows: JacobianRows::default(),
        }
    }

    /// Hinge axis in world space, carried by body A.
    #[inline(always)]
    pub fn world_axis(&self, a: &Body) -> Vec3 {
        a.orientation() * self.frame.local_axis_a
    }
}

impl Constraint for HingeConstraint {
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

        let error = self.frame.rotation_error(a, b);
        let error_vector = Vec3::new(error.x, error.y, error.z);
        let k = rotation_error_rows(a.orientation(), error);
        let (u, v) = math_helper::get_ortho(self.frame.local_axis_a);
        for (row, direction) in [(3, u), (4, v)] {
            let axis = k[0] * direction.x + k[1] * direction.y + k[2] * direction.z;
            self.rows.set_angular_row(row, axis);
        }
        self.rows.warm_start(a, b, settings);

        let drift = anchor_b - anchor_a;
        for (row, component) in drift.to_array().into_iter().enumerate() {
            self.rows.set_baumgarte(row, Self::LINEAR_BETA, dt, component);
        }
        self.rows.set_baumgarte(3, Self::ANGULAR_BETA, dt, u.dot(error_vector));
        self.rows.set_baumgarte(4, Self::ANGULAR_BETA, dt, v.dot(error_vector));
    }

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        self.rows.solve(a, b, settings);
    }

    fn post_solve(&mut self, settings: &SolverSettings) {
        self.rows.clamp_accumulated(5, f32::INFINITY);
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
        Body::new(&BodyDescription::create_dynamic(
            RigidPose::from_position(position),
            Arc::new(Shape::from(Cuboid::new(Vec3::splat(0.5)).unwrap())),
            mass,
        ))
    }

    #[test]
    fn test_spin_about_hinge_axis_survives() {
        let settings = SolverSettings::default();
        let mut frame = cube(Vec3::ZERO, 0.0);
        let mut door = cube(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let mut hinge = HingeConstraint::new(
            (BodyHandle(0), &frame),
            (BodyHandle(1), &door),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::Y,
        );
        door.velocity = BodyVelocity::new(Vec3::ZERO, Vec3::new(3.0, 2.0, -1.0));

        hinge.pre_solve(&mut frame, &mut door, &settings, 1.0 / 60.0);
        hinge.solve(&mut frame, &mut door, &settings);

        // Only rotation about Y remains, and the hinge point stays put.
        let w = door.velocity.angular;
        assert_abs_diff_eq!(w.x, 0.0, epsilon = 5e-3);
        assert_abs_diff_eq!(w.z, 0.0, epsilon = 5e-3);
        assert!(w.y.abs() > 0.1);
        let pivot = door.velocity_at_point(Vec3::new(0.5, 0.0, 0.0));
        assert_abs_diff_eq!(pivot.length(), 0.0, epsilon = 5e-3);
    }

    #[test]
    fn test_world_axis_follows_body_a() {
        let frame = cube(Vec3::ZERO, 0.0);
        let door = cube(Vec3::X, 1.0);
        let hinge = HingeConstraint::new((BodyHandle(0), &frame), (BodyHandle(1), &door), Vec3::ZERO, Vec3::Z * 2.0);
        assert_abs_diff_eq!(hinge.world_axis(&frame).z, 1.0, epsilon = 1e-6);
    }
}
