use glam::Vec3;

use super::constraint_base::{JacobianRows, JointFrame};
use super::Constraint;
use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;
use crate::utilities::{math_helper, quaternion_ex};

/// Ball socket whose relative rotation is confined to a cone around the twist axis, with a
/// bounded twist about that axis.
///
/// The swing and twist rows only exist while their limit is exceeded; they push back and never
/// pull.
#[derive(Debug, Clone)]
pub struct ConeTwistConstraint {
    pub frame: JointFrame,
    /// Largest allowed angle between the rest twist axis and the current one, in radians.
    pub cone_limit: f32,
    /// Largest allowed twist about the twist axis in either direction, in radians.
    pub twist_limit: f32,
    rows: JacobianRows<5>,
}

impl ConeTwistConstraint {
    pub const LINEAR_BETA: f32 = 0.6;
    pub const ANGULAR_BETA: f32 = 0.0025;
    /// Band kept in the warm-start cache. Multipliers below `-WARM_START_LIMIT` are discarded.
    pub const WARM_START_LIMIT: f32 = 5.0;

    const SWING_ROW: usize = 3;
    const TWIST_ROW: usize = 4;

    /// Joins the bodies at `world_anchor`. The twist axis is `world_twist_axis` as seen by A.
    pub fn new(
        a: (BodyHandle, &Body),
        b: (BodyHandle, &Body),
        world_anchor: Vec3,
        world_twist_axis: Vec3,
        cone_limit: f32,
        twist_limit: f32,
    ) -> Self {
        Self {
            frame: JointFrame::new(a, b, world_anchor, world_twist_axis),
            cone_limit: cone_limit.max(0.0),
            twist_limit: twist_limit.max(0.0),
            rows: JacobianRows::default(),
        }
    }

    /// Current `(swing, twist)` angles of B relative to A, in radians.
    pub fn angles(&self, a: &Body, b: &Body) -> (f32, f32) {
        let relative = self.frame.rotation_error(a, b);
        let axis = self.frame.local_axis_a;
        let rotated = relative * axis;
        let swing = axis.dot(rotated).clamp(-1.0, 1.0).acos();
        (swing, quaternion_ex::twist_angle(relative, axis))
    }

    fn limit_rows(&mut self, a: &Body, b: &Body, dt: f32) {
        let (swing, twist) = self.angles(a, b);
        let relative = self.frame.rotation_error(a, b);
        let axis = self.frame.local_axis_a;
        let rotated = relative * axis;

        if swing > self.cone_limit {
            let swing_axis = math_helper::normalize_or(rotated.cross(axis), math_helper::any_perpendicular(axis));
            self.rows.set_angular_row(Self::SWING_ROW, a.orientation() * swing_axis);
            self.rows.set_non_negative(Self::SWING_ROW);
            self.rows
                .set_baumgarte(Self::SWING_ROW, Self::ANGULAR_BETA, dt, self.cone_limit - swing);
        } else {
            self.rows.accumulated[Self::SWING_ROW] = 0.0;
        }

        if twist.abs() > self.twist_limit {
            let twist_axis = a.orientation() * rotated;
            self.rows
                .set_angular_row(Self::TWIST_ROW, twist_axis * -math_helper::binary_sign(twist));
            self.rows.set_non_negative(Self::TWIST_ROW);
            self.rows
                .set_baumgarte(Self::TWIST_ROW, Self::ANGULAR_BETA, dt, self.twist_limit - twist.abs());
        } else {
            self.rows.accumulated[Self::TWIST_ROW] = 0.0;
        }
    }
}

impl Constraint for ConeTwistConstraint {
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
        self.limit_rows(a, b, dt);
        self.rows.warm_start(a, b, settings);

        let drift = anchor_b - anchor_a;
        for (row, component) in drift.to_array().into_iter().enumerate() {
            self.rows.set_baumgarte(row, Self::LINEAR_BETA, dt, component);
        }
    }

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        self.rows.solve(a, b, settings);
    }

    fn post_solve(&mut self, _settings: &SolverSettings) {
        for i in 0..5 {
            let value = self.rows.accumulated[i];
            self.rows.accumulated[i] = if value.is_nan() || value < -Self::WARM_START_LIMIT {
                0.0
            } else {
                value.min(Self::WARM_START_LIMIT)
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use crate::physics::body_properties::{BodyVelocity, RigidPose};
    use crate::physics::collidables::{Cuboid, Shape};
    use approx::assert_abs_diff_eq;
    use glam::Quat;
    use std::sync::Arc;

    fn setup(mass_b: f32) -> (Body, Body, ConeTwistConstraint) {
        let shape = Arc::new(Shape::from(Cuboid::new(Vec3::splat(0.5)).unwrap()));
        let a = Body::new(&BodyDescription::create_static(RigidPose::IDENTITY, shape.clone()));
        let b = Body::new(&BodyDescription::create_dynamic(
            RigidPose::from_position(Vec3::new(2.0, 0.0, 0.0)),
            shape,
            mass_b,
        ));
        let joint = ConeTwistConstraint::new((BodyHandle(0), &a), (BodyHandle(1), &b), b.position(), Vec3::X, 0.5, 0.5);
        (a, b, joint)
    }

    #[test]
    fn test_free_rotation_inside_cone() {
        let settings = SolverSettings::default();
        let (mut a, mut b, mut joint) = setup(1.0);
        b.pose.orientation = Quat::from_rotation_z(0.2);
        b.velocity = BodyVelocity::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.5));

        joint.pre_solve(&mut a, &mut b, &settings, 1.0 / 60.0);
        joint.solve(&mut a, &mut b, &settings);
        assert_abs_diff_eq!(b.velocity.angular.z, 1.5, epsilon = 1e-4);
    }

    #[test]
    fn test_swing_past_cone_is_stopped() {
        let settings = SolverSettings::default();
        let (mut a, mut b, mut joint) = setup(1.0);
        b.pose.orientation = Quat::from_rotation_z(0.8);
        b.velocity = BodyVelocity::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0));
        let (swing, _) = joint.angles(&a, &b);
        assert_abs_diff_eq!(swing, 0.8, epsilon = 1e-4);

        joint.pre_solve(&mut a, &mut b, &settings, 1.0 / 60.0);
        joint.solve(&mut a, &mut b, &settings);
        assert!(b.velocity.angular.z <= 1e-3);
        assert!(joint.rows.accumulated[ConeTwistConstraint::SWING_ROW] >= 0.0);
    }

    #[test]
    fn test_twist_past_limit_is_stopped() {
        let settings = SolverSettings::default();
        let (mut a, mut b, mut joint) = setup(1.0);
        b.pose.orientation = Quat::from_rotation_x(1.0);
        b.velocity = BodyVelocity::new(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0));
        let (_, twist) = joint.angles(&a, &b);
        assert_abs_diff_eq!(twist, 1.0, epsilon = 1e-4);

        joint.pre_solve(&mut a, &mut b, &settings, 1.0 / 60.0);
        joint.solve(&mut a, &mut b, &settings);
        assert!(b.velocity.angular.x <= 1e-3);
    }

    #[test]
    fn test_warm_start_band() {
        let settings = SolverSettings::default();
        let (_, _, mut joint) = setup(1.0);
        joint.rows.accumulated = crate::utilities::VectorN::from_array([9.0, -9.0, -2.0, f32::NAN, 1.0]);
        joint.post_solve(&settings);
        assert_eq!(joint.rows.accumulated.data, [5.0, 0.0, -2.0, 0.0, 1.0]);
    }
}
