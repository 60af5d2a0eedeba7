use glam::Vec3;

use super::constraint_base::{rotation_error_rows, JacobianRows, JointFrame};
use super::Constraint;
use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;
use crate::utilities::math_helper;

/// Prismatic joint: B may only translate along the slide axis carried by A, and may not rotate
/// relative to A.
///
/// Rows 0 and 1 keep the anchors on the axis line, rows 2..5 lock the relative rotation, and
/// row 5 enforces the optional travel limit.
#[derive(Debug, Clone)]
pub struct SliderConstraint {
    pub frame: JointFrame,
    /// Allowed travel `(min, max)` along the axis, measured from the creation pose.
    pub limits: Option<(f32, f32)>,
    rows: JacobianRows<6>,
}

impl SliderConstraint {
    pub const LINEAR_BETA: f32 = 0.6;
    pub const ANGULAR_BETA: f32 = 0.6;
    pub const LIMIT_BETA: f32 = 0.3;

    const LIMIT_ROW: usize = 5;

    pub fn new(a: (BodyHandle, &Body), b: (BodyHandle, &Body), world_anchor: Vec3, world_axis: Vec3) -> Self {
        Self {
            frame: JointFrame::new(a, b, world_anchor, world_axis),
            limits: None,
            rows: JacobianRows::default(),
        }
    }

    /// Restricts travel along the axis to `[min, max]`.
    #[must_use]
    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.limits = Some((min.min(max), max.max(min)));
        self
    }

    /// Signed travel of B's anchor along the axis.
    pub fn travel(&self, a: &Body, b: &Body) -> f32 {
        let (anchor_a, anchor_b) = self.frame.world_anchors(a, b);
        (anchor_b - anchor_a).dot(a.orientation() * self.frame.local_axis_a)
    }
}

impl Constraint for SliderConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.frame.a, self.frame.b)
    }

    fn pre_solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings, dt: f32) {
        self.rows.begin(settings);
        let (anchor_a, anchor_b) = self.frame.world_anchors(a, b);
        let offset_a = anchor_a - a.center_of_mass_world();
        let offset_b = anchor_b - b.center_of_mass_world();
        let separation = anchor_b - anchor_a;
        let axis = a.orientation() * self.frame.local_axis_a;
        let (n1, n2) = math_helper::get_ortho(axis);

        // The normals turn with A, which adds the separation term to A's angular part.
        let translation_row = |direction: Vec3| {
            (
                -direction,
                -(offset_a + separation).cross(direction),
                direction,
                offset_b.cross(direction),
            )
        };
        for (row, direction) in [(0, n1), (1, n2)] {
            let (la, aa, lb, ab) = translation_row(direction);
            self.rows.set_row(row, la, aa, lb, ab);
        }

        let error = self.frame.rotation_error(a, b);
        for (i, k) in rotation_error_rows(a.orientation(), error).into_iter().enumerate() {
            self.rows.set_angular_row(2 + i, k);
        }

        let mut limit_error = None;
        if let Some((min, max)) = self.limits {
            let travel = separation.dot(axis);
            if travel <= min {
                let (la, aa, lb, ab) = translation_row(axis);
                self.rows.set_row(Self::LIMIT_ROW, la, aa, lb, ab);
                limit_error = Some(travel - min);
            } else if travel >= max {
                let (la, aa, lb, ab) = translation_row(-axis);
                self.rows.set_row(Self::LIMIT_ROW, la, aa, lb, ab);
                limit_error = Some(max - travel);
            }
        }
        match limit_error {
            Some(_) => self.rows.set_non_negative(Self::LIMIT_ROW),
            None => self.rows.accumulated[Self::LIMIT_ROW] = 0.0,
        }
        self.rows.warm_start(a, b, settings);

        self.rows.set_baumgarte(0, Self::LINEAR_BETA, dt, separation.dot(n1));
        self.rows.set_baumgarte(1, Self::LINEAR_BETA, dt, separation.dot(n2));
        for (i, component) in [error.x, error.y, error.z].into_iter().enumerate() {
            self.rows.set_baumgarte(2 + i, Self::ANGULAR_BETA, dt, component);
        }
        if let Some(error) = limit_error {
            self.rows.set_baumgarte(Self::LIMIT_ROW, Self::LIMIT_BETA, dt, error);
        }
    }

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        self.rows.solve(a, b, settings);
    }

    fn post_solve(&mut self, settings: &SolverSettings) {
        self.rows.clamp_accumulated(6, settings.warm_start_limit);
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

    fn rail_and_carriage() -> (Body, Body) {
        let shape = Arc::new(Shape::from(Cuboid::new(Vec3::splat(0.5)).unwrap()));
        let rail = Body::new(&BodyDescription::create_static(RigidPose::IDENTITY, shape.clone()));
        let carriage = Body::new(&BodyDescription::create_dynamic(
            RigidPose::from_position(Vec3::new(1.0, 0.0, 0.0)),
            shape,
            1.0,
        ));
        (rail, carriage)
    }

    #[test]
    fn test_only_axial_motion_survives() {
        let settings = SolverSettings::default();
        let (mut rail, mut carriage) = rail_and_carriage();
        let mut slider = SliderConstraint::new((BodyHandle(0), &rail), (BodyHandle(1), &carriage), carriage.position(), Vec3::X);
        carriage.velocity = BodyVelocity::new(Vec3::new(2.0, 3.0, -1.0), Vec3::new(0.5, 1.0, 0.0));

        slider.pre_solve(&mut rail, &mut carriage, &settings, 1.0 / 60.0);
        slider.solve(&mut rail, &mut carriage, &settings);

        assert_abs_diff_eq!(carriage.velocity.linear.x, 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(carriage.velocity.linear.y, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(carriage.velocity.linear.z, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(carriage.velocity.angular.length(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_limit_stops_travel() {
        let settings = SolverSettings::default();
        let (mut rail, mut carriage) = rail_and_carriage();
        let mut slider = SliderConstraint::new((BodyHandle(0), &rail), (BodyHandle(1), &carriage), carriage.position(), Vec3::X)
            .with_limits(-0.5, 0.5);
        carriage.pose.position.x = 1.7;
        carriage.velocity = BodyVelocity::linear(Vec3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(slider.travel(&rail, &carriage), 0.7, epsilon = 1e-5);

        slider.pre_solve(&mut rail, &mut carriage, &settings, 1.0 / 60.0);
        slider.solve(&mut rail, &mut carriage, &settings);
        // Pushed back toward the limit by the bias: 0.3 * 60 * 0.2.
        assert_abs_diff_eq!(carriage.velocity.linear.x, -3.6, epsilon = 1e-3);
    }

    #[test]
    fn test_limit_never_pulls() {
        let settings = SolverSettings::default();
        let (mut rail, mut carriage) = rail_and_carriage();
        let mut slider = SliderConstraint::new((BodyHandle(0), &rail), (BodyHandle(1), &carriage), carriage.position(), Vec3::X)
            .with_limits(-0.5, 0.5);
        carriage.pose.position.x = 1.5;
        carriage.velocity = BodyVelocity::linear(Vec3::new(-4.0, 0.0, 0.0));

        slider.pre_solve(&mut rail, &mut carriage, &settings, 1.0 / 60.0);
        slider.solve(&mut rail, &mut carriage, &settings);
        assert_abs_diff_eq!(carriage.velocity.linear.x, -4.0, epsilon = 1e-4);
    }
}
