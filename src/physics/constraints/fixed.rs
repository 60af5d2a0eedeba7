use glam::Vec3;

use super::constraint_base::{rotation_error_rows, JacobianRows, JointFrame};
use super::Constraint;
use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;

/// Welds two bodies together, removing all six relative degrees of freedom.
#[derive(Debug, Clone)]
pub struct FixedConstraint {
    pub frame: JointFrame,
    rows: JacobianRows<6>,
}

impl FixedConstraint {
    pub const LINEAR_BETA: f32 = 0.5;
    pub const ANGULAR_BETA: f32 = 0.5;

    pub fn new(a: (BodyHandle, &Body), b: (BodyHandle, &Body), world_anchor: Vec3) -> Self {
        Self {
            frame: JointFrame::new(a, b, world_anchor, Vec3::X),
            rows: JacobianRows::default(),
        }
    }
}

impl Constraint for FixedConstraint {
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
        for (i, row) in rotation_error_rows(a.orientation(), error).into_iter().enumerate() {
            self.rows.set_angular_row(3 + i, row);
        }
        self.rows.warm_start(a, b, settings);

        let drift = anchor_b - anchor_a;
        for (row, component) in drift.to_array().into_iter().enumerate() {
            self.rows.set_baumgarte(row, Self::LINEAR_BETA, dt, component);
        }
        for (i, component) in [error.x, error.y, error.z].into_iter().enumerate() {
            self.rows.set_baumgarte(3 + i, Self::ANGULAR_BETA, dt, component);
        }
    }

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        self.rows.solve(a, b, settings);
    }

    fn post_solve(&mut self, settings: &SolverSettings) {
        self.rows.clamp_accumulated(6, settings.warm_start_limit);
    }
}
