//! Two-body velocity constraints.
//!
//! Every constraint runs the same per-step cycle: [`Constraint::pre_solve`] builds the Jacobian,
//! warm starts and computes the Baumgarte bias; [`Constraint::solve`] is called once per solver
//! iteration; [`Constraint::post_solve`] sanitizes the warm-start cache for the next step.

pub mod constraint_base;

pub mod ball_socket;
pub mod cone_twist;
pub mod distance;
pub mod fixed;
pub mod hinge;
pub mod penetration;
pub mod slider;

pub use ball_socket::BallSocketConstraint;
pub use cone_twist::ConeTwistConstraint;
pub use constraint_base::JointFrame;
pub use distance::DistanceConstraint;
pub use fixed::FixedConstraint;
pub use hinge::HingeConstraint;
pub use penetration::PenetrationConstraint;
pub use slider::SliderConstraint;

use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;

/// A constraint between two bodies, solved with sequential impulses.
///
/// `a` and `b` passed to every method must be the bodies named by [`Constraint::bodies`], in
/// that order.
pub trait Constraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle);

    fn pre_solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings, dt: f32);

    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings);

    fn post_solve(&mut self, settings: &SolverSettings);
}

/// Any joint the simulation can own.
#[derive(Debug, Clone)]
pub enum JointConstraint {
    Distance(DistanceConstraint),
    BallSocket(BallSocketConstraint),
    Hinge(HingeConstraint),
    ConeTwist(ConeTwistConstraint),
    Fixed(FixedConstraint),
    Slider(SliderConstraint),
}

macro_rules! dispatch {
    ($self:expr, $joint:ident => $body:expr) => {
        match $self {
            JointConstraint::Distance($joint) => $body,
            JointConstraint::BallSocket($joint) => $body,
            JointConstraint::Hinge($joint) => $body,
            JointConstraint::ConeTwist($joint) => $body,
            JointConstraint::Fixed($joint) => $body,
            JointConstraint::Slider($joint) => $body,
        }
    };
}

impl Constraint for JointConstraint {
    #[inline]
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        dispatch!(self, joint => joint.bodies())
    }

    #[inline]
    fn pre_solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings, dt: f32) {
        dispatch!(self, joint => joint.pre_solve(a, b, settings, dt))
    }

    #[inline]
    fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        dispatch!(self, joint => joint.solve(a, b, settings))
    }

    #[inline]
    fn post_solve(&mut self, settings: &SolverSettings) {
        dispatch!(self, joint => joint.post_solve(settings))
    }
}

macro_rules! joint_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for JointConstraint {
                fn from(joint: $ty) -> Self {
                    JointConstraint::$variant(joint)
                }
            }
        )*
    };
}

joint_from!(
    Distance(DistanceConstraint),
    BallSocket(BallSocketConstraint),
    Hinge(HingeConstraint),
    ConeTwist(ConeTwistConstraint),
    Fixed(FixedConstraint),
    Slider(SliderConstraint),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use crate::physics::body_properties::{BodyVelocity, RigidPose};
    use crate::physics::collidables::{Shape, Sphere};
    use approx::assert_abs_diff_eq;
    use glam::Vec3;
    use std::sync::Arc;

    fn ball(position: Vec3) -> Body {
        Body::new(&BodyDescription::create_dynamic(
            RigidPose::from_position(position),
            Arc::new(Shape::from(Sphere::new(0.25))),
            2.0,
        ))
    }

    #[test]
    fn test_enum_dispatch_reaches_joint() {
        let a = ball(Vec3::ZERO);
        let b = ball(Vec3::X);
        let joint: JointConstraint =
            BallSocketConstraint::new((BodyHandle(3), &a), (BodyHandle(7), &b), Vec3::new(0.5, 0.0, 0.0)).into();
        assert_eq!(joint.bodies(), (BodyHandle(3), BodyHandle(7)));
        assert!(matches!(joint, JointConstraint::BallSocket(_)));
    }

    #[test]
    fn test_converged_solve_is_a_fixed_point() {
        let settings = SolverSettings::default();
        let mut a = ball(Vec3::ZERO);
        let mut b = ball(Vec3::new(1.0, 1.0, 0.0));
        b.velocity = BodyVelocity::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(0.3, 0.0, -0.7));
        let mut joint: JointConstraint =
            HingeConstraint::new((BodyHandle(0), &a), (BodyHandle(1), &b), Vec3::new(0.5, 0.5, 0.0), Vec3::Z).into();

        joint.pre_solve(&mut a, &mut b, &settings, 1.0 / 60.0);
        for _ in 0..20 {
            joint.solve(&mut a, &mut b, &settings);
        }
        let (va, vb) = (a.velocity, b.velocity);
        joint.solve(&mut a, &mut b, &settings);
        assert_abs_diff_eq!(a.velocity.linear.distance(va.linear), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(b.velocity.linear.distance(vb.linear), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(b.velocity.angular.distance(vb.angular), 0.0, epsilon = 1e-4);
    }
}
