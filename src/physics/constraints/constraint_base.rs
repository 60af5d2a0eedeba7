//! Shared machinery for two-body velocity constraints.
//!
//! Every constraint stacks its equations into a `R x 12` Jacobian whose columns are
//! `[linear A, angular A, linear B, angular B]`. Solving forms the effective mass
//! `J M^-1 J^T`, relaxes the bounded system with projected Gauss-Seidel, and applies `J^T lambda`
//! as impulses. Accumulated multipliers persist between steps for warm starting.

use glam::{Quat, Vec3};

use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;
use crate::utilities::linear_equations_solver::lcp_gauss_seidel_into;
use crate::utilities::math_helper;
use crate::utilities::matrix_mn::{MatrixMN, VectorN};
use crate::utilities::quaternion_ex;

/// Block-diagonal inverse mass matrix of the pair:
/// `diag(m_a^-1 I, I_a^-1, m_b^-1 I, I_b^-1)` with world-space inverse inertia.
pub fn inverse_mass_matrix(a: &Body, b: &Body) -> MatrixMN<12, 12> {
    let mut m = MatrixMN::<12, 12>::zero();
    for i in 0..3 {
        m.set(i, i, a.inverse_mass());
        m.set(6 + i, 6 + i, b.inverse_mass());
    }
    m.set_block3(3, 3, &a.inverse_inertia_world());
    m.set_block3(9, 9, &b.inverse_inertia_world());
    m
}

/// Stacked velocities `[v_a, w_a, v_b, w_b]`.
#[inline]
pub fn velocities(a: &Body, b: &Body) -> VectorN<12> {
    let mut v = VectorN::<12>::zero();
    v.set_vec3(0, a.velocity.linear);
    v.set_vec3(3, a.velocity.angular);
    v.set_vec3(6, b.velocity.linear);
    v.set_vec3(9, b.velocity.angular);
    v
}

/// Applies stacked impulses `[j_a, h_a, j_b, h_b]`.
#[inline]
pub fn apply_impulses(a: &mut Body, b: &mut Body, impulses: &VectorN<12>) {
    a.apply_impulse_linear(impulses.vec3(0));
    a.apply_impulse_angular(impulses.vec3(3));
    b.apply_impulse_linear(impulses.vec3(6));
    b.apply_impulse_angular(impulses.vec3(9));
}

/// Anchor points and axes of a two-body joint, stored in each body's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointFrame {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
    pub local_axis_a: Vec3,
    pub local_axis_b: Vec3,
    /// Relative orientation `q_a^-1 q_b` when the joint was created.
    pub rest_orientation: Quat,
}

impl JointFrame {
    /// Captures a frame anchored at one world point, with a world axis shared by both bodies.
    pub fn new(
        (a, body_a): (BodyHandle, &Body),
        (b, body_b): (BodyHandle, &Body),
        world_anchor: Vec3,
        world_axis: Vec3,
    ) -> Self {
        let axis = math_helper::normalize_or(world_axis, Vec3::X);
        Self {
            a,
            b,
            local_anchor_a: body_a.world_to_local(world_anchor),
            local_anchor_b: body_b.world_to_local(world_anchor),
            local_axis_a: body_a.orientation().conjugate() * axis,
            local_axis_b: body_b.orientation().conjugate() * axis,
            rest_orientation: quaternion_ex::relative_rotation_local(body_a.orientation(), body_b.orientation()),
        }
    }

    #[inline(always)]
    pub fn world_anchors(&self, a: &Body, b: &Body) -> (Vec3, Vec3) {
        (a.local_to_world(self.local_anchor_a), b.local_to_world(self.local_anchor_b))
    }

    /// Rotation error `q_a^-1 q_b q_rest^-1`, taken with a non-negative scalar part. Identity when
    /// the bodies hold their rest orientation; the vector part is half the rotation vector,
    /// expressed in A's local frame.
    #[inline]
    pub fn rotation_error(&self, a: &Body, b: &Body) -> Quat {
        let relative = quaternion_ex::relative_rotation_local(a.orientation(), b.orientation());
        quaternion_ex::shortest(relative * self.rest_orientation.conjugate())
    }
}

/// Rows `k_i` of the matrix mapping `w_b - w_a` to the rate of change of the rotation error's
/// vector part: `d/dt error.xyz = K (w_b - w_a)`.
pub fn rotation_error_rows(orientation_a: Quat, error: Quat) -> [Vec3; 3] {
    let inverse_a = orientation_a.conjugate();
    let error_vector = Vec3::new(error.x, error.y, error.z);
    let column = |axis: Vec3| {
        let local = inverse_a * axis;
        (local * error.w - error_vector.cross(local)) * 0.5
    };
    let (c0, c1, c2) = (column(Vec3::X), column(Vec3::Y), column(Vec3::Z));
    [
        Vec3::new(c0.x, c1.x, c2.x),
        Vec3::new(c0.y, c1.y, c2.y),
        Vec3::new(c0.z, c1.z, c2.z),
    ]
}

/// Jacobian, bias, bounds and accumulated multipliers for `R` constraint equations.
#[derive(Debug, Clone, Copy)]
pub struct JacobianRows<const R: usize> {
    pub jacobian: MatrixMN<R, 12>,
    pub bias: VectorN<R>,
    pub lower: VectorN<R>,
    pub upper: VectorN<R>,
    /// Multipliers accumulated over the previous and current step.
    pub accumulated: VectorN<R>,
}

impl<const R: usize> Default for JacobianRows<R> {
    fn default() -> Self {
        Self {
            jacobian: MatrixMN::zero(),
            bias: VectorN::zero(),
            lower: VectorN::from_array([f32::NEG_INFINITY; R]),
            upper: VectorN::from_array([f32::INFINITY; R]),
            accumulated: VectorN::zero(),
        }
    }
}

impl<const R: usize> JacobianRows<R> {
    /// Clears the Jacobian, bias and bounds for a new pre-solve. The accumulated multipliers are
    /// kept when warm starting and dropped otherwise.
    pub fn begin(&mut self, settings: &SolverSettings) {
        self.jacobian.clear();
        self.bias.clear();
        self.lower = VectorN::from_array([f32::NEG_INFINITY; R]);
        self.upper = VectorN::from_array([f32::INFINITY; R]);
        if !settings.warm_starting {
            self.accumulated.clear();
        }
    }

    /// Writes one equation: the velocity of the constraint is
    /// `linear_a . v_a + angular_a . w_a + linear_b . v_b + angular_b . w_b`.
    #[inline]
    pub fn set_row(&mut self, row: usize, linear_a: Vec3, angular_a: Vec3, linear_b: Vec3, angular_b: Vec3) {
        self.jacobian.set_vec3(row, 0, linear_a);
        self.jacobian.set_vec3(row, 3, angular_a);
        self.jacobian.set_vec3(row, 6, linear_b);
        self.jacobian.set_vec3(row, 9, angular_b);
    }

    /// Writes a purely rotational equation `axis . (w_b - w_a)`.
    #[inline]
    pub fn set_angular_row(&mut self, row: usize, axis: Vec3) {
        self.set_row(row, Vec3::ZERO, -axis, Vec3::ZERO, axis);
    }

    /// Writes three equations pinning the world anchors together. Their velocity is the velocity
    /// of anchor B relative to anchor A, so the matching position error is `anchor_b - anchor_a`.
    pub fn set_point_rows(&mut self, first_row: usize, offset_a: Vec3, offset_b: Vec3) {
        for (i, axis) in [Vec3::X, Vec3::Y, Vec3::Z].into_iter().enumerate() {
            self.set_row(first_row + i, -axis, -offset_a.cross(axis), axis, offset_b.cross(axis));
        }
    }

    /// Baumgarte bias `-(beta / dt) * error` for one equation.
    #[inline(always)]
    pub fn set_baumgarte(&mut self, row: usize, beta: f32, dt: f32, error: f32) {
        self.bias[row] = -(beta / dt) * error;
    }

    /// Restricts an equation to push only (`lambda >= 0`).
    #[inline(always)]
    pub fn set_non_negative(&mut self, row: usize) {
        self.lower[row] = 0.0;
        self.upper[row] = f32::INFINITY;
    }

    /// Applies `J^T lambda_accumulated` from the previous step.
    pub fn warm_start(&self, a: &mut Body, b: &mut Body, settings: &SolverSettings) {
        if !settings.warm_starting {
            return;
        }
        let impulses = self.jacobian.mul_transposed_vector(&self.accumulated);
        apply_impulses(a, b, &impulses);
    }

    /// Effective mass `J M^-1 J^T` and right hand side `-J v + bias`.
    pub fn system(&self, a: &Body, b: &Body) -> (MatrixMN<R, R>, VectorN<R>) {
        let inverse_mass = inverse_mass_matrix(a, b);
        let effective_mass = self
            .jacobian
            .mul_matrix(&inverse_mass)
            .mul_matrix(&self.jacobian.transpose());
        let rhs = self.bias - self.jacobian.mul_vector(&velocities(a, b));
        (effective_mass, rhs)
    }

    /// Solves for this iteration's multipliers, applies them and adds them to the accumulator.
    pub fn solve(&mut self, a: &mut Body, b: &mut Body, settings: &SolverSettings) -> VectorN<R> {
        let (effective_mass, rhs) = self.system(a, b);
        let mut lambda = VectorN::<R>::zero();
        lcp_gauss_seidel_into(
            &effective_mass,
            &rhs,
            &self.lower,
            &self.upper,
            settings.gauss_seidel_iterations,
            &mut lambda,
        );
        let impulses = self.jacobian.mul_transposed_vector(&lambda);
        apply_impulses(a, b, &impulses);
        self.accumulated = self.accumulated + lambda;
        lambda
    }

    /// Zeroes NaN multipliers and clamps the first `rows` accumulated multipliers to
    /// `[-limit, limit]`.
    pub fn clamp_accumulated(&mut self, rows: usize, limit: f32) {
        for i in 0..rows.min(R) {
            let value = self.accumulated[i];
            self.accumulated[i] = if value.is_nan() { 0.0 } else { value.clamp(-limit, limit) };
        }
    }
}
