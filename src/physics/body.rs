use std::fmt;
use std::sync::Arc;

use glam::{Quat, Vec3};

use super::body_description::BodyDescription;
use super::body_properties::{BodyVelocity, RigidPose};
use crate::physics::collidables::Shape;
use crate::utilities::quaternion_ex;
use crate::utilities::{BoundingBox, Matrix3x3};

/// A rigid body: pose, velocity, force accumulators, mass properties and a shared shape.
///
/// A body with zero inverse mass is static. Static bodies ignore forces and impulses and never
/// move under [`Body::update`].
#[derive(Debug, Clone)]
pub struct Body {
    pub pose: RigidPose,
    pub velocity: BodyVelocity,
    /// Render scale. Collision geometry lives in the shape and is not scaled by this.
    pub scale: Vec3,
    pub force: Vec3,
    pub torque: Vec3,
    pub restitution: f32,
    pub friction: f32,
    mass: f32,
    inverse_mass: f32,
    local_inertia: Matrix3x3,
    local_inverse_inertia: Matrix3x3,
    shape: Arc<Shape>,
}

impl Body {
    /// Hard cap on angular speed after an angular impulse, in radians per second.
    pub const MAX_ANGULAR_SPEED: f32 = 30.0;

    pub fn new(description: &BodyDescription) -> Self {
        let mass = description.mass.max(0.0);
        let (inverse_mass, local_inertia, local_inverse_inertia) = if mass < f32::EPSILON {
            (0.0, Matrix3x3::ZERO, Matrix3x3::ZERO)
        } else {
            let inertia = description.shape.inertia_tensor() * mass;
            (1.0 / mass, inertia, inertia.invert())
        };
        Self {
            pose: RigidPose::new(description.pose.position, description.pose.orientation.normalize()),
            velocity: description.velocity,
            scale: description.scale,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            restitution: description.restitution,
            friction: description.friction,
            mass: if inverse_mass == 0.0 { 0.0 } else { mass },
            inverse_mass,
            local_inertia,
            local_inverse_inertia,
            shape: description.shape.clone(),
        }
    }

    #[inline(always)]
    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    #[inline(always)]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline(always)]
    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    #[inline(always)]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline(always)]
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    #[inline(always)]
    pub fn orientation(&self) -> Quat {
        self.pose.orientation
    }

    /// Body-space inertia tensor about the center of mass.
    #[inline(always)]
    pub fn local_inertia(&self) -> Matrix3x3 {
        self.local_inertia
    }

    #[inline(always)]
    pub fn local_inverse_inertia(&self) -> Matrix3x3 {
        self.local_inverse_inertia
    }

    #[inline(always)]
    pub fn center_of_mass_local(&self) -> Vec3 {
        self.shape.get_center_of_mass()
    }

    #[inline(always)]
    pub fn center_of_mass_world(&self) -> Vec3 {
        self.pose.transform(self.shape.get_center_of_mass())
    }

    #[inline(always)]
    pub fn local_to_world(&self, point: Vec3) -> Vec3 {
        self.pose.transform(point)
    }

    #[inline(always)]
    pub fn world_to_local(&self, point: Vec3) -> Vec3 {
        self.pose.transform_by_inverse(point)
    }

    /// World-space inertia tensor `R * I * R^T`.
    #[inline(always)]
    pub fn inertia_world(&self) -> Matrix3x3 {
        Matrix3x3::rotate_tensor(&self.local_inertia, self.pose.orientation)
    }

    /// World-space inverse inertia tensor `R * I^-1 * R^T`. Zero for static bodies.
    #[inline(always)]
    pub fn inverse_inertia_world(&self) -> Matrix3x3 {
        Matrix3x3::rotate_tensor(&self.local_inverse_inertia, self.pose.orientation)
    }

    /// World bounds of the shape at the current pose.
    #[inline(always)]
    pub fn bounds(&self) -> BoundingBox {
        self.shape.get_bounds(self.pose.position, self.pose.orientation)
    }

    /// Support point of the shape in world space.
    #[inline(always)]
    pub fn support(&self, direction: Vec3, bias: f32) -> Vec3 {
        self.shape
            .support_point_world_space(direction, self.pose.position, self.pose.orientation, bias)
    }

    /// Fastest speed any surface point reaches along a world direction from the current spin.
    #[inline]
    pub fn fastest_linear_speed(&self, direction: Vec3) -> f32 {
        let to_local = self.pose.orientation.conjugate();
        self.shape
            .fastest_linear_speed(to_local * self.velocity.angular, to_local * direction)
    }

    /// World velocity of a point rigidly attached to the body.
    #[inline(always)]
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        self.velocity.linear + self.velocity.angular.cross(point - self.center_of_mass_world())
    }

    #[inline(always)]
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    #[inline(always)]
    pub fn add_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    #[inline(always)]
    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    #[inline]
    pub fn apply_impulse_linear(&mut self, impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.linear += impulse * self.inverse_mass;
    }

    /// Changes angular velocity by `I_world^-1 * impulse`, clamping the resulting speed to
    /// [`Body::MAX_ANGULAR_SPEED`].
    #[inline]
    pub fn apply_impulse_angular(&mut self, impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.angular += self.inverse_inertia_world() * impulse;
        let speed_squared = self.velocity.angular.length_squared();
        if speed_squared > Self::MAX_ANGULAR_SPEED * Self::MAX_ANGULAR_SPEED {
            self.velocity.angular *= Self::MAX_ANGULAR_SPEED / speed_squared.sqrt();
        }
    }

    /// Applies a world-space impulse at a world-space point.
    #[inline]
    pub fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_static() {
            return;
        }
        let r = point - self.center_of_mass_world();
        self.apply_impulse_linear(impulse);
        self.apply_impulse_angular(r.cross(impulse));
    }

    /// Turns the accumulated force and torque into velocity change, then clears them.
    pub fn integrate_forces(&mut self, dt: f32) {
        if !self.is_static() {
            self.velocity.linear += self.force * (self.inverse_mass * dt);
            self.velocity.angular += self.inverse_inertia_world() * (self.torque * dt);
        }
        self.clear_forces();
    }

    /// Advances the pose by `dt`. Rotation happens about the center of mass, and the angular
    /// velocity picks up the gyroscopic term of Euler's equation for asymmetric inertia.
    pub fn update(&mut self, dt: f32) {
        if self.is_static() {
            return;
        }

        self.pose.position += self.velocity.linear * dt;

        let center_of_mass = self.center_of_mass_world();
        let center_to_origin = self.pose.position - center_of_mass;

        let orientation = self.pose.orientation;
        let inertia = Matrix3x3::rotate_tensor(&self.local_inertia, orientation);
        let inverse_inertia = Matrix3x3::rotate_tensor(&self.local_inverse_inertia, orientation);
        let omega = self.velocity.angular;
        let gyroscopic = omega.cross(inertia * omega);
        let alpha = -(inverse_inertia * gyroscopic);
        self.velocity.angular += alpha * dt;

        let delta = quaternion_ex::delta_from_angular_velocity(self.velocity.angular, dt);
        self.pose.orientation = (delta * orientation).normalize();
        self.pose.position = center_of_mass + delta * center_to_origin;
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Body {{ pose: {}, velocity: {}, mass: {} }}",
            self.pose, self.velocity, self.mass
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collidables::{Cuboid, Sphere};
    use approx::assert_abs_diff_eq;

    fn dynamic_box(mass: f32) -> Body {
        let shape = Arc::new(Shape::from(Cuboid::new(Vec3::new(0.5, 0.1, 1.0)).unwrap()));
        Body::new(&BodyDescription::create_dynamic(RigidPose::IDENTITY, shape, mass))
    }

    fn static_sphere() -> Body {
        let shape = Arc::new(Shape::from(Sphere::new(1.0)));
        Body::new(&BodyDescription::create_static(RigidPose::from_position(Vec3::new(0.0, 2.0, 0.0)), shape))
    }

    #[test]
    fn test_static_body_ignores_impulses_and_update() {
        let mut body = static_sphere();
        body.velocity.linear = Vec3::new(1.0, 0.0, 0.0);
        body.apply_impulse_linear(Vec3::splat(10.0));
        body.apply_impulse_angular(Vec3::splat(10.0));
        body.apply_impulse_at_point(Vec3::X, Vec3::new(0.0, 3.0, 0.0));
        body.add_force(Vec3::Y);
        body.integrate_forces(0.1);
        body.update(0.1);
        assert!(body.is_static());
        assert_eq!(body.position(), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(body.orientation(), Quat::IDENTITY);
        assert_eq!(body.inverse_inertia_world(), Matrix3x3::ZERO);
    }

    #[test]
    fn test_integrate_forces_clears_accumulators() {
        let mut body = dynamic_box(2.0);
        body.add_force(Vec3::new(4.0, 0.0, 0.0));
        body.integrate_forces(0.5);
        assert_abs_diff_eq!(body.velocity.linear.x, 1.0, epsilon = 1e-6);
        assert_eq!(body.force, Vec3::ZERO);
        assert_eq!(body.torque, Vec3::ZERO);
    }

    #[test]
    fn test_orientation_stays_unit_under_tumbling() {
        let mut body = dynamic_box(1.0);
        body.velocity.angular = Vec3::new(3.0, 0.1, 0.2);
        for _ in 0..1000 {
            body.update(1.0 / 60.0);
            assert_abs_diff_eq!(body.orientation().length(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_angular_impulse_is_clamped() {
        let mut body = dynamic_box(1.0);
        body.apply_impulse_angular(Vec3::new(0.0, 1000.0, 0.0));
        assert_abs_diff_eq!(body.velocity.angular.length(), Body::MAX_ANGULAR_SPEED, epsilon = 1e-3);
    }

    #[test]
    fn test_offset_impulse_spins_body() {
        let mut body = dynamic_box(1.0);
        body.apply_impulse_at_point(Vec3::new(0.0, 0.0, 0.1), Vec3::new(0.5, 0.0, 0.0));
        assert!(body.velocity.linear.z > 0.0);
        // r = +X, j = +Z: r x j points along -Y.
        assert!(body.velocity.angular.y < 0.0);
    }

    #[test]
    fn test_rotation_about_center_of_mass() {
        let shape = Arc::new(Shape::from(
            Cuboid::from_points(&[Vec3::new(1.0, -0.5, -0.5), Vec3::new(2.0, 0.5, 0.5)]).unwrap(),
        ));
        let mut body = Body::new(&BodyDescription::create_dynamic(RigidPose::IDENTITY, shape, 1.0));
        let before = body.center_of_mass_world();
        body.velocity.angular = Vec3::new(0.0, 0.0, 2.0);
        body.update(0.1);
        assert_abs_diff_eq!(body.center_of_mass_world().distance(before), 0.0, epsilon = 1e-5);
        assert!(body.position().length() > 1e-3);
    }
}
