use glam::Vec3;

use crate::physics::body::Body;
use crate::physics::handles::BodyHandle;
use crate::utilities::math_helper;

/// A single contact between two bodies.
///
/// `normal` is the world-space direction from `a` toward `b`; pushing the bodies apart along it
/// separates them. `separation` is negative while the bodies interpenetrate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub world_point_on_a: Vec3,
    pub world_point_on_b: Vec3,
    pub local_point_on_a: Vec3,
    pub local_point_on_b: Vec3,
    pub normal: Vec3,
    pub separation: f32,
    /// Time into the step at which the bodies first touch. Zero for resting contacts.
    pub time_of_impact: f32,
}

impl Contact {
    /// Builds a contact from world-space witness points. The local points are taken relative to
    /// the bodies' current poses.
    pub fn from_world_points(
        (a, body_a): (BodyHandle, &Body),
        (b, body_b): (BodyHandle, &Body),
        world_point_on_a: Vec3,
        world_point_on_b: Vec3,
        normal: Vec3,
        separation: f32,
        time_of_impact: f32,
    ) -> Self {
        Self {
            a,
            b,
            world_point_on_a,
            world_point_on_b,
            local_point_on_a: body_a.world_to_local(world_point_on_a),
            local_point_on_b: body_b.world_to_local(world_point_on_b),
            normal,
            separation,
            time_of_impact,
        }
    }

    /// The same contact seen from `b`'s side.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
            world_point_on_a: self.world_point_on_b,
            world_point_on_b: self.world_point_on_a,
            local_point_on_a: self.local_point_on_b,
            local_point_on_b: self.local_point_on_a,
            normal: -self.normal,
            separation: self.separation,
            time_of_impact: self.time_of_impact,
        }
    }

    /// Resolves the contact in one shot: a restitution impulse along the normal, a friction
    /// impulse bounded by the Coulomb cone, then a positional split by inverse mass when the
    /// bodies actually overlap (`time_of_impact == 0`).
    ///
    /// `body_a` and `body_b` must be the bodies named by `a` and `b`.
    pub fn resolve(&self, body_a: &mut Body, body_b: &mut Body) {
        debug_assert!(
            !(body_a.is_static() && body_b.is_static()),
            "resolving a contact between two static bodies"
        );
        let inverse_mass_a = body_a.inverse_mass();
        let inverse_mass_b = body_b.inverse_mass();
        let inverse_mass_sum = inverse_mass_a + inverse_mass_b;
        if inverse_mass_sum == 0.0 {
            return;
        }

        let point_a = self.world_point_on_a;
        let point_b = self.world_point_on_b;
        let n = self.normal;
        let inverse_inertia_a = body_a.inverse_inertia_world();
        let inverse_inertia_b = body_b.inverse_inertia_world();
        let ra = point_a - body_a.center_of_mass_world();
        let rb = point_b - body_b.center_of_mass_world();

        let restitution = body_a.restitution * body_b.restitution;
        let friction = body_a.friction * body_b.friction;

        let relative_velocity = body_a.velocity_at_point(point_a) - body_b.velocity_at_point(point_b);
        let closing_speed = relative_velocity.dot(n);

        if closing_speed > 0.0 {
            let angular_a = (inverse_inertia_a * ra.cross(n)).cross(ra);
            let angular_b = (inverse_inertia_b * rb.cross(n)).cross(rb);
            let angular_factor = (angular_a + angular_b).dot(n);
            let normal_impulse = (1.0 + restitution) * closing_speed / (inverse_mass_sum + angular_factor);
            let impulse = n * normal_impulse;
            body_a.apply_impulse_at_point(-impulse, point_a);
            body_b.apply_impulse_at_point(impulse, point_b);

            let tangential_velocity = relative_velocity - n * closing_speed;
            let tangent = math_helper::normalize_or(tangential_velocity, Vec3::ZERO);
            if tangent != Vec3::ZERO {
                let angular_a = (inverse_inertia_a * ra.cross(tangent)).cross(ra);
                let angular_b = (inverse_inertia_b * rb.cross(tangent)).cross(rb);
                let angular_factor = (angular_a + angular_b).dot(tangent);
                let reduced_mass = 1.0 / (inverse_mass_sum + angular_factor);
                let mut friction_impulse = tangential_velocity * (reduced_mass * friction);
                let limit = friction * normal_impulse;
                if friction_impulse.length_squared() > limit * limit {
                    friction_impulse = tangent * limit;
                }
                body_a.apply_impulse_at_point(-friction_impulse, point_a);
                body_b.apply_impulse_at_point(friction_impulse, point_b);
            }
        }

        // Impacts are resolved once, outside the solver, so the whole overlap is projected away
        // here. Cached contacts go through `PenetrationConstraint`, which keeps its `SLOP` and
        // corrects a `BETA` fraction per step instead.
        if self.time_of_impact == 0.0 {
            let correction = point_b - point_a;
            body_a.pose.position += correction * (inverse_mass_a / inverse_mass_sum);
            body_b.pose.position -= correction * (inverse_mass_b / inverse_mass_sum);
        }
    }
}
