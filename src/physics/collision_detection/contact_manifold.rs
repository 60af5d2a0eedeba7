//! Persistent contact caches.
//!
//! A [`Manifold`] keeps up to four contacts for one body pair across steps so that their
//! penetration constraints can warm start. The [`ManifoldCollector`] owns every live manifold and
//! drives their constraints through the solver cycle.

use glam::Vec3;
use tracing::trace;

use super::Contact;
use crate::physics::bodies::Bodies;
use crate::physics::body::Body;
use crate::physics::constraints::{Constraint, PenetrationConstraint};
use crate::physics::handles::BodyHandle;
use crate::physics::simulation_config::SolverSettings;
use crate::utilities::math_helper;

/// A cached contact together with the constraint that enforces it.
#[derive(Debug, Clone)]
pub struct ManifoldPoint {
    pub contact: Contact,
    pub constraint: PenetrationConstraint,
}

/// Cached contacts between one pair of bodies.
#[derive(Debug, Clone)]
pub struct Manifold {
    pub a: BodyHandle,
    pub b: BodyHandle,
    points: Vec<ManifoldPoint>,
}

impl Manifold {
    pub const MAX_CONTACTS: usize = 4;
    /// Contacts closer than this to a cached one, on either body, update the cached contact's
    /// points in place instead of adding a new one.
    pub const DUPLICATE_DISTANCE: f32 = 0.02;
    /// Tangential drift beyond which a cached contact is discarded.
    pub const DRIFT_DISTANCE: f32 = 0.02;

    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        Self {
            a,
            b,
            points: Vec::with_capacity(Self::MAX_CONTACTS),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline(always)]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points
    }

    #[inline(always)]
    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }

    #[inline(always)]
    pub fn matches(&self, a: BodyHandle, b: BodyHandle) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }

    /// Caches a contact. `body_a` and `body_b` are the manifold's `a` and `b`; the contact may name
    /// them in either order.
    ///
    /// Returns whether the contact was stored as a new point.
    pub fn add_contact(&mut self, contact: Contact, body_a: &Body, body_b: &Body) -> bool {
        debug_assert!(self.matches(contact.a, contact.b), "contact belongs to another pair");
        let contact = if contact.a == self.a { contact } else { contact.swapped() };

        let new_a = body_a.local_to_world(contact.local_point_on_a);
        let new_b = body_b.local_to_world(contact.local_point_on_b);
        let threshold = Self::DUPLICATE_DISTANCE * Self::DUPLICATE_DISTANCE;
        let duplicate = self.points.iter().position(|point| {
            let old_a = body_a.local_to_world(point.contact.local_point_on_a);
            let old_b = body_b.local_to_world(point.contact.local_point_on_b);
            old_a.distance_squared(new_a) < threshold || old_b.distance_squared(new_b) < threshold
        });
        if let Some(index) = duplicate {
            // A rolling body carries its cached point away from the support; take the new geometry.
            let point = &mut self.points[index];
            point.constraint.refresh(&contact, body_a);
            point.contact = contact;
            return false;
        }

        let slot = if self.points.len() < Self::MAX_CONTACTS {
            None
        } else {
            match self.replacement_slot(&contact) {
                Some(slot) => Some(slot),
                None => return false,
            }
        };

        let point = ManifoldPoint {
            constraint: PenetrationConstraint::new(&contact, body_a, body_b),
            contact,
        };
        match slot {
            Some(slot) => self.points[slot] = point,
            None => self.points.push(point),
        }
        true
    }

    /// The cached contact nearest the average of all five candidates, if it is nearer than the
    /// new contact. Replacing it keeps the contact set as spread out as possible.
    fn replacement_slot(&self, contact: &Contact) -> Option<usize> {
        let sum = self
            .points
            .iter()
            .fold(contact.local_point_on_a, |sum, point| sum + point.contact.local_point_on_a);
        let average = sum / (self.points.len() + 1) as f32;

        let mut nearest = average.distance_squared(contact.local_point_on_a);
        let mut slot = None;
        for (i, point) in self.points.iter().enumerate() {
            let distance = average.distance_squared(point.contact.local_point_on_a);
            if distance < nearest {
                nearest = distance;
                slot = Some(i);
            }
        }
        slot
    }

    /// Drops cached contacts whose points have slid apart or separated since they were found.
    pub fn remove_expired(&mut self, body_a: &Body, body_b: &Body) {
        let threshold = Self::DRIFT_DISTANCE * Self::DRIFT_DISTANCE;
        self.points.retain(|point| {
            let point_a = body_a.local_to_world(point.contact.local_point_on_a);
            let point_b = body_b.local_to_world(point.contact.local_point_on_b);
            let normal = math_helper::normalize_or(body_a.orientation() * point.constraint.local_normal, Vec3::Y);
            let ab = point_b - point_a;
            let depth = normal.dot(ab);
            let tangent = ab - normal * depth;
            tangent.length_squared() < threshold && depth <= 0.0
        });
    }

    pub fn pre_solve(&mut self, body_a: &mut Body, body_b: &mut Body, settings: &SolverSettings, dt: f32) {
        for point in &mut self.points {
            point.constraint.pre_solve(body_a, body_b, settings, dt);
        }
    }

    pub fn solve(&mut self, body_a: &mut Body, body_b: &mut Body, settings: &SolverSettings) {
        for point in &mut self.points {
            point.constraint.solve(body_a, body_b, settings);
        }
    }

    pub fn post_solve(&mut self, settings: &SolverSettings) {
        for point in &mut self.points {
            point.constraint.post_solve(settings);
        }
    }
}

/// Owns every live manifold.
#[derive(Debug, Default)]
pub struct ManifoldCollector {
    manifolds: Vec<Manifold>,
}

impl ManifoldCollector {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn manifolds(&self) -> &[Manifold] {
        &self.manifolds
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    /// Total cached contacts over all manifolds.
    pub fn contact_count(&self) -> usize {
        self.manifolds.iter().map(Manifold::len).sum()
    }

    /// The manifold for a pair, in either order.
    pub fn find(&self, a: BodyHandle, b: BodyHandle) -> Option<&Manifold> {
        self.manifolds.iter().find(|manifold| manifold.matches(a, b))
    }

    /// Routes a contact to its pair's manifold, creating one for a new pair.
    pub fn add_contact(&mut self, contact: Contact, bodies: &Bodies) -> bool {
        let (Some(body_a), Some(body_b)) = (bodies.get(contact.a), bodies.get(contact.b)) else {
            return false;
        };
        match self.manifolds.iter_mut().find(|manifold| manifold.matches(contact.a, contact.b)) {
            Some(manifold) => {
                if manifold.a == contact.a {
                    manifold.add_contact(contact, body_a, body_b)
                } else {
                    manifold.add_contact(contact, body_b, body_a)
                }
            }
            None => {
                let mut manifold = Manifold::new(contact.a, contact.b);
                let added = manifold.add_contact(contact, body_a, body_b);
                trace!(a = %contact.a, b = %contact.b, "new manifold");
                self.manifolds.push(manifold);
                added
            }
        }
    }

    /// Expires stale contacts, then drops manifolds that are empty or whose bodies are gone.
    pub fn remove_expired(&mut self, bodies: &Bodies) {
        self.manifolds.retain_mut(|manifold| {
            let (Some(a), Some(b)) = (bodies.get(manifold.a), bodies.get(manifold.b)) else {
                return false;
            };
            manifold.remove_expired(a, b);
            !manifold.is_empty()
        });
    }

    /// Forgets every manifold that involves the body.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        self.manifolds.retain(|manifold| !manifold.involves(handle));
    }

    pub fn clear(&mut self) {
        self.manifolds.clear();
    }

    pub fn pre_solve(&mut self, bodies: &mut Bodies, settings: &SolverSettings, dt: f32) {
        for manifold in &mut self.manifolds {
            if let Some((a, b)) = bodies.get_pair_mut(manifold.a, manifold.b) {
                manifold.pre_solve(a, b, settings, dt);
            }
        }
    }

    pub fn solve(&mut self, bodies: &mut Bodies, settings: &SolverSettings) {
        for manifold in &mut self.manifolds {
            if let Some((a, b)) = bodies.get_pair_mut(manifold.a, manifold.b) {
                manifold.solve(a, b, settings);
            }
        }
    }

    pub fn post_solve(&mut self, settings: &SolverSettings) {
        for manifold in &mut self.manifolds {
            manifold.post_solve(settings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use crate::physics::body_properties::RigidPose;
    use crate::physics::collidables::{Cuboid, Shape, Sphere};
    use approx::assert_abs_diff_eq;
    use glam::Quat;
    use std::sync::Arc;

    fn ground_and_crate() -> Bodies {
        let mut bodies = Bodies::with_capacity(2);
        bodies.add(&BodyDescription::create_static(
            RigidPose::from_position(Vec3::new(0.0, -0.5, 0.0)),
            Arc::new(Shape::from(Cuboid::new(Vec3::new(5.0, 0.5, 5.0)).unwrap())),
        ));
        bodies.add(&BodyDescription::create_dynamic(
            RigidPose::from_position(Vec3::new(0.0, 0.49, 0.0)),
            Arc::new(Shape::from(Cuboid::new(Vec3::splat(0.5)).unwrap())),
            1.0,
        ));
        bodies
    }

    fn touching(bodies: &Bodies, x: f32, z: f32) -> Contact {
        let (ground, crate_body) = (BodyHandle(0), BodyHandle(1));
        Contact::from_world_points(
            (ground, bodies.get(ground).unwrap()),
            (crate_body, bodies.get(crate_body).unwrap()),
            Vec3::new(x, 0.0, z),
            Vec3::new(x, -0.01, z),
            Vec3::Y,
            -0.01,
            0.0,
        )
    }

    #[test]
    fn test_near_duplicate_keeps_cached_contact() {
        let bodies = ground_and_crate();
        let mut collector = ManifoldCollector::new();
        assert!(collector.add_contact(touching(&bodies, 0.5, 0.5), &bodies));

        let settings = SolverSettings::default();
        let mut bodies_mut = ground_and_crate();
        collector.pre_solve(&mut bodies_mut, &settings, 1.0 / 60.0);
        collector.solve(&mut bodies_mut, &settings);
        let cached = collector.manifolds()[0].points()[0].constraint.normal_impulse();

        assert!(!collector.add_contact(touching(&bodies, 0.505, 0.5), &bodies));
        let manifold = collector.find(BodyHandle(1), BodyHandle(0)).unwrap();
        assert_eq!(manifold.len(), 1);
        assert_eq!(manifold.points()[0].constraint.normal_impulse(), cached);
        let point = &manifold.points()[0];
        assert_abs_diff_eq!(point.contact.world_point_on_a.x, 0.505);
        assert_abs_diff_eq!(point.constraint.local_point_b.x, 0.505, epsilon = 1e-6);
    }

    #[test]
    fn test_rolled_sphere_contact_moves_under_the_center() {
        let mut bodies = Bodies::with_capacity(2);
        let ground = bodies.add(&BodyDescription::create_static(
            RigidPose::from_position(Vec3::new(0.0, -0.5, 0.0)),
            Arc::new(Shape::from(Cuboid::new(Vec3::new(5.0, 0.5, 5.0)).unwrap())),
        ));
        let ball = bodies.add(&BodyDescription::create_dynamic(
            RigidPose::from_position(Vec3::new(0.0, 0.5, 0.0)),
            Arc::new(Shape::from(Sphere::new(0.5))),
            1.0,
        ));
        let bottom = |bodies: &Bodies| {
            let center = bodies.get(ball).unwrap().position();
            Contact::from_world_points(
                (ground, bodies.get(ground).unwrap()),
                (ball, bodies.get(ball).unwrap()),
                Vec3::new(center.x, 0.0, center.z),
                center - Vec3::Y * 0.5,
                Vec3::Y,
                0.0,
                0.0,
            )
        };
        let mut collector = ManifoldCollector::new();
        assert!(collector.add_contact(bottom(&bodies), &bodies));

        // Spin the ball in place; its cached point rides up the side.
        bodies.get_mut(ball).unwrap().pose.orientation = Quat::from_rotation_z(0.3);
        assert!(!collector.add_contact(bottom(&bodies), &bodies));

        let manifold = collector.find(ground, ball).unwrap();
        assert_eq!(manifold.len(), 1);
        let body = bodies.get(ball).unwrap();
        let on_ball = body.local_to_world(manifold.points()[0].constraint.local_point_b);
        assert_abs_diff_eq!(on_ball.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(on_ball.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_contact_in_reverse_order_joins_same_manifold() {
        let bodies = ground_and_crate();
        let mut collector = ManifoldCollector::new();
        collector.add_contact(touching(&bodies, 0.5, 0.5), &bodies);
        collector.add_contact(touching(&bodies, -0.5, 0.5).swapped(), &bodies);
        assert_eq!(collector.len(), 1);
        let manifold = &collector.manifolds()[0];
        assert_eq!(manifold.len(), 2);
        assert_eq!(manifold.points()[1].contact.a, BodyHandle(0));
        assert_abs_diff_eq!(manifold.points()[1].contact.normal.y, 1.0);
    }

    #[test]
    fn test_full_manifold_keeps_spread() {
        let bodies = ground_and_crate();
        let mut collector = ManifoldCollector::new();
        for (x, z) in [(0.5, 0.5), (-0.5, 0.5), (-0.5, -0.5), (0.5, -0.5)] {
            assert!(collector.add_contact(touching(&bodies, x, z), &bodies));
        }
        // A point in the middle would shrink the set; it is rejected.
        assert!(!collector.add_contact(touching(&bodies, 0.05, 0.0), &bodies));
        assert_eq!(collector.contact_count(), 4);

        // With one corner pulled in, a far point replaces it.
        let mut collector = ManifoldCollector::new();
        for (x, z) in [(0.5, 0.5), (-0.5, 0.5), (-0.5, -0.5), (0.1, -0.1)] {
            collector.add_contact(touching(&bodies, x, z), &bodies);
        }
        assert!(collector.add_contact(touching(&bodies, 0.5, -0.5), &bodies));
        let xs: Vec<f32> = collector.manifolds()[0]
            .points()
            .iter()
            .map(|point| point.contact.world_point_on_a.x)
            .collect();
        assert!(!xs.contains(&0.1));
        assert_eq!(collector.contact_count(), 4);
    }

    #[test]
    fn test_separated_contacts_expire() {
        let mut bodies = ground_and_crate();
        let mut collector = ManifoldCollector::new();
        collector.add_contact(touching(&bodies, 0.5, 0.5), &bodies);
        collector.remove_expired(&bodies);
        assert_eq!(collector.contact_count(), 1);

        bodies.get_mut(BodyHandle(1)).unwrap().pose.position.y += 0.5;
        collector.remove_expired(&bodies);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_sliding_contacts_expire() {
        let mut bodies = ground_and_crate();
        let mut collector = ManifoldCollector::new();
        collector.add_contact(touching(&bodies, 0.5, 0.5), &bodies);
        bodies.get_mut(BodyHandle(1)).unwrap().pose.position.x += 0.1;
        collector.remove_expired(&bodies);
        assert!(collector.is_empty());
    }
}
