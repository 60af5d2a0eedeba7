use tracing::{debug, info, trace, warn};

use crate::physics::bodies::Bodies;
use crate::physics::body::Body;
use crate::physics::body_description::BodyDescription;
use crate::physics::collision_detection::{BroadPhase, CollisionPair, Contact, ManifoldCollector, NarrowPhase};
use crate::physics::constraints::{Constraint, JointConstraint};
use crate::physics::errors::SimulationError;
use crate::physics::handles::{BodyHandle, ConstraintHandle};
use crate::physics::simulation_config::SimulationConfig;
use crate::utilities::memory::IdPool;

/// Counters describing one call to [`Simulation::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Candidate pairs reported by the broad phase.
    pub pairs: usize,
    /// Pairs the narrow phase found touching or about to touch.
    pub contacts: usize,
    /// Live manifolds after the step.
    pub manifolds: usize,
    /// Contacts cached across all manifolds after the step.
    pub cached_contacts: usize,
    /// Contacts resolved at a time of impact inside the step.
    pub impacts: usize,
}

/// Orchestrates the bookkeeping and execution of a full dynamic simulation.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    bodies: Bodies,
    joints: Vec<Option<JointConstraint>>,
    joint_handles: IdPool,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    manifolds: ManifoldCollector,

    // Per-step scratch, kept to reuse allocations.
    pairs: Vec<CollisionPair>,
    impacts: Vec<Contact>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        info!(
            iterations = config.solver.iterations,
            ccd = config.enable_ccd,
            "creating simulation"
        );
        Ok(Self {
            bodies: Bodies::with_capacity(config.initial_body_capacity),
            joints: Vec::new(),
            joint_handles: IdPool::with_capacity(16),
            broad_phase: BroadPhase::with_capacity(config.initial_body_capacity),
            narrow_phase: NarrowPhase::new(config.arena_capacity, config.contact_bias, config.max_ccd_iterations),
            manifolds: ManifoldCollector::new(),
            pairs: Vec::new(),
            impacts: Vec::new(),
            config,
        })
    }

    #[inline(always)]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// All bodies, for rendering and queries.
    #[inline(always)]
    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    #[inline(always)]
    pub fn manifolds(&self) -> &ManifoldCollector {
        &self.manifolds
    }

    pub fn add_body(&mut self, description: &BodyDescription) -> BodyHandle {
        self.bodies.add(description)
    }

    /// Removes a body along with every joint and cached contact that refers to it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<Body, SimulationError> {
        let body = self.bodies.remove(handle)?;
        self.manifolds.remove_body(handle);
        for (index, slot) in self.joints.iter_mut().enumerate() {
            let attached = slot.as_ref().is_some_and(|joint| {
                let (a, b) = joint.bodies();
                a == handle || b == handle
            });
            if attached {
                *slot = None;
                self.joint_handles.return_id(index as i32);
                trace!(joint = %ConstraintHandle(index as i32), body = %handle, "removed joint with body");
            }
        }
        Ok(body)
    }

    #[inline]
    pub fn body(&self, handle: BodyHandle) -> Result<&Body, SimulationError> {
        self.bodies.try_get(handle)
    }

    #[inline]
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body, SimulationError> {
        self.bodies.get_mut(handle).ok_or(SimulationError::UnknownBody(handle))
    }

    /// Adds a joint between two existing bodies, at least one of them dynamic.
    pub fn add_constraint(&mut self, joint: impl Into<JointConstraint>) -> Result<ConstraintHandle, SimulationError> {
        let joint = joint.into();
        let (a, b) = joint.bodies();
        if a == b {
            return Err(SimulationError::SameBody(a));
        }
        let body_a = self.bodies.try_get(a)?;
        let body_b = self.bodies.try_get(b)?;
        if body_a.is_static() && body_b.is_static() {
            return Err(SimulationError::StaticPair(a, b));
        }

        let handle = ConstraintHandle(self.joint_handles.take());
        let index = handle.index();
        if index >= self.joints.len() {
            self.joints.resize_with(index + 1, || None);
        }
        self.joints[index] = Some(joint);
        trace!(%handle, %a, %b, "added joint");
        Ok(handle)
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<JointConstraint, SimulationError> {
        if handle.0 < 0 {
            return Err(SimulationError::UnknownConstraint(handle));
        }
        let joint = self
            .joints
            .get_mut(handle.index())
            .and_then(Option::take)
            .ok_or(SimulationError::UnknownConstraint(handle))?;
        self.joint_handles.return_id(handle.0);
        Ok(joint)
    }

    pub fn constraint(&self, handle: ConstraintHandle) -> Result<&JointConstraint, SimulationError> {
        if handle.0 < 0 {
            return Err(SimulationError::UnknownConstraint(handle));
        }
        self.joints
            .get(handle.index())
            .and_then(Option::as_ref)
            .ok_or(SimulationError::UnknownConstraint(handle))
    }

    pub fn constraint_count(&self) -> usize {
        self.joints.iter().flatten().count()
    }

    /// Performs one timestep of the given length.
    ///
    /// Gravity and accumulated forces are applied first. Contacts are then gathered, joints and
    /// cached contacts are solved, and bodies are advanced through any impacts found inside the
    /// step before integrating the rest of `dt`.
    pub fn step(&mut self, dt: f32) -> StepStats {
        if !(dt > 0.0 && dt.is_finite()) {
            warn!(dt, "ignoring step with a non-positive duration");
            return StepStats::default();
        }

        self.integrate_velocities(dt);
        let mut stats = self.collision_detection(dt);
        self.solve(dt);
        stats.impacts = self.integrate_poses(dt);
        stats.manifolds = self.manifolds.len();
        stats.cached_contacts = self.manifolds.contact_count();

        debug!(
            pairs = stats.pairs,
            contacts = stats.contacts,
            manifolds = stats.manifolds,
            cached_contacts = stats.cached_contacts,
            impacts = stats.impacts,
            "step"
        );
        stats
    }

    /// Applies gravity as an impulse, then turns accumulated forces into velocity.
    fn integrate_velocities(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        for (_, body) in self.bodies.iter_mut() {
            if !body.is_static() {
                let impulse = gravity * (body.mass() * dt);
                body.apply_impulse_linear(impulse);
            }
            body.integrate_forces(dt);
        }
    }

    /// Expires stale cached contacts, finds candidate pairs and runs the narrow phase on each.
    /// Resting contacts go to the manifolds; contacts with a time of impact are queued in time
    /// order.
    fn collision_detection(&mut self, dt: f32) -> StepStats {
        let mut stats = StepStats::default();
        self.manifolds.remove_expired(&self.bodies);

        self.broad_phase.find_pairs(&self.bodies, dt, &mut self.pairs);
        stats.pairs = self.pairs.len();

        self.impacts.clear();
        for pair in &self.pairs {
            let (Some(a), Some(b)) = (self.bodies.get(pair.a), self.bodies.get(pair.b)) else {
                continue;
            };
            if a.is_static() && b.is_static() {
                continue;
            }
            let contact = if self.config.enable_ccd {
                self.narrow_phase.intersect_dynamic((pair.a, a), (pair.b, b), dt)
            } else {
                self.narrow_phase.intersect((pair.a, a), (pair.b, b))
            };
            let Some(contact) = contact else {
                continue;
            };
            stats.contacts += 1;
            if contact.time_of_impact == 0.0 {
                self.manifolds.add_contact(contact, &self.bodies);
            } else {
                self.impacts.push(contact);
            }
        }
        self.impacts
            .sort_by(|a, b| a.time_of_impact.total_cmp(&b.time_of_impact));
        stats
    }

    /// Runs the pre-solve, iterate, post-solve cycle over joints and cached contacts.
    fn solve(&mut self, dt: f32) {
        let settings = self.config.solver;
        for joint in self.joints.iter_mut().flatten() {
            let (a, b) = joint.bodies();
            if let Some((body_a, body_b)) = self.bodies.get_pair_mut(a, b) {
                joint.pre_solve(body_a, body_b, &settings, dt);
            }
        }
        self.manifolds.pre_solve(&mut self.bodies, &settings, dt);

        for _ in 0..settings.iterations {
            for joint in self.joints.iter_mut().flatten() {
                let (a, b) = joint.bodies();
                if let Some((body_a, body_b)) = self.bodies.get_pair_mut(a, b) {
                    joint.solve(body_a, body_b, &settings);
                }
            }
            self.manifolds.solve(&mut self.bodies, &settings);
        }

        for joint in self.joints.iter_mut().flatten() {
            joint.post_solve(&settings);
        }
        self.manifolds.post_solve(&settings);
    }

    /// Advances every body through the queued impacts in time order, resolving each at its time
    /// of impact, then integrates whatever remains of `dt`. Returns the number of impacts.
    fn integrate_poses(&mut self, dt: f32) -> usize {
        let mut elapsed = 0.0;
        for contact in &self.impacts {
            let step = (contact.time_of_impact - elapsed).max(0.0);
            if step > 0.0 {
                for (_, body) in self.bodies.iter_mut() {
                    body.update(step);
                }
                elapsed += step;
            }
            if let Some((a, b)) = self.bodies.get_pair_mut(contact.a, contact.b) {
                contact.resolve(a, b);
            }
        }

        let remaining = dt - elapsed;
        if remaining > 0.0 {
            for (_, body) in self.bodies.iter_mut() {
                body.update(remaining);
            }
        }
        self.impacts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::{BodyVelocity, RigidPose};
    use crate::physics::collidables::{Cuboid, Shape, Sphere};
    use crate::physics::constraints::{BallSocketConstraint, DistanceConstraint};
    use crate::physics::errors::ConfigError;
    use crate::physics::simulation_config::SolverSettings;
    use approx::assert_abs_diff_eq;
    use glam::{Quat, Vec3};
    use std::sync::Arc;

    fn sphere(position: Vec3, mass: f32) -> BodyDescription {
        BodyDescription::create_dynamic(RigidPose::from_position(position), Arc::new(Shape::from(Sphere::new(0.5))), mass)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulationConfig::default().with_solver(SolverSettings::default().with_gauss_seidel_iterations(0));
        let error = Simulation::new(config).unwrap_err();
        assert_eq!(
            error,
            SimulationError::Config(ConfigError::ZeroCount {
                field: "gauss_seidel_iterations"
            })
        );
    }

    #[test]
    fn test_free_fall_matches_gravity() {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        let ball = simulation.add_body(&sphere(Vec3::new(0.0, 10.0, 0.0), 1.0));
        let dt = 1.0 / 60.0;
        for _ in 0..60 {
            simulation.step(dt);
        }
        let body = simulation.body(ball).unwrap();
        assert_abs_diff_eq!(body.velocity.linear.y, -9.8, epsilon = 1e-3);
        // Semi-implicit Euler falls slightly further than the analytic 4.9.
        assert!(body.position().y < 5.1 && body.position().y > 4.9);
    }

    #[test]
    fn test_static_bodies_never_move() {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        let ground = simulation.add_body(&BodyDescription::create_static(
            RigidPose::new(Vec3::ZERO, Quat::from_rotation_y(0.3)),
            Arc::new(Shape::from(Cuboid::new(Vec3::new(5.0, 0.5, 5.0)).unwrap())),
        ));
        simulation.add_body(&sphere(Vec3::new(0.0, 0.9, 0.0), 1.0).with_velocity(BodyVelocity::linear(Vec3::new(0.0, -5.0, 0.0))));
        let before = simulation.body(ground).unwrap().pose;
        for _ in 0..30 {
            simulation.step(1.0 / 60.0);
        }
        assert_eq!(simulation.body(ground).unwrap().pose, before);
    }

    #[test]
    fn test_orientation_stays_normalized() {
        let mut simulation = Simulation::new(SimulationConfig::default().with_gravity(Vec3::ZERO)).unwrap();
        let spinner = simulation.add_body(
            &BodyDescription::create_dynamic(
                RigidPose::IDENTITY,
                Arc::new(Shape::from(Cuboid::new(Vec3::new(1.0, 0.2, 0.5)).unwrap())),
                3.0,
            )
            .with_velocity(BodyVelocity::new(Vec3::ZERO, Vec3::new(4.0, 7.0, -2.0))),
        );
        for _ in 0..240 {
            simulation.step(1.0 / 60.0);
            let q = simulation.body(spinner).unwrap().orientation();
            assert_abs_diff_eq!(q.length(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_constraint_validation() {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        let shape = Arc::new(Shape::from(Sphere::new(0.5)));
        let wall = simulation.add_body(&BodyDescription::create_static(RigidPose::IDENTITY, shape.clone()));
        let floor = simulation.add_body(&BodyDescription::create_static(RigidPose::from_position(Vec3::X), shape));
        let ball = simulation.add_body(&sphere(Vec3::new(0.0, 3.0, 0.0), 1.0));

        let statics = BallSocketConstraint::new(
            (wall, simulation.body(wall).unwrap()),
            (floor, simulation.body(floor).unwrap()),
            Vec3::ZERO,
        );
        assert_eq!(simulation.add_constraint(statics), Err(SimulationError::StaticPair(wall, floor)));

        let same = BallSocketConstraint::new(
            (ball, simulation.body(ball).unwrap()),
            (ball, simulation.body(ball).unwrap()),
            Vec3::ZERO,
        );
        assert_eq!(simulation.add_constraint(same), Err(SimulationError::SameBody(ball)));

        let rope = DistanceConstraint::new(
            (wall, simulation.body(wall).unwrap()),
            (ball, simulation.body(ball).unwrap()),
            Vec3::ZERO,
            Vec3::new(0.0, 3.0, 0.0),
        );
        let handle = simulation.add_constraint(rope).unwrap();
        assert_eq!(simulation.constraint_count(), 1);

        simulation.remove_body(ball).unwrap();
        assert_eq!(simulation.constraint_count(), 0);
        assert_eq!(
            simulation.remove_constraint(handle).unwrap_err(),
            SimulationError::UnknownConstraint(handle)
        );
    }

    #[test]
    fn test_non_positive_step_is_ignored() {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        let ball = simulation.add_body(&sphere(Vec3::ZERO, 1.0));
        assert_eq!(simulation.step(0.0), StepStats::default());
        assert_eq!(simulation.body(ball).unwrap().position(), Vec3::ZERO);
    }
}
