use glam::Vec3;

use super::errors::ConfigError;
use crate::utilities::memory::ArenaCapacity;

/// Describes how the constraint solver iterates each step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverSettings {
    /// Number of `solve` passes over every constraint per step.
    pub iterations: usize,
    /// Projected Gauss-Seidel sweeps used inside one constraint's `solve`.
    pub gauss_seidel_iterations: usize,
    /// Whether the previous step's multipliers seed the current step.
    pub warm_starting: bool,
    /// Magnitude band the warm-start cache is clamped to after each step.
    pub warm_start_limit: f32,
}

impl SolverSettings {
    pub const DEFAULT_ITERATIONS: usize = 5;
    pub const DEFAULT_GAUSS_SEIDEL_ITERATIONS: usize = 16;
    pub const DEFAULT_WARM_START_LIMIT: f32 = 20.0;

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_gauss_seidel_iterations(mut self, iterations: usize) -> Self {
        self.gauss_seidel_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_warm_starting(mut self, warm_starting: bool) -> Self {
        self.warm_starting = warm_starting;
        self
    }

    #[must_use]
    pub fn with_warm_start_limit(mut self, limit: f32) -> Self {
        self.warm_start_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroCount { field: "iterations" });
        }
        if self.gauss_seidel_iterations == 0 {
            return Err(ConfigError::ZeroCount {
                field: "gauss_seidel_iterations",
            });
        }
        positive("warm_start_limit", self.warm_start_limit)
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
            gauss_seidel_iterations: Self::DEFAULT_GAUSS_SEIDEL_ITERATIONS,
            warm_starting: true,
            warm_start_limit: Self::DEFAULT_WARM_START_LIMIT,
        }
    }
}

/// Everything a [`Simulation`](super::simulation::Simulation) needs to know up front.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// Acceleration applied to every dynamic body.
    pub gravity: Vec3,
    pub solver: SolverSettings,
    /// Conservative advancement steps tried per pair before giving up on a time of impact.
    pub max_ccd_iterations: usize,
    /// Support-point inflation used while searching for contacts, in world units.
    pub contact_bias: f32,
    /// Scratch capacity for one GJK/EPA query.
    pub arena_capacity: ArenaCapacity,
    /// Whether fast bodies are swept for a time of impact instead of tested at their end pose.
    pub enable_ccd: bool,
    /// Initial body storage.
    pub initial_body_capacity: usize,
}

impl SimulationConfig {
    pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);
    pub const DEFAULT_MAX_CCD_ITERATIONS: usize = 10;
    pub const DEFAULT_CONTACT_BIAS: f32 = 0.001;

    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    #[must_use]
    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    #[must_use]
    pub fn with_max_ccd_iterations(mut self, iterations: usize) -> Self {
        self.max_ccd_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_contact_bias(mut self, bias: f32) -> Self {
        self.contact_bias = bias;
        self
    }

    #[must_use]
    pub fn with_arena_capacity(mut self, capacity: ArenaCapacity) -> Self {
        self.arena_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_ccd(mut self, enable: bool) -> Self {
        self.enable_ccd = enable;
        self
    }

    #[must_use]
    pub fn with_initial_body_capacity(mut self, capacity: usize) -> Self {
        self.initial_body_capacity = capacity;
        self
    }

    /// Checks every count and scale. Gravity may be anything finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solver.validate()?;
        if self.max_ccd_iterations == 0 {
            return Err(ConfigError::ZeroCount {
                field: "max_ccd_iterations",
            });
        }
        positive("contact_bias", self.contact_bias)?;
        let capacity = self.arena_capacity;
        for (field, value) in [
            ("arena_capacity.points", capacity.points),
            ("arena_capacity.triangles", capacity.triangles),
            ("arena_capacity.edges", capacity.edges),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCount { field });
            }
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::NonPositive {
                field: "gravity",
                value: self.gravity.length(),
            });
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: Self::DEFAULT_GRAVITY,
            solver: SolverSettings::default(),
            max_ccd_iterations: Self::DEFAULT_MAX_CCD_ITERATIONS,
            contact_bias: Self::DEFAULT_CONTACT_BIAS,
            arena_capacity: ArenaCapacity::default(),
            enable_ccd: true,
            initial_body_capacity: 64,
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.solver.iterations, 5);
        assert_eq!(config.solver.gauss_seidel_iterations, 16);
        assert_eq!(config.gravity, Vec3::new(0.0, -9.8, 0.0));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = SimulationConfig::default().with_solver(SolverSettings::default().with_iterations(0));
        assert_eq!(config.validate(), Err(ConfigError::ZeroCount { field: "iterations" }));
    }

    #[test]
    fn test_non_positive_values_rejected() {
        let config = SimulationConfig::default().with_contact_bias(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { field: "contact_bias", .. })
        ));
        let settings = SolverSettings::default().with_warm_start_limit(f32::NAN);
        assert!(settings.validate().is_err());
    }
}
