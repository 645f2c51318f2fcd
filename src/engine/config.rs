// World configuration and simulation constants

use crate::core::Fix64;

/// Fixed timestep in seconds (0.02 = 50 ticks per second)
pub const DEFAULT_DELTA_TIME: Fix64 = Fix64::from_ratio(1, 50);

/// Solver passes per step; one third elastic, two thirds inelastic
pub const DEFAULT_ITERATION_COUNT: u32 = 20;

/// Velocity multiplier applied to dynamic bodies every step
pub const DEFAULT_DAMPING: Fix64 = Fix64::from_ratio(999, 1000);

pub const DEFAULT_DENSITY: Fix64 = Fix64::ONE;
pub const DEFAULT_FRICTION: Fix64 = Fix64::from_ratio(8, 10);
pub const DEFAULT_RESTITUTION: Fix64 = Fix64::from_ratio(5, 10);

/// Penetration allowed before the bias pass pushes shapes apart
pub const RESOLVE_SLOP: Fix64 = Fix64::from_ratio(1, 100);

/// Fraction of the remaining penetration resolved per step
pub const RESOLVE_RATE: Fix64 = Fix64::from_ratio(1, 10);

/// Converts shape area times density into mass
pub const AREA_MASS_RATIO: Fix64 = Fix64::from_ratio(1, 100);

pub const MIN_DYNAMIC_MASS: Fix64 = Fix64::from_ratio(1, 100_000);

/// Bisection steps used by `move_and_collide`
pub const DEFAULT_MOVE_ITERATIONS: u32 = 8;

pub const DEFAULT_MAX_SLIDES: u32 = 4;

/// Gap left between a swept body and the surface it stopped against (2^-20)
pub const DEFAULT_KINEMATIC_SKIN: Fix64 = Fix64::from_raw(1 << 12);

/// Tunable parameters of a [`PhysicsWorld`](super::physics::PhysicsWorld)
///
/// All fields are fixed-point so two peers built from the same config run
/// identical simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsConfig {
    /// Number of past ticks each moving body remembers (0 disables history)
    pub history_length: usize,

    /// Velocity multiplier applied every step (1 = no damping)
    pub damping: Fix64,

    pub delta_time: Fix64,

    pub iteration_count: u32,

    /// Dynamic bodies lighter than this are rejected at construction
    pub min_dynamic_mass: Fix64,

    pub resolve_slop: Fix64,

    pub resolve_rate: Fix64,

    pub area_mass_ratio: Fix64,

    pub move_iterations: u32,

    pub kinematic_skin: Fix64,

    /// Reuse last tick's contact impulses as the solver's starting guess
    pub warm_starting: bool,
}

impl PhysicsConfig {
    /// Defaults with the given history window and damping
    pub fn new(history_length: usize, damping: Fix64) -> Self {
        Self {
            history_length,
            damping,
            ..Self::default()
        }
    }

    pub fn with_history_length(mut self, history_length: usize) -> Self {
        self.history_length = history_length;
        self
    }

    pub fn with_damping(mut self, damping: Fix64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_delta_time(mut self, delta_time: Fix64) -> Self {
        self.delta_time = delta_time;
        self
    }

    pub fn with_iteration_count(mut self, iteration_count: u32) -> Self {
        self.iteration_count = iteration_count;
        self
    }

    pub fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    pub fn with_move_iterations(mut self, move_iterations: u32) -> Self {
        self.move_iterations = move_iterations;
        self
    }

    /// Iterations run with full restitution
    pub fn elastic_iterations(&self) -> u32 {
        self.iteration_count / 3
    }

    /// Iterations run with restitution disabled
    pub fn inelastic_iterations(&self) -> u32 {
        self.iteration_count * 2 / 3
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            history_length: 0,
            damping: DEFAULT_DAMPING,
            delta_time: DEFAULT_DELTA_TIME,
            iteration_count: DEFAULT_ITERATION_COUNT,
            min_dynamic_mass: MIN_DYNAMIC_MASS,
            resolve_slop: RESOLVE_SLOP,
            resolve_rate: RESOLVE_RATE,
            area_mass_ratio: AREA_MASS_RATIO,
            move_iterations: DEFAULT_MOVE_ITERATIONS,
            kinematic_skin: DEFAULT_KINEMATIC_SKIN,
            warm_starting: true,
        }
    }
}
