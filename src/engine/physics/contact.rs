// Contact points and the sequential-impulse solver

use super::body::Body;
use crate::core::{Fix64, Vec2Fix};

/// Solver tuning shared by every contact in a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SolverParams {
    pub resolve_rate: Fix64,
    pub resolve_slop: Fix64,
}

/// One point of contact between two shapes
///
/// `normal` points from body A towards body B and `penetration` is positive
/// while the shapes overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contact {
    position: Vec2Fix,
    normal: Vec2Fix,
    penetration: Fix64,
    feature: u32,

    to_a: Vec2Fix,
    to_b: Vec2Fix,
    normal_mass: Fix64,
    tangent_mass: Fix64,
    bias: Fix64,
    bounce: Fix64,

    normal_impulse: Fix64,
    tangent_impulse: Fix64,
    bias_impulse: Fix64,
}

impl Contact {
    pub(crate) fn new(position: Vec2Fix, normal: Vec2Fix, penetration: Fix64, feature: u32) -> Self {
        Self {
            position,
            normal,
            penetration,
            feature,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Vec2Fix {
        self.position
    }

    pub fn normal(&self) -> Vec2Fix {
        self.normal
    }

    pub fn penetration(&self) -> Fix64 {
        self.penetration
    }

    /// Identifies which vertex or edge produced this point
    pub fn feature(&self) -> u32 {
        self.feature
    }

    /// Accumulated normal impulse
    pub fn normal_impulse(&self) -> Fix64 {
        self.normal_impulse
    }

    /// Accumulated friction impulse
    pub fn tangent_impulse(&self) -> Fix64 {
        self.tangent_impulse
    }

    /// Compute lever arms, effective masses and bias targets
    pub(crate) fn pre_step(&mut self, a: &Body, b: &Body, restitution: Fix64, params: &SolverParams) {
        self.to_a = self.position - a.position();
        self.to_b = self.position - b.position();

        self.normal_mass = effective_mass(a, b, self.to_a, self.to_b, self.normal);
        self.tangent_mass = effective_mass(a, b, self.to_a, self.to_b, self.normal.left());

        self.bias = params.resolve_rate * (self.penetration - params.resolve_slop).max(Fix64::ZERO);
        self.bounce = restitution * relative_velocity(a, b, self.to_a, self.to_b).dot(self.normal);

        self.normal_impulse = Fix64::ZERO;
        self.tangent_impulse = Fix64::ZERO;
        self.bias_impulse = Fix64::ZERO;
    }

    /// Seed the accumulators with last tick's impulses and apply them
    pub(crate) fn warm_start(&mut self, a: &mut Body, b: &mut Body, normal: Fix64, tangent: Fix64) {
        self.normal_impulse = normal;
        self.tangent_impulse = tangent;
        self.apply_contact_impulse(a, b, normal, tangent);
    }

    pub(crate) fn solve(&mut self, a: &mut Body, b: &mut Body, friction: Fix64, elasticity: Fix64) {
        // Position correction through the bias channel
        let bias_velocity = relative_bias_velocity(a, b, self.to_a, self.to_b).dot(self.normal);
        let mut jbn = self.normal_mass * (bias_velocity + self.bias);
        jbn = jbn.max(-self.bias_impulse);
        self.bias_impulse += jbn;
        let bias_impulse = self.normal * jbn;
        a.apply_bias(-bias_impulse, self.to_a);
        b.apply_bias(bias_impulse, self.to_b);

        let velocity = relative_velocity(a, b, self.to_a, self.to_b);

        let mut jn = self.normal_mass * (velocity.dot(self.normal) + self.bounce * elasticity);
        jn = jn.max(-self.normal_impulse);
        self.normal_impulse += jn;

        let max_tangent = friction * self.normal_impulse;
        let jt = self.tangent_mass * velocity.dot(self.normal.left());
        let accumulated = (self.tangent_impulse + jt).clamp(-max_tangent, max_tangent);
        let jt = accumulated - self.tangent_impulse;
        self.tangent_impulse = accumulated;

        self.apply_contact_impulse(a, b, jn, jt);
    }

    /// Re-apply the accumulated impulses once more
    pub(crate) fn solve_cached(&self, a: &mut Body, b: &mut Body) {
        self.apply_contact_impulse(a, b, self.normal_impulse, self.tangent_impulse);
    }

    fn apply_contact_impulse(&self, a: &mut Body, b: &mut Body, normal: Fix64, tangent: Fix64) {
        let impulse = self.normal * normal + self.normal.left() * tangent;
        a.apply_impulse(-impulse, self.to_a);
        b.apply_impulse(impulse, self.to_b);
    }
}

/// Velocity of A's contact point relative to B's
fn relative_velocity(a: &Body, b: &Body, to_a: Vec2Fix, to_b: Vec2Fix) -> Vec2Fix {
    let va = a.linear_velocity() + to_a.left() * a.angular_velocity();
    let vb = b.linear_velocity() + to_b.left() * b.angular_velocity();
    va - vb
}

/// Same as `relative_velocity`, over the position-correction channel
fn relative_bias_velocity(a: &Body, b: &Body, to_a: Vec2Fix, to_b: Vec2Fix) -> Vec2Fix {
    let va = a.bias_velocity() + to_a.left() * a.bias_rotation();
    let vb = b.bias_velocity() + to_b.left() * b.bias_rotation();
    va - vb
}

fn effective_mass(a: &Body, b: &Body, to_a: Vec2Fix, to_b: Vec2Fix, direction: Vec2Fix) -> Fix64 {
    let ra = to_a.cross(direction);
    let rb = to_b.cross(direction);
    let k = a.inv_mass() + b.inv_mass() + a.inv_inertia() * ra * ra + b.inv_inertia() * rb * rb;
    if k.is_zero() {
        Fix64::ZERO
    } else {
        Fix64::ONE / k
    }
}
