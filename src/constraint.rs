//! The seam between bodies and constraint/contact logic.
//!
//! Generators never touch a body directly. Each round they read the whole
//! body set and emit [`Correction`]s; the model then sums those into the
//! target bodies' accumulators in emission order, so a body receives every
//! contribution of a round before anything is applied, and the sum does not
//! depend on how many threads produced it.

use cgmath::{Matrix4, Vector3};

use crate::body::{Accumulator, Body, BodyVector};

/// Per-round inputs handed to every generator.
#[derive(Copy, Clone, Debug)]
pub struct SolveContext {
    pub step: u32,
    pub substep: u32,
    /// Jacobi round within the substep; `None` during the shock pass.
    pub iter: Option<u32>,
    pub hs: f32,
    pub gravity: Vector3<f32>,
    pub ground: Matrix4<f32>,
}

/// One contribution to one body's accumulator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Correction {
    pub body: usize,
    pub dx: BodyVector,
}

/// External constraint/contact logic.
pub trait ConstraintSolver: Send + Sync {
    fn name(&self) -> &str;

    /// Emits the corrections of one Jacobi round, computed from the bodies'
    /// current `x` only.
    fn solve_jacobi(&self, bodies: &[Body], ctx: &SolveContext, out: &mut Vec<Correction>);

    /// Emits the once-per-substep shock corrections. Nothing by default.
    fn solve_shock(&self, _bodies: &[Body], _ctx: &SolveContext, _out: &mut Vec<Correction>) {}
}

/// Sums `corrections` into the `target` accumulator of the bodies they name.
///
/// Corrections aimed at an index outside `bodies` are skipped.
pub fn accumulate(bodies: &mut [Body], corrections: &[Correction], target: Accumulator) {
    for c in corrections {
        match bodies.get_mut(c.body) {
            Some(body) => body.accumulate(target, &c.dx),
            None => log::warn!("dropping correction for missing body {}", c.body),
        }
    }
}
