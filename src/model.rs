//! The body collection, global parameters and the stepping loop.
//!
//! One outer step of length `h` is split into `substeps` substeps of length
//! `hs = h / substeps`. Each substep runs these phases, each finished for
//! every body before the next one starts:
//!
//! 1. predict: `step_bdf1` on every body,
//! 2. `iters` Jacobi rounds: clear, generators emit, sum, apply,
//! 3. one shock pass: clear, generators emit, sum, apply,
//! 4. regularize.
//!
//! The corrected `x` then becomes the next substep's `x0` inside the next
//! `step_bdf1`.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use log::{debug, info, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::body::{Accumulator, Body};
use crate::constraint::{accumulate, ConstraintSolver, Correction, SolveContext};
use crate::error::{SimError, SimResult};
use crate::ground::GroundContact;

/// Rounding slack, in steps, when comparing elapsed time to `t_end`.
const END_TIME_EPS: f32 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Initialized,
    Stepping,
    Finished,
}

pub struct Model {
    pub t_end: f32,
    pub h: f32,
    pub substeps: u32,
    pub iters: u32,
    pub gravity: Vector3<f32>,
    pub ground_e: Matrix4<f32>,

    // Viewer bookkeeping, not used by the integrator.
    pub ground_size: f32,
    pub axis: [f32; 6],

    bodies: Vec<Body>,
    constraints: Vec<Box<dyn ConstraintSolver>>,
    corrections: Vec<Correction>,
    state: ModelState,
    k: u32,
    t: f32,
}

impl Default for Model {
    fn default() -> Self {
        Model {
            t_end: 1.0,
            h: 1.0 / 30.0,
            substeps: 1,
            iters: 1,
            gravity: Vector3::new(0.0, 0.0, -980.0),
            ground_e: Matrix4::identity(),
            ground_size: 10.0,
            axis: [-5.0, 5.0, -5.0, 5.0, 0.0, 5.0],
            bodies: Vec::new(),
            constraints: Vec::new(),
            corrections: Vec::new(),
            state: ModelState::Uninitialized,
            k: 0,
            t: 0.0,
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.constraints.iter().map(|c| c.name()).collect();
        f.debug_struct("Model")
            .field("state", &self.state)
            .field("bodies", &self.bodies.len())
            .field("constraints", &names)
            .field("h", &self.h)
            .field("substeps", &self.substeps)
            .field("iters", &self.iters)
            .field("t", &self.t)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_uninitialized(&self) -> SimResult<()> {
        if self.state == ModelState::Uninitialized {
            Ok(())
        } else {
            Err(SimError::AlreadyInitialized)
        }
    }

    /// Appends a body and returns its index.
    pub fn add_body(&mut self, body: impl Into<Body>) -> SimResult<usize> {
        self.ensure_uninitialized()?;
        self.bodies.push(body.into());
        Ok(self.bodies.len() - 1)
    }

    pub fn add_constraint(&mut self, solver: impl ConstraintSolver + 'static) -> SimResult<()> {
        self.ensure_uninitialized()?;
        self.constraints.push(Box::new(solver));
        Ok(())
    }

    /// Registers contact against the plane of `ground_e`.
    pub fn with_ground_contact(mut self) -> SimResult<Self> {
        self.add_constraint(GroundContact::new())?;
        Ok(self)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Bodies may still be configured before `init`; afterwards only their
    /// state changes, through stepping.
    pub fn bodies_mut(&mut self) -> SimResult<&mut [Body]> {
        self.ensure_uninitialized()?;
        Ok(&mut self.bodies)
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Completed outer steps.
    pub fn step_count(&self) -> u32 {
        self.k
    }

    /// Elapsed simulated time.
    pub fn time(&self) -> f32 {
        self.t
    }

    pub fn hs(&self) -> f32 {
        self.h / self.substeps as f32
    }

    /// Validates parameters and puts every body at its initial configuration.
    pub fn init(&mut self) -> SimResult<()> {
        self.ensure_uninitialized()?;
        if !(self.h.is_finite() && self.h > 0.0) {
            return Err(SimError::InvalidTimeStep(self.h));
        }
        if self.substeps == 0 {
            return Err(SimError::InvalidSubsteps);
        }
        if self.t_end.is_nan() || self.t_end < 0.0 {
            return Err(SimError::InvalidEndTime(self.t_end));
        }
        for body in self.bodies.iter_mut() {
            body.update_mass()?;
        }
        for body in self.bodies.iter_mut() {
            body.reset();
        }
        self.bodies.shrink_to_fit();
        self.k = 0;
        self.t = 0.0;
        self.state = if self.t_end > 0.0 {
            ModelState::Initialized
        } else {
            ModelState::Finished
        };
        info!(
            "model initialized: {} bodies, {} constraint generators, h = {}, {} substeps x {} iters",
            self.bodies.len(),
            self.constraints.len(),
            self.h,
            self.substeps,
            self.iters
        );
        Ok(())
    }

    /// Advances the model by one outer step of length `h` on the host.
    pub fn step(&mut self) -> SimResult<ModelState> {
        self.step_on(&mut HostPhases)
    }

    /// Advances the model by one outer step, running the per-body predict
    /// and regularize phases on `phases`.
    pub fn step_on(&mut self, phases: &mut impl BodyPhases) -> SimResult<ModelState> {
        match self.state {
            ModelState::Uninitialized => return Err(SimError::NotInitialized),
            ModelState::Finished => return Err(SimError::Finished(self.t)),
            ModelState::Initialized | ModelState::Stepping => {}
        }
        self.state = ModelState::Stepping;

        for ks in 0..self.substeps {
            self.substep(phases, self.k, ks)?;
        }

        self.k += 1;
        self.t = self.k as f32 * self.h;
        debug!("step {} done, t = {}", self.k, self.t);
        if self.t >= self.t_end - END_TIME_EPS * self.h {
            info!("simulation finished at t = {}", self.t);
            self.state = ModelState::Finished;
        }
        Ok(self.state)
    }

    /// Steps until finished; returns the number of steps taken, zero when the
    /// model is already finished.
    pub fn simulate(&mut self) -> SimResult<u32> {
        let mut steps = 0;
        while self.state != ModelState::Finished {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    fn substep(&mut self, phases: &mut impl BodyPhases, k: u32, ks: u32) -> SimResult<()> {
        let hs = self.hs();
        let gravity = self.gravity;
        trace!("substep {k}.{ks}, hs = {hs}");

        phases.predict(&mut self.bodies, k, ks, hs, gravity)?;

        let mut ctx = SolveContext {
            step: k,
            substep: ks,
            iter: None,
            hs,
            gravity,
            ground: self.ground_e,
        };

        for iter in 0..self.iters {
            ctx.iter = Some(iter);
            for_each_body(&mut self.bodies, Body::clear_jacobi);
            self.gather(&ctx, Accumulator::Jacobi);
            for_each_body(&mut self.bodies, Body::apply_jacobi);
        }

        ctx.iter = None;
        for_each_body(&mut self.bodies, Body::clear_shock);
        self.gather(&ctx, Accumulator::Shock);
        for_each_body(&mut self.bodies, Body::apply_jacobi_shock);

        phases.regularize(&mut self.bodies)
    }

    /// Runs every generator over the (read-only) bodies and sums what they
    /// emit into `target`.
    fn gather(&mut self, ctx: &SolveContext, target: Accumulator) {
        self.corrections.clear();
        for solver in &self.constraints {
            match target {
                Accumulator::Jacobi => solver.solve_jacobi(&self.bodies, ctx, &mut self.corrections),
                Accumulator::Shock => solver.solve_shock(&self.bodies, ctx, &mut self.corrections),
            }
        }
        if !self.corrections.is_empty() {
            trace!("{:?}: {} corrections", target, self.corrections.len());
        }
        accumulate(&mut self.bodies, &self.corrections, target);
    }
}

/// Executes the per-body phases of a substep that read no other body.
pub trait BodyPhases {
    /// `step_bdf1` on every body.
    fn predict(
        &mut self,
        bodies: &mut [Body],
        step: u32,
        substep: u32,
        hs: f32,
        gravity: Vector3<f32>,
    ) -> SimResult<()>;

    /// `regularize` on every body.
    fn regularize(&mut self, bodies: &mut [Body]) -> SimResult<()>;
}

/// Host execution, one rayon task per body with the `parallel` feature.
#[derive(Copy, Clone, Debug, Default)]
pub struct HostPhases;

impl BodyPhases for HostPhases {
    fn predict(
        &mut self,
        bodies: &mut [Body],
        step: u32,
        substep: u32,
        hs: f32,
        gravity: Vector3<f32>,
    ) -> SimResult<()> {
        for_each_body(bodies, |b| b.step_bdf1(step, substep, hs, gravity));
        Ok(())
    }

    fn regularize(&mut self, bodies: &mut [Body]) -> SimResult<()> {
        for_each_body(bodies, Body::regularize);
        Ok(())
    }
}

#[cfg(feature = "parallel")]
fn for_each_body<F>(bodies: &mut [Body], f: F)
where
    F: Fn(&mut Body) + Sync + Send,
{
    bodies.par_iter_mut().for_each(f);
}

#[cfg(not(feature = "parallel"))]
fn for_each_body<F>(bodies: &mut [Body], f: F)
where
    F: Fn(&mut Body) + Sync + Send,
{
    bodies.iter_mut().for_each(f);
}
