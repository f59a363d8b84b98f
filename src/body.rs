//! Bodies: per-body generalized state and the rigid/affine sum type.
//!
//! Every body carries its coordinates at three time levels:
//!
//! - `x0`: start of the current substep (last accepted state),
//! - `x1`: free-motion prediction for the end of the substep,
//! - `x`: the corrected coordinate, authoritative between phases,
//!
//! plus `x1_0`, the baseline that the Jacobi and shock accumulators are added
//! to. All operations here touch only the body they are called on, so the
//! model may run them for every body at once.

use cgmath::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::affine_body::BodyAffine;
use crate::coords::{GenVec, Vec12, Vec7};
use crate::error::SimResult;
use crate::rigid_body::BodyRigid;
use crate::shape::Shape;

/// Kinematic model discriminant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Affine,
    Rigid,
}

impl BodyKind {
    /// Dimension of the generalized coordinate.
    pub const fn dof(self) -> usize {
        match self {
            BodyKind::Affine => BodyAffine::DOF,
            BodyKind::Rigid => BodyRigid::DOF,
        }
    }
}

/// Which correction accumulator a contribution is summed into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Accumulator {
    Jacobi,
    Shock,
}

/// Spatial velocity in the body frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpatialVelocity {
    pub linear: Vector3<f32>,
    pub angular: Vector3<f32>,
}

impl SpatialVelocity {
    pub fn new(linear: Vector3<f32>, angular: Vector3<f32>) -> Self {
        SpatialVelocity { linear, angular }
    }
}

impl From<[f32; 6]> for SpatialVelocity {
    /// `[vx, vy, vz, wx, wy, wz]`
    fn from(v: [f32; 6]) -> Self {
        SpatialVelocity {
            linear: Vector3::new(v[0], v[1], v[2]),
            angular: Vector3::new(v[3], v[4], v[5]),
        }
    }
}

/// Coordinate-sized vector of either body model: a velocity, or a correction
/// headed for one of the accumulators.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BodyVector {
    Rigid(Vec7),
    Affine(Vec12),
}

impl BodyVector {
    pub fn zero(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Rigid => BodyVector::Rigid(Vec7::zero()),
            BodyKind::Affine => BodyVector::Affine(Vec12::zero()),
        }
    }

    pub fn kind(&self) -> BodyKind {
        match self {
            BodyVector::Rigid(_) => BodyKind::Rigid,
            BodyVector::Affine(_) => BodyKind::Affine,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        match self {
            BodyVector::Rigid(v) => v.as_slice(),
            BodyVector::Affine(v) => v.as_slice(),
        }
    }

    pub fn norm(&self) -> f32 {
        match self {
            BodyVector::Rigid(v) => v.norm(),
            BodyVector::Affine(v) => v.norm(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            BodyVector::Rigid(v) => v.is_zero(),
            BodyVector::Affine(v) => v.is_zero(),
        }
    }
}

/// Time levels and accumulators shared by both body models.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyState<const N: usize> {
    pub x_init: GenVec<N>,
    pub xdot_init: GenVec<N>,
    pub x: GenVec<N>,
    pub x0: GenVec<N>,
    pub x1: GenVec<N>,
    pub x1_0: GenVec<N>,
    pub dx_jacobi: GenVec<N>,
    pub dx_jacobi_shock: GenVec<N>,
}

impl<const N: usize> BodyState<N> {
    /// At rest in configuration `x_init`.
    pub fn at_rest(x_init: GenVec<N>) -> Self {
        BodyState {
            x_init,
            xdot_init: GenVec::zero(),
            x: x_init,
            x0: x_init,
            x1: x_init,
            x1_0: x_init,
            dx_jacobi: GenVec::zero(),
            dx_jacobi_shock: GenVec::zero(),
        }
    }

    /// Moves every time level back to `x_init` and clears both accumulators.
    pub fn reset(&mut self) {
        *self = BodyState {
            xdot_init: self.xdot_init,
            ..Self::at_rest(self.x_init)
        };
    }

    /// Generalized velocity of the free motion entering substep
    /// (`step`, `substep`).
    ///
    /// The very first substep of a run has no history and uses `xdot_init`;
    /// every later one uses the BDF1 velocity of the substep that just
    /// finished. Pure: reads `x`, `x0` and `xdot_init` only.
    pub fn compute_velocity(&self, step: u32, substep: u32, hs: f32) -> GenVec<N> {
        if step == 0 && substep == 0 {
            self.xdot_init
        } else {
            (self.x - self.x0) / hs
        }
    }

    /// Installs a new prediction as `x1`, the Jacobi baseline and `x`.
    pub fn accept_prediction(&mut self, x1: GenVec<N>) {
        self.x1 = x1;
        self.x1_0 = x1;
        self.x = x1;
    }

    pub fn clear_jacobi(&mut self) {
        self.dx_jacobi = GenVec::zero();
    }

    pub fn clear_shock(&mut self) {
        self.dx_jacobi_shock = GenVec::zero();
    }

    /// `x = x1_0 + dx_jacobi`; the result becomes the next round's baseline.
    pub fn apply_jacobi(&mut self) {
        self.x = self.x1_0 + self.dx_jacobi;
        self.x1_0 = self.x;
        self.clear_jacobi();
    }

    /// `x = x1_0 + dx_jacobi_shock`.
    pub fn apply_jacobi_shock(&mut self) {
        self.x = self.x1_0 + self.dx_jacobi_shock;
        self.clear_shock();
    }

    pub fn accumulate(&mut self, target: Accumulator, dx: &GenVec<N>) {
        match target {
            Accumulator::Jacobi => self.dx_jacobi += *dx,
            Accumulator::Shock => self.dx_jacobi_shock += *dx,
        }
    }
}

/// A simulated body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Body {
    Rigid(BodyRigid),
    Affine(BodyAffine),
}

impl From<BodyRigid> for Body {
    fn from(rigid: BodyRigid) -> Self {
        Body::Rigid(rigid)
    }
}

impl From<BodyAffine> for Body {
    fn from(affine: BodyAffine) -> Self {
        Body::Affine(affine)
    }
}

impl Body {
    /// Colliding rigid body with zero friction.
    pub fn rigid(shape: Shape, density: f32) -> SimResult<Self> {
        Ok(BodyRigid::new(shape, density)?.into())
    }

    /// Colliding affine body with zero friction.
    pub fn affine(shape: Shape, density: f32) -> SimResult<Self> {
        Ok(BodyAffine::new(shape, density)?.into())
    }

    pub fn kind(&self) -> BodyKind {
        match self {
            Body::Rigid(_) => BodyKind::Rigid,
            Body::Affine(_) => BodyKind::Affine,
        }
    }

    pub fn dof(&self) -> usize {
        self.kind().dof()
    }

    pub fn collide(&self) -> bool {
        match self {
            Body::Rigid(b) => b.collide,
            Body::Affine(b) => b.collide,
        }
    }

    pub fn mu(&self) -> f32 {
        match self {
            Body::Rigid(b) => b.mu,
            Body::Affine(b) => b.mu,
        }
    }

    pub fn layer(&self) -> u32 {
        match self {
            Body::Rigid(b) => b.layer,
            Body::Affine(b) => b.layer,
        }
    }

    pub fn set_layer(&mut self, layer: u32) {
        match self {
            Body::Rigid(b) => b.layer = layer,
            Body::Affine(b) => b.layer = layer,
        }
    }

    pub fn shape(&self) -> &Shape {
        match self {
            Body::Rigid(b) => &b.shape,
            Body::Affine(b) => &b.shape,
        }
    }

    pub fn density(&self) -> f32 {
        match self {
            Body::Rigid(b) => b.density,
            Body::Affine(b) => b.density,
        }
    }

    /// Translational mass (`Mp` or `Wp`).
    pub fn mass(&self) -> f32 {
        match self {
            Body::Rigid(b) => b.mp,
            Body::Affine(b) => b.wp,
        }
    }

    /// Recomputes the mass parameters from `shape` and `density`, rejecting
    /// invalid values.
    pub fn update_mass(&mut self) -> SimResult<()> {
        match self {
            Body::Rigid(b) => b.update_mass(),
            Body::Affine(b) => b.update_mass(),
        }
    }

    /// Current corrected coordinate.
    pub fn x(&self) -> BodyVector {
        match self {
            Body::Rigid(b) => BodyVector::Rigid(b.state.x),
            Body::Affine(b) => BodyVector::Affine(b.state.x),
        }
    }

    /// See [`BodyState::compute_velocity`].
    pub fn compute_velocity(&self, step: u32, substep: u32, hs: f32) -> BodyVector {
        match self {
            Body::Rigid(b) => BodyVector::Rigid(b.compute_velocity(step, substep, hs)),
            Body::Affine(b) => BodyVector::Affine(b.compute_velocity(step, substep, hs)),
        }
    }

    pub fn step_bdf1(&mut self, step: u32, substep: u32, hs: f32, gravity: Vector3<f32>) {
        match self {
            Body::Rigid(b) => b.step_bdf1(step, substep, hs, gravity),
            Body::Affine(b) => b.step_bdf1(step, substep, hs, gravity),
        }
    }

    pub fn clear_jacobi(&mut self) {
        match self {
            Body::Rigid(b) => b.state.clear_jacobi(),
            Body::Affine(b) => b.state.clear_jacobi(),
        }
    }

    pub fn apply_jacobi(&mut self) {
        match self {
            Body::Rigid(b) => b.state.apply_jacobi(),
            Body::Affine(b) => b.state.apply_jacobi(),
        }
    }

    pub fn clear_shock(&mut self) {
        match self {
            Body::Rigid(b) => b.state.clear_shock(),
            Body::Affine(b) => b.state.clear_shock(),
        }
    }

    pub fn apply_jacobi_shock(&mut self) {
        match self {
            Body::Rigid(b) => b.state.apply_jacobi_shock(),
            Body::Affine(b) => b.state.apply_jacobi_shock(),
        }
    }

    pub fn regularize(&mut self) {
        match self {
            Body::Rigid(b) => b.regularize(),
            Body::Affine(b) => b.regularize(),
        }
    }

    /// Sums `dx` into the chosen accumulator. A vector of the other body model
    /// is a caller bug and is dropped.
    pub fn accumulate(&mut self, target: Accumulator, dx: &BodyVector) {
        match (self, dx) {
            (Body::Rigid(b), BodyVector::Rigid(dx)) => b.state.accumulate(target, dx),
            (Body::Affine(b), BodyVector::Affine(dx)) => b.state.accumulate(target, dx),
            (body, dx) => debug_assert!(
                false,
                "{:?} correction sent to {:?} body",
                dx.kind(),
                body.kind()
            ),
        }
    }

    /// Puts every time level back to `x_init` and clears the accumulators.
    pub fn reset(&mut self) {
        match self {
            Body::Rigid(b) => b.state.reset(),
            Body::Affine(b) => b.state.reset(),
        }
    }

    pub fn set_init_transform(&mut self, e: Matrix4<f32>) {
        match self {
            Body::Rigid(b) => b.set_init_transform(e),
            Body::Affine(b) => b.set_init_transform(e),
        }
    }

    pub fn set_init_velocity(&mut self, velocity: impl Into<SpatialVelocity>) {
        let velocity = velocity.into();
        match self {
            Body::Rigid(b) => b.set_init_velocity(velocity),
            Body::Affine(b) => b.set_init_velocity(velocity),
        }
    }

    /// Initial configuration as a homogeneous transform.
    ///
    /// Only meaningful after [`Body::set_init_transform`]; before that it
    /// reports the identity pose the body was built with.
    pub fn compute_init_transform(&self) -> Matrix4<f32> {
        match self {
            Body::Rigid(b) => b.compute_init_transform(),
            Body::Affine(b) => b.compute_init_transform(),
        }
    }

    /// Current configuration `x` as a homogeneous transform.
    pub fn transform(&self) -> Matrix4<f32> {
        match self {
            Body::Rigid(b) => b.transform(),
            Body::Affine(b) => b.transform(),
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        match self {
            Body::Rigid(b) => b.position(),
            Body::Affine(b) => b.position(),
        }
    }

    /// Body-frame point mapped through the current coordinate `x`.
    pub fn world_point(&self, local: Vector3<f32>) -> Vector3<f32> {
        match self {
            Body::Rigid(b) => b.world_point(&b.state.x, local),
            Body::Affine(b) => b.world_point(&b.state.x, local),
        }
    }

    /// Body-frame point mapped through the substep-start coordinate `x0`.
    pub fn world_point_prev(&self, local: Vector3<f32>) -> Vector3<f32> {
        match self {
            Body::Rigid(b) => b.world_point(&b.state.x0, local),
            Body::Affine(b) => b.world_point(&b.state.x0, local),
        }
    }

    /// Coordinate correction that moves the body-frame point `local` by the
    /// world displacement `dx`, distributed by the body's generalized mass.
    pub fn point_correction(&self, local: Vector3<f32>, dx: Vector3<f32>) -> BodyVector {
        match self {
            Body::Rigid(b) => BodyVector::Rigid(b.point_correction(local, dx)),
            Body::Affine(b) => BodyVector::Affine(b.point_correction(local, dx)),
        }
    }

    /// Coordinate correction that translates the whole body by `dp`.
    pub fn translation_correction(&self, dp: Vector3<f32>) -> BodyVector {
        match self {
            Body::Rigid(_) => BodyVector::Rigid(BodyRigid::translation_correction(dp)),
            Body::Affine(_) => BodyVector::Affine(BodyAffine::translation_correction(dp)),
        }
    }

    /// The shock accumulator, for inspection.
    pub fn dx_jacobi_shock(&self) -> BodyVector {
        match self {
            Body::Rigid(b) => BodyVector::Rigid(b.state.dx_jacobi_shock),
            Body::Affine(b) => BodyVector::Affine(b.state.dx_jacobi_shock),
        }
    }

    /// The Jacobi accumulator, for inspection.
    pub fn dx_jacobi(&self) -> BodyVector {
        match self {
            Body::Rigid(b) => BodyVector::Rigid(b.state.dx_jacobi),
            Body::Affine(b) => BodyVector::Affine(b.state.dx_jacobi),
        }
    }
}
