use cgmath::{InnerSpace, Matrix3, Matrix4, Vector3};

use crate::body::{BodyState, SpatialVelocity};
use crate::coords::Vec12;
use crate::error::SimResult;
use crate::se3;
use crate::shape::{validate_density, Shape};

const COLS: [usize; 3] = [0, 3, 6];
const POS: usize = 9;

/// Smallest column stretch `regularize` lets the linear part reach.
pub const MIN_STRETCH: f32 = 0.2;
/// Largest column stretch `regularize` lets the linear part reach.
pub const MAX_STRETCH: f32 = 5.0;

/// Affine body: `x = [a0, a1, a2, p]`, a world point is `p + A r` with
/// `A = [a0 a1 a2]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyAffine {
    pub state: BodyState<12>,
    pub collide: bool,
    pub mu: f32,
    pub layer: u32,

    pub shape: Shape,
    pub density: f32,
    /// Per-column affine inertia.
    pub wa: Vector3<f32>,
    pub wp: f32,
}

impl BodyAffine {
    pub const DOF: usize = 12;

    pub fn new(shape: Shape, density: f32) -> SimResult<Self> {
        Self::with_contact(shape, density, true, 0.0)
    }

    pub fn with_contact(shape: Shape, density: f32, collide: bool, mu: f32) -> SimResult<Self> {
        shape.validate()?;
        validate_density(density)?;
        let (wa, wp) = shape.affine_mass(density);
        let x_init = Self::encode(Matrix3::from_scale(1.0), Vector3::new(0.0, 0.0, 0.0));
        Ok(BodyAffine {
            state: BodyState::at_rest(x_init),
            collide,
            mu,
            layer: 0,
            shape,
            density,
            wa,
            wp,
        })
    }

    /// Re-derives `wa`/`wp` from the current shape and density.
    pub fn update_mass(&mut self) -> SimResult<()> {
        self.shape.validate()?;
        validate_density(self.density)?;
        (self.wa, self.wp) = self.shape.affine_mass(self.density);
        Ok(())
    }

    fn linear(x: &Vec12) -> Matrix3<f32> {
        Matrix3::from_cols(
            Vector3::from(x.segment::<3>(COLS[0])),
            Vector3::from(x.segment::<3>(COLS[1])),
            Vector3::from(x.segment::<3>(COLS[2])),
        )
    }

    fn translation(x: &Vec12) -> Vector3<f32> {
        Vector3::from(x.segment::<3>(POS))
    }

    fn encode(a: Matrix3<f32>, p: Vector3<f32>) -> Vec12 {
        let mut x = Vec12::zero();
        x.set_segment(COLS[0], &Into::<[f32; 3]>::into(a.x));
        x.set_segment(COLS[1], &Into::<[f32; 3]>::into(a.y));
        x.set_segment(COLS[2], &Into::<[f32; 3]>::into(a.z));
        x.set_segment(POS, &Into::<[f32; 3]>::into(p));
        x
    }

    pub fn linear_part(&self) -> Matrix3<f32> {
        Self::linear(&self.state.x)
    }

    pub fn position(&self) -> Vector3<f32> {
        Self::translation(&self.state.x)
    }

    pub fn compute_velocity(&self, step: u32, substep: u32, hs: f32) -> Vec12 {
        self.state.compute_velocity(step, substep, hs)
    }

    /// Predicts `x1`. Gravity acts on the translation only.
    pub fn step_bdf1(&mut self, step: u32, substep: u32, hs: f32, gravity: Vector3<f32>) {
        let mut v = self.compute_velocity(step, substep, hs);
        self.state.x0 = self.state.x;
        for (i, g) in Into::<[f32; 3]>::into(gravity).into_iter().enumerate() {
            v[POS + i] += hs * g;
        }
        let x1 = self.state.x0 + v * hs;
        self.state.accept_prediction(x1);
    }

    /// Clamps each column of the linear part into
    /// `[MIN_STRETCH, MAX_STRETCH]` so the map cannot blow up or collapse.
    pub fn regularize(&mut self) {
        for &c in &COLS {
            let col = Vector3::from(self.state.x.segment::<3>(c));
            let n = col.magnitude();
            let target = n.clamp(MIN_STRETCH, MAX_STRETCH);
            if n > 0.0 && n.is_finite() && target != n {
                self.state
                    .x
                    .set_segment(c, &Into::<[f32; 3]>::into(col * (target / n)));
            }
        }
    }

    /// Replaces the map of `x_init` with the 3x3 block and translation of `e`.
    pub fn set_init_transform(&mut self, e: Matrix4<f32>) {
        let (a, p) = se3::split_transform(&e);
        self.state.x_init = Self::encode(a, p);
        self.state.reset();
    }

    /// Body-frame spatial velocity to `xdot_init = [A [w]x, A v]`.
    pub fn set_init_velocity(&mut self, velocity: SpatialVelocity) {
        let a = Self::linear(&self.state.x_init);
        let adot = a * se3::brac(velocity.angular);
        self.state.xdot_init = Self::encode(adot, a * velocity.linear);
    }

    pub fn compute_init_transform(&self) -> Matrix4<f32> {
        se3::compose_transform(
            Self::linear(&self.state.x_init),
            Self::translation(&self.state.x_init),
        )
    }

    pub fn transform(&self) -> Matrix4<f32> {
        se3::compose_transform(Self::linear(&self.state.x), Self::translation(&self.state.x))
    }

    pub fn world_point(&self, x: &Vec12, local: Vector3<f32>) -> Vector3<f32> {
        Self::translation(x) + Self::linear(x) * local
    }

    /// Correction moving body point `local` by `dx`, weighted by the affine
    /// inverse mass `1/Wp + sum_i r_i^2 / Wa_i`.
    pub fn point_correction(&self, local: Vector3<f32>, dx: Vector3<f32>) -> Vec12 {
        let len = dx.magnitude();
        if len == 0.0 {
            return Vec12::zero();
        }
        let u = dx / len;
        let w = 1.0 / self.wp + (0..3).map(|i| local[i] * local[i] / self.wa[i]).sum::<f32>();
        let lambda = len / w;

        let mut out = Vec12::zero();
        for (i, &c) in COLS.iter().enumerate() {
            let da = u * (lambda * local[i] / self.wa[i]);
            out.set_segment(c, &Into::<[f32; 3]>::into(da));
        }
        out.set_segment(POS, &Into::<[f32; 3]>::into(u * (lambda / self.wp)));
        out
    }

    pub fn translation_correction(dp: Vector3<f32>) -> Vec12 {
        let mut dx = Vec12::zero();
        dx.set_segment(POS, &Into::<[f32; 3]>::into(dp));
        dx
    }
}
