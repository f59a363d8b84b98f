use cgmath::{Array, ElementWise, InnerSpace, Matrix, Matrix3, Matrix4, Quaternion, Vector3};
use log::warn;

use crate::body::{BodyState, SpatialVelocity};
use crate::coords::Vec7;
use crate::error::SimResult;
use crate::se3;
use crate::shape::{validate_density, Shape};

const QUAT: usize = 0;
const POS: usize = 4;

/// Rigid body in maximal coordinates `[qx, qy, qz, qw, px, py, pz]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyRigid {
    pub state: BodyState<7>,
    pub collide: bool,
    pub mu: f32,
    pub layer: u32,

    pub shape: Shape,
    pub density: f32,
    // Angular
    /// Principal rotational inertia.
    pub mr: Vector3<f32>,
    // Linear
    pub mp: f32,
}

impl BodyRigid {
    pub const DOF: usize = 7;

    /// Colliding, frictionless body at the identity pose.
    pub fn new(shape: Shape, density: f32) -> SimResult<Self> {
        Self::with_contact(shape, density, true, 0.0)
    }

    pub fn with_contact(shape: Shape, density: f32, collide: bool, mu: f32) -> SimResult<Self> {
        shape.validate()?;
        validate_density(density)?;
        let (mr, mp) = shape.rigid_mass(density);
        let mut x_init = Vec7::zero();
        x_init[QUAT + 3] = 1.0;
        Ok(BodyRigid {
            state: BodyState::at_rest(x_init),
            collide,
            mu,
            layer: 0,
            shape,
            density,
            mr,
            mp,
        })
    }

    /// Re-derives `mr`/`mp` from the current shape and density.
    pub fn update_mass(&mut self) -> SimResult<()> {
        self.shape.validate()?;
        validate_density(self.density)?;
        (self.mr, self.mp) = self.shape.rigid_mass(self.density);
        Ok(())
    }

    fn pose(x: &Vec7) -> (Quaternion<f32>, Vector3<f32>) {
        (
            se3::quat_from_coords(x.segment(QUAT)),
            Vector3::from(x.segment::<3>(POS)),
        )
    }

    fn encode(q: Quaternion<f32>, p: Vector3<f32>) -> Vec7 {
        let mut x = Vec7::zero();
        x.set_segment(QUAT, &se3::quat_to_coords(q));
        x.set_segment(POS, &Into::<[f32; 3]>::into(p));
        x
    }

    /// Rotation of `x`, tolerating a quaternion that drifted off unit norm.
    fn rotation(x: &Vec7) -> Matrix3<f32> {
        let (q, _) = Self::pose(x);
        let n = q.magnitude();
        if n > 0.0 {
            Matrix3::from(q / n)
        } else {
            Matrix3::from_scale(1.0)
        }
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        Self::pose(&self.state.x).0
    }

    pub fn position(&self) -> Vector3<f32> {
        Self::pose(&self.state.x).1
    }

    pub fn compute_velocity(&self, step: u32, substep: u32, hs: f32) -> Vec7 {
        self.state.compute_velocity(step, substep, hs)
    }

    /// Predicts `x1` over one substep of length `hs` under `gravity`.
    pub fn step_bdf1(&mut self, step: u32, substep: u32, hs: f32, gravity: Vector3<f32>) {
        let xdot = self.compute_velocity(step, substep, hs);
        self.state.x0 = self.state.x;
        let (q0, p0) = Self::pose(&self.state.x0);

        // Angular: body-frame velocity, explicit gyroscopic torque, then the
        // exponential map so the prediction stays on the unit sphere.
        let qdot = se3::quat_from_coords(xdot.segment(QUAT));
        let mut w = se3::qdot_to_w(q0, qdot);
        let mut iw = self.mr.mul_element_wise(w);
        iw -= w.cross(iw) * hs;
        w = iw.div_element_wise(self.mr);
        let q1 = match se3::exp_w(w, hs) {
            Some(dq) => q0 * dq,
            None => q0,
        };

        // Linear
        let v = Vector3::from(xdot.segment::<3>(POS)) + gravity * hs;
        let p1 = p0 + v * hs;

        self.state.accept_prediction(Self::encode(q1, p1));
    }

    /// Renormalizes the orientation of `x`.
    pub fn regularize(&mut self) {
        let (q, p) = Self::pose(&self.state.x);
        let n = q.magnitude();
        let q = if n > 0.0 && n.is_finite() {
            q / n
        } else {
            warn!("rigid body orientation collapsed (|q| = {n}), resetting to identity");
            Quaternion::new(1.0, 0.0, 0.0, 0.0)
        };
        self.state.x = Self::encode(q, p);
    }

    /// Replaces the pose of `x_init` with the rigid transform `e`.
    ///
    /// Mass parameters are untouched. Call before [`Self::set_init_velocity`],
    /// which is expressed relative to the initial orientation.
    pub fn set_init_transform(&mut self, e: Matrix4<f32>) {
        let (r, p) = se3::split_transform(&e);
        let q = Quaternion::from(r).normalize();
        self.state.x_init = Self::encode(q, p);
        self.state.reset();
    }

    /// Body-frame spatial velocity to `xdot_init = [qdot, pdot]`.
    pub fn set_init_velocity(&mut self, velocity: SpatialVelocity) {
        let (q, _) = Self::pose(&self.state.x_init);
        let qdot = se3::w_to_qdot(q, velocity.angular);
        let pdot = Matrix3::from(q) * velocity.linear;
        self.state.xdot_init = Self::encode(qdot, pdot);
    }

    pub fn compute_init_transform(&self) -> Matrix4<f32> {
        let (_, p) = Self::pose(&self.state.x_init);
        se3::compose_transform(Self::rotation(&self.state.x_init), p)
    }

    pub fn transform(&self) -> Matrix4<f32> {
        let (_, p) = Self::pose(&self.state.x);
        se3::compose_transform(Self::rotation(&self.state.x), p)
    }

    pub fn world_point(&self, x: &Vec7, local: Vector3<f32>) -> Vector3<f32> {
        let (_, p) = Self::pose(x);
        p + Self::rotation(x) * local
    }

    /// Position-level correction moving body point `local` by `dx` (world).
    ///
    /// Splits the move between translation and rotation in proportion to the
    /// generalized inverse mass `1/Mp + (r x u)^T Mr^-1 (r x u)` along
    /// `u = dx / |dx|`, the same weighting a single PBD constraint uses.
    pub fn point_correction(&self, local: Vector3<f32>, dx: Vector3<f32>) -> Vec7 {
        let len = dx.magnitude();
        if len == 0.0 {
            return Vec7::zero();
        }
        let u = dx / len;
        let (q, _) = Self::pose(&self.state.x);
        let r = Self::rotation(&self.state.x);
        let rxu = local.cross(r.transpose() * u);
        let w = 1.0 / self.mp + rxu.mul_element_wise(rxu).div_element_wise(self.mr).sum();
        let lambda = len / w;

        let dtheta = rxu.div_element_wise(self.mr) * lambda;
        let dq = se3::w_to_qdot(q, dtheta);
        let dp = u * (lambda / self.mp);
        Self::encode(dq, dp)
    }

    pub fn translation_correction(dp: Vector3<f32>) -> Vec7 {
        let mut dx = Vec7::zero();
        dx.set_segment(POS, &Into::<[f32; 3]>::into(dp));
        dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use cgmath::{Rad, Rotation3, SquareMatrix};
    use std::f32::consts::FRAC_PI_4;

    fn beam() -> BodyRigid {
        BodyRigid::new(Shape::cuboid(Vector3::new(5.0, 1.0, 1.0)), 1.0).unwrap()
    }

    #[test]
    fn new_body_is_identity_at_rest() {
        let body = beam();
        assert!(body.collide);
        assert_eq!(body.mu, 0.0);
        assert_eq!(body.compute_init_transform(), Matrix4::identity());
        assert!(body.state.xdot_init.is_zero());
        assert_relative_eq!(body.mp, 5.0);
    }

    #[test]
    fn init_transform_round_trip() {
        let mut body = beam();
        let r = se3::aa_to_mat(Vector3::new(1.0, 1.0, 1.0), FRAC_PI_4);
        let e = se3::compose_transform(r, Vector3::new(0.0, 0.0, 5.0));
        let (mr, mp) = (body.mr, body.mp);
        body.set_init_transform(e);
        assert_abs_diff_eq!(body.compute_init_transform(), e, epsilon = 1e-5);
        assert_eq!(body.state.x, body.state.x_init);
        assert_eq!((body.mr, body.mp), (mr, mp));
    }

    #[test]
    fn zero_velocity_no_gravity_does_not_drift() {
        let mut body = beam();
        let r = se3::aa_to_mat(Vector3::new(0.0, 1.0, 0.0), 0.4);
        body.set_init_transform(se3::compose_transform(r, Vector3::new(1.0, 2.0, 3.0)));
        let zero = Vector3::new(0.0, 0.0, 0.0);
        for substep in 0..10 {
            body.step_bdf1(0, substep, 0.01, zero);
            assert_eq!(body.state.x1, body.state.x0);
        }
    }

    #[test]
    fn spin_about_principal_axis() {
        let mut body = beam();
        let w = Vector3::new(1.0, 0.0, 0.0);
        body.set_init_velocity(SpatialVelocity::new(Vector3::new(0.0, 0.0, 0.0), w));
        let hs = 0.01;
        body.step_bdf1(0, 0, hs, Vector3::new(0.0, 0.0, 0.0));
        let expected = Quaternion::from_axis_angle(w, Rad(hs));
        assert_abs_diff_eq!(body.orientation(), expected, epsilon = 1e-6);
        assert_abs_diff_eq!(body.orientation().magnitude(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn linear_velocity_is_rotated_to_world() {
        let mut body = beam();
        let r = se3::aa_to_mat(Vector3::new(0.0, 0.0, 1.0), std::f32::consts::FRAC_PI_2);
        body.set_init_transform(se3::compose_transform(r, Vector3::new(0.0, 0.0, 0.0)));
        body.set_init_velocity(SpatialVelocity::from([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        let pdot = Vector3::from(body.state.xdot_init.segment::<3>(POS));
        assert_abs_diff_eq!(pdot, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn regularize_restores_unit_quaternion() {
        let mut body = beam();
        body.state.x.set_segment(QUAT, &[0.3, -0.2, 0.1, 2.0]);
        body.regularize();
        assert_abs_diff_eq!(body.orientation().magnitude(), 1.0, epsilon = 1e-5);
        let once = body.state.x;
        body.regularize();
        assert!(body.state.x.max_abs_diff(&once) <= 1e-6);
    }

    #[test]
    fn regularize_recovers_from_zero_quaternion() {
        let mut body = beam();
        body.state.x.set_segment(QUAT, &[0.0; 4]);
        body.regularize();
        assert_eq!(body.orientation(), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn central_correction_is_pure_translation() {
        let body = beam();
        let dx = body.point_correction(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(dx, BodyRigid::translation_correction(Vector3::new(0.0, 0.0, 2.0)));
    }
}
