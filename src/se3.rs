//! Rotation and rigid-transform helpers shared by both body models.
//!
//! Quaternions are stored in generalized coordinates as `[x, y, z, w]`;
//! `cgmath` keeps the scalar first, so every crossing goes through
//! [`quat_from_coords`] / [`quat_to_coords`].

use cgmath::{InnerSpace, Matrix3, Matrix4, Quaternion, Rad, Rotation3, Vector3, Vector4};

pub fn quat_from_coords(c: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(c[3], c[0], c[1], c[2])
}

pub fn quat_to_coords(q: Quaternion<f32>) -> [f32; 4] {
    [q.v.x, q.v.y, q.v.z, q.s]
}

/// Rotation matrix for `angle` radians about `axis` (need not be unit length).
pub fn aa_to_mat(axis: Vector3<f32>, angle: f32) -> Matrix3<f32> {
    if axis.magnitude2() == 0.0 {
        return Matrix3::from_scale(1.0);
    }
    Matrix3::from_axis_angle(axis.normalize(), Rad(angle))
}

/// Splits a homogeneous transform into its 3x3 block and translation.
pub fn split_transform(e: &Matrix4<f32>) -> (Matrix3<f32>, Vector3<f32>) {
    let m = Matrix3::from_cols(e.x.truncate(), e.y.truncate(), e.z.truncate());
    (m, e.w.truncate())
}

pub fn compose_transform(m: Matrix3<f32>, p: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_cols(
        m.x.extend(0.0),
        m.y.extend(0.0),
        m.z.extend(0.0),
        Vector4::new(p.x, p.y, p.z, 1.0),
    )
}

/// Skew-symmetric cross-product matrix, `brac(a) * b == a.cross(b)`.
pub fn brac(a: Vector3<f32>) -> Matrix3<f32> {
    Matrix3::new(0.0, a.z, -a.y, -a.z, 0.0, a.x, a.y, -a.x, 0.0)
}

/// Quaternion derivative for a body-frame angular velocity.
pub fn w_to_qdot(q: Quaternion<f32>, w: Vector3<f32>) -> Quaternion<f32> {
    q * Quaternion::from_sv(0.0, w) * 0.5
}

/// Body-frame angular velocity for a quaternion derivative.
pub fn qdot_to_w(q: Quaternion<f32>, qdot: Quaternion<f32>) -> Vector3<f32> {
    (q.conjugate() * qdot).v * 2.0
}

/// Exponential map of the body-frame rotation `w * dt`.
///
/// Returns `None` for a zero rotation so callers can leave the orientation
/// bit-for-bit untouched.
pub fn exp_w(w: Vector3<f32>, dt: f32) -> Option<Quaternion<f32>> {
    let speed = w.magnitude();
    if speed == 0.0 || dt == 0.0 {
        return None;
    }
    Some(Quaternion::from_axis_angle(w / speed, Rad(speed * dt)))
}
