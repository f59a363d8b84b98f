//! Contact between colliding bodies and the model's ground plane.
//!
//! The plane passes through the translation of the ground transform with the
//! transform's local z axis as its normal. Shape corners below the plane are
//! pushed back out along the normal, with Coulomb friction (scaled by the
//! body's `mu`) cancelling tangential slip of the corner since the start of
//! the substep.

use cgmath::{InnerSpace, Matrix4, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::body::Body;
use crate::constraint::{ConstraintSolver, Correction, SolveContext};

#[derive(Copy, Clone, Debug, Default)]
pub struct GroundContact;

impl GroundContact {
    pub fn new() -> Self {
        GroundContact
    }

    fn plane(ground: &Matrix4<f32>) -> (Vector3<f32>, Vector3<f32>) {
        (ground.w.truncate(), ground.z.truncate().normalize())
    }
}

/// Signed distance of `p` above the plane through `origin` along `normal`.
fn height(p: Vector3<f32>, origin: Vector3<f32>, normal: Vector3<f32>) -> f32 {
    normal.dot(p - origin)
}

impl GroundContact {
    /// Averaged corner corrections of one body.
    fn jacobi_body(
        i: usize,
        body: &Body,
        origin: Vector3<f32>,
        normal: Vector3<f32>,
    ) -> Vec<Correction> {
        let mu = body.mu();
        let contacts: Vec<(Vector3<f32>, Vector3<f32>)> = body
            .shape()
            .vertices()
            .into_iter()
            .filter_map(|local| {
                let p = body.world_point(local);
                let d = height(p, origin, normal);
                if d >= 0.0 {
                    return None;
                }
                let mut dx = normal * -d;
                let slip = p - body.world_point_prev(local);
                let tangent = slip - normal * normal.dot(slip);
                let t_len = tangent.magnitude();
                if mu > 0.0 && t_len > 0.0 {
                    dx -= tangent * (t_len.min(mu * -d) / t_len);
                }
                Some((local, dx))
            })
            .collect();

        // Jacobi averaging: the corners of one body share its correction.
        let share = 1.0 / contacts.len().max(1) as f32;
        contacts
            .into_iter()
            .map(|(local, dx)| Correction {
                body: i,
                dx: body.point_correction(local, dx * share),
            })
            .collect()
    }

    fn shock_body(
        i: usize,
        body: &Body,
        origin: Vector3<f32>,
        normal: Vector3<f32>,
    ) -> Option<Correction> {
        let deepest = body
            .shape()
            .vertices()
            .into_iter()
            .map(|local| height(body.world_point(local), origin, normal))
            .fold(0.0, f32::min);
        (deepest < 0.0).then(|| Correction {
            body: i,
            dx: body.translation_correction(normal * -deepest),
        })
    }
}

/// Runs `f` on every colliding body and appends what it yields to `out`,
/// in body order.
#[cfg(feature = "parallel")]
fn collect_per_body<F, I>(bodies: &[Body], out: &mut Vec<Correction>, f: F)
where
    F: Fn(usize, &Body) -> I + Sync + Send,
    I: IntoIterator<Item = Correction>,
    I::IntoIter: Send,
{
    let found: Vec<Correction> = bodies
        .par_iter()
        .enumerate()
        .filter(|(_, b)| b.collide())
        .flat_map_iter(|(i, b)| f(i, b))
        .collect();
    out.extend(found);
}

#[cfg(not(feature = "parallel"))]
fn collect_per_body<F, I>(bodies: &[Body], out: &mut Vec<Correction>, f: F)
where
    F: Fn(usize, &Body) -> I + Sync + Send,
    I: IntoIterator<Item = Correction>,
    I::IntoIter: Send,
{
    out.extend(
        bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| b.collide())
            .flat_map(|(i, b)| f(i, b)),
    );
}

impl ConstraintSolver for GroundContact {
    fn name(&self) -> &str {
        "ground"
    }

    fn solve_jacobi(&self, bodies: &[Body], ctx: &SolveContext, out: &mut Vec<Correction>) {
        let (origin, normal) = Self::plane(&ctx.ground);
        collect_per_body(bodies, out, |i, b| Self::jacobi_body(i, b, origin, normal));
    }

    /// Lifts each body out by its deepest remaining penetration.
    fn solve_shock(&self, bodies: &[Body], ctx: &SolveContext, out: &mut Vec<Correction>) {
        let (origin, normal) = Self::plane(&ctx.ground);
        collect_per_body(bodies, out, |i, b| Self::shock_body(i, b, origin, normal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Accumulator;
    use crate::constraint::accumulate;
    use crate::se3;
    use crate::shape::Shape;
    use approx::assert_abs_diff_eq;
    use cgmath::{Matrix3, SquareMatrix};

    fn ctx() -> SolveContext {
        SolveContext {
            step: 0,
            substep: 0,
            iter: Some(0),
            hs: 0.01,
            gravity: Vector3::new(0.0, 0.0, -980.0),
            ground: Matrix4::identity(),
        }
    }

    fn sunk_cube(depth: f32) -> Body {
        let mut body = Body::rigid(Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)), 1.0).unwrap();
        body.set_init_transform(Matrix4::from_translation(Vector3::new(0.0, 0.0, 0.5 - depth)));
        body
    }

    #[test]
    fn no_contact_above_ground() {
        let bodies = vec![sunk_cube(-0.1)];
        let mut out = Vec::new();
        GroundContact.solve_jacobi(&bodies, &ctx(), &mut out);
        GroundContact.solve_shock(&bodies, &ctx(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn non_colliding_bodies_are_ignored() {
        let mut body = sunk_cube(0.2);
        if let Body::Rigid(b) = &mut body {
            b.collide = false;
        }
        let mut out = Vec::new();
        GroundContact.solve_jacobi(&[body], &ctx(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn flat_cube_is_pushed_straight_up() {
        let mut bodies = vec![sunk_cube(0.1)];
        let mut out = Vec::new();
        GroundContact.solve_jacobi(&bodies, &ctx(), &mut out);
        assert_eq!(out.len(), 4);
        accumulate(&mut bodies, &out, Accumulator::Jacobi);
        bodies[0].apply_jacobi();
        let p = bodies[0].position();
        assert!(p.z > 0.4 && p.z <= 0.5 + 1e-6);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn shock_removes_remaining_penetration() {
        let mut bodies = vec![sunk_cube(0.1)];
        let mut out = Vec::new();
        GroundContact.solve_shock(&bodies, &ctx(), &mut out);
        accumulate(&mut bodies, &out, Accumulator::Shock);
        bodies[0].apply_jacobi_shock();
        assert_abs_diff_eq!(bodies[0].position().z, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn corrections_come_out_in_body_order() {
        let mut bodies: Vec<Body> = (0..64).map(|i| sunk_cube(0.01 * (i % 7) as f32)).collect();
        if let Body::Rigid(b) = &mut bodies[5] {
            b.collide = false;
        }
        let mut out = Vec::new();
        GroundContact.solve_jacobi(&bodies, &ctx(), &mut out);

        let (origin, normal) = GroundContact::plane(&ctx().ground);
        let expected: Vec<Correction> = bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| b.collide())
            .flat_map(|(i, b)| GroundContact::jacobi_body(i, b, origin, normal))
            .collect();
        assert!(!expected.is_empty());
        assert_eq!(out, expected);
        assert!(out.windows(2).all(|w| w[0].body <= w[1].body));
        assert!(out.iter().all(|c| c.body != 5));

        let mut shock = Vec::new();
        GroundContact.solve_shock(&bodies, &ctx(), &mut shock);
        let sunk = bodies.iter().enumerate().filter(|(i, _)| i % 7 != 0 && *i != 5).count();
        assert_eq!(shock.len(), sunk);
    }

    #[test]
    fn tilted_ground_normal() {
        let tilt = se3::aa_to_mat(Vector3::new(1.0, 0.0, 0.0), 0.3);
        let ground = se3::compose_transform(tilt, Vector3::new(0.0, 0.0, 0.0));
        let (_, n) = GroundContact::plane(&ground);
        assert_abs_diff_eq!(n, tilt * Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        let (o, _) = GroundContact::plane(&Matrix4::from(Matrix3::identity()));
        assert_eq!(o, Vector3::new(0.0, 0.0, 0.0));
    }
}
