//! Built-in scenes, selectable by id from the command line.

use std::f32::consts::FRAC_PI_4;

use cgmath::{Matrix, Matrix4, SquareMatrix, Vector3};
use log::info;

use crate::affine_body::BodyAffine;
use crate::body::{Body, SpatialVelocity};
use crate::error::{SimError, SimResult};
use crate::model::Model;
use crate::rigid_body::BodyRigid;
use crate::se3;
use crate::shape::Shape;

/// Ids accepted by [`create_model_sample`].
pub const SAMPLE_IDS: [u32; 4] = [1, 2, 3, 10];

/// Builds and initializes sample `id`.
pub fn create_model_sample(id: u32) -> SimResult<Model> {
    let mut model = match id {
        1 => resting_box()?,
        2 => affine_drop()?,
        3 => friction_row()?,
        10 => spinning_beam()?,
        _ => return Err(SimError::UnknownSample(id)),
    };
    model.init()?;
    info!("built sample {id}");
    Ok(model)
}

fn ground_scene(t_end: f32) -> Model {
    let mut model = Model::new();
    model.t_end = t_end;
    model.h = 1.0 / 30.0;
    model.substeps = 10;
    model.iters = 4;
    model.gravity = Vector3::new(0.0, 0.0, -980.0);
    model.ground_e = Matrix4::identity();
    model
}

/// A unit cube placed exactly on the ground.
fn resting_box() -> SimResult<Model> {
    let mut model = ground_scene(1.0).with_ground_contact()?;
    let cube = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0));
    let mut body: Body = BodyRigid::with_contact(cube, 1.0, true, 0.1)?.into();
    body.set_init_transform(Matrix4::from_translation(Vector3::new(0.0, 0.0, 0.5)));
    model.add_body(body)?;
    Ok(model)
}

/// A tilted affine box falling onto the ground.
fn affine_drop() -> SimResult<Model> {
    let mut model = ground_scene(2.0).with_ground_contact()?;
    let slab = Shape::cuboid(Vector3::new(2.0, 1.0, 1.0));
    let mut body: Body = BodyAffine::with_contact(slab, 1.0, true, 0.2)?.into();
    let r = se3::aa_to_mat(Vector3::new(0.0, 1.0, 0.0), 0.3);
    body.set_init_transform(se3::compose_transform(r, Vector3::new(0.0, 0.0, 3.0)));
    model.add_body(body)?;
    Ok(model)
}

/// Boxes launched along x at the same speed, each with more friction than
/// the last.
fn friction_row() -> SimResult<Model> {
    let mut model = ground_scene(2.0).with_ground_contact()?;
    model.axis = [-5.0, 15.0, -5.0, 5.0, 0.0, 5.0];
    let cube = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0));
    let launch = SpatialVelocity::new(Vector3::new(100.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0));
    for i in 0..5 {
        let mu = 0.25 * i as f32;
        let mut body: Body = BodyRigid::with_contact(cube, 1.0, true, mu)?.into();
        body.set_layer(i);
        let y = 2.0 * i as f32 - 4.0;
        body.set_init_transform(Matrix4::from_translation(Vector3::new(0.0, y, 0.5)));
        body.set_init_velocity(launch);
        model.add_body(body)?;
    }
    Ok(model)
}

/// A long beam tumbling in zero gravity.
fn spinning_beam() -> SimResult<Model> {
    let mut model = Model::new();
    model.t_end = 1.0;
    model.h = 1.0 / 30.0;
    model.substeps = 10;
    model.iters = 1;
    model.gravity = Vector3::new(0.0, 0.0, 0.0);
    model.ground_e = Matrix4::identity();
    model.ground_size = 20.0;
    model.axis = [-10.0, 10.0, -10.0, 10.0, 0.0, 10.0];

    let mut body = Body::rigid(Shape::cuboid(Vector3::new(5.0, 1.0, 1.0)), 1.0)?;
    let r = se3::aa_to_mat(Vector3::new(1.0, 1.0, 1.0), FRAC_PI_4);
    body.set_init_transform(se3::compose_transform(r, Vector3::new(0.0, 0.0, 5.0)));
    let rt = r.transpose();
    body.set_init_velocity(SpatialVelocity::new(
        rt * Vector3::new(0.0, 0.0, 5.0),
        rt * Vector3::new(3.0, -4.0, 5.0),
    ));
    model.add_body(body)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelState;
    use approx::assert_abs_diff_eq;

    #[test]
    fn every_sample_builds() {
        for id in SAMPLE_IDS {
            let model = create_model_sample(id).unwrap();
            assert_eq!(model.state(), ModelState::Initialized, "sample {id}");
            assert!(!model.bodies().is_empty());
        }
    }

    #[test]
    fn unknown_sample_is_rejected() {
        assert!(matches!(
            create_model_sample(42),
            Err(SimError::UnknownSample(42))
        ));
    }

    #[test]
    fn beam_starts_at_its_init_transform() {
        let model = create_model_sample(10).unwrap();
        let body = &model.bodies()[0];
        assert_abs_diff_eq!(body.position(), Vector3::new(0.0, 0.0, 5.0), epsilon = 1e-6);
        assert_abs_diff_eq!(body.transform(), body.compute_init_transform(), epsilon = 1e-6);
    }

    #[test]
    fn beam_keeps_a_unit_quaternion() {
        let mut model = create_model_sample(10).unwrap();
        let steps = model.simulate().unwrap();
        assert_eq!(steps, 30);
        let x = model.bodies()[0].x();
        let q = &x.as_slice()[..4];
        let n = q.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert_abs_diff_eq!(n, 1.0, epsilon = 1e-5);
        // Free flight: the center moves with the initial world velocity (0, 0, 5).
        assert_abs_diff_eq!(
            model.bodies()[0].position(),
            Vector3::new(0.0, 0.0, 10.0),
            epsilon = 1e-2
        );
    }
}
