//! Bodies against the ground plane.

use apbd_sim::{create_model_sample, Body, BodyAffine, BodyRigid, Model, Shape};
use approx::assert_abs_diff_eq;
use cgmath::{Matrix4, Vector3};

fn lowest_corner(body: &Body) -> f32 {
    body.shape()
        .vertices()
        .into_iter()
        .map(|v| body.world_point(v).z)
        .fold(f32::INFINITY, f32::min)
}

fn ground_model(body: Body, t_end: f32) -> Model {
    let mut model = Model::new().with_ground_contact().unwrap();
    model.t_end = t_end;
    model.h = 1.0 / 30.0;
    model.substeps = 10;
    model.iters = 4;
    model.add_body(body).unwrap();
    model.init().unwrap();
    model
}

fn cube() -> Shape {
    Shape::cuboid(Vector3::new(1.0, 1.0, 1.0))
}

#[test]
fn resting_box_stays_put() {
    let mut model = create_model_sample(1).unwrap();
    model.simulate().unwrap();
    let body = &model.bodies()[0];
    assert_abs_diff_eq!(body.position().z, 0.5, epsilon = 1e-3);
    assert_abs_diff_eq!(body.position().x, 0.0, epsilon = 1e-4);
    assert!(lowest_corner(body) > -1e-4);
}

#[test]
fn dropped_box_settles() {
    let mut body: Body = BodyRigid::with_contact(cube(), 1.0, true, 0.5).unwrap().into();
    body.set_init_transform(Matrix4::from_translation(Vector3::new(0.0, 0.0, 2.0)));
    let mut model = ground_model(body, 1.0);

    let mut lowest = f32::INFINITY;
    while model.step().unwrap() != apbd_sim::ModelState::Finished {
        lowest = lowest.min(lowest_corner(&model.bodies()[0]));
    }
    assert!(lowest > -1e-3, "penetrated to {lowest}");
    assert_abs_diff_eq!(model.bodies()[0].position().z, 0.5, epsilon = 1e-2);
}

#[test]
fn affine_box_is_held_by_the_ground() {
    let mut body: Body = BodyAffine::with_contact(cube(), 1.0, true, 0.0).unwrap().into();
    body.set_init_transform(Matrix4::from_translation(Vector3::new(0.0, 0.0, 0.5)));
    let mut model = ground_model(body, 1.0);
    for _ in 0..3 {
        model.step().unwrap();
        assert!(lowest_corner(&model.bodies()[0]) > -1e-4);
    }
}

#[test]
fn friction_slows_sliding_boxes() {
    let mut model = create_model_sample(3).unwrap();
    model.simulate().unwrap();
    let x: Vec<f32> = model.bodies().iter().map(|b| b.position().x).collect();
    // Frictionless box slides at its launch speed.
    assert_abs_diff_eq!(x[0], 100.0 * model.time(), epsilon = 1.0);
    assert!(x[4] < x[0] - 1.0, "positions {x:?}");
}
