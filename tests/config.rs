//! Scenario files drive the same models as the built-in samples.

use apbd_sim::{BodyConfig, BodyKind, GroundConfig, ModelConfig, ModelState, Shape};
use approx::assert_abs_diff_eq;

fn scene() -> ModelConfig {
    ModelConfig {
        t_end: 0.2,
        substeps: 5,
        iters: 2,
        ground: GroundConfig {
            height: 0.0,
            ..GroundConfig::default()
        },
        bodies: vec![BodyConfig {
            kind: BodyKind::Rigid,
            shape: Shape::Cuboid {
                sides: [1.0, 1.0, 1.0],
            },
            density: 1.0,
            collide: true,
            mu: 0.1,
            layer: 0,
            position: [0.0, 0.0, 0.5],
            axis_angle: [0.0, 0.0, 1.0, 0.0],
            velocity: None,
        }],
        ..ModelConfig::default()
    }
}

#[test]
fn saved_scene_loads_back() {
    let config = scene();
    let path = std::env::temp_dir().join(format!("apbd-scene-{}.json", std::process::id()));
    std::fs::write(&path, config.to_json_string().unwrap()).unwrap();
    let loaded = ModelConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn scene_runs_to_completion() {
    let mut model = scene().build().unwrap();
    assert_eq!(model.simulate().unwrap(), 6);
    assert_eq!(model.state(), ModelState::Finished);
    assert_abs_diff_eq!(model.bodies()[0].position().z, 0.5, epsilon = 1e-3);
}
