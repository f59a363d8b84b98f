//! JSON scenario files.
//!
//! ```json
//! {
//!   "t_end": 1.0,
//!   "h": 0.0333,
//!   "substeps": 10,
//!   "gravity": [0, 0, -980],
//!   "ground": { "height": 0, "contact": true },
//!   "bodies": [
//!     { "kind": "rigid", "shape": { "type": "cuboid", "sides": [1, 1, 1] },
//!       "density": 1.0, "mu": 0.2, "position": [0, 0, 3] }
//!   ]
//! }
//! ```
//!
//! Every field except `bodies[].kind` and `bodies[].shape` has a default.

use std::path::Path;

use cgmath::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::affine_body::BodyAffine;
use crate::body::{Body, BodyKind, SpatialVelocity};
use crate::error::{SimError, SimResult};
use crate::model::Model;
use crate::rigid_body::BodyRigid;
use crate::se3;
use crate::shape::Shape;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub t_end: f32,
    pub h: f32,
    pub substeps: u32,
    pub iters: u32,
    pub gravity: [f32; 3],
    pub ground: GroundConfig,
    pub axis: [f32; 6],
    pub bodies: Vec<BodyConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let model = Model::default();
        ModelConfig {
            t_end: model.t_end,
            h: model.h,
            substeps: model.substeps,
            iters: model.iters,
            gravity: model.gravity.into(),
            ground: GroundConfig::default(),
            axis: model.axis,
            bodies: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Full ground transform, column-major. Overrides `height`.
    pub transform: Option<[[f32; 4]; 4]>,
    /// Height of a horizontal ground plane.
    pub height: f32,
    pub size: f32,
    /// Register ground contact for colliding bodies.
    pub contact: bool,
}

impl Default for GroundConfig {
    fn default() -> Self {
        GroundConfig {
            transform: None,
            height: 0.0,
            size: 10.0,
            contact: true,
        }
    }
}

impl GroundConfig {
    pub fn transform(&self) -> Matrix4<f32> {
        match self.transform {
            Some(columns) => Matrix4::from(columns),
            None => Matrix4::from_translation(Vector3::new(0.0, 0.0, self.height)),
        }
    }
}

fn default_density() -> f32 {
    1.0
}

fn default_collide() -> bool {
    true
}

fn default_axis_angle() -> [f32; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    pub kind: BodyKind,
    pub shape: Shape,
    #[serde(default = "default_density")]
    pub density: f32,
    #[serde(default = "default_collide")]
    pub collide: bool,
    #[serde(default)]
    pub mu: f32,
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub position: [f32; 3],
    /// `[ax, ay, az, angle]`, angle in radians.
    #[serde(default = "default_axis_angle")]
    pub axis_angle: [f32; 4],
    /// Body-frame `[vx, vy, vz, wx, wy, wz]`.
    #[serde(default)]
    pub velocity: Option<[f32; 6]>,
}

impl BodyConfig {
    pub fn build(&self) -> SimResult<Body> {
        let mut body: Body = match self.kind {
            BodyKind::Rigid => {
                BodyRigid::with_contact(self.shape, self.density, self.collide, self.mu)?.into()
            }
            BodyKind::Affine => {
                BodyAffine::with_contact(self.shape, self.density, self.collide, self.mu)?.into()
            }
        };
        body.set_layer(self.layer);

        let [ax, ay, az, angle] = self.axis_angle;
        let rotation = se3::aa_to_mat(Vector3::new(ax, ay, az), angle);
        body.set_init_transform(se3::compose_transform(rotation, self.position.into()));
        if let Some(v) = self.velocity {
            body.set_init_velocity(SpatialVelocity::from(v));
        }
        Ok(body)
    }
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds and initializes the model.
    pub fn build(&self) -> SimResult<Model> {
        let mut model = Model::new();
        model.t_end = self.t_end;
        model.h = self.h;
        model.substeps = self.substeps;
        model.iters = self.iters;
        model.gravity = self.gravity.into();
        model.ground_e = self.ground.transform();
        model.ground_size = self.ground.size;
        model.axis = self.axis;

        for body in &self.bodies {
            model.add_body(body.build()?)?;
        }
        if self.ground.contact {
            model = model.with_ground_contact()?;
        }
        model.init()?;
        Ok(model)
    }
}
