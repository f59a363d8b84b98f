//! Position-based simulation of rigid and affine bodies.
//!
//! A [`Model`] owns a set of [`Body`] values and advances them with BDF1
//! predictions, Jacobi position corrections from registered
//! [`ConstraintSolver`]s, a shock pass and a regularization pass per substep.

pub mod affine_body;
pub mod body;
pub mod config;
pub mod constraint;
pub mod coords;
pub mod error;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod ground;
pub mod model;
pub mod rigid_body;
pub mod samples;
pub mod se3;
pub mod shape;

pub use affine_body::BodyAffine;
pub use body::{Accumulator, Body, BodyKind, BodyVector, SpatialVelocity};
pub use config::{BodyConfig, GroundConfig, ModelConfig};
pub use constraint::{ConstraintSolver, Correction, SolveContext};
pub use coords::{GenVec, Vec12, Vec7};
pub use error::{SimError, SimResult};
#[cfg(feature = "gpu")]
pub use gpu::GpuStepper;
pub use ground::GroundContact;
pub use model::{BodyPhases, HostPhases, Model, ModelState};
pub use rigid_body::BodyRigid;
pub use samples::create_model_sample;
pub use shape::Shape;
