use cgmath::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Collision/inertia geometry of a body, centered on its center of mass.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned box with full side lengths.
    Cuboid { sides: [f32; 3] },
}

impl Shape {
    pub fn cuboid(sides: Vector3<f32>) -> Self {
        Shape::Cuboid {
            sides: sides.into(),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        match self {
            Shape::Cuboid { sides } => {
                if sides.iter().all(|s| s.is_finite() && *s > 0.0) {
                    Ok(())
                } else {
                    Err(SimError::DegenerateShape(format!("cuboid sides {sides:?}")))
                }
            }
        }
    }

    pub fn volume(&self) -> f32 {
        match self {
            Shape::Cuboid { sides } => sides[0] * sides[1] * sides[2],
        }
    }

    /// Principal rotational inertia and mass of a solid body of this shape.
    pub fn rigid_mass(&self, density: f32) -> (Vector3<f32>, f32) {
        let mass = density * self.volume();
        match self {
            Shape::Cuboid { sides } => {
                let [x2, y2, z2] = sides.map(|s| s * s);
                let inertia = Vector3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 12.0);
                (inertia, mass)
            }
        }
    }

    /// Per-axis second moments `∫ρ r_i² dV` and mass, the affine counterpart
    /// of [`Shape::rigid_mass`].
    pub fn affine_mass(&self, density: f32) -> (Vector3<f32>, f32) {
        let mass = density * self.volume();
        match self {
            Shape::Cuboid { sides } => {
                let [x2, y2, z2] = sides.map(|s| s * s);
                (Vector3::new(x2, y2, z2) * (mass / 12.0), mass)
            }
        }
    }

    /// Corner points in the body frame.
    pub fn vertices(&self) -> [Vector3<f32>; 8] {
        match self {
            Shape::Cuboid { sides } => {
                let h = Vector3::from(*sides) * 0.5;
                let mut out = [Vector3::new(0.0, 0.0, 0.0); 8];
                for (i, v) in out.iter_mut().enumerate() {
                    let sx = if i & 1 == 0 { -h.x } else { h.x };
                    let sy = if i & 2 == 0 { -h.y } else { h.y };
                    let sz = if i & 4 == 0 { -h.z } else { h.z };
                    *v = Vector3::new(sx, sy, sz);
                }
                out
            }
        }
    }
}

pub(crate) fn validate_density(density: f32) -> SimResult<()> {
    if density.is_finite() && density > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidDensity(density))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cube_inertia() {
        let shape = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0));
        let (mr, mp) = shape.rigid_mass(2.0);
        assert_relative_eq!(mp, 2.0);
        assert_relative_eq!(mr, Vector3::new(1.0, 1.0, 1.0) * (2.0 / 6.0));
    }

    #[test]
    fn beam_affine_moments() {
        let shape = Shape::cuboid(Vector3::new(5.0, 1.0, 1.0));
        let (wa, wp) = shape.affine_mass(1.0);
        assert_relative_eq!(wp, 5.0);
        assert_relative_eq!(wa.x, 5.0 * 25.0 / 12.0);
        assert_relative_eq!(wa.y, 5.0 / 12.0);
        // Rigid inertia is the sum of the two orthogonal affine moments.
        let (mr, _) = shape.rigid_mass(1.0);
        assert_relative_eq!(mr.z, wa.x + wa.y);
    }

    #[test]
    fn corners_span_the_box() {
        let v = Shape::cuboid(Vector3::new(2.0, 4.0, 6.0)).vertices();
        assert_eq!(v[0], Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(v[7], Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(Shape::cuboid(Vector3::new(1.0, 0.0, 1.0)).validate().is_err());
        assert!(Shape::Cuboid { sides: [1.0, f32::NAN, 1.0] }.validate().is_err());
        assert!(validate_density(0.0).is_err());
        assert!(validate_density(-1.0).is_err());
        assert!(validate_density(1.0).is_ok());
    }
}
