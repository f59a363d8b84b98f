use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Sub};

/// Fixed-size generalized coordinate (or velocity, or correction) vector.
///
/// Plain `f32` data with no indirection, so a slice of these can be cast to
/// bytes and uploaded to a GPU buffer as-is.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GenVec<const N: usize>(pub [f32; N]);

/// Rigid body coordinates: `[qx, qy, qz, qw, px, py, pz]`.
pub type Vec7 = GenVec<7>;

/// Affine body coordinates: three columns of the linear part, then translation.
pub type Vec12 = GenVec<12>;

// SAFETY: `GenVec<N>` is a transparent wrapper around `[f32; N]`.
unsafe impl<const N: usize> bytemuck::Zeroable for GenVec<N> {}
unsafe impl<const N: usize> bytemuck::Pod for GenVec<N> {}

impl<const N: usize> GenVec<N> {
    pub const DIM: usize = N;

    pub const fn zero() -> Self {
        GenVec([0.0; N])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0.0)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn norm(&self) -> f32 {
        self.0.iter().map(|c| c * c).sum::<f32>().sqrt()
    }

    /// Largest absolute component difference to `other`.
    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }

    /// Copies `values` into `self[offset..offset + values.len()]`.
    pub fn set_segment(&mut self, offset: usize, values: &[f32]) {
        self.0[offset..offset + values.len()].copy_from_slice(values);
    }

    pub fn segment<const M: usize>(&self, offset: usize) -> [f32; M] {
        let mut out = [0.0; M];
        out.copy_from_slice(&self.0[offset..offset + M]);
        out
    }
}

impl<const N: usize> Default for GenVec<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> From<[f32; N]> for GenVec<N> {
    fn from(values: [f32; N]) -> Self {
        GenVec(values)
    }
}

impl<const N: usize> Index<usize> for GenVec<N> {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.0[i]
    }
}

impl<const N: usize> IndexMut<usize> for GenVec<N> {
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.0[i]
    }
}

impl<const N: usize> Add for GenVec<N> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<const N: usize> AddAssign for GenVec<N> {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += b;
        }
    }
}

impl<const N: usize> Sub for GenVec<N> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a -= b;
        }
        self
    }
}

impl<const N: usize> Mul<f32> for GenVec<N> {
    type Output = Self;

    fn mul(mut self, s: f32) -> Self {
        for a in self.0.iter_mut() {
            *a *= s;
        }
        self
    }
}

impl<const N: usize> Div<f32> for GenVec<N> {
    type Output = Self;

    fn div(mut self, s: f32) -> Self {
        for a in self.0.iter_mut() {
            *a /= s;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_componentwise() {
        let a = Vec7::from([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let b = Vec7::from([7.0; 7]);
        let c = (a + b) * 2.0 - b;
        assert_eq!(c.0, [9.0, 11.0, 13.0, 15.0, 17.0, 19.0, 21.0]);
        assert_eq!((c / 1.0).0, c.0);
    }

    #[test]
    fn segments() {
        let mut v = Vec12::zero();
        v.set_segment(9, &[1.0, 2.0, 3.0]);
        assert_eq!(v.segment::<3>(9), [1.0, 2.0, 3.0]);
        assert_eq!(v.segment::<3>(0), [0.0; 3]);
        assert!(!v.is_zero());
        assert!(Vec12::zero().is_zero());
    }

    #[test]
    fn casts_to_bytes() {
        let v = [Vec7::from([1.0; 7]), Vec7::zero()];
        let bytes: &[u8] = bytemuck::cast_slice(&v);
        assert_eq!(bytes.len(), 2 * 7 * std::mem::size_of::<f32>());
    }
}
