//! Small dense matrices sized at compile time, used for constraint Jacobians and effective mass.

use std::ops::{Add, Index, IndexMut, Mul, Sub};

/// Dense vector of `N` scalars.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorN<const N: usize> {
    pub data: [f32; N],
}

impl<const N: usize> Default for VectorN<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> VectorN<N> {
    #[inline(always)]
    pub const fn zero() -> Self {
        Self { data: [0.0; N] }
    }

    #[inline(always)]
    pub const fn from_array(data: [f32; N]) -> Self {
        Self { data }
    }

    #[inline(always)]
    pub fn dot(&self, other: &Self) -> f32 {
        self.data.iter().zip(other.data.iter()).map(|(a, b)| a * b).sum()
    }

    #[inline(always)]
    pub fn scale(&self, s: f32) -> Self {
        let mut out = *self;
        out.data.iter_mut().for_each(|v| *v *= s);
        out
    }

    /// Sets every element to zero.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.data = [0.0; N];
    }

    /// Writes three consecutive elements starting at `offset`.
    #[inline(always)]
    pub fn set_vec3(&mut self, offset: usize, v: glam::Vec3) {
        self.data[offset] = v.x;
        self.data[offset + 1] = v.y;
        self.data[offset + 2] = v.z;
    }

    /// Reads three consecutive elements starting at `offset`.
    #[inline(always)]
    pub fn vec3(&self, offset: usize) -> glam::Vec3 {
        glam::Vec3::new(self.data[offset], self.data[offset + 1], self.data[offset + 2])
    }

    /// Largest absolute element.
    pub fn max_abs(&self) -> f32 {
        self.data.iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }
}

impl<const N: usize> Index<usize> for VectorN<N> {
    type Output = f32;

    #[inline(always)]
    fn index(&self, index: usize) -> &f32 {
        &self.data[index]
    }
}

impl<const N: usize> IndexMut<usize> for VectorN<N> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.data[index]
    }
}

impl<const N: usize> Add for VectorN<N> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.data.iter_mut().zip(rhs.data.iter()).for_each(|(a, b)| *a += b);
        self
    }
}

impl<const N: usize> Sub for VectorN<N> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self.data.iter_mut().zip(rhs.data.iter()).for_each(|(a, b)| *a -= b);
        self
    }
}

/// Dense `M` row by `N` column matrix stored row major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixMN<const M: usize, const N: usize> {
    pub rows: [VectorN<N>; M],
}

impl<const M: usize, const N: usize> Default for MatrixMN<M, N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const M: usize, const N: usize> MatrixMN<M, N> {
    #[inline(always)]
    pub const fn zero() -> Self {
        Self {
            rows: [VectorN::zero(); M],
        }
    }

    /// Sets every element to zero.
    #[inline(always)]
    pub fn clear(&mut self) {
        *self = Self::zero();
    }

    #[inline(always)]
    pub fn get(&self, row: usize, column: usize) -> f32 {
        self.rows[row].data[column]
    }

    #[inline(always)]
    pub fn set(&mut self, row: usize, column: usize, value: f32) {
        self.rows[row].data[column] = value;
    }

    /// Writes three consecutive columns of a row.
    #[inline(always)]
    pub fn set_vec3(&mut self, row: usize, column: usize, v: glam::Vec3) {
        self.rows[row].set_vec3(column, v);
    }

    /// Writes a 3x3 block with its top-left element at `(row, column)`. The block's rows land
    /// on consecutive matrix rows.
    pub fn set_block3(&mut self, row: usize, column: usize, block: &super::Matrix3x3) {
        self.set_vec3(row, column, block.x);
        self.set_vec3(row + 1, column, block.y);
        self.set_vec3(row + 2, column, block.z);
    }

    pub fn transpose(&self) -> MatrixMN<N, M> {
        let mut out = MatrixMN::<N, M>::zero();
        for r in 0..M {
            for c in 0..N {
                out.rows[c].data[r] = self.rows[r].data[c];
            }
        }
        out
    }

    /// `self * v`.
    pub fn mul_vector(&self, v: &VectorN<N>) -> VectorN<M> {
        let mut out = VectorN::<M>::zero();
        for r in 0..M {
            out.data[r] = self.rows[r].dot(v);
        }
        out
    }

    /// `transpose(self) * v`, without materializing the transpose.
    pub fn mul_transposed_vector(&self, v: &VectorN<M>) -> VectorN<N> {
        let mut out = VectorN::<N>::zero();
        for r in 0..M {
            let s = v.data[r];
            if s == 0.0 {
                continue;
            }
            for c in 0..N {
                out.data[c] += self.rows[r].data[c] * s;
            }
        }
        out
    }

    /// `self * other`.
    pub fn mul_matrix<const P: usize>(&self, other: &MatrixMN<N, P>) -> MatrixMN<M, P> {
        let mut out = MatrixMN::<M, P>::zero();
        for r in 0..M {
            for k in 0..N {
                let a = self.rows[r].data[k];
                if a == 0.0 {
                    continue;
                }
                for c in 0..P {
                    out.rows[r].data[c] += a * other.rows[k].data[c];
                }
            }
        }
        out
    }
}

impl<const N: usize> MatrixMN<N, N> {
    pub fn identity() -> Self {
        let mut out = Self::zero();
        for i in 0..N {
            out.rows[i].data[i] = 1.0;
        }
        out
    }
}

impl<const M: usize, const N: usize> Mul<VectorN<N>> for MatrixMN<M, N> {
    type Output = VectorN<M>;

    fn mul(self, rhs: VectorN<N>) -> VectorN<M> {
        self.mul_vector(&rhs)
    }
}

impl<const M: usize, const N: usize, const P: usize> Mul<MatrixMN<N, P>> for MatrixMN<M, N> {
    type Output = MatrixMN<M, P>;

    fn mul(self, rhs: MatrixMN<N, P>) -> MatrixMN<M, P> {
        self.mul_matrix(&rhs)
    }
}
