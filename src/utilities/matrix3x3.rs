use glam::{Quat, Vec3};
use std::ops::{Add, Mul, Sub};

/// 3 row, 3 column matrix.
///
/// Vectors are treated as rows: `transform(v, m)` computes `v * m`. A rotation matrix built from
/// a quaternion therefore stores the rotated basis axes in its rows.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix3x3 {
    /// First row of the matrix.
    pub x: Vec3,
    /// Second row of the matrix.
    pub y: Vec3,
    /// Third row of the matrix.
    pub z: Vec3,
}

impl Default for Matrix3x3 {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix3x3 {
    /// The 3x3 identity matrix.
    pub const IDENTITY: Self = Self {
        x: Vec3::X,
        y: Vec3::Y,
        z: Vec3::Z,
    };

    /// Matrix with every component set to zero.
    pub const ZERO: Self = Self {
        x: Vec3::ZERO,
        y: Vec3::ZERO,
        z: Vec3::ZERO,
    };

    /// Creates a matrix from its three rows.
    #[inline(always)]
    pub const fn from_rows(x: Vec3, y: Vec3, z: Vec3) -> Self {
        Self { x, y, z }
    }

    /// Creates a diagonal matrix.
    #[inline(always)]
    pub fn from_diagonal(diagonal: Vec3) -> Self {
        Self {
            x: Vec3::new(diagonal.x, 0.0, 0.0),
            y: Vec3::new(0.0, diagonal.y, 0.0),
            z: Vec3::new(0.0, 0.0, diagonal.z),
        }
    }

    /// Gets the element at `(row, column)`.
    #[inline(always)]
    pub fn get(&self, row: usize, column: usize) -> f32 {
        self.row(row)[column]
    }

    /// Gets a row by index.
    #[inline(always)]
    pub fn row(&self, index: usize) -> Vec3 {
        match index {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Scales the components of a matrix by a scalar.
    #[inline(always)]
    pub fn scale(&self, scale: f32) -> Self {
        Self {
            x: self.x * scale,
            y: self.y * scale,
            z: self.z * scale,
        }
    }

    /// Computes the transposed matrix of a matrix.
    #[inline(always)]
    pub fn transpose(&self) -> Self {
        Self {
            x: Vec3::new(self.x.x, self.y.x, self.z.x),
            y: Vec3::new(self.x.y, self.y.y, self.z.y),
            z: Vec3::new(self.x.z, self.y.z, self.z.z),
        }
    }

    /// Calculates the determinant of the matrix.
    #[inline(always)]
    pub fn determinant(&self) -> f32 {
        self.x.dot(self.y.cross(self.z))
    }

    /// Inverts the matrix. A singular matrix inverts to zero, which is what an infinite-mass
    /// body expects of its inertia.
    #[inline(always)]
    pub fn invert(&self) -> Self {
        let yz = self.y.cross(self.z);
        let zx = self.z.cross(self.x);
        let xy = self.x.cross(self.y);
        let determinant = self.x.dot(yz);
        if determinant.abs() < f32::EPSILON * f32::EPSILON {
            return Self::ZERO;
        }
        let inverse_determinant = 1.0 / determinant;
        Self {
            x: yz * inverse_determinant,
            y: zx * inverse_determinant,
            z: xy * inverse_determinant,
        }
        .transpose()
    }

    /// Transforms the vector by the matrix: `v * m`.
    #[inline(always)]
    pub fn transform(v: Vec3, m: &Self) -> Vec3 {
        m.x * v.x + m.y * v.y + m.z * v.z
    }

    /// Transforms the vector by the matrix's transpose: `v * transpose(m)`, equivalently `m * v`
    /// for column vectors.
    #[inline(always)]
    pub fn transform_transpose(v: Vec3, m: &Self) -> Vec3 {
        Vec3::new(v.dot(m.x), v.dot(m.y), v.dot(m.z))
    }

    /// Multiplies the two matrices.
    #[inline(always)]
    pub fn multiply(a: &Self, b: &Self) -> Self {
        Self {
            x: Self::transform(a.x, b),
            y: Self::transform(a.y, b),
            z: Self::transform(a.z, b),
        }
    }

    /// Multiplies a matrix by another matrix's transpose: `a * transpose(b)`.
    #[inline(always)]
    pub fn multiply_by_transposed(a: &Self, b: &Self) -> Self {
        Self {
            x: Self::transform_transpose(a.x, b),
            y: Self::transform_transpose(a.y, b),
            z: Self::transform_transpose(a.z, b),
        }
    }

    /// Creates a rotation matrix whose rows are the quaternion's rotated basis axes.
    #[inline(always)]
    pub fn create_from_quaternion(q: Quat) -> Self {
        let qx2 = q.x + q.x;
        let qy2 = q.y + q.y;
        let qz2 = q.z + q.z;
        let xx = qx2 * q.x;
        let yy = qy2 * q.y;
        let zz = qz2 * q.z;
        let xy = qx2 * q.y;
        let xz = qx2 * q.z;
        let xw = qx2 * q.w;
        let yz = qy2 * q.z;
        let yw = qy2 * q.w;
        let zw = qz2 * q.w;

        Self {
            x: Vec3::new(1.0 - yy - zz, xy + zw, xz - yw),
            y: Vec3::new(xy - zw, 1.0 - xx - zz, yz + xw),
            z: Vec3::new(xz + yw, yz - xw, 1.0 - xx - yy),
        }
    }

    /// Creates a matrix such that `a x v = a * result`.
    #[inline(always)]
    pub fn create_cross_product(v: Vec3) -> Self {
        Self {
            x: Vec3::new(0.0, -v.z, v.y),
            y: Vec3::new(v.z, 0.0, -v.x),
            z: Vec3::new(-v.y, v.x, 0.0),
        }
    }

    /// Outer product `a^T * b`.
    #[inline(always)]
    pub fn create_outer_product(a: Vec3, b: Vec3) -> Self {
        Self {
            x: b * a.x,
            y: b * a.y,
            z: b * a.z,
        }
    }

    /// Rotates a body-space tensor into world space. For a rotation whose rows are the rotated
    /// axes, this is `transpose(r) * tensor * r`.
    #[inline(always)]
    pub fn rotate_tensor(tensor: &Self, orientation: Quat) -> Self {
        let r = Self::create_from_quaternion(orientation);
        Self::multiply(&r.transpose(), &Self::multiply(tensor, &r))
    }
}

impl Add for Matrix3x3 {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self::Output {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Matrix3x3 {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self::Output {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul for Matrix3x3 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, other: Self) -> Self::Output {
        Self::multiply(&self, &other)
    }
}

impl Mul<f32> for Matrix3x3 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, scale: f32) -> Self::Output {
        self.scale(scale)
    }
}

/// Column-vector product `m * v`, i.e. each row dotted with `v`.
impl Mul<Vec3> for Matrix3x3 {
    type Output = Vec3;

    #[inline(always)]
    fn mul(self, v: Vec3) -> Self::Output {
        Self::transform_transpose(v, &self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_matrix_eq(a: &Matrix3x3, b: &Matrix3x3) {
        for r in 0..3 {
            for c in 0..3 {
                assert_abs_diff_eq!(a.get(r, c), b.get(r, c), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_invert_round_trips_to_identity() {
        let m = Matrix3x3::from_rows(
            Vec3::new(2.0, 0.5, 0.0),
            Vec3::new(0.1, 3.0, 1.0),
            Vec3::new(0.0, -1.0, 4.0),
        );
        let product = m * m.invert();
        assert_matrix_eq(&product, &Matrix3x3::IDENTITY);
    }

    #[test]
    fn test_invert_singular_is_zero() {
        assert_matrix_eq(&Matrix3x3::ZERO.invert(), &Matrix3x3::ZERO);
    }

    #[test]
    fn test_quaternion_matrix_matches_quaternion_rotation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), 0.7);
        let m = Matrix3x3::create_from_quaternion(q);
        let v = Vec3::new(0.3, -2.0, 5.0);
        let expected = q * v;
        let actual = Matrix3x3::transform(v, &m);
        assert_abs_diff_eq!(expected.x, actual.x, epsilon = 1e-5);
        assert_abs_diff_eq!(expected.y, actual.y, epsilon = 1e-5);
        assert_abs_diff_eq!(expected.z, actual.z, epsilon = 1e-5);
    }

    #[test]
    fn test_cross_product_matrix() {
        let a = Vec3::new(1.0, -2.0, 0.5);
        let v = Vec3::new(3.0, 1.0, -1.0);
        let skew = Matrix3x3::create_cross_product(v);
        let expected = a.cross(v);
        let actual = Matrix3x3::transform(a, &skew);
        assert_abs_diff_eq!(expected.x, actual.x, epsilon = 1e-6);
        assert_abs_diff_eq!(expected.y, actual.y, epsilon = 1e-6);
        assert_abs_diff_eq!(expected.z, actual.z, epsilon = 1e-6);
    }

    #[test]
    fn test_rotate_tensor_matches_change_of_basis() {
        let tensor = Matrix3x3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
        let q = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let world = Matrix3x3::rotate_tensor(&tensor, q);
        // Body X maps onto world Y, so the world Y moment is the body X moment.
        assert_abs_diff_eq!(world.get(0, 0), 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(world.get(1, 1), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(world.get(2, 2), 3.0, epsilon = 1e-5);
    }
}
