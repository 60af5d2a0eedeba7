use glam::Vec3;

/// Squared length below which a direction is treated as degenerate.
pub const DEGENERATE_LENGTH_SQUARED: f32 = 1e-12;

/// Returns -1 if the value is negative and 1 otherwise.
#[inline(always)]
pub fn binary_sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Checks a scalar for NaN/infinity using the `x * 0 != x * 0` test.
/// Any finite value times zero is zero; NaN and infinities yield NaN, which never compares equal.
#[inline(always)]
pub fn is_valid(x: f32) -> bool {
    let zeroed = x * 0.0;
    #[allow(clippy::eq_op)]
    let valid = zeroed == zeroed;
    valid
}

/// Normalizes a vector, returning the fallback if its length is too small to divide by.
#[inline(always)]
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let length_squared = v.length_squared();
    if length_squared > DEGENERATE_LENGTH_SQUARED {
        v / length_squared.sqrt()
    } else {
        fallback
    }
}

/// Builds an orthonormal pair `(u, v)` perpendicular to the unit vector `n`, such that
/// `(u, v, n)` is right handed.
#[inline]
pub fn get_ortho(n: Vec3) -> (Vec3, Vec3) {
    let w = if n.z * n.z > 0.9 * 0.9 {
        Vec3::X
    } else {
        Vec3::Z
    };
    let u = w.cross(n).normalize();
    let v = n.cross(u).normalize();
    let u = v.cross(n).normalize();
    (u, v)
}

/// Returns any unit vector perpendicular to `v`. `v` does not need to be normalized.
#[inline]
pub fn any_perpendicular(v: Vec3) -> Vec3 {
    let n = normalize_or(v, Vec3::Z);
    get_ortho(n).0
}

/// Twice the signed area of the 2D triangle `(x1, y1) (x2, y2) (x3, y3)`.
#[inline(always)]
pub fn double_triangle_area_2d(x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) -> f32 {
    (x1 - x2) * (y2 - y3) - (x2 - x3) * (y1 - y2)
}
