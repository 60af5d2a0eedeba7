//! Projected Gauss-Seidel relaxation for small bounded linear systems.
//!
//! Solves `A x = b` subject to `lo <= x <= hi` one row at a time:
//! ```text
//! x_i <- clamp(x_i + (b_i - A_i . x) / A_ii, lo_i, hi_i)
//! ```
//! Unbounded rows use infinite bounds. Rows whose diagonal vanishes are left untouched.

use super::math_helper;
use super::matrix_mn::{MatrixMN, VectorN};

/// Diagonal magnitude below which a row is considered inactive.
const MIN_DIAGONAL: f32 = 1e-12;

/// Runs `iterations` projected Gauss-Seidel sweeps over the system, starting from `x`.
pub fn lcp_gauss_seidel_into<const N: usize>(
    a: &MatrixMN<N, N>,
    b: &VectorN<N>,
    lo: &VectorN<N>,
    hi: &VectorN<N>,
    iterations: usize,
    x: &mut VectorN<N>,
) {
    for _ in 0..iterations {
        for i in 0..N {
            let diagonal = a.get(i, i);
            if diagonal.abs() < MIN_DIAGONAL {
                continue;
            }
            let dx = (b[i] - a.rows[i].dot(x)) / diagonal;
            if !math_helper::is_valid(dx) {
                continue;
            }
            x[i] = (x[i] + dx).clamp(lo[i], hi[i]);
        }
    }
}

/// Runs projected Gauss-Seidel from a zero initial guess.
pub fn lcp_gauss_seidel<const N: usize>(
    a: &MatrixMN<N, N>,
    b: &VectorN<N>,
    lo: &VectorN<N>,
    hi: &VectorN<N>,
    iterations: usize,
) -> VectorN<N> {
    let mut x = VectorN::zero();
    lcp_gauss_seidel_into(a, b, lo, hi, iterations, &mut x);
    x
}

/// Bounds vector that leaves every row unconstrained.
pub fn unbounded<const N: usize>() -> (VectorN<N>, VectorN<N>) {
    (
        VectorN::from_array([f32::NEG_INFINITY; N]),
        VectorN::from_array([f32::INFINITY; N]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_unbounded_system_converges_to_exact_solution() {
        let mut a = MatrixMN::<2, 2>::zero();
        a.rows[0] = VectorN::from_array([4.0, 1.0]);
        a.rows[1] = VectorN::from_array([1.0, 3.0]);
        let b = VectorN::from_array([1.0, 2.0]);
        let (lo, hi) = unbounded();
        let x = lcp_gauss_seidel(&a, &b, &lo, &hi, 50);
        assert_abs_diff_eq!(x[0], 1.0 / 11.0, epsilon = 1e-5);
        assert_abs_diff_eq!(x[1], 7.0 / 11.0, epsilon = 1e-5);
    }

    #[test]
    fn test_lower_bound_projects_negative_solution() {
        let a = MatrixMN::<1, 1>::identity();
        let b = VectorN::from_array([-3.0]);
        let lo = VectorN::from_array([0.0]);
        let hi = VectorN::from_array([f32::INFINITY]);
        let x = lcp_gauss_seidel(&a, &b, &lo, &hi, 4);
        assert_eq!(x[0], 0.0);
    }

    #[test]
    fn test_zero_diagonal_row_is_skipped() {
        let a = MatrixMN::<2, 2>::zero();
        let b = VectorN::from_array([1.0, 1.0]);
        let (lo, hi) = unbounded();
        let x = lcp_gauss_seidel(&a, &b, &lo, &hi, 4);
        assert_eq!(x.data, [0.0, 0.0]);
    }
}
