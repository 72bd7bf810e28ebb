use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;
use rustfft::num_traits::{One, Zero};

/// Pivots smaller than this fraction of the largest input entry mark the matrix as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

pub struct MatrixHelper;

impl MatrixHelper {
    /// Outer product `x xᴴ`.
    pub fn outer(x: ArrayView1<Complex64>) -> Array2<Complex64> {
        let n = x.len();
        Array2::from_shape_fn((n, n), |(i, j)| x[i] * x[j].conj())
    }

    /// Adds `loading` to every diagonal entry in place.
    pub fn load_diagonal(matrix: &mut Array2<Complex64>, loading: f64) {
        for value in matrix.diag_mut() {
            *value += loading;
        }
    }

    /// Inverse by Gauss-Jordan elimination with partial pivoting.
    ///
    /// Returns `None` for non-square or non-finite input and when a pivot is
    /// numerically zero relative to the largest entry.
    pub fn invert(matrix: ArrayView2<Complex64>) -> Option<Array2<Complex64>> {
        let (rows, cols) = matrix.dim();
        if rows != cols || rows == 0 {
            return None;
        }
        if matrix.iter().any(|value| !value.re.is_finite() || !value.im.is_finite()) {
            return None;
        }

        let n = rows;
        let scale = matrix.iter().map(|value| value.norm()).fold(0.0, f64::max);
        if scale == 0.0 {
            return None;
        }

        let mut work = matrix.to_owned();
        let mut inverse = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                Complex64::one()
            } else {
                Complex64::zero()
            }
        });

        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&a, &b| work[[a, col]].norm().total_cmp(&work[[b, col]].norm()))?;
            if work[[pivot_row, col]].norm() <= SINGULAR_TOLERANCE * scale {
                return None;
            }
            if pivot_row != col {
                for k in 0..n {
                    work.swap([col, k], [pivot_row, k]);
                    inverse.swap([col, k], [pivot_row, k]);
                }
            }

            let pivot_inv = work[[col, col]].inv();
            for k in 0..n {
                work[[col, k]] *= pivot_inv;
                inverse[[col, k]] *= pivot_inv;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = work[[row, col]];
                if factor.is_zero() {
                    continue;
                }
                for k in 0..n {
                    let w = work[[col, k]];
                    let v = inverse[[col, k]];
                    work[[row, k]] -= factor * w;
                    inverse[[row, k]] -= factor * v;
                }
            }
        }

        Some(inverse)
    }

    pub fn mat_vec(matrix: ArrayView2<Complex64>, x: ArrayView1<Complex64>) -> Array1<Complex64> {
        matrix.dot(&x)
    }

    /// Inner product `aᴴ b`.
    pub fn inner(a: ArrayView1<Complex64>, b: ArrayView1<Complex64>) -> Complex64 {
        a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
    }
}
