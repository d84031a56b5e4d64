//! Gauss-Jordan elimination with full pivoting.
//!
//! Solves `A x = b` in place: on return `a` holds `A⁻¹` and `b` holds the
//! solution. Only the leading `n × n` block of `a` and the first `n` rows of
//! `b` take part, so callers can reuse buffers sized for a larger system.

use ndarray::{Array1, Array2};

use crate::error::{MealError, Result};

/// Invert the leading `n × n` block of `a` and solve for `b`.
///
/// # Errors
///
/// * `MealError::SingularMatrix` if the largest remaining pivot has an
///   absolute value not greater than `threshold`
pub fn gauss_jordan(
    a: &mut Array2<f64>,
    b: &mut Array1<f64>,
    n: usize,
    threshold: f64,
) -> Result<()> {
    if a.nrows() < n || a.ncols() < n || b.len() < n {
        return Err(MealError::InvalidState(format!(
            "gauss_jordan a={:?} b={} smaller than n={}",
            a.dim(),
            b.len(),
            n
        )));
    }

    let mut indxc = vec![0usize; n];
    let mut indxr = vec![0usize; n];
    let mut ipiv = vec![false; n];

    for i in 0..n {
        let mut big = 0.0;
        let mut irow = 0;
        let mut icol = 0;

        for j in 0..n {
            if ipiv[j] {
                continue;
            }
            for k in 0..n {
                if !ipiv[k] && a[[j, k]].abs() >= big {
                    big = a[[j, k]].abs();
                    irow = j;
                    icol = k;
                }
            }
        }

        if !(big > threshold) {
            return Err(MealError::SingularMatrix {
                pivot: big,
                row: i,
                degenerate: Vec::new(),
            });
        }

        ipiv[icol] = true;

        if irow != icol {
            for l in 0..n {
                a.swap([irow, l], [icol, l]);
            }
            b.swap(irow, icol);
        }

        indxr[i] = irow;
        indxc[i] = icol;

        let pivinv = 1.0 / a[[icol, icol]];
        a[[icol, icol]] = 1.0;
        for l in 0..n {
            a[[icol, l]] *= pivinv;
        }
        b[icol] *= pivinv;

        for ll in 0..n {
            if ll == icol {
                continue;
            }
            let dum = a[[ll, icol]];
            a[[ll, icol]] = 0.0;
            for l in 0..n {
                a[[ll, l]] -= a[[icol, l]] * dum;
            }
            b[ll] -= b[icol] * dum;
        }
    }

    // unscramble the column interchanges
    for l in (0..n).rev() {
        if indxr[l] != indxc[l] {
            for k in 0..n {
                a.swap([k, indxr[l]], [k, indxc[l]]);
            }
        }
    }

    Ok(())
}
