use anyhow::bail;

/// Solve a tridiagonal linear system with the Thomas algorithm.
///
/// Arguments:
/// * `lower` - sub-diagonal, `lower[0]` is ignored
/// * `diagonal` - main diagonal
/// * `upper` - super-diagonal, the last entry is ignored
/// * `rhs` - right hand side
pub(crate) fn solve_tridiagonal(
    lower: &[f64],
    diagonal: &[f64],
    upper: &[f64],
    rhs: &[f64],
) -> anyhow::Result<Vec<f64>> {
    let n = diagonal.len();
    if n == 0 || lower.len() != n || upper.len() != n || rhs.len() != n {
        bail!(
            "Tridiagonal system has inconsistent sizes (lower {}, diagonal {n}, upper {}, rhs {})",
            lower.len(),
            upper.len(),
            rhs.len()
        );
    }

    let mut c_prime = vec![0.; n];
    let mut d_prime = vec![0.; n];

    let mut pivot = diagonal[0];
    for i in 0..n {
        if i > 0 {
            pivot = diagonal[i] - lower[i] * c_prime[i - 1];
        }
        if pivot == 0. || !pivot.is_finite() {
            bail!("Tridiagonal system is singular at row {i}");
        }
        if i < n - 1 {
            c_prime[i] = upper[i] / pivot;
        }
        d_prime[i] = if i == 0 {
            rhs[0] / pivot
        } else {
            (rhs[i] - lower[i] * d_prime[i - 1]) / pivot
        };
    }

    let mut solution = d_prime;
    for i in (0..n - 1).rev() {
        solution[i] -= c_prime[i] * solution[i + 1];
    }

    Ok(solution)
}
