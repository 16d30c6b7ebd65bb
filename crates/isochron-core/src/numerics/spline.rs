use super::linalg::DenseMatrix;
use super::stats::linspace;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplineBasisError {
    #[error("spline basis requires at least 2 time points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("spline basis requires at least 1 segment")]
    ZeroSegments,
    #[error("spline basis time points must be finite, index {index} has {value}")]
    NonFiniteTime { index: usize, value: f64 },
    #[error("spline basis time points must be non-decreasing, index {index} has {current} after {previous}")]
    NonChronologicalTime {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("spline basis time range must be positive, got [{first}, {last}]")]
    DegenerateTimeRange { first: f64, last: f64 },
}

/// Truncated-power B-spline basis over a block's acquisition times.
///
/// `num_segments + 1` evenly spaced interior knots span the time range,
/// extended by `degree` knots on each side (`num_segments + 2*degree + 1`
/// total, spacing `dx = range / num_segments`). The basis is the degree+1-th
/// finite difference of the truncated-power matrix, normalized by
/// `degree! * dx^degree`, with each function masked to its compact support
/// window of `degree + 2` knot intervals.
///
/// Output shape: one row per time point, `num_segments + degree` columns.
/// Purely a function of its inputs; no randomness, no state.
pub fn spline_basis(
    times: &[f64],
    num_segments: usize,
    degree: usize,
) -> Result<DenseMatrix, SplineBasisError> {
    validate_times(times, num_segments)?;

    let lower = times[0];
    let upper = times[times.len() - 1];
    let dx = (upper - lower) / num_segments as f64;
    let knot_count = num_segments + 2 * degree + 1;
    let knots = linspace(
        lower - degree as f64 * dx,
        upper + degree as f64 * dx,
        knot_count,
    );

    let mut powers = DenseMatrix::zeros(times.len(), knot_count);
    for (row, &time) in times.iter().enumerate() {
        for (col, &knot) in knots.iter().enumerate() {
            if time >= knot {
                powers[(row, col)] = (time - knot).powi(degree as i32);
            }
        }
    }

    let difference = scaled_difference_operator(knot_count, degree, dx);

    let basis_count = num_segments + degree;
    let mut basis = DenseMatrix::zeros(times.len(), basis_count);
    for (row, &time) in times.iter().enumerate() {
        for col in 0..basis_count {
            // compact support: the function rooted at knot `col` vanishes at
            // and beyond knot `col + degree + 1`
            if time >= knots[col + degree + 1] {
                continue;
            }
            let mut sum = 0.0;
            for inner in 0..knot_count {
                sum += powers[(row, inner)] * difference[(col, inner)];
            }
            basis[(row, col)] = sum;
        }
    }

    Ok(basis)
}

/// `diff(identity(size), degree + 1)` scaled by `1 / (degree! * dx^degree)`.
fn scaled_difference_operator(size: usize, degree: usize, dx: f64) -> DenseMatrix {
    let mut operator = identity(size);
    for _ in 0..(degree + 1) {
        operator = forward_difference(&operator);
    }

    let scale = 1.0 / (factorial(degree) * dx.powi(degree as i32));
    for row in 0..operator.nrows() {
        for col in 0..operator.ncols() {
            operator[(row, col)] *= scale;
        }
    }
    operator
}

fn forward_difference(matrix: &DenseMatrix) -> DenseMatrix {
    let mut output = DenseMatrix::zeros(matrix.nrows() - 1, matrix.ncols());
    for row in 0..output.nrows() {
        for col in 0..output.ncols() {
            output[(row, col)] = matrix[(row + 1, col)] - matrix[(row, col)];
        }
    }
    output
}

fn identity(size: usize) -> DenseMatrix {
    let mut output = DenseMatrix::zeros(size, size);
    for index in 0..size {
        output[(index, index)] = 1.0;
    }
    output
}

fn factorial(n: usize) -> f64 {
    (1..=n as u64).product::<u64>() as f64
}

fn validate_times(times: &[f64], num_segments: usize) -> Result<(), SplineBasisError> {
    if times.len() < 2 {
        return Err(SplineBasisError::InsufficientPoints {
            actual: times.len(),
        });
    }
    if num_segments == 0 {
        return Err(SplineBasisError::ZeroSegments);
    }

    for (index, value) in times.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(SplineBasisError::NonFiniteTime { index, value });
        }
        if index > 0 {
            let previous = times[index - 1];
            if value < previous {
                return Err(SplineBasisError::NonChronologicalTime {
                    index,
                    previous,
                    current: value,
                });
            }
        }
    }

    let first = times[0];
    let last = times[times.len() - 1];
    if last <= first {
        return Err(SplineBasisError::DegenerateTimeRange { first, last });
    }

    Ok(())
}
