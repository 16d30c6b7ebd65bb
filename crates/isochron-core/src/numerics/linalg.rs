use faer::Mat;

pub type DenseMatrix = Mat<f64>;

const RANK_DEFICIENT_RELATIVE_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LeastSquaresError {
    #[error("least squares requires a non-empty matrix")]
    EmptyMatrix,
    #[error("least squares requires rows >= columns, got {rows}x{cols}")]
    UnderdeterminedSystem { rows: usize, cols: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
    #[error("matrix is rank deficient at column {column}")]
    RankDeficientColumn { column: usize },
}

/// Householder-QR linear least squares: minimizes `||A x - b||` for a dense
/// tall matrix. Rank deficiency is detected against the input's largest
/// column norm so a degenerate basis aborts instead of returning garbage.
pub fn solve_least_squares(
    matrix: &DenseMatrix,
    rhs: &[f64],
) -> Result<Vec<f64>, LeastSquaresError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || cols == 0 {
        return Err(LeastSquaresError::EmptyMatrix);
    }
    if rows < cols {
        return Err(LeastSquaresError::UnderdeterminedSystem { rows, cols });
    }
    if rhs.len() != rows {
        return Err(LeastSquaresError::RhsLengthMismatch {
            expected: rows,
            actual: rhs.len(),
        });
    }

    let pivot_threshold = largest_column_norm(matrix) * RANK_DEFICIENT_RELATIVE_EPSILON;
    let mut work = matrix.clone();
    let mut projected = rhs.to_vec();
    let mut householder = vec![0.0; rows];

    for pivot in 0..cols {
        let mut norm_sq = 0.0;
        for row in pivot..rows {
            norm_sq += work[(row, pivot)] * work[(row, pivot)];
        }
        let norm = norm_sq.sqrt();
        if norm <= pivot_threshold {
            return Err(LeastSquaresError::RankDeficientColumn { column: pivot });
        }

        let head = work[(pivot, pivot)];
        let alpha = if head >= 0.0 { -norm } else { norm };
        householder[pivot] = head - alpha;
        for row in (pivot + 1)..rows {
            householder[row] = work[(row, pivot)];
        }
        let reflector_norm_sq: f64 = householder[pivot..rows]
            .iter()
            .map(|component| component * component)
            .sum();

        for col in pivot..cols {
            let mut dot = 0.0;
            for row in pivot..rows {
                dot += householder[row] * work[(row, col)];
            }
            let factor = 2.0 * dot / reflector_norm_sq;
            for row in pivot..rows {
                work[(row, col)] -= factor * householder[row];
            }
        }

        let mut dot = 0.0;
        for row in pivot..rows {
            dot += householder[row] * projected[row];
        }
        let factor = 2.0 * dot / reflector_norm_sq;
        for row in pivot..rows {
            projected[row] -= factor * householder[row];
        }
    }

    let mut solution = vec![0.0; cols];
    for pivot in (0..cols).rev() {
        let mut value = projected[pivot];
        for col in (pivot + 1)..cols {
            value -= work[(pivot, col)] * solution[col];
        }

        let diagonal = work[(pivot, pivot)];
        if diagonal.abs() <= pivot_threshold {
            return Err(LeastSquaresError::RankDeficientColumn { column: pivot });
        }
        solution[pivot] = value / diagonal;
    }

    Ok(solution)
}

/// Dense matrix-vector product. The vector length must equal the column
/// count; callers hold that invariant by construction (coefficients always
/// come out of `solve_least_squares` on the same matrix).
pub fn mat_vec(matrix: &DenseMatrix, vector: &[f64]) -> Vec<f64> {
    debug_assert_eq!(matrix.ncols(), vector.len());

    let mut output = vec![0.0; matrix.nrows()];
    for (row, entry) in output.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (col, value) in vector.iter().enumerate() {
            sum += matrix[(row, col)] * value;
        }
        *entry = sum;
    }
    output
}

fn largest_column_norm(matrix: &DenseMatrix) -> f64 {
    let mut best = 0.0_f64;
    for col in 0..matrix.ncols() {
        let mut norm_sq = 0.0;
        for row in 0..matrix.nrows() {
            norm_sq += matrix[(row, col)] * matrix[(row, col)];
        }
        best = best.max(norm_sq.sqrt());
    }
    best
}
