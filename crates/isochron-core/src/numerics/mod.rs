pub mod linalg;
pub mod spline;
pub mod stats;

pub use linalg::{mat_vec, solve_least_squares, DenseMatrix, LeastSquaresError};
pub use spline::{spline_basis, SplineBasisError};
pub use stats::{linspace, RunningStatistics};
