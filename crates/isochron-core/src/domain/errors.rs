use crate::accumulate::ObservationSetError;
use crate::numerics::{LeastSquaresError, SplineBasisError};

pub type InitResult<T> = Result<T, BlockInitError>;

/// Failures raised while turning a raw block into an initialized model.
#[derive(Debug, thiserror::Error)]
pub enum BlockInitError {
    #[error("sequence {sequence_id} targets unknown species {species}")]
    UnknownSpecies {
        sequence_id: String,
        species: String,
    },
    #[error("block {block_number}: row index {index} out of range for {available} rows")]
    ObservationIndexOutOfRange {
        block_number: u64,
        index: usize,
        available: usize,
    },
    #[error("block {block_number}: spline basis construction failed")]
    SplineBasis {
        block_number: u64,
        #[source]
        source: SplineBasisError,
    },
    #[error("block {block_number}: trajectory least-squares solve failed")]
    TrajectorySolve {
        block_number: u64,
        #[source]
        source: LeastSquaresError,
    },
    #[error(
        "block {block_number}: log-ratio series has {actual} samples but the knot matrix has {expected} rows"
    )]
    TrajectoryObservationMismatch {
        block_number: u64,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Observations(#[from] ObservationSetError),
}
