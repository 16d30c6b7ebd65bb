//! Single-block model initialization for multicollector mass spectrometry.
//!
//! A block of raw data (baseline and on-peak intensity tables plus the
//! acquisition method that produced them) is accumulated into observation
//! vectors, a spline models the reference beam trajectory, and a
//! profile-likelihood scan over each parameter sizes the diagonal proposal
//! covariance that a downstream sampler starts from.

pub mod accumulate;
pub mod block;
pub mod dataset;
pub mod domain;
pub mod method;
pub mod model;
pub mod numerics;
pub mod session;

pub use accumulate::{accumulate_baseline, accumulate_on_peak, ObservationSet};
pub use block::BlockRecord;
pub use dataset::{BlockDataSet, InitializerConfig};
pub use domain::{BlockInitError, DetectorClass, DetectorSetup, InitResult};
pub use method::AnalysisMethod;
pub use model::{initialize_block_model, BlockModelRecord, InitializedBlockModel};
pub use session::{initialize_session, BlockOutcome, SessionRecord};
