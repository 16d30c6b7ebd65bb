//! Block model state: point estimates, noise model, and the diagonal
//! proposal covariance produced by the initializer.

pub mod evaluator;
pub mod initializer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use evaluator::{predict_observation, predicted_data, weighted_misfit, ModelParams};
pub use initializer::{
    initialize_block_model, INITIAL_DETECTOR_FARADAY_GAIN, REPORT_INTERVAL,
};

/// Point-estimate state for one block.
///
/// `log_ratios` holds the free isotopes only; the reference isotope (highest
/// ordinal) is pinned at log ratio zero. Baseline vectors are indexed by
/// Faraday index, with `detector_ordinal_to_faraday_index` translating raw
/// detector ordinals into that compact range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockModelRecord {
    pub block_number: u64,
    pub baseline_means: Vec<f64>,
    pub baseline_standard_deviations: Vec<f64>,
    pub detector_faraday_gain: f64,
    pub detector_ordinal_to_faraday_index: BTreeMap<usize, usize>,
    pub log_ratios: Vec<f64>,
    pub knot_coefficients: Vec<f64>,
    pub fitted_intensity: Vec<f64>,
    pub signal_noise_variance: Vec<f64>,
    pub predicted_data: Vec<f64>,
    pub faraday_count: usize,
    pub isotope_count: usize,
}

impl BlockModelRecord {
    /// Free parameters: log ratios, knot coefficients, baseline means, and
    /// the single Faraday gain.
    pub fn parameter_count(&self) -> usize {
        self.log_ratios.len() + self.knot_coefficients.len() + self.baseline_means.len() + 1
    }

    /// Borrowed parameter view for re-running the forward model.
    pub fn params(&self) -> ModelParams<'_> {
        ModelParams {
            baseline_means: &self.baseline_means,
            log_ratios: &self.log_ratios,
            detector_faraday_gain: self.detector_faraday_gain,
            knot_coefficients: &self.knot_coefficients,
            detector_ordinal_to_faraday_index: &self.detector_ordinal_to_faraday_index,
        }
    }
}

/// Initializer output: the model point estimate plus the diagonal of the
/// starting proposal covariance, ordered log ratios, knot coefficients,
/// baseline means, gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializedBlockModel {
    pub model: BlockModelRecord,
    pub covariance_diagonal: Vec<f64>,
}
