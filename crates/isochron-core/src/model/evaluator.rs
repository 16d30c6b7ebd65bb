//! Forward model: predicts the combined observation vector from a parameter
//! state, and scores it against the observed data.

use std::collections::BTreeMap;

use crate::dataset::BlockDataSet;
use crate::numerics::mat_vec;

/// Borrowed view of one candidate parameter state. Scans build thousands of
/// these per block, so nothing here owns its data.
#[derive(Debug, Clone, Copy)]
pub struct ModelParams<'a> {
    pub baseline_means: &'a [f64],
    pub log_ratios: &'a [f64],
    pub detector_faraday_gain: f64,
    pub knot_coefficients: &'a [f64],
    pub detector_ordinal_to_faraday_index: &'a BTreeMap<usize, usize>,
}

impl ModelParams<'_> {
    /// Baseline mean for a raw detector ordinal. A detector with no baseline
    /// slot contributes nothing to the prediction.
    fn baseline_mean_for(&self, detector_ordinal: usize) -> f64 {
        self.detector_ordinal_to_faraday_index
            .get(&detector_ordinal)
            .and_then(|&index| self.baseline_means.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    /// `exp(log ratio)` for an isotope ordinal. The reference isotope sits
    /// past the end of the free log-ratio vector and scales by one.
    fn abundance_factor(&self, isotope_ordinal: usize) -> f64 {
        let index = isotope_ordinal.wrapping_sub(1);
        match self.log_ratios.get(index) {
            Some(log_ratio) => log_ratio.exp(),
            None => 1.0,
        }
    }
}

/// Predicts the full combined observation vector, rebuilding the beam
/// trajectory from the knot coefficients first.
pub fn predicted_data(params: &ModelParams<'_>, dataset: &BlockDataSet) -> Vec<f64> {
    let fitted = mat_vec(dataset.knot_matrix(), params.knot_coefficients);
    predicted_with_fitted(params, dataset, &fitted)
}

/// Predicts the combined observation vector against a precomputed beam
/// trajectory. Scans over parameters that leave the trajectory untouched use
/// this to skip the basis multiply.
pub fn predicted_with_fitted(
    params: &ModelParams<'_>,
    dataset: &BlockDataSet,
    fitted: &[f64],
) -> Vec<f64> {
    (0..dataset.total_count())
        .map(|index| predict_observation(params, dataset, fitted, index))
        .collect()
}

/// Predicts a single combined-layout observation. Pure in its inputs;
/// identical arguments always reproduce the identical value.
pub fn predict_observation(
    params: &ModelParams<'_>,
    dataset: &BlockDataSet,
    fitted: &[f64],
    index: usize,
) -> f64 {
    let detector_ordinal = dataset.detector_ordinals()[index];
    if index < dataset.baseline_count() {
        return params.baseline_mean_for(detector_ordinal);
    }

    let beam = fitted
        .get(dataset.time_indices()[index])
        .copied()
        .unwrap_or(f64::NAN);
    let abundance = params.abundance_factor(dataset.isotope_ordinals()[index]);
    if index < dataset.photomultiplier_start() {
        abundance / params.detector_faraday_gain * beam + params.baseline_mean_for(detector_ordinal)
    } else {
        abundance * beam
    }
}

/// Sum of squared residuals, each weighted by its noise variance. Any NaN in
/// the inputs makes the result NaN rather than being skipped.
pub fn weighted_misfit(observed: &[f64], predicted: &[f64], noise_variance: &[f64]) -> f64 {
    let mut sum = 0.0;
    for ((observation, prediction), variance) in observed.iter().zip(predicted).zip(noise_variance)
    {
        let residual = observation - prediction;
        sum += residual * residual / variance;
    }
    sum
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{predicted_data, weighted_misfit, ModelParams};
    use crate::block::BlockRecord;
    use crate::dataset::{BlockDataSet, InitializerConfig};
    use crate::domain::{DetectorSetup, SpeciesRecord};
    use crate::method::{AnalysisMethod, BaselineCell, SequenceCell};
    use crate::numerics::linspace;

    fn fixture() -> BlockDataSet {
        let mut baseline_table = BTreeMap::new();
        baseline_table.insert(4, vec![BaselineCell::new("BL1")]);

        let mut sequence_table = BTreeMap::new();
        sequence_table.insert(4, vec![SequenceCell::new("S1", "Rb85")]);
        sequence_table.insert(5, vec![SequenceCell::new("S1", "Rb87")]);

        let method = AnalysisMethod {
            detector_setup: DetectorSetup::phoenix_synthetic(),
            species_list: vec![SpeciesRecord::new("Rb85", 85), SpeciesRecord::new("Rb87", 87)],
            baseline_table,
            sequence_table,
        };

        let cycles = 16;
        let block = BlockRecord {
            block_number: 1,
            baseline_intensities: vec![vec![0.0, 0.0, 0.0, 0.0, 50.0, 0.0, 0.0, 0.0, 0.0, 0.0]; 3],
            baseline_id_to_indices: BTreeMap::from([("BL1".to_string(), vec![0, 1, 2])]),
            on_peak_intensities: vec![
                vec![0.0, 0.0, 0.0, 0.0, 400.0, 1000.0, 0.0, 0.0, 0.0, 0.0];
                cycles
            ],
            on_peak_time_stamps: linspace(0.0, 15.0, cycles),
            on_peak_id_to_indices: BTreeMap::from([("S1".to_string(), (0..cycles).collect())]),
        };

        BlockDataSet::assemble(
            &block,
            &method,
            InitializerConfig {
                num_segments: 4,
                basis_degree: 3,
            },
        )
        .expect("assemble")
    }

    #[test]
    fn predictions_follow_the_three_class_forward_model() {
        let dataset = fixture();
        // Cubic basis rows sum to one, so all-equal knot coefficients give a
        // flat beam at that level.
        let knot_coefficients = vec![1000.0; dataset.knot_matrix().ncols()];
        let map = BTreeMap::from([(4, 0)]);
        let params = ModelParams {
            baseline_means: &[50.0],
            log_ratios: &[(0.4_f64).ln()],
            detector_faraday_gain: 0.8,
            knot_coefficients: &knot_coefficients,
            detector_ordinal_to_faraday_index: &map,
        };

        let predicted = predicted_data(&params, &dataset);
        assert_eq!(predicted.len(), dataset.total_count());

        for value in &predicted[..dataset.baseline_count()] {
            assert!((value - 50.0).abs() < 1.0e-9);
        }
        // Faraday: exp(lr) / gain * beam + baseline = 0.4 / 0.8 * 1000 + 50.
        for value in &predicted[dataset.baseline_count()..dataset.photomultiplier_start()] {
            assert!((value - 550.0).abs() < 1.0e-6, "faraday prediction {value}");
        }
        // Photomultiplier reads the reference isotope: beam alone.
        for value in &predicted[dataset.photomultiplier_start()..] {
            assert!((value - 1000.0).abs() < 1.0e-6, "pm prediction {value}");
        }
    }

    #[test]
    fn detector_without_baseline_slot_contributes_no_baseline_term() {
        let dataset = fixture();
        let knot_coefficients = vec![1000.0; dataset.knot_matrix().ncols()];
        let map = BTreeMap::new();
        let params = ModelParams {
            baseline_means: &[],
            log_ratios: &[0.0],
            detector_faraday_gain: 1.0,
            knot_coefficients: &knot_coefficients,
            detector_ordinal_to_faraday_index: &map,
        };

        let predicted = predicted_data(&params, &dataset);
        for value in &predicted[..dataset.baseline_count()] {
            assert_eq!(*value, 0.0);
        }
        for value in &predicted[dataset.baseline_count()..dataset.photomultiplier_start()] {
            assert!((value - 1000.0).abs() < 1.0e-6);
        }
    }

    #[test]
    fn weighted_misfit_matches_hand_computation() {
        let observed = [1.0, 2.0, 3.0];
        let predicted = [1.5, 2.0, 1.0];
        let noise = [0.25, 1.0, 4.0];

        let misfit = weighted_misfit(&observed, &predicted, &noise);
        assert!((misfit - (1.0 + 0.0 + 1.0)).abs() < 1.0e-12);
    }

    #[test]
    fn weighted_misfit_propagates_nan() {
        let misfit = weighted_misfit(&[1.0, f64::NAN], &[1.0, 1.0], &[1.0, 1.0]);
        assert!(misfit.is_nan());
    }
}
