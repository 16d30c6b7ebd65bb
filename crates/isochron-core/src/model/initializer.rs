//! Block model initializer: point estimates from the raw data, then a
//! profile-likelihood scan per parameter to size the starting proposal
//! covariance.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::dataset::BlockDataSet;
use crate::domain::{BlockInitError, InitResult};
use crate::model::evaluator::{
    predicted_data, predicted_with_fitted, weighted_misfit, ModelParams,
};
use crate::model::{BlockModelRecord, InitializedBlockModel};
use crate::numerics::{linspace, mat_vec, solve_least_squares, RunningStatistics};

/// Starting value for the Faraday/photomultiplier cross-calibration gain.
pub const INITIAL_DETECTOR_FARADAY_GAIN: f64 = 0.9;

/// Integration period in seconds; counting-noise variance scales by its
/// reciprocal.
pub const REPORT_INTERVAL: f64 = 0.1;

const LOG_RATIO_SCAN_HALF_WIDTH: f64 = 0.5;
const LOG_RATIO_SCAN_POINTS: usize = 1001;
const KNOT_SCAN_POINTS: usize = 101;
const GAIN_SCAN_HALF_WIDTH: f64 = 0.1;
const GAIN_SCAN_POINTS: usize = 1001;
const BASELINE_SCAN_POINTS: usize = 1001;

const COVARIANCE_STEP: f64 = 0.1;

/// Builds the starting model and diagonal proposal covariance for one block.
pub fn initialize_block_model(dataset: &BlockDataSet) -> InitResult<InitializedBlockModel> {
    let block_number = dataset.block_number();

    // Baseline statistics per Faraday detector, in ascending ordinal order.
    let mut baseline_stats: BTreeMap<usize, RunningStatistics> = BTreeMap::new();
    for (&ordinal, &value) in dataset
        .baseline()
        .detector_ordinals()
        .iter()
        .zip(dataset.baseline().intensities())
    {
        baseline_stats.entry(ordinal).or_default().add(value);
    }
    if baseline_stats.is_empty() {
        warn!(block_number, "block has no baseline observations");
    }

    let mut detector_ordinal_to_faraday_index = BTreeMap::new();
    let mut baseline_means = Vec::with_capacity(baseline_stats.len());
    let mut baseline_standard_deviations = Vec::with_capacity(baseline_stats.len());
    let mut spread_of_spreads = RunningStatistics::new();
    for (faraday_index, (&ordinal, stats)) in baseline_stats.iter().enumerate() {
        detector_ordinal_to_faraday_index.insert(ordinal, faraday_index);
        baseline_means.push(stats.mean());
        baseline_standard_deviations.push(stats.standard_deviation());
        spread_of_spreads.add(stats.standard_deviation());
    }
    let mean_baseline_standard_deviation = spread_of_spreads.mean();

    let isotope_count = reference_isotope_ordinal(
        dataset,
        &baseline_means,
        &detector_ordinal_to_faraday_index,
    );
    let free_log_ratio_count = isotope_count.saturating_sub(1);

    // Beam trajectory from the reference isotope's corrected series.
    let reference_series = corrected_series(
        dataset,
        isotope_count,
        &baseline_means,
        &detector_ordinal_to_faraday_index,
    );
    if reference_series.len() != dataset.knot_matrix().nrows() {
        return Err(BlockInitError::TrajectoryObservationMismatch {
            block_number,
            expected: dataset.knot_matrix().nrows(),
            actual: reference_series.len(),
        });
    }
    let knot_coefficients = solve_least_squares(
        dataset.knot_matrix(),
        &reference_series
            .iter()
            .map(|&(_, value)| value)
            .collect::<Vec<_>>(),
    )
    .map_err(|source| BlockInitError::TrajectorySolve {
        block_number,
        source,
    })?;
    let fitted_intensity = mat_vec(dataset.knot_matrix(), &knot_coefficients);

    // Each free isotope's log ratio comes from the mean of its corrected
    // observations divided by the fitted beam at the same time step.
    let mut log_ratios = Vec::with_capacity(free_log_ratio_count);
    for isotope_ordinal in 1..=free_log_ratio_count {
        let series = corrected_series(
            dataset,
            isotope_ordinal,
            &baseline_means,
            &detector_ordinal_to_faraday_index,
        );
        let mut ratio_stats = RunningStatistics::new();
        for (time_index, value) in series {
            let beam = fitted_intensity
                .get(time_index)
                .copied()
                .unwrap_or(f64::NAN);
            ratio_stats.add(value / beam);
        }
        log_ratios.push(ratio_stats.mean().ln());
    }

    let signal_noise_variance = signal_noise(
        dataset,
        &log_ratios,
        &fitted_intensity,
        &baseline_standard_deviations,
        &detector_ordinal_to_faraday_index,
    );

    let point_params = ModelParams {
        baseline_means: &baseline_means,
        log_ratios: &log_ratios,
        detector_faraday_gain: INITIAL_DETECTOR_FARADAY_GAIN,
        knot_coefficients: &knot_coefficients,
        detector_ordinal_to_faraday_index: &detector_ordinal_to_faraday_index,
    };
    let predicted = predicted_data(&point_params, dataset);
    debug!(
        block_number,
        isotope_count,
        faraday_count = detector_ordinal_to_faraday_index.len(),
        "point estimates complete, starting profile scans"
    );

    // Profile scans: perturb one parameter at a time over its grid and turn
    // the misfit profile into a variance.
    let log_ratio_variances: Vec<f64> = (0..log_ratios.len())
        .into_par_iter()
        .map(|parameter| {
            let offsets = linspace(
                -LOG_RATIO_SCAN_HALF_WIDTH,
                LOG_RATIO_SCAN_HALF_WIDTH,
                LOG_RATIO_SCAN_POINTS,
            );
            let errors: Vec<f64> = offsets
                .iter()
                .map(|&offset| {
                    let mut candidate = log_ratios.clone();
                    candidate[parameter] += offset;
                    let params = ModelParams {
                        log_ratios: &candidate,
                        ..point_params
                    };
                    let model = predicted_with_fitted(&params, dataset, &fitted_intensity);
                    weighted_misfit(dataset.intensities(), &model, &signal_noise_variance)
                })
                .collect();
            profile_variance(&offsets, &errors)
        })
        .collect();

    let knot_variances: Vec<f64> = (0..knot_coefficients.len())
        .into_par_iter()
        .map(|parameter| {
            if mean_baseline_standard_deviation == 0.0 {
                return 0.0;
            }
            let offsets = linspace(
                -mean_baseline_standard_deviation,
                mean_baseline_standard_deviation,
                KNOT_SCAN_POINTS,
            );
            let errors: Vec<f64> = offsets
                .iter()
                .map(|&offset| {
                    let mut candidate = knot_coefficients.clone();
                    candidate[parameter] += offset;
                    let params = ModelParams {
                        knot_coefficients: &candidate,
                        ..point_params
                    };
                    let model = predicted_data(&params, dataset);
                    weighted_misfit(dataset.intensities(), &model, &signal_noise_variance)
                })
                .collect();
            profile_variance(&offsets, &errors)
        })
        .collect();

    let gain_offsets = linspace(-GAIN_SCAN_HALF_WIDTH, GAIN_SCAN_HALF_WIDTH, GAIN_SCAN_POINTS);
    let gain_errors: Vec<f64> = gain_offsets
        .iter()
        .map(|&offset| {
            let params = ModelParams {
                detector_faraday_gain: INITIAL_DETECTOR_FARADAY_GAIN + offset,
                ..point_params
            };
            let model = predicted_with_fitted(&params, dataset, &fitted_intensity);
            weighted_misfit(dataset.intensities(), &model, &signal_noise_variance)
        })
        .collect();
    let gain_variance = profile_variance(&gain_offsets, &gain_errors);

    let baseline_variances: Vec<f64> = (0..baseline_means.len())
        .into_par_iter()
        .map(|parameter| {
            let half_width = baseline_standard_deviations[parameter];
            if half_width == 0.0 {
                return 0.0;
            }
            let offsets = linspace(-half_width, half_width, BASELINE_SCAN_POINTS);
            let errors: Vec<f64> = offsets
                .iter()
                .map(|&offset| {
                    let mut candidate = baseline_means.clone();
                    candidate[parameter] += offset;
                    let params = ModelParams {
                        baseline_means: &candidate,
                        ..point_params
                    };
                    let model = predicted_with_fitted(&params, dataset, &fitted_intensity);
                    weighted_misfit(dataset.intensities(), &model, &signal_noise_variance)
                })
                .collect();
            profile_variance(&offsets, &errors)
        })
        .collect();

    let faraday_count = detector_ordinal_to_faraday_index.len();
    let model = BlockModelRecord {
        block_number,
        baseline_means,
        baseline_standard_deviations,
        detector_faraday_gain: INITIAL_DETECTOR_FARADAY_GAIN,
        detector_ordinal_to_faraday_index,
        log_ratios,
        knot_coefficients,
        fitted_intensity,
        signal_noise_variance,
        predicted_data: predicted,
        faraday_count,
        isotope_count,
    };

    let shrinkage = COVARIANCE_STEP * COVARIANCE_STEP / model.parameter_count() as f64;
    let mut covariance_diagonal = Vec::with_capacity(model.parameter_count());
    covariance_diagonal.extend(log_ratio_variances.iter().map(|v| v.sqrt() * shrinkage));
    covariance_diagonal.extend(knot_variances.iter().map(|v| v.sqrt() * shrinkage));
    covariance_diagonal.extend(baseline_variances.iter().map(|v| v.sqrt() * shrinkage));
    covariance_diagonal.push(gain_variance.sqrt() * shrinkage);

    Ok(InitializedBlockModel {
        model,
        covariance_diagonal,
    })
}

/// Highest isotope ordinal seen on the photomultiplier; that species pins
/// the log-ratio scale. Warns when the photomultiplier means over the
/// species both channels saw point at a different isotope.
fn reference_isotope_ordinal(
    dataset: &BlockDataSet,
    baseline_means: &[f64],
    detector_ordinal_to_faraday_index: &BTreeMap<usize, usize>,
) -> usize {
    let photomultiplier = dataset.on_peak_photomultiplier();
    let Some(&isotope_count) = photomultiplier.isotope_ordinals().iter().max() else {
        warn!(
            block_number = dataset.block_number(),
            "block has no photomultiplier observations"
        );
        return 0;
    };

    let mut faraday_isotope_stats: BTreeMap<usize, RunningStatistics> = BTreeMap::new();
    for (&isotope, (&ordinal, &value)) in dataset.on_peak_faraday().isotope_ordinals().iter().zip(
        dataset
            .on_peak_faraday()
            .detector_ordinals()
            .iter()
            .zip(dataset.on_peak_faraday().intensities()),
    ) {
        let baseline = detector_ordinal_to_faraday_index
            .get(&ordinal)
            .and_then(|&index| baseline_means.get(index))
            .copied()
            .unwrap_or(0.0);
        faraday_isotope_stats
            .entry(isotope)
            .or_default()
            .add(value - baseline);
    }

    let mut photomultiplier_isotope_stats: BTreeMap<usize, RunningStatistics> = BTreeMap::new();
    for (&isotope, &value) in photomultiplier
        .isotope_ordinals()
        .iter()
        .zip(photomultiplier.intensities())
    {
        photomultiplier_isotope_stats
            .entry(isotope)
            .or_default()
            .add(value);
    }

    let most_abundant_shared = photomultiplier_isotope_stats
        .iter()
        .filter(|(isotope, _)| faraday_isotope_stats.contains_key(isotope))
        .max_by(|(_, left), (_, right)| left.mean().total_cmp(&right.mean()))
        .map(|(&isotope, _)| isotope);
    if let Some(most_abundant) = most_abundant_shared {
        if most_abundant != isotope_count {
            warn!(
                block_number = dataset.block_number(),
                most_abundant,
                reference = isotope_count,
                "most abundant shared species is not the reference isotope"
            );
        }
    }

    isotope_count
}

/// Observations of one isotope, translated onto the photomultiplier scale
/// and ordered by time step. Faraday readings lose their baseline and gain
/// down by the initial cross-calibration factor.
fn corrected_series(
    dataset: &BlockDataSet,
    isotope_ordinal: usize,
    baseline_means: &[f64],
    detector_ordinal_to_faraday_index: &BTreeMap<usize, usize>,
) -> Vec<(usize, f64)> {
    let mut series = Vec::new();
    for index in 0..dataset.total_count() {
        if dataset.isotope_ordinals()[index] != isotope_ordinal {
            continue;
        }
        let value = dataset.intensities()[index];
        let corrected = if index < dataset.photomultiplier_start() {
            let baseline = detector_ordinal_to_faraday_index
                .get(&dataset.detector_ordinals()[index])
                .and_then(|&faraday_index| baseline_means.get(faraday_index))
                .copied()
                .unwrap_or(0.0);
            (value - baseline) * INITIAL_DETECTOR_FARADAY_GAIN
        } else {
            value
        };
        series.push((dataset.time_indices()[index], corrected));
    }
    series.sort_by_key(|&(time_index, _)| time_index);
    series
}

/// Per-observation noise variance: baseline spread for baseline readings,
/// shot noise scaled by the report interval on peak, plus the baseline
/// spread again on Faraday channels.
fn signal_noise(
    dataset: &BlockDataSet,
    log_ratios: &[f64],
    fitted_intensity: &[f64],
    baseline_standard_deviations: &[f64],
    detector_ordinal_to_faraday_index: &BTreeMap<usize, usize>,
) -> Vec<f64> {
    let baseline_count = dataset.baseline_count();
    let photomultiplier_start = dataset.photomultiplier_start();

    let baseline_variance_for = |detector_ordinal: usize| -> f64 {
        let spread = detector_ordinal_to_faraday_index
            .get(&detector_ordinal)
            .and_then(|&index| baseline_standard_deviations.get(index))
            .copied()
            .unwrap_or(0.0);
        spread * spread
    };

    let mut noise = Vec::with_capacity(dataset.total_count());
    for index in 0..dataset.total_count() {
        let detector_ordinal = dataset.detector_ordinals()[index];
        if index < baseline_count {
            noise.push(baseline_variance_for(detector_ordinal));
            continue;
        }

        let beam = fitted_intensity
            .get(dataset.time_indices()[index])
            .copied()
            .unwrap_or(f64::NAN);
        let ratio_index = dataset.isotope_ordinals()[index].wrapping_sub(1);
        let abundance = match log_ratios.get(ratio_index) {
            Some(log_ratio) => log_ratio.exp(),
            None => 1.0,
        };
        if index < photomultiplier_start {
            let expected = abundance * (1.0 / INITIAL_DETECTOR_FARADAY_GAIN) * beam;
            noise.push(expected / REPORT_INTERVAL + baseline_variance_for(detector_ordinal));
        } else {
            let expected = abundance * beam;
            noise.push(expected / REPORT_INTERVAL);
        }
    }
    noise
}

/// Turns a misfit profile into a variance: offsets are weighted by the
/// normalized likelihood `exp(-(e - min(e)) / 2)` and the variance is the
/// weighted mean squared offset around zero.
fn profile_variance(offsets: &[f64], errors: &[f64]) -> f64 {
    let minimum = errors.iter().copied().fold(f64::INFINITY, f64::min);

    let mut weight_sum = 0.0;
    for &error in errors {
        weight_sum += (-(error - minimum) / 2.0).exp();
    }

    let mut variance = 0.0;
    for (&error, &offset) in errors.iter().zip(offsets) {
        let probability = (-(error - minimum) / 2.0).exp() / weight_sum;
        variance += probability * offset * offset;
    }
    variance
}
