use std::collections::BTreeMap;

use isochron_core::domain::SpeciesRecord;
use isochron_core::method::{AnalysisMethod, BaselineCell, SequenceCell};
use isochron_core::model::initializer::INITIAL_DETECTOR_FARADAY_GAIN;
use isochron_core::model::predicted_data;
use isochron_core::numerics::linspace;
use isochron_core::{
    initialize_block_model, initialize_session, BlockDataSet, BlockRecord, DetectorSetup,
    InitializerConfig,
};

const CYCLES: usize = 60;

fn two_isotope_method() -> AnalysisMethod {
    let mut baseline_table = BTreeMap::new();
    baseline_table.insert(4, vec![BaselineCell::new("BL1")]);

    let mut sequence_table = BTreeMap::new();
    sequence_table.insert(4, vec![SequenceCell::new("S1", "Sr87")]);
    sequence_table.insert(5, vec![SequenceCell::new("S1", "Sr88")]);

    AnalysisMethod {
        detector_setup: DetectorSetup::phoenix_synthetic(),
        species_list: vec![SpeciesRecord::new("Sr87", 87), SpeciesRecord::new("Sr88", 88)],
        baseline_table,
        sequence_table,
    }
}

/// Flat beam at `beam` counts, exact ratio, optional baseline wobble.
fn synthetic_block(block_number: u64, ratio: f64, beam: f64, baseline_spread: bool) -> BlockRecord {
    let baseline_level = 100.0;
    let mut baseline_intensities = Vec::new();
    let offsets: &[f64] = if baseline_spread {
        &[-1.0, 0.0, 1.0]
    } else {
        &[0.0, 0.0, 0.0]
    };
    for offset in offsets {
        let mut row = vec![0.0; 10];
        row[4] = baseline_level + offset;
        baseline_intensities.push(row);
    }

    let mut row = vec![0.0; 10];
    row[4] = baseline_level + ratio * beam / INITIAL_DETECTOR_FARADAY_GAIN;
    row[5] = beam;

    BlockRecord {
        block_number,
        baseline_intensities,
        baseline_id_to_indices: BTreeMap::from([("BL1".to_string(), vec![0, 1, 2])]),
        on_peak_intensities: vec![row; CYCLES],
        on_peak_time_stamps: linspace(0.0, (CYCLES - 1) as f64 * 0.5, CYCLES),
        on_peak_id_to_indices: BTreeMap::from([("S1".to_string(), (0..CYCLES).collect())]),
    }
}

fn assemble(block: &BlockRecord) -> BlockDataSet {
    BlockDataSet::assemble(block, &two_isotope_method(), InitializerConfig::default())
        .expect("assemble")
}

#[test]
fn noiseless_block_is_recovered_exactly() {
    let dataset = assemble(&synthetic_block(1, 0.5, 1000.0, false));
    let initialized = initialize_block_model(&dataset).expect("initialize");
    let model = &initialized.model;

    assert!((model.baseline_means[0] - 100.0).abs() < 1.0e-12);
    assert_eq!(model.baseline_standard_deviations[0], 0.0);
    assert!((model.log_ratios[0] - 0.5_f64.ln()).abs() < 1.0e-9);
    for beam in &model.fitted_intensity {
        assert!((beam - 1000.0).abs() < 1.0e-6);
    }
    for (observed, predicted) in dataset.intensities().iter().zip(&model.predicted_data) {
        assert!(
            (observed - predicted).abs() < 1.0e-6,
            "observed {observed}, predicted {predicted}"
        );
    }

    // Zero baseline spread collapses the knot and baseline scan grids, so
    // those covariance entries are exactly zero.
    let knot_start = model.log_ratios.len();
    let baseline_start = knot_start + model.knot_coefficients.len();
    let gain_index = baseline_start + model.baseline_means.len();
    assert_eq!(initialized.covariance_diagonal.len(), gain_index + 1);
    for entry in &initialized.covariance_diagonal[knot_start..baseline_start] {
        assert_eq!(*entry, 0.0);
    }
    for entry in &initialized.covariance_diagonal[baseline_start..gain_index] {
        assert_eq!(*entry, 0.0);
    }
}

#[test]
fn two_detector_noiseless_block_recovers_both_baselines() {
    // Baselines on L5 and L4, minor isotope on L5, reference on the Daly.
    let mut baseline_table = BTreeMap::new();
    baseline_table.insert(0, vec![BaselineCell::new("BL1")]);
    baseline_table.insert(1, vec![BaselineCell::new("BL1")]);

    let mut sequence_table = BTreeMap::new();
    sequence_table.insert(0, vec![SequenceCell::new("S1", "Sr87")]);
    sequence_table.insert(5, vec![SequenceCell::new("S1", "Sr88")]);

    let method = AnalysisMethod {
        detector_setup: DetectorSetup::phoenix_synthetic(),
        species_list: vec![SpeciesRecord::new("Sr87", 87), SpeciesRecord::new("Sr88", 88)],
        baseline_table,
        sequence_table,
    };

    let mut baseline_row = vec![0.0; 10];
    baseline_row[0] = 100.0;
    baseline_row[1] = 200.0;
    let mut on_peak_row = vec![0.0; 10];
    on_peak_row[0] = 100.0 + 500.0 / INITIAL_DETECTOR_FARADAY_GAIN;
    on_peak_row[5] = 1000.0;

    let block = BlockRecord {
        block_number: 1,
        baseline_intensities: vec![baseline_row; 4],
        baseline_id_to_indices: BTreeMap::from([("BL1".to_string(), vec![0, 1, 2, 3])]),
        on_peak_intensities: vec![on_peak_row; CYCLES],
        on_peak_time_stamps: linspace(0.0, (CYCLES - 1) as f64 * 0.5, CYCLES),
        on_peak_id_to_indices: BTreeMap::from([("S1".to_string(), (0..CYCLES).collect())]),
    };

    let dataset =
        BlockDataSet::assemble(&block, &method, InitializerConfig::default()).expect("assemble");
    let initialized = initialize_block_model(&dataset).expect("initialize");
    let model = &initialized.model;

    assert_eq!(model.faraday_count, 2);
    assert_eq!(model.baseline_means, vec![100.0, 200.0]);
    assert_eq!(model.baseline_standard_deviations, vec![0.0, 0.0]);
    assert!((model.log_ratios[0] - 0.5_f64.ln()).abs() < 1.0e-9);
    for (observed, predicted) in dataset.intensities().iter().zip(&model.predicted_data) {
        assert!((observed - predicted).abs() < 1.0e-6);
    }

    let knot_start = model.log_ratios.len();
    let baseline_start = knot_start + model.knot_coefficients.len();
    for entry in
        &initialized.covariance_diagonal[baseline_start..baseline_start + model.baseline_means.len()]
    {
        assert_eq!(*entry, 0.0);
    }
}

#[test]
fn point_estimate_sits_at_the_log_ratio_misfit_minimum() {
    use isochron_core::model::{weighted_misfit, ModelParams};

    let dataset = assemble(&synthetic_block(1, 0.5, 1.0e6, true));
    let model = initialize_block_model(&dataset).expect("initialize").model;

    let misfit_for = |log_ratios: &[f64]| {
        let params = ModelParams {
            log_ratios,
            ..model.params()
        };
        let predicted = predicted_data(&params, &dataset);
        weighted_misfit(dataset.intensities(), &predicted, &model.signal_noise_variance)
    };

    let at_point = misfit_for(&model.log_ratios);
    for offset in [-0.1, -0.01, 0.01, 0.1] {
        let perturbed = vec![model.log_ratios[0] + offset];
        assert!(
            misfit_for(&perturbed) >= at_point - 1.0e-9,
            "offset {offset} should not improve on the point estimate"
        );
    }
}

#[test]
fn doubling_the_minor_isotope_shifts_the_log_ratio_by_ln_two() {
    let half = assemble(&synthetic_block(1, 0.5, 1.0e6, true));
    let doubled = assemble(&synthetic_block(2, 1.0, 1.0e6, true));

    let half_model = initialize_block_model(&half).expect("half").model;
    let doubled_model = initialize_block_model(&doubled).expect("doubled").model;

    let shift = doubled_model.log_ratios[0] - half_model.log_ratios[0];
    assert!(
        (shift - 2.0_f64.ln()).abs() < 1.0e-9,
        "log-ratio shift {shift}"
    );
}

#[test]
fn baseline_spread_yields_finite_nonnegative_covariance() {
    let dataset = assemble(&synthetic_block(1, 0.5, 1.0e6, true));
    let initialized = initialize_block_model(&dataset).expect("initialize");

    assert_eq!(
        initialized.covariance_diagonal.len(),
        initialized.model.parameter_count()
    );
    for (index, entry) in initialized.covariance_diagonal.iter().enumerate() {
        assert!(entry.is_finite(), "entry {index} is {entry}");
        assert!(*entry >= 0.0, "entry {index} is {entry}");
    }
}

#[test]
fn stored_prediction_matches_rerunning_the_forward_model() {
    let dataset = assemble(&synthetic_block(1, 0.5, 1.0e6, true));
    let initialized = initialize_block_model(&dataset).expect("initialize");
    let model = &initialized.model;

    let replayed = predicted_data(&model.params(), &dataset);
    assert_eq!(replayed.len(), model.predicted_data.len());
    for (stored, fresh) in model.predicted_data.iter().zip(&replayed) {
        assert!((stored - fresh).abs() < 1.0e-12);
    }
}

#[test]
fn wobbling_beam_is_tracked_by_the_spline_trajectory() {
    let mut block = synthetic_block(1, 0.5, 0.0, true);
    for (cycle, row) in block.on_peak_intensities.iter_mut().enumerate() {
        let time = cycle as f64 * 0.5;
        let beam = 1.0e6 * (1.0 + 0.05 * (time / 8.0).sin());
        row[4] = 100.0 + 0.5 * beam / INITIAL_DETECTOR_FARADAY_GAIN;
        row[5] = beam;
    }

    let dataset = assemble(&block);
    let model = initialize_block_model(&dataset).expect("initialize").model;

    for (cycle, fitted) in model.fitted_intensity.iter().enumerate() {
        let time = cycle as f64 * 0.5;
        let beam = 1.0e6 * (1.0 + 0.05 * (time / 8.0).sin());
        assert!(
            ((fitted - beam) / beam).abs() < 1.0e-3,
            "cycle {cycle}: fitted {fitted}, beam {beam}"
        );
    }
    assert!((model.log_ratios[0] - 0.5_f64.ln()).abs() < 1.0e-3);
}

#[test]
fn session_initialization_preserves_block_order() {
    let blocks = vec![
        synthetic_block(1, 0.5, 1.0e6, true),
        synthetic_block(2, 0.25, 1.0e6, true),
    ];
    let outcomes =
        initialize_session(&blocks, &two_isotope_method(), InitializerConfig::default());

    assert_eq!(outcomes.len(), 2);
    let first = outcomes[0].result.as_ref().expect("block 1");
    let second = outcomes[1].result.as_ref().expect("block 2");
    assert_eq!(first.model.block_number, 1);
    assert_eq!(second.model.block_number, 2);
    assert!((first.model.log_ratios[0] - 0.5_f64.ln()).abs() < 1.0e-9);
    assert!((second.model.log_ratios[0] - 0.25_f64.ln()).abs() < 1.0e-9);
}
