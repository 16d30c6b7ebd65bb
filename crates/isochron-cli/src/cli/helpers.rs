use std::collections::BTreeMap;
use std::path::Path;

use isochron_core::method::{AnalysisMethod, BaselineCell, SequenceCell};
use isochron_core::model::initializer::INITIAL_DETECTOR_FARADAY_GAIN;
use isochron_core::domain::SpeciesRecord;
use isochron_core::{BlockRecord, DetectorSetup, InitializerConfig, SessionRecord};

use super::CliError;

pub(super) fn read_session(path: &Path) -> Result<SessionRecord, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    serde_json::from_str(&contents)
        .map_err(|source| CliError::encoding(format!("failed to parse '{}'", path.display()), source))
}

pub(super) fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(value)
        .map_err(|source| CliError::encoding(format!("failed to encode '{}'", path.display()), source))?;
    std::fs::write(path, encoded)
        .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
}

pub(super) fn ensure_output_dir(path: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(path)
        .map_err(|source| CliError::io(format!("failed to create '{}'", path.display()), source))
}

/// Deterministic synthetic session: a gently wobbling beam at a true 87/88
/// ratio of 0.5, read on the Ax Faraday and the Daly. No randomness, so
/// repeated runs produce identical models.
pub(super) fn synthetic_session(block_count: usize) -> SessionRecord {
    let mut baseline_table = BTreeMap::new();
    baseline_table.insert(4, vec![BaselineCell::new("BL1")]);

    let mut sequence_table = BTreeMap::new();
    sequence_table.insert(4, vec![SequenceCell::new("S1", "Sr87")]);
    sequence_table.insert(5, vec![SequenceCell::new("S1", "Sr88")]);

    let method = AnalysisMethod {
        detector_setup: DetectorSetup::phoenix_synthetic(),
        species_list: vec![SpeciesRecord::new("Sr87", 87), SpeciesRecord::new("Sr88", 88)],
        baseline_table,
        sequence_table,
    };

    let blocks = (1..=block_count as u64).map(synthetic_block).collect();

    SessionRecord {
        method,
        config: InitializerConfig::default(),
        blocks,
    }
}

fn synthetic_block(block_number: u64) -> BlockRecord {
    const BASELINE_CYCLES: usize = 20;
    const ON_PEAK_CYCLES: usize = 60;
    const DETECTOR_COUNT: usize = 10;
    const TRUE_RATIO: f64 = 0.5;
    const BASELINE_LEVEL: f64 = 100.0;

    let phase = block_number as f64;

    let mut baseline_intensities = Vec::with_capacity(BASELINE_CYCLES);
    for cycle in 0..BASELINE_CYCLES {
        let wobble = (cycle as f64 * 0.7 + phase).sin() * 2.0;
        let mut row = vec![0.0; DETECTOR_COUNT];
        row[4] = BASELINE_LEVEL + wobble;
        baseline_intensities.push(row);
    }

    let mut on_peak_intensities = Vec::with_capacity(ON_PEAK_CYCLES);
    let mut on_peak_time_stamps = Vec::with_capacity(ON_PEAK_CYCLES);
    for cycle in 0..ON_PEAK_CYCLES {
        let time = cycle as f64 * 0.5;
        let beam = 1.0e6 * (1.0 + 0.05 * (time / 8.0 + phase).sin());
        let mut row = vec![0.0; DETECTOR_COUNT];
        row[4] = BASELINE_LEVEL + TRUE_RATIO * beam / INITIAL_DETECTOR_FARADAY_GAIN;
        row[5] = beam;
        on_peak_intensities.push(row);
        on_peak_time_stamps.push(time);
    }

    BlockRecord {
        block_number,
        baseline_intensities,
        baseline_id_to_indices: BTreeMap::from([(
            "BL1".to_string(),
            (0..BASELINE_CYCLES).collect(),
        )]),
        on_peak_intensities,
        on_peak_time_stamps,
        on_peak_id_to_indices: BTreeMap::from([(
            "S1".to_string(),
            (0..ON_PEAK_CYCLES).collect(),
        )]),
    }
}
