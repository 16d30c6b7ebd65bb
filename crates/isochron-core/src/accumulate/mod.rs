//! Data accumulator: flattens a block's raw intensity tables into per-class
//! observation vectors ordered by detector ordinal.

use crate::block::BlockRecord;
use crate::domain::{BlockInitError, DetectorClass, InitResult};
use crate::method::AnalysisMethod;

/// Isotope ordinal recorded for baseline observations, which have no target
/// species.
pub const BASELINE_SENTINEL: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObservationSetError {
    #[error("observation columns disagree in length: {lengths:?}")]
    ColumnLengthMismatch { lengths: [usize; 5] },
}

/// Parallel observation columns for one detector class within one block.
///
/// Every column has the same length; `new` enforces that so downstream
/// zips never truncate silently. Entries are ordered detector-major
/// (ascending ordinal) and chronologically within a detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    intensities: Vec<f64>,
    detector_ordinals: Vec<usize>,
    times: Vec<f64>,
    time_indices: Vec<usize>,
    isotope_ordinals: Vec<usize>,
}

impl ObservationSet {
    pub fn new(
        intensities: Vec<f64>,
        detector_ordinals: Vec<usize>,
        times: Vec<f64>,
        time_indices: Vec<usize>,
        isotope_ordinals: Vec<usize>,
    ) -> Result<Self, ObservationSetError> {
        let lengths = [
            intensities.len(),
            detector_ordinals.len(),
            times.len(),
            time_indices.len(),
            isotope_ordinals.len(),
        ];
        if lengths.iter().any(|length| *length != lengths[0]) {
            return Err(ObservationSetError::ColumnLengthMismatch { lengths });
        }

        Ok(Self {
            intensities,
            detector_ordinals,
            times,
            time_indices,
            isotope_ordinals,
        })
    }

    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn detector_ordinals(&self) -> &[usize] {
        &self.detector_ordinals
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn time_indices(&self) -> &[usize] {
        &self.time_indices
    }

    pub fn isotope_ordinals(&self) -> &[usize] {
        &self.isotope_ordinals
    }
}

/// Gathers every baseline reading taken on a Faraday detector. Baseline rows
/// carry no species and no meaningful acquisition time, so the isotope column
/// holds [`BASELINE_SENTINEL`] and the time column zeros.
pub fn accumulate_baseline(
    block: &BlockRecord,
    method: &AnalysisMethod,
) -> InitResult<ObservationSet> {
    let mut intensities = Vec::new();
    let mut detector_ordinals = Vec::new();

    for (&ordinal, cells) in &method.baseline_table {
        let Some(detector) = method.detector_setup.detector(ordinal) else {
            continue;
        };
        if !detector.detector_type.is_faraday() {
            continue;
        }

        for cell in cells {
            let Some(rows) = block.baseline_id_to_indices.get(&cell.baseline_id) else {
                continue;
            };
            let mut rows = rows.clone();
            rows.sort_unstable();

            for row in rows {
                let value = block
                    .baseline_intensities
                    .get(row)
                    .and_then(|cycle| cycle.get(ordinal))
                    .copied()
                    .ok_or(BlockInitError::ObservationIndexOutOfRange {
                        block_number: block.block_number,
                        index: row,
                        available: block.baseline_intensities.len(),
                    })?;
                intensities.push(value);
                detector_ordinals.push(ordinal);
            }
        }
    }

    let count = intensities.len();
    Ok(ObservationSet::new(
        intensities,
        detector_ordinals,
        vec![0.0; count],
        vec![0; count],
        vec![BASELINE_SENTINEL; count],
    )?)
}

/// Gathers every on-peak reading taken on the requested detector class.
/// Sequence ids absent from the block's index map are skipped; a sequence
/// targeting a species the method never declared is an error.
pub fn accumulate_on_peak(
    block: &BlockRecord,
    method: &AnalysisMethod,
    class: DetectorClass,
) -> InitResult<ObservationSet> {
    let mut intensities = Vec::new();
    let mut detector_ordinals = Vec::new();
    let mut times = Vec::new();
    let mut time_indices = Vec::new();
    let mut isotope_ordinals = Vec::new();

    for (&ordinal, cells) in &method.sequence_table {
        let Some(detector) = method.detector_setup.detector(ordinal) else {
            continue;
        };
        if !class.matches(detector.detector_type) {
            continue;
        }

        for cell in cells {
            let isotope_ordinal = method.species_ordinal(&cell.target_species).ok_or_else(|| {
                BlockInitError::UnknownSpecies {
                    sequence_id: cell.sequence_id.clone(),
                    species: cell.target_species.clone(),
                }
            })?;

            let Some(rows) = block.on_peak_id_to_indices.get(&cell.sequence_id) else {
                continue;
            };
            let mut rows = rows.clone();
            rows.sort_unstable();

            for row in rows {
                let value = block
                    .on_peak_intensities
                    .get(row)
                    .and_then(|cycle| cycle.get(ordinal))
                    .copied()
                    .ok_or(BlockInitError::ObservationIndexOutOfRange {
                        block_number: block.block_number,
                        index: row,
                        available: block.on_peak_intensities.len(),
                    })?;
                let time = block.on_peak_time_stamps.get(row).copied().ok_or(
                    BlockInitError::ObservationIndexOutOfRange {
                        block_number: block.block_number,
                        index: row,
                        available: block.on_peak_time_stamps.len(),
                    },
                )?;

                intensities.push(value);
                detector_ordinals.push(ordinal);
                times.push(time);
                time_indices.push(row);
                isotope_ordinals.push(isotope_ordinal);
            }
        }
    }

    Ok(ObservationSet::new(
        intensities,
        detector_ordinals,
        times,
        time_indices,
        isotope_ordinals,
    )?)
}
