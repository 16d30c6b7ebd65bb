//! Raw per-block acquisition data as read off the instrument.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One block of raw intensities, split into the baseline portion and the
/// on-peak portion.
///
/// Intensity tables are cycle-major: `intensities[row][detector_ordinal]`,
/// one row per measurement cycle. The `*_id_to_indices` maps list which rows
/// belong to each baseline or sequence id; a block that never ran a given id
/// simply omits it. `on_peak_time_stamps` carries one acquisition time per
/// on-peak row, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_number: u64,
    pub baseline_intensities: Vec<Vec<f64>>,
    pub baseline_id_to_indices: BTreeMap<String, Vec<usize>>,
    pub on_peak_intensities: Vec<Vec<f64>>,
    pub on_peak_time_stamps: Vec<f64>,
    pub on_peak_id_to_indices: BTreeMap<String, Vec<usize>>,
}
