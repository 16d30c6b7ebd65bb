//! Assembled per-block dataset: the three accumulated observation classes,
//! their concatenation, and the spline basis over the block's time grid.

use serde::{Deserialize, Serialize};

use crate::accumulate::{accumulate_baseline, accumulate_on_peak, ObservationSet};
use crate::block::BlockRecord;
use crate::domain::{BlockInitError, DetectorClass, InitResult};
use crate::method::AnalysisMethod;
use crate::numerics::{spline_basis, DenseMatrix};

/// Spline knobs for the beam-trajectory basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializerConfig {
    pub num_segments: usize,
    pub basis_degree: usize,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            num_segments: 10,
            basis_degree: 3,
        }
    }
}

/// One block's worth of model-ready data.
///
/// The combined columns concatenate the classes in the fixed order baseline,
/// on-peak Faraday, on-peak photomultiplier; every model-space vector built
/// from this block uses the same layout.
#[derive(Debug, Clone)]
pub struct BlockDataSet {
    block_number: u64,
    baseline: ObservationSet,
    on_peak_faraday: ObservationSet,
    on_peak_photomultiplier: ObservationSet,
    intensities: Vec<f64>,
    detector_ordinals: Vec<usize>,
    isotope_ordinals: Vec<usize>,
    time_indices: Vec<usize>,
    knot_matrix: DenseMatrix,
}

impl BlockDataSet {
    pub fn assemble(
        block: &BlockRecord,
        method: &AnalysisMethod,
        config: InitializerConfig,
    ) -> InitResult<Self> {
        let baseline = accumulate_baseline(block, method)?;
        let on_peak_faraday = accumulate_on_peak(block, method, DetectorClass::Faraday)?;
        let on_peak_photomultiplier =
            accumulate_on_peak(block, method, DetectorClass::PhotoMultiplier)?;

        let knot_matrix = spline_basis(
            &block.on_peak_time_stamps,
            config.num_segments,
            config.basis_degree,
        )
        .map_err(|source| BlockInitError::SplineBasis {
            block_number: block.block_number,
            source,
        })?;

        let classes = [&baseline, &on_peak_faraday, &on_peak_photomultiplier];
        let total: usize = classes.iter().map(|class| class.len()).sum();
        let mut intensities = Vec::with_capacity(total);
        let mut detector_ordinals = Vec::with_capacity(total);
        let mut isotope_ordinals = Vec::with_capacity(total);
        let mut time_indices = Vec::with_capacity(total);
        for class in classes {
            intensities.extend_from_slice(class.intensities());
            detector_ordinals.extend_from_slice(class.detector_ordinals());
            isotope_ordinals.extend_from_slice(class.isotope_ordinals());
            time_indices.extend_from_slice(class.time_indices());
        }

        Ok(Self {
            block_number: block.block_number,
            baseline,
            on_peak_faraday,
            on_peak_photomultiplier,
            intensities,
            detector_ordinals,
            isotope_ordinals,
            time_indices,
            knot_matrix,
        })
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn baseline(&self) -> &ObservationSet {
        &self.baseline
    }

    pub fn on_peak_faraday(&self) -> &ObservationSet {
        &self.on_peak_faraday
    }

    pub fn on_peak_photomultiplier(&self) -> &ObservationSet {
        &self.on_peak_photomultiplier
    }

    /// Combined intensity vector, baseline then Faraday then photomultiplier.
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn detector_ordinals(&self) -> &[usize] {
        &self.detector_ordinals
    }

    pub fn isotope_ordinals(&self) -> &[usize] {
        &self.isotope_ordinals
    }

    pub fn time_indices(&self) -> &[usize] {
        &self.time_indices
    }

    pub fn knot_matrix(&self) -> &DenseMatrix {
        &self.knot_matrix
    }

    pub fn baseline_count(&self) -> usize {
        self.baseline.len()
    }

    pub fn faraday_count(&self) -> usize {
        self.on_peak_faraday.len()
    }

    pub fn photomultiplier_count(&self) -> usize {
        self.on_peak_photomultiplier.len()
    }

    pub fn total_count(&self) -> usize {
        self.intensities.len()
    }

    /// Offset of the first photomultiplier entry in the combined layout.
    pub fn photomultiplier_start(&self) -> usize {
        self.baseline_count() + self.faraday_count()
    }
}
