//! Session-level driver: runs the block initializer across every block of an
//! analysis, in parallel, collecting per-block outcomes.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::block::BlockRecord;
use crate::dataset::{BlockDataSet, InitializerConfig};
use crate::domain::InitResult;
use crate::method::AnalysisMethod;
use crate::model::{initialize_block_model, InitializedBlockModel};

/// A full analysis session as stored on disk: the method plus every block's
/// raw data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub method: AnalysisMethod,
    #[serde(default)]
    pub config: InitializerConfig,
    pub blocks: Vec<BlockRecord>,
}

/// Result of initializing one block. Failures stay attached to their block
/// number so a bad block never takes down the rest of the session.
#[derive(Debug)]
pub struct BlockOutcome {
    pub block_number: u64,
    pub result: InitResult<InitializedBlockModel>,
}

/// Initializes every block of a session. Outcomes come back in block order
/// regardless of which worker finished first.
pub fn initialize_session(
    blocks: &[BlockRecord],
    method: &AnalysisMethod,
    config: InitializerConfig,
) -> Vec<BlockOutcome> {
    blocks
        .par_iter()
        .map(|block| {
            let result = BlockDataSet::assemble(block, method, config)
                .and_then(|dataset| initialize_block_model(&dataset));
            match &result {
                Ok(initialized) => info!(
                    block_number = block.block_number,
                    parameters = initialized.model.parameter_count(),
                    "block initialized"
                ),
                Err(failure) => error!(
                    block_number = block.block_number,
                    error = %failure,
                    "block initialization failed"
                ),
            }
            BlockOutcome {
                block_number: block.block_number,
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::initialize_session;
    use crate::block::BlockRecord;
    use crate::dataset::InitializerConfig;
    use crate::domain::{BlockInitError, DetectorSetup, SpeciesRecord};
    use crate::method::{AnalysisMethod, BaselineCell, SequenceCell};
    use crate::numerics::linspace;

    fn method() -> AnalysisMethod {
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

    fn block(block_number: u64) -> BlockRecord {
        let cycles = 24;
        let mut baseline_rows = Vec::new();
        for offset in [-1.0, 0.0, 1.0] {
            let mut row = vec![0.0; 10];
            row[4] = 100.0 + offset;
            baseline_rows.push(row);
        }
        let mut on_peak_row = vec![0.0; 10];
        on_peak_row[4] = 100.0 + 500.0 / 0.9;
        on_peak_row[5] = 1000.0;

        BlockRecord {
            block_number,
            baseline_intensities: baseline_rows,
            baseline_id_to_indices: BTreeMap::from([("BL1".to_string(), vec![0, 1, 2])]),
            on_peak_intensities: vec![on_peak_row; cycles],
            on_peak_time_stamps: linspace(0.0, (cycles - 1) as f64, cycles),
            on_peak_id_to_indices: BTreeMap::from([("S1".to_string(), (0..cycles).collect())]),
        }
    }

    #[test]
    fn outcomes_preserve_block_order_and_isolate_failures() {
        let config = InitializerConfig {
            num_segments: 4,
            basis_degree: 3,
        };
        let mut broken = block(2);
        broken.on_peak_time_stamps = vec![0.0; 24];

        let outcomes = initialize_session(&[block(1), broken, block(3)], &method(), config);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].block_number, 1);
        assert_eq!(outcomes[1].block_number, 2);
        assert_eq!(outcomes[2].block_number, 3);

        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[2].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(BlockInitError::SplineBasis { block_number: 2, .. })
        ));
    }
}
