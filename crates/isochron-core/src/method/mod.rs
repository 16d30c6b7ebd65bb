//! Analysis method: which detector reads which species during which part of
//! the acquisition cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DetectorSetup, SpeciesRecord};

/// A baseline measurement slot on one detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineCell {
    pub baseline_id: String,
}

impl BaselineCell {
    pub fn new(baseline_id: impl Into<String>) -> Self {
        Self {
            baseline_id: baseline_id.into(),
        }
    }
}

/// An on-peak measurement slot: one sequence reading one species on one
/// detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCell {
    pub sequence_id: String,
    pub target_species: String,
}

impl SequenceCell {
    pub fn new(sequence_id: impl Into<String>, target_species: impl Into<String>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            target_species: target_species.into(),
        }
    }
}

/// Cells grouped by detector ordinal. BTreeMap keeps detector traversal in
/// ascending ordinal order, which fixes the layout of every accumulated
/// observation vector.
pub type BaselineTable = BTreeMap<usize, Vec<BaselineCell>>;
pub type SequenceTable = BTreeMap<usize, Vec<SequenceCell>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMethod {
    pub detector_setup: DetectorSetup,
    pub species_list: Vec<SpeciesRecord>,
    pub baseline_table: BaselineTable,
    pub sequence_table: SequenceTable,
}

impl AnalysisMethod {
    /// 1-based position of a species in the method's list, or None when the
    /// method never declared it.
    pub fn species_ordinal(&self, name: &str) -> Option<usize> {
        self.species_list
            .iter()
            .position(|species| species.name == name)
            .map(|index| index + 1)
    }
}
