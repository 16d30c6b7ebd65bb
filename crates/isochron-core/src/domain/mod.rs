//! Instrument-facing domain types: detectors, detector arrays, and the
//! species a method can target.

pub mod errors;

use serde::{Deserialize, Serialize};

pub use errors::{BlockInitError, InitResult};

/// Physical amplifier class behind a collector position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorType {
    Faraday,
    Daly,
    Sem,
}

impl DetectorType {
    pub const fn is_faraday(&self) -> bool {
        matches!(self, Self::Faraday)
    }

    /// Only the Daly counts as the photomultiplier channel; an SEM collector
    /// is ion counting too but is not routed through the gain parameter.
    pub const fn is_photomultiplier(&self) -> bool {
        matches!(self, Self::Daly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detector {
    pub detector_type: DetectorType,
    pub name: String,
    pub ordinal_index: usize,
}

impl Detector {
    pub fn new(detector_type: DetectorType, name: impl Into<String>, ordinal_index: usize) -> Self {
        Self {
            detector_type,
            name: name.into(),
            ordinal_index,
        }
    }
}

/// Ordered collector array of a mass spectrometer. Ordinal indices are the
/// column positions of the raw intensity tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorSetup {
    detectors: Vec<Detector>,
}

impl DetectorSetup {
    pub fn new(detectors: Vec<Detector>) -> Self {
        Self { detectors }
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn detector(&self, ordinal_index: usize) -> Option<&Detector> {
        self.detectors
            .iter()
            .find(|detector| detector.ordinal_index == ordinal_index)
    }

    pub fn detector_by_name(&self, name: &str) -> Option<&Detector> {
        self.detectors.iter().find(|detector| detector.name == name)
    }

    pub fn faraday_count(&self) -> usize {
        self.detectors
            .iter()
            .filter(|detector| detector.detector_type.is_faraday())
            .count()
    }

    /// Phoenix collector block: Daly photomultiplier and SEM ahead of the
    /// nine Faraday cups L5 through H4.
    pub fn phoenix() -> Self {
        Self::new(vec![
            Detector::new(DetectorType::Daly, "PM", 0),
            Detector::new(DetectorType::Sem, "RS", 1),
            Detector::new(DetectorType::Faraday, "L5", 2),
            Detector::new(DetectorType::Faraday, "L4", 3),
            Detector::new(DetectorType::Faraday, "L3", 4),
            Detector::new(DetectorType::Faraday, "L2", 5),
            Detector::new(DetectorType::Faraday, "Ax", 6),
            Detector::new(DetectorType::Faraday, "H1", 7),
            Detector::new(DetectorType::Faraday, "H2", 8),
            Detector::new(DetectorType::Faraday, "H3", 9),
            Detector::new(DetectorType::Faraday, "H4", 10),
        ])
    }

    /// Synthetic-data layout with the Daly in the axial slot between the low
    /// and high Faraday banks.
    pub fn phoenix_synthetic() -> Self {
        Self::new(vec![
            Detector::new(DetectorType::Faraday, "L5", 0),
            Detector::new(DetectorType::Faraday, "L4", 1),
            Detector::new(DetectorType::Faraday, "L3", 2),
            Detector::new(DetectorType::Faraday, "L2", 3),
            Detector::new(DetectorType::Faraday, "Ax", 4),
            Detector::new(DetectorType::Daly, "PM", 5),
            Detector::new(DetectorType::Faraday, "H1", 6),
            Detector::new(DetectorType::Faraday, "H2", 7),
            Detector::new(DetectorType::Faraday, "H3", 8),
            Detector::new(DetectorType::Faraday, "H4", 9),
        ])
    }
}

/// One isotope a sequence cell can target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub name: String,
    pub mass_number: u32,
}

impl SpeciesRecord {
    pub fn new(name: impl Into<String>, mass_number: u32) -> Self {
        Self {
            name: name.into(),
            mass_number,
        }
    }
}

/// Observation class selector for on-peak accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorClass {
    Faraday,
    PhotoMultiplier,
}

impl DetectorClass {
    pub const fn matches(&self, detector_type: DetectorType) -> bool {
        match self {
            Self::Faraday => detector_type.is_faraday(),
            Self::PhotoMultiplier => detector_type.is_photomultiplier(),
        }
    }
}
