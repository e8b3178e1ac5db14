use crate::catalog::Element;
use crate::report::{DatasetOutcome, ElementOutcome, SweepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Empty feature classes and tables.
    Leaves,
    /// Feature datasets left empty by the leaf phase.
    Datasets,
}

/// Trait for reporting sweep progress.
///
/// The CLI implements it with indicatif spinners. All methods have default no-op implementations.
pub trait SweepReporter {
    fn on_phase_start(&self, _phase: Phase) {}
    fn on_dataset_start(&self, _name: &str) {}
    fn on_element_checked(&self, _element: &Element, _outcome: &ElementOutcome) {}
    fn on_dataset_checked(&self, _name: &str, _outcome: &DatasetOutcome) {}
    fn on_complete(&self, _report: &SweepReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl SweepReporter for SilentReporter {}
