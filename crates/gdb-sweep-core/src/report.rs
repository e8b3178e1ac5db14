use std::fmt;
use std::time::Duration;

/// Totals and deletion log for one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub datasets: usize,
    pub empty_datasets: usize,
    pub deleted_datasets: usize,
    pub feature_classes: usize,
    pub tables: usize,
    pub empty_elements: usize,
    pub deleted_elements: usize,
    /// Row-check, delete and listing failures that were skipped over.
    pub failures: usize,
    pub compacted: bool,
    /// Deletion log entries in the order the deletions happened.
    pub deleted: Vec<String>,
    pub duration: Duration,
}

impl SweepReport {
    pub fn deleted_anything(&self) -> bool {
        !self.deleted.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    RowCheck,
    Delete,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::RowCheck => write!(f, "row check"),
            FailureStage::Delete => write!(f, "delete"),
        }
    }
}

/// Result of evaluating one feature class or table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementOutcome {
    /// Has at least one row.
    Retained,
    Deleted,
    /// A `Delete` failure means the element was found empty.
    Failed { stage: FailureStage, reason: String },
}

impl ElementOutcome {
    pub fn was_empty(&self) -> bool {
        matches!(
            self,
            ElementOutcome::Deleted
                | ElementOutcome::Failed {
                    stage: FailureStage::Delete,
                    ..
                }
        )
    }
}

/// Result of re-checking a feature dataset after leaf elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetOutcome {
    /// Still holds this many feature classes.
    Retained(usize),
    Deleted,
    ListFailed(String),
    DeleteFailed(String),
}
