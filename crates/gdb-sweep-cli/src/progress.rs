use gdb_sweep_core::{DatasetOutcome, Element, ElementOutcome, Phase, SweepReport, SweepReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::{Cell, RefCell};
use std::time::Duration;

/// CLI progress reporter using an indicatif spinner per phase.
///
/// - Leaf phase: spinner showing the element being checked
/// - Dataset phase: spinner showing the dataset being re-checked
pub struct CliReporter {
    bar: RefCell<Option<ProgressBar>>,
    checked: Cell<usize>,
    deleted: Cell<usize>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: RefCell::new(None),
            checked: Cell::new(0),
            deleted: Cell::new(0),
        }
    }

    fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Some(old) = self.bar.borrow_mut().replace(pb) {
            old.finish_and_clear();
        }
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }

    fn set_message(&self, message: String) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_message(message);
        }
    }
}

impl SweepReporter for CliReporter {
    fn on_phase_start(&self, phase: Phase) {
        match phase {
            Phase::Leaves => {
                self.checked.set(0);
                self.deleted.set(0);
                self.set_bar(Self::spinner("Looking for empty elements..."));
            }
            Phase::Datasets => {
                eprintln!(
                    "  \x1b[32m✓\x1b[0m Leaf elements checked: {} checked, {} deleted",
                    self.checked.get(),
                    self.deleted.get()
                );
                self.set_bar(Self::spinner("Looking for empty datasets..."));
            }
        }
    }

    fn on_dataset_start(&self, name: &str) {
        self.set_message(format!("Checking dataset {}...", name));
    }

    fn on_element_checked(&self, element: &Element, outcome: &ElementOutcome) {
        self.checked.set(self.checked.get() + 1);
        if *outcome == ElementOutcome::Deleted {
            self.deleted.set(self.deleted.get() + 1);
        }
        self.set_message(format!(
            "{} checked, {} deleted ({})",
            self.checked.get(),
            self.deleted.get(),
            element.path()
        ));
    }

    fn on_dataset_checked(&self, name: &str, _outcome: &DatasetOutcome) {
        self.set_message(format!("Checked dataset {}", name));
    }

    fn on_complete(&self, report: &SweepReport) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Sweep complete: {} elements and {} datasets deleted in {:.2}s",
            report.deleted_elements,
            report.deleted_datasets,
            report.duration.as_secs_f64()
        );
    }
}
