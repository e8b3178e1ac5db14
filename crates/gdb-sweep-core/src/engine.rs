use crate::catalog::{self, Catalog, Element, GeoPackage, Scope};
use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::{Phase, SweepReporter};
use crate::report::{DatasetOutcome, ElementOutcome, FailureStage, SweepReport};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Two-phase empty element elimination: leaves first, then the feature
/// datasets the leaf phase left empty.
pub struct Sweeper<'a> {
    config: AppConfig,
    reporter: &'a dyn SweepReporter,
}

impl<'a> Sweeper<'a> {
    pub fn new(config: AppConfig, reporter: &'a dyn SweepReporter) -> Self {
        Self { config, reporter }
    }

    /// Run the full sweep:
    /// 1. Delete empty feature classes inside each dataset
    /// 2. Delete empty feature classes and tables at the root
    /// 3. Delete the datasets seen in step 1 that no longer hold feature classes
    ///
    /// Per-element failures are logged and counted; listing failures in the
    /// leaf phase abort the run.
    pub fn sweep<C: Catalog + ?Sized>(&self, catalog: &mut C) -> Result<SweepReport, Error> {
        let location = catalog.location();
        if !catalog.exists() {
            return Err(Error::Inaccessible(location));
        }

        let start = Instant::now();
        let mut report = SweepReport::default();
        info!("Processing geodatabase: {}", location);

        // Phase 1: Leaves
        info!("Phase 1: looking for empty feature classes and tables...");
        self.reporter.on_phase_start(Phase::Leaves);

        let datasets = self.ordered(catalog.list_datasets()?);
        if datasets.is_empty() {
            info!("No feature datasets found");
        } else {
            info!("Found {} feature datasets", datasets.len());
        }

        for ds in &datasets {
            report.datasets += 1;
            info!("Checking dataset: {}", ds);
            self.reporter.on_dataset_start(ds);

            let scope = Scope::Dataset(ds);
            for fc in self.ordered(catalog.list_feature_classes(scope)?) {
                report.feature_classes += 1;
                let element = Element::feature_class(scope, &fc);
                self.sweep_element(catalog, &element, &mut report);
            }
        }

        info!("Checking feature classes at the root...");
        for fc in self.ordered(catalog.list_feature_classes(Scope::Root)?) {
            report.feature_classes += 1;
            let element = Element::feature_class(Scope::Root, &fc);
            self.sweep_element(catalog, &element, &mut report);
        }

        info!("Checking tables...");
        for table in self.ordered(catalog.list_tables()?) {
            report.tables += 1;
            let element = Element::table(&table);
            self.sweep_element(catalog, &element, &mut report);
        }

        // Phase 2: Datasets, from the list captured above
        info!("Phase 2: looking for empty feature datasets...");
        self.reporter.on_phase_start(Phase::Datasets);

        for ds in &datasets {
            let outcome = evaluate_dataset(catalog, ds);
            record_dataset(ds, &outcome, &mut report);
            self.reporter.on_dataset_checked(ds, &outcome);
        }

        if self.config.compact && report.deleted_anything() {
            match catalog.compact() {
                Ok(()) => {
                    report.compacted = true;
                    info!("Compacted {}", location);
                }
                Err(e) => {
                    report.failures += 1;
                    warn!("Error compacting {}: {}", location, e);
                }
            }
        }

        report.duration = start.elapsed();
        debug!(
            "Sweep completed in {:.2}s: {} deleted, {} failures",
            report.duration.as_secs_f64(),
            report.deleted.len(),
            report.failures,
        );
        self.reporter.on_complete(&report);

        Ok(report)
    }

    fn sweep_element<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        element: &Element,
        report: &mut SweepReport,
    ) {
        let outcome = evaluate_element(catalog, element);
        record_element(element, &outcome, report);
        self.reporter.on_element_checked(element, &outcome);
    }

    fn ordered(&self, mut names: Vec<String>) -> Vec<String> {
        if self.config.sort_names {
            names.sort();
        }
        names
    }
}

/// Check one element for rows and delete it if it has no rows.
pub fn evaluate_element<C: Catalog + ?Sized>(catalog: &mut C, element: &Element) -> ElementOutcome {
    match catalog.has_rows(element) {
        Ok(true) => ElementOutcome::Retained,
        Ok(false) => match catalog.delete_element(element) {
            Ok(()) => ElementOutcome::Deleted,
            Err(e) => ElementOutcome::Failed {
                stage: FailureStage::Delete,
                reason: e.to_string(),
            },
        },
        Err(e) => ElementOutcome::Failed {
            stage: FailureStage::RowCheck,
            reason: e.to_string(),
        },
    }
}

/// Delete a dataset if it no longer holds feature classes. Plain tables are
/// never counted; datasets only group feature data.
pub fn evaluate_dataset<C: Catalog + ?Sized>(catalog: &mut C, name: &str) -> DatasetOutcome {
    let remaining = match catalog.list_feature_classes(Scope::Dataset(name)) {
        Ok(remaining) => remaining,
        Err(e) => return DatasetOutcome::ListFailed(e.to_string()),
    };
    if !remaining.is_empty() {
        return DatasetOutcome::Retained(remaining.len());
    }

    match catalog.delete_dataset(name) {
        Ok(()) => DatasetOutcome::Deleted,
        Err(e) => DatasetOutcome::DeleteFailed(e.to_string()),
    }
}

fn record_element(element: &Element, outcome: &ElementOutcome, report: &mut SweepReport) {
    if outcome.was_empty() {
        report.empty_elements += 1;
    }
    match outcome {
        ElementOutcome::Retained => {
            info!("  {} contains data", element.path());
        }
        ElementOutcome::Deleted => {
            report.deleted_elements += 1;
            report.deleted.push(element.to_string());
            info!("  {} was empty, deleted", element.path());
        }
        ElementOutcome::Failed { stage, reason } => {
            report.failures += 1;
            warn!("  Error processing {} ({}): {}", element.path(), stage, reason);
        }
    }
}

fn record_dataset(name: &str, outcome: &DatasetOutcome, report: &mut SweepReport) {
    match outcome {
        DatasetOutcome::Retained(count) => {
            info!("  Dataset {} contains {} feature classes", name, count);
        }
        DatasetOutcome::Deleted => {
            report.empty_datasets += 1;
            report.deleted_datasets += 1;
            report.deleted.push(catalog::dataset_entry(name));
            info!("  Dataset {} was empty, deleted", name);
        }
        DatasetOutcome::ListFailed(reason) => {
            report.failures += 1;
            warn!("Error checking dataset {}: {}", name, reason);
        }
        DatasetOutcome::DeleteFailed(reason) => {
            report.empty_datasets += 1;
            report.failures += 1;
            error!("  Error deleting dataset {}: {}", name, reason);
        }
    }
}

/// Open the GeoPackage at `path` and sweep it.
pub fn sweep_geopackage(
    path: &Path,
    config: &AppConfig,
    reporter: &dyn SweepReporter,
) -> Result<SweepReport, Error> {
    if !path.exists() {
        return Err(Error::Inaccessible(path.display().to_string()));
    }
    let mut gpkg = GeoPackage::open(path, config)?;
    Sweeper::new(config.clone(), reporter).sweep(&mut gpkg)
}
