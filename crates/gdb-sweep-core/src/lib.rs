pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod report;

pub use catalog::{Catalog, Element, ElementKind, Scope};
pub use config::AppConfig;
pub use engine::{sweep_geopackage, Sweeper};
pub use error::Error;
pub use progress::{Phase, SilentReporter, SweepReporter};
pub use report::{DatasetOutcome, ElementOutcome, FailureStage, SweepReport};
