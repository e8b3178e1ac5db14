pub mod geopackage;
pub mod memory;

use crate::error::Error;
use std::fmt;

pub use geopackage::GeoPackage;
pub use memory::MemoryCatalog;

/// Addressing context for listing calls: the database root or one feature dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Root,
    Dataset(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    FeatureClass,
    Table,
}

/// A leaf element addressed from the database root.
///
/// `Display` renders the deletion log entry for the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub dataset: Option<String>,
    pub name: String,
}

impl Element {
    pub fn feature_class(scope: Scope<'_>, name: &str) -> Self {
        let dataset = match scope {
            Scope::Root => None,
            Scope::Dataset(ds) => Some(ds.to_string()),
        };
        Self {
            kind: ElementKind::FeatureClass,
            dataset,
            name: name.to_string(),
        }
    }

    pub fn table(name: &str) -> Self {
        Self {
            kind: ElementKind::Table,
            dataset: None,
            name: name.to_string(),
        }
    }

    /// `dataset/name` inside a dataset, `name` at the root.
    pub fn path(&self) -> String {
        match &self.dataset {
            Some(ds) => format!("{}/{}", ds, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ElementKind::FeatureClass => write!(f, "Feature Class: {}", self.path()),
            ElementKind::Table => write!(f, "Tabla: {}", self.name),
        }
    }
}

/// Log entry for a deleted feature dataset.
pub fn dataset_entry(name: &str) -> String {
    format!("Dataset: {}", name)
}

/// Capabilities the sweep needs from a geodatabase.
///
/// Every listing takes its addressing context explicitly; there is no
/// "current workspace" to restore before a delete.
pub trait Catalog {
    /// Human readable location of the database root, used in messages.
    fn location(&self) -> String;

    /// Whether the database root exists and is readable as a geodatabase.
    fn exists(&self) -> bool;

    fn list_datasets(&self) -> Result<Vec<String>, Error>;

    fn list_feature_classes(&self, scope: Scope<'_>) -> Result<Vec<String>, Error>;

    /// Plain tables live at the root only.
    fn list_tables(&self) -> Result<Vec<String>, Error>;

    /// Existence check: true as soon as one record is found.
    fn has_rows(&self, element: &Element) -> Result<bool, Error>;

    fn delete_element(&mut self, element: &Element) -> Result<(), Error>;

    fn delete_dataset(&mut self, name: &str) -> Result<(), Error>;

    fn compact(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
