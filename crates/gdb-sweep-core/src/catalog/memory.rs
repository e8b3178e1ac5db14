use super::{Catalog, Element, ElementKind, Scope};
use crate::error::Error;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    rows: u64,
}

#[derive(Debug, Clone)]
struct Dataset {
    name: String,
    feature_classes: Vec<Entry>,
}

/// In-process geodatabase. Listings come back in insertion order.
///
/// Failure injection is keyed by element path (`dataset/name` or `name`)
/// for row checks and deletes, and by dataset name for listings. A re-check
/// failure lets the first listing of a dataset succeed and fails every later one.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    location: String,
    accessible: bool,
    datasets: Vec<Dataset>,
    feature_classes: Vec<Entry>,
    tables: Vec<Entry>,
    failing_row_checks: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_listings: HashSet<String>,
    failing_rechecks: HashSet<String>,
    listings: RefCell<HashMap<String, usize>>,
    compactions: usize,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryCatalog {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            accessible: true,
            datasets: Vec::new(),
            feature_classes: Vec::new(),
            tables: Vec::new(),
            failing_row_checks: HashSet::new(),
            failing_deletes: HashSet::new(),
            failing_listings: HashSet::new(),
            failing_rechecks: HashSet::new(),
            listings: RefCell::new(HashMap::new()),
            compactions: 0,
        }
    }

    pub fn with_dataset(mut self, name: &str) -> Self {
        if self.dataset(name).is_none() {
            self.datasets.push(Dataset {
                name: name.to_string(),
                feature_classes: Vec::new(),
            });
        }
        self
    }

    /// Adds a feature class; a missing dataset is created on the way.
    pub fn with_feature_class(mut self, dataset: Option<&str>, name: &str, rows: u64) -> Self {
        let entry = Entry {
            name: name.to_string(),
            rows,
        };
        match dataset {
            Some(ds) => {
                self = self.with_dataset(ds);
                if let Some(dataset) = self.datasets.iter_mut().find(|d| d.name == ds) {
                    dataset.feature_classes.push(entry);
                }
            }
            None => self.feature_classes.push(entry),
        }
        self
    }

    pub fn with_table(mut self, name: &str, rows: u64) -> Self {
        self.tables.push(Entry {
            name: name.to_string(),
            rows,
        });
        self
    }

    pub fn failing_row_check(mut self, path: &str) -> Self {
        self.failing_row_checks.insert(path.to_string());
        self
    }

    pub fn failing_delete(mut self, path: &str) -> Self {
        self.failing_deletes.insert(path.to_string());
        self
    }

    pub fn failing_listing(mut self, dataset: &str) -> Self {
        self.failing_listings.insert(dataset.to_string());
        self
    }

    pub fn failing_recheck(mut self, dataset: &str) -> Self {
        self.failing_rechecks.insert(dataset.to_string());
        self
    }

    pub fn inaccessible(mut self) -> Self {
        self.accessible = false;
        self
    }

    pub fn has_dataset(&self, name: &str) -> bool {
        self.dataset(name).is_some()
    }

    pub fn has_feature_class(&self, dataset: Option<&str>, name: &str) -> bool {
        self.entries(ElementKind::FeatureClass, dataset)
            .is_some_and(|entries| entries.iter().any(|e| e.name == name))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|e| e.name == name)
    }

    pub fn row_count(&self, element: &Element) -> Option<u64> {
        self.entries(element.kind, element.dataset.as_deref())?
            .iter()
            .find(|e| e.name == element.name)
            .map(|e| e.rows)
    }

    /// Number of times `compact` ran.
    pub fn compactions(&self) -> usize {
        self.compactions
    }

    fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    fn entries(&self, kind: ElementKind, dataset: Option<&str>) -> Option<&Vec<Entry>> {
        match (kind, dataset) {
            (ElementKind::FeatureClass, Some(ds)) => self.dataset(ds).map(|d| &d.feature_classes),
            (ElementKind::FeatureClass, None) => Some(&self.feature_classes),
            (ElementKind::Table, None) => Some(&self.tables),
            (ElementKind::Table, Some(_)) => None,
        }
    }

    fn entries_mut(&mut self, kind: ElementKind, dataset: Option<&str>) -> Option<&mut Vec<Entry>> {
        match (kind, dataset) {
            (ElementKind::FeatureClass, Some(ds)) => self
                .datasets
                .iter_mut()
                .find(|d| d.name == ds)
                .map(|d| &mut d.feature_classes),
            (ElementKind::FeatureClass, None) => Some(&mut self.feature_classes),
            (ElementKind::Table, None) => Some(&mut self.tables),
            (ElementKind::Table, Some(_)) => None,
        }
    }

    fn check_accessible(&self) -> Result<(), Error> {
        if self.accessible {
            Ok(())
        } else {
            Err(Error::Inaccessible(self.location.clone()))
        }
    }
}

impl Catalog for MemoryCatalog {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn exists(&self) -> bool {
        self.accessible
    }

    fn list_datasets(&self) -> Result<Vec<String>, Error> {
        self.check_accessible()?;
        Ok(self.datasets.iter().map(|d| d.name.clone()).collect())
    }

    fn list_feature_classes(&self, scope: Scope<'_>) -> Result<Vec<String>, Error> {
        self.check_accessible()?;
        let entries = match scope {
            Scope::Root => &self.feature_classes,
            Scope::Dataset(ds) => {
                let listed = {
                    let mut listings = self.listings.borrow_mut();
                    let count = listings.entry(ds.to_string()).or_insert(0);
                    *count += 1;
                    *count
                };
                if self.failing_listings.contains(ds)
                    || (listed > 1 && self.failing_rechecks.contains(ds))
                {
                    return Err(Error::Catalog(format!("cannot list dataset {}", ds)));
                }
                match self.dataset(ds) {
                    Some(dataset) => &dataset.feature_classes,
                    None => return Err(Error::NotFound(format!("dataset {}", ds))),
                }
            }
        };
        Ok(entries.iter().map(|e| e.name.clone()).collect())
    }

    fn list_tables(&self) -> Result<Vec<String>, Error> {
        self.check_accessible()?;
        Ok(self.tables.iter().map(|e| e.name.clone()).collect())
    }

    fn has_rows(&self, element: &Element) -> Result<bool, Error> {
        self.check_accessible()?;
        let path = element.path();
        if self.failing_row_checks.contains(&path) {
            return Err(Error::Catalog(format!("cannot open cursor on {}", path)));
        }
        self.row_count(element)
            .map(|rows| rows > 0)
            .ok_or(Error::NotFound(path))
    }

    fn delete_element(&mut self, element: &Element) -> Result<(), Error> {
        self.check_accessible()?;
        let path = element.path();
        if self.failing_deletes.contains(&path) {
            return Err(Error::Catalog(format!("{} is locked", path)));
        }
        let entries = self
            .entries_mut(element.kind, element.dataset.as_deref())
            .ok_or_else(|| Error::NotFound(path.clone()))?;
        let before = entries.len();
        entries.retain(|e| e.name != element.name);
        if entries.len() == before {
            return Err(Error::NotFound(path));
        }
        Ok(())
    }

    fn delete_dataset(&mut self, name: &str) -> Result<(), Error> {
        self.check_accessible()?;
        if self.failing_deletes.contains(name) {
            return Err(Error::Catalog(format!("{} is locked", name)));
        }
        let index = self
            .datasets
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| Error::NotFound(format!("dataset {}", name)))?;
        let remaining = self.datasets[index].feature_classes.len();
        if remaining > 0 {
            return Err(Error::NotEmpty(format!("{} ({} members)", name, remaining)));
        }
        self.datasets.remove(index);
        Ok(())
    }

    fn compact(&mut self) -> Result<(), Error> {
        self.check_accessible()?;
        self.compactions += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listings_keep_insertion_order() {
        let catalog = MemoryCatalog::default()
            .with_feature_class(Some("zeta"), "b", 0)
            .with_feature_class(Some("zeta"), "a", 0)
            .with_dataset("alpha")
            .with_table("t2", 1)
            .with_table("t1", 1);

        assert_eq!(catalog.list_datasets().unwrap(), vec!["zeta", "alpha"]);
        assert_eq!(
            catalog.list_feature_classes(Scope::Dataset("zeta")).unwrap(),
            vec!["b", "a"]
        );
        assert_eq!(catalog.list_tables().unwrap(), vec!["t2", "t1"]);
        assert!(catalog.list_feature_classes(Scope::Root).unwrap().is_empty());
    }

    #[test]
    fn test_delete_non_empty_dataset_fails() {
        let mut catalog = MemoryCatalog::default().with_feature_class(Some("A"), "fc", 3);
        assert!(matches!(
            catalog.delete_dataset("A"),
            Err(Error::NotEmpty(_))
        ));
        assert!(catalog.has_dataset("A"));
    }

    #[test]
    fn test_recheck_failure_spares_first_listing() {
        let catalog = MemoryCatalog::default()
            .with_feature_class(Some("A"), "fc", 0)
            .failing_recheck("A");
        assert_eq!(
            catalog.list_feature_classes(Scope::Dataset("A")).unwrap(),
            vec!["fc"]
        );
        assert!(catalog.list_feature_classes(Scope::Dataset("A")).is_err());
    }

    #[test]
    fn test_delete_missing_element_is_not_found() {
        let mut catalog = MemoryCatalog::default();
        let element = Element::table("ghost");
        assert!(matches!(
            catalog.delete_element(&element),
            Err(Error::NotFound(_))
        ));
    }
}
