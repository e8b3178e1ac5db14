use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("GeoPackage error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cannot access geodatabase: {0}")]
    Inaccessible(String),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Dataset is not empty: {0}")]
    NotEmpty(String),

    #[error("{0}")]
    Catalog(String),
}
