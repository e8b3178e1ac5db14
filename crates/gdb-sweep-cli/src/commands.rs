use clap::Parser;
use gdb_sweep_core::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gdb-sweep")]
#[command(about = "Delete empty feature classes, tables and feature datasets from a geodatabase", long_about = None)]
pub struct Cli {
    /// Path to the geodatabase (GeoPackage file)
    pub path: PathBuf,

    /// Vacuum the database after deleting elements
    #[arg(long)]
    pub compact: bool,

    /// Process elements in catalog order instead of sorting by name
    #[arg(long)]
    pub unsorted: bool,

    /// Print configuration values before running
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Flags only switch settings on; an absent flag keeps the configured value.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if self.compact {
            config.compact = true;
        }
        if self.unsorted {
            config.sort_names = false;
        }
    }
}
