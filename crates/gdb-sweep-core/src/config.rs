use crate::error::Error;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File as ConfigFile};
use serde::Deserialize;

const ENV_PREFIX: &str = "GDB_SWEEP";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Process datasets and elements in name order instead of catalog order.
    pub sort_names: bool,
    /// Reclaim free pages once something has been deleted.
    pub compact: bool,
    pub busy_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sort_names: true,
            compact: false,
            busy_timeout_ms: 5000,
        }
    }
}

/// `Config.*` in the working directory, then `GDB_SWEEP_*` variables.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(environment());
    build_configuration(builder)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

pub fn build_configuration(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, Error> {
    let config = builder.build()?.try_deserialize::<AppConfig>()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_without_sources() {
        let config = build_configuration(Config::builder()).unwrap();
        assert!(config.sort_names);
        assert!(!config.compact);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let builder = Config::builder().add_source(ConfigFile::from_str(
            "compact = true\nbusy_timeout_ms = 250\n",
            FileFormat::Toml,
        ));
        let config = build_configuration(builder).unwrap();
        assert!(config.sort_names);
        assert!(config.compact);
        assert_eq!(config.busy_timeout_ms, 250);
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let builder = Config::builder().add_source(ConfigFile::from_str(
            "sort_names = \"sometimes\"\n",
            FileFormat::Toml,
        ));
        assert!(matches!(
            build_configuration(builder),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut vars = config::Map::new();
        vars.insert("GDB_SWEEP_SORT_NAMES".to_string(), "false".to_string());
        vars.insert("GDB_SWEEP_BUSY_TIMEOUT_MS".to_string(), "900".to_string());
        vars.insert("OTHER_COMPACT".to_string(), "false".to_string());

        let builder = Config::builder()
            .add_source(ConfigFile::from_str(
                "compact = true\nbusy_timeout_ms = 250\n",
                FileFormat::Toml,
            ))
            .add_source(environment().source(Some(vars)));
        let config = build_configuration(builder).unwrap();
        assert!(!config.sort_names);
        assert!(config.compact);
        assert_eq!(config.busy_timeout_ms, 900);
    }
}
