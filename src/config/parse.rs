use super::types::*;
use crate::config::{expand_env_vars, resolve_config_path, unexpanded_env_vars};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML in '{path}': {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse { source, .. } => ConfigError::YamlParse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Parse and validate config text. Environment variables are expanded first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    // An empty document means "all defaults"
    let config: Config = if yaml_string.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml_string).map_err(|source| ConfigError::YamlParse {
            path: "<inline>".to_string(),
            source,
        })?
    };

    validate_config(&config)?;
    Ok(config)
}

/// Load the config from an explicit path or the default locations, falling back
/// to built-in defaults when no file exists.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match resolve_config_path(explicit) {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            load_config(&path)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let unexpanded_vars = unexpanded_env_vars(yaml_string);

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=<value>\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    let monitor = &config.monitor;

    for (name, value) in [
        ("poll_interval", monitor.poll_interval),
        ("report_interval", monitor.report_interval),
        ("report_window", monitor.report_window),
        ("retention", monitor.retention),
    ] {
        if value.is_zero() {
            errors.push(format!("monitor.{}: must be greater than zero", name));
        }
    }

    if monitor.report_window > monitor.retention {
        errors.push(format!(
            "monitor.report_window ({:?}) must not exceed monitor.retention ({:?})",
            monitor.report_window, monitor.retention
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
