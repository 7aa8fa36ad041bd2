//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the listening port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid PORT value '{0}': expected an integer port")]
    Port(String),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Override the listener port from a `PORT` value, if one is set.
pub fn apply_port_override(config: &mut AppConfig, port: Option<&str>) -> Result<(), ConfigError> {
    if let Some(raw) = port {
        let trimmed = raw.trim();
        config.listener.port = trimmed
            .parse()
            .map_err(|_| ConfigError::Port(trimmed.to_string()))?;
    }
    Ok(())
}

/// Build the effective configuration: file (or defaults), then environment,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => AppConfig::default(),
    };

    let port = std::env::var(PORT_ENV).ok();
    apply_port_override(&mut config, port.as_deref())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_override() {
        let mut config = AppConfig::default();
        apply_port_override(&mut config, Some("9100")).unwrap();
        assert_eq!(config.listener.port, 9100);

        apply_port_override(&mut config, None).unwrap();
        assert_eq!(config.listener.port, 9100);
    }

    #[test]
    fn test_invalid_port() {
        let mut config = AppConfig::default();
        let err = apply_port_override(&mut config, Some("eighty")).unwrap_err();
        assert!(matches!(err, ConfigError::Port(ref v) if v == "eighty"));
        assert_eq!(config.listener.port, 8000);
    }

    #[test]
    fn test_read_config_file() {
        let path = std::env::temp_dir().join(format!("calculator-app-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[simulation]\nenabled = false\n").unwrap();

        let config = read_config(&path).unwrap();
        assert!(!config.simulation.enabled);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = read_config(Path::new("/nonexistent/calculator.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::Validation(vec![
            ValidationError::EmptyHost,
            ValidationError::ZeroBodyLimit,
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: listener.host must not be empty, limits.max_body_size must be greater than zero"
        );
    }
}
