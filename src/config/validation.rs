//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delay bounds ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("simulation.min_delay_ms ({min}) exceeds simulation.max_delay_ms ({max})")]
    DelayRange { min: u64, max: u64 },

    #[error("tracing.service must not be empty")]
    EmptyService,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    let sim = &config.simulation;
    if sim.enabled && sim.min_delay_ms > sim.max_delay_ms {
        errors.push(ValidationError::DelayRange {
            min: sim.min_delay_ms,
            max: sim.max_delay_ms,
        });
    }

    if config.tracing.service.trim().is_empty() {
        errors.push(ValidationError::EmptyService);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = AppConfig::default();
        config.simulation.min_delay_ms = 900;
        config.simulation.max_delay_ms = 100;
        config.tracing.service = " ".into();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DelayRange { min: 900, max: 100 },
                ValidationError::EmptyService,
                ValidationError::ZeroRequestTimeout,
            ]
        );
    }

    #[test]
    fn test_disabled_simulation_skips_range_check() {
        let mut config = AppConfig::default();
        config.simulation.enabled = false;
        config.simulation.min_delay_ms = 10;
        config.simulation.max_delay_ms = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bad_metrics_address() {
        let mut config = AppConfig::default();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("nowhere".into())]
        );
    }
}
