//! Configuration validation for the live proxy.
//!
//! Hard errors reject the configuration; soft problems (such as a tool
//! endpoint that is not served over https) are returned as warnings so the
//! caller can log them and continue.

use thiserror::Error;

use crate::config::{Config, ObservabilityConfig, SummaryConfig, ToolsConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.summary.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load, apply environment overrides, validate, and log warnings.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        for warning in config.tools.warnings() {
            tracing::warn!("{}", warning);
        }
        Ok(config)
    }
}

impl Validate for SummaryConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.max_output_tokens == 0 {
            return Err(ValidationError::InvalidValue {
                field: "summary.max_output_tokens".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "summary.model".into(),
            });
        }
        if self.enabled && self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "summary.prompt".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("'{}' is not one of {:?}", self.log_level, LOG_LEVELS),
            });
        }
        Ok(())
    }
}

impl ToolsConfig {
    /// Non-fatal endpoint problems, sorted by tool name.
    pub fn warnings(&self) -> Vec<String> {
        let mut names: Vec<&String> = self.endpoints.keys().collect();
        names.sort();

        names
            .into_iter()
            .filter_map(|name| {
                let url = self.endpoints[name].trim();
                if url.is_empty() {
                    Some(format!("Missing URL for cloud function: {name}"))
                } else if !url.starts_with("https://") {
                    Some(format!("Invalid URL format for {name}: {url}"))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let mut config = Config::default();
        config.summary.max_output_tokens = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("summary.max_output_tokens"));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.summary.model = " ".into();
        config.observability.log_level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Multiple(errors)) if errors.len() == 2
        ));
    }

    #[test]
    fn test_empty_prompt_allowed_when_disabled() {
        let mut summary = SummaryConfig::default();
        summary.prompt.clear();
        assert!(summary.validate().is_err());
        summary.enabled = false;
        assert!(summary.validate().is_ok());
    }

    #[test]
    fn test_tool_endpoint_warnings() {
        let mut tools = ToolsConfig::default();
        tools.endpoints.insert("secure".into(), "https://example.com/fn".into());
        tools.endpoints.insert("plain".into(), "http://example.com/fn".into());
        tools.endpoints.insert("empty".into(), String::new());

        let warnings = tools.warnings();
        assert_eq!(
            warnings,
            vec![
                "Missing URL for cloud function: empty".to_string(),
                "Invalid URL format for plain: http://example.com/fn".to_string(),
            ]
        );
    }
}
