//! Pipeline configuration.

use std::fmt;
use std::str::FromStr;

use http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::correlation::CORRELATION_ID_HEADER;

/// Configuration error for the request pipeline
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid correlation header name '{name}'")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("unknown environment '{0}' (expected development, staging or production)")]
    UnknownEnvironment(String),
}

/// Host environment the pipeline runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_owned())),
        }
    }
}

/// Settings for the correlation and exception-handling stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub environment: Environment,
    /// Explicit override; when unset diagnostics follow `environment`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<bool>,
    pub correlation_header: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            diagnostics: None,
            correlation_header: CORRELATION_ID_HEADER.to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Whether problem documents carry `exception`, `stackTrace` and
    /// `innerException`.
    #[must_use]
    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics
            .unwrap_or_else(|| self.environment.is_development())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidHeaderName` if the configured name is not a
    /// valid HTTP header name.
    pub fn correlation_header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::try_from(self.correlation_header.as_str()).map_err(|source| {
            ConfigError::InvalidHeaderName {
                name: self.correlation_header.clone(),
                source,
            }
        })
    }
}
