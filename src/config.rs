//! Configuration types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::{CatalogError, ConfigError};
use crate::flow::catalog::Catalog;
use crate::flow::reveal::DEFAULT_REVEAL_DELAY;
use crate::flow::transcript::FormTranscript;
use crate::flow::variants::Variant;
use crate::http::registry::DEFAULT_SESSION_TTL;
use crate::submit::{LeadSubmitter, LogSubmitter, WebhookSubmitter};

/// Which front end `main` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Interactive terminal conversation.
    Cli,
    /// JSON API serving many conversations.
    Http,
}

impl std::str::FromStr for RunMode {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cli" => Ok(Self::Cli),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::InvalidValue {
                key: "QUALIFY_MODE".to_string(),
                message: format!("expected cli or http, got {other:?}"),
            }),
        }
    }
}

/// Flow engine configuration, built from `QUALIFY_*` environment variables.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Built-in catalog to run when no catalog file is given.
    pub variant: Variant,
    /// JSON catalog file; takes precedence over `variant`.
    pub catalog_path: Option<PathBuf>,
    /// Composing delay before each step is shown.
    pub reveal_delay: Duration,
    /// Overrides the catalog's own email/phone format check setting.
    pub format_checks: Option<bool>,
    pub form_transcript: FormTranscript,
    pub mode: RunMode,
    pub http_port: u16,
    /// HTTP conversations idle this long are dropped.
    pub session_ttl: Duration,
    /// Leads are POSTed here when set, otherwise only logged.
    pub webhook_url: Option<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            variant: Variant::LawyerReview,
            catalog_path: None,
            reveal_delay: DEFAULT_REVEAL_DELAY,
            format_checks: None,
            form_transcript: FormTranscript::Summary,
            mode: RunMode::Cli,
            http_port: 8080,
            session_ttl: DEFAULT_SESSION_TTL,
            webhook_url: None,
        }
    }
}

impl FlowConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup. Unset or empty keys take defaults;
    /// values that fail to parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let variant = match get("QUALIFY_VARIANT") {
            Some(v) => v.parse()?,
            None => defaults.variant,
        };

        let reveal_delay = match get("QUALIFY_REVEAL_DELAY_MS") {
            Some(v) => Duration::from_millis(parse_number("QUALIFY_REVEAL_DELAY_MS", &v)?),
            None => defaults.reveal_delay,
        };

        let format_checks = get("QUALIFY_FORMAT_CHECKS")
            .map(|v| parse_flag("QUALIFY_FORMAT_CHECKS", &v))
            .transpose()?;

        let form_transcript = match get("QUALIFY_FORM_TRANSCRIPT").as_deref() {
            None => defaults.form_transcript,
            Some("summary") => FormTranscript::Summary,
            Some("omit") => FormTranscript::Omit,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "QUALIFY_FORM_TRANSCRIPT".to_string(),
                    message: format!("expected summary or omit, got {other:?}"),
                });
            }
        };

        let mode = match get("QUALIFY_MODE") {
            Some(v) => v.parse()?,
            None => defaults.mode,
        };

        let http_port = match get("QUALIFY_HTTP_PORT") {
            Some(v) => parse_number("QUALIFY_HTTP_PORT", &v)?,
            None => defaults.http_port,
        };

        let session_ttl = match get("QUALIFY_SESSION_TTL_MIN") {
            Some(v) => match parse_number::<u64>("QUALIFY_SESSION_TTL_MIN", &v)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "QUALIFY_SESSION_TTL_MIN".to_string(),
                        message: "must be at least one minute".to_string(),
                    });
                }
                minutes => Duration::from_secs(minutes.saturating_mul(60)),
            },
            None => defaults.session_ttl,
        };

        Ok(Self {
            variant,
            catalog_path: get("QUALIFY_CATALOG_PATH").map(PathBuf::from),
            reveal_delay,
            format_checks,
            form_transcript,
            mode,
            http_port,
            session_ttl,
            webhook_url: get("QUALIFY_WEBHOOK_URL"),
        })
    }

    /// Load and validate the configured catalog.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        let catalog = match &self.catalog_path {
            Some(path) => Catalog::load_file(path)?,
            None => self.variant.catalog()?,
        };
        Ok(match self.format_checks {
            Some(enabled) => catalog.with_format_checks(enabled),
            None => catalog,
        })
    }

    /// Submitter for accepted leads.
    pub fn submitter(&self) -> Arc<dyn LeadSubmitter> {
        match &self.webhook_url {
            Some(url) => {
                info!(url = %url, "Leads will be posted to webhook");
                Arc::new(WebhookSubmitter::new(url.clone()))
            }
            None => Arc::new(LogSubmitter::new()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{value:?} is not a valid number"),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value:?} is not a boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<FlowConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FlowConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.variant, Variant::LawyerReview);
        assert_eq!(cfg.reveal_delay, Duration::from_millis(1200));
        assert_eq!(cfg.mode, RunMode::Cli);
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.session_ttl, Duration::from_secs(30 * 60));
        assert!(cfg.format_checks.is_none());
        assert!(cfg.webhook_url.is_none());
        assert_eq!(cfg.form_transcript, FormTranscript::Summary);
    }

    #[test]
    fn reads_every_key() {
        let cfg = config(&[
            ("QUALIFY_VARIANT", "screening"),
            ("QUALIFY_REVEAL_DELAY_MS", "0"),
            ("QUALIFY_FORMAT_CHECKS", "true"),
            ("QUALIFY_FORM_TRANSCRIPT", "omit"),
            ("QUALIFY_MODE", "http"),
            ("QUALIFY_HTTP_PORT", "9000"),
            ("QUALIFY_SESSION_TTL_MIN", "5"),
            ("QUALIFY_WEBHOOK_URL", "http://localhost:9999/leads"),
            ("QUALIFY_CATALOG_PATH", "/etc/qualify/catalog.json"),
        ])
        .unwrap();
        assert_eq!(cfg.variant, Variant::Screening);
        assert!(cfg.reveal_delay.is_zero());
        assert_eq!(cfg.format_checks, Some(true));
        assert_eq!(cfg.form_transcript, FormTranscript::Omit);
        assert_eq!(cfg.mode, RunMode::Http);
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.session_ttl, Duration::from_secs(300));
        assert_eq!(cfg.webhook_url.as_deref(), Some("http://localhost:9999/leads"));
        assert_eq!(
            cfg.catalog_path,
            Some(PathBuf::from("/etc/qualify/catalog.json"))
        );
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let cfg = config(&[("QUALIFY_HTTP_PORT", "  "), ("QUALIFY_WEBHOOK_URL", "")]).unwrap();
        assert_eq!(cfg.http_port, 8080);
        assert!(cfg.webhook_url.is_none());
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config(&[("QUALIFY_VARIANT", "deluxe")]),
            Err(ConfigError::UnknownVariant(_))
        ));
        for (key, value) in [
            ("QUALIFY_HTTP_PORT", "99999"),
            ("QUALIFY_REVEAL_DELAY_MS", "soon"),
            ("QUALIFY_FORMAT_CHECKS", "maybe"),
            ("QUALIFY_MODE", "gui"),
            ("QUALIFY_FORM_TRANSCRIPT", "full"),
            ("QUALIFY_SESSION_TTL_MIN", "0"),
            ("QUALIFY_SESSION_TTL_MIN", "forever"),
        ] {
            match config(&[(key, value)]) {
                Err(ConfigError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("{key}={value} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn format_check_override_applies_to_catalog() {
        let cfg = FlowConfig {
            variant: Variant::Screening,
            format_checks: Some(true),
            ..FlowConfig::default()
        };
        assert!(cfg.load_catalog().unwrap().format_checks());

        let cfg = FlowConfig {
            variant: Variant::Classic,
            ..FlowConfig::default()
        };
        assert!(cfg.load_catalog().unwrap().format_checks());
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let cfg = FlowConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/qualify/catalog.json")),
            ..FlowConfig::default()
        };
        assert!(matches!(cfg.load_catalog(), Err(CatalogError::Io(_))));
    }

    #[test]
    fn submitter_follows_webhook_setting() {
        assert_eq!(FlowConfig::default().submitter().name(), "log");
        let cfg = FlowConfig {
            webhook_url: Some("http://localhost:9999/leads".into()),
            ..FlowConfig::default()
        };
        assert_eq!(cfg.submitter().name(), "webhook");
    }
}
