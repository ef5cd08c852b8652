//! Process configuration loaded via OrthoConfig.
//!
//! Every value can come from the command line, a configuration file or a
//! `GDE_KOFE_*` environment variable. Settings are read once at startup and
//! handed to adapters and services as plain values.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

use backend::domain::background::LoopSchedule;
use backend::domain::events::RetryPolicy;
use backend::domain::rating::FormulaSettings;
use backend::inbound::http::deadline::Deadlines;
use backend::outbound::object_store::ObjectStoreSettings;
use backend::outbound::persistence::PoolConfig;
use backend::outbound::summarizer::SummarizerSettings;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(15);
const DISPATCH_BATCH: usize = 100;

/// Errors raised while turning raw settings into adapter configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid bind address {value}: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("database_url is required")]
    MissingDatabaseUrl,
    #[error("invalid {field} url: {source}")]
    Url {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{field} is required when {feature} is enabled")]
    Missing {
        field: &'static str,
        feature: &'static str,
    },
}

/// Configuration of the reviews backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GDE_KOFE")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    pub db_max_connections: Option<u32>,
    /// Object store base URL; photos are disabled when unset.
    pub object_store_endpoint: Option<String>,
    pub object_store_bucket: Option<String>,
    pub object_store_signing_secret: Option<String>,
    pub object_store_public_base_url: Option<String>,
    /// Enable descriptive tags from the chat-completions endpoint.
    #[ortho_config(default = false)]
    pub ai_enabled: bool,
    pub ai_endpoint: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_model: Option<String>,
    pub rating_formula_version: Option<String>,
    pub quality_formula_version: Option<String>,
    pub outbox_poll_ms: Option<u64>,
    pub inbox_poll_ms: Option<u64>,
    pub rating_rebuild_secs: Option<u64>,
    pub photo_cleanup_secs: Option<u64>,
    pub event_max_attempts: Option<i32>,
    pub request_deadline_ms: Option<u64>,
    pub verify_deadline_ms: Option<u64>,
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|source| SettingsError::Url { field, source })
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|raw| raw.trim()).filter(|raw| !raw.is_empty())
}

impl AppSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = non_blank(self.bind_addr.as_ref()).unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let url = non_blank(self.database_url.as_ref()).ok_or(SettingsError::MissingDatabaseUrl)?;
        let config = PoolConfig::new(url);
        Ok(match self.db_max_connections {
            Some(max) => config.with_max_size(max),
            None => config,
        })
    }

    /// `None` when no endpoint is configured.
    pub fn object_store(&self) -> Result<Option<ObjectStoreSettings>, SettingsError> {
        let Some(endpoint) = non_blank(self.object_store_endpoint.as_ref()) else {
            return Ok(None);
        };
        let bucket = non_blank(self.object_store_bucket.as_ref()).ok_or(SettingsError::Missing {
            field: "object_store_bucket",
            feature: "the object store",
        })?;
        let secret = non_blank(self.object_store_signing_secret.as_ref()).ok_or(
            SettingsError::Missing {
                field: "object_store_signing_secret",
                feature: "the object store",
            },
        )?;
        Ok(Some(ObjectStoreSettings {
            endpoint: parse_url("object_store_endpoint", endpoint)?,
            bucket: bucket.to_owned(),
            signing_secret: Zeroizing::new(secret.to_owned()),
            public_base_url: non_blank(self.object_store_public_base_url.as_ref())
                .map(str::to_owned),
            timeout: OUTBOUND_TIMEOUT,
        }))
    }

    /// `None` unless AI is enabled.
    pub fn summarizer(&self) -> Result<Option<SummarizerSettings>, SettingsError> {
        if !self.ai_enabled {
            return Ok(None);
        }
        let endpoint = non_blank(self.ai_endpoint.as_ref()).ok_or(SettingsError::Missing {
            field: "ai_endpoint",
            feature: "ai",
        })?;
        let api_key = non_blank(self.ai_api_key.as_ref()).ok_or(SettingsError::Missing {
            field: "ai_api_key",
            feature: "ai",
        })?;
        Ok(Some(SummarizerSettings {
            endpoint: parse_url("ai_endpoint", endpoint)?,
            api_key: Zeroizing::new(api_key.to_owned()),
            model: non_blank(self.ai_model.as_ref())
                .unwrap_or(DEFAULT_AI_MODEL)
                .to_owned(),
            timeout: OUTBOUND_TIMEOUT,
        }))
    }

    pub fn formulas(&self) -> FormulaSettings {
        let defaults = FormulaSettings::default();
        FormulaSettings {
            rating_version: non_blank(self.rating_formula_version.as_ref())
                .map_or(defaults.rating_version, str::to_owned),
            quality_version: non_blank(self.quality_formula_version.as_ref())
                .map_or(defaults.quality_version, str::to_owned),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self
                .event_max_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_attempts),
            ..defaults
        }
    }

    pub fn deadlines(&self) -> Deadlines {
        let defaults = Deadlines::default();
        Deadlines {
            default: self
                .request_deadline_ms
                .map_or(defaults.default, Duration::from_millis),
            verify_visit: self
                .verify_deadline_ms
                .map_or(defaults.verify_visit, Duration::from_millis),
        }
    }

    pub fn outbox_schedule(&self) -> LoopSchedule {
        let interval = Duration::from_millis(self.outbox_poll_ms.unwrap_or(1_000));
        LoopSchedule::new(interval, DISPATCH_BATCH)
    }

    pub fn inbox_schedule(&self) -> LoopSchedule {
        let interval = Duration::from_millis(self.inbox_poll_ms.unwrap_or(1_000));
        LoopSchedule::new(interval, DISPATCH_BATCH)
    }

    pub fn rating_rebuild_schedule(&self) -> LoopSchedule {
        let interval = Duration::from_secs(self.rating_rebuild_secs.unwrap_or(15 * 60));
        LoopSchedule::new(interval, 1)
    }

    pub fn photo_cleanup_schedule(&self) -> LoopSchedule {
        let interval = Duration::from_secs(self.photo_cleanup_secs.unwrap_or(60 * 60));
        LoopSchedule::new(interval, 1)
    }
}
