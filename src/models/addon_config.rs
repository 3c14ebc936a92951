//! Per-user add-on configuration carried in the first path segment.
//!
//! Two encodings are accepted:
//! - `language=de-DE|include_adult=true|rpdbkey=t0-xxx|session_id=abc`
//! - a JSON object with the same keys (camelCase variants also accepted)

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonConfig {
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default, alias = "includeAdult")]
    pub include_adult: bool,

    #[serde(default, rename = "rpdbkey", alias = "rpdb_key", alias = "rpdbKey")]
    pub rpdb_key: Option<String>,

    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Validation {
            field: key.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

impl AddonConfig {
    /// Parses the configuration segment; `None` or an empty segment yields
    /// the defaults.
    pub fn parse(segment: Option<&str>) -> AppResult<Self> {
        let Some(segment) = segment.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };

        if segment.starts_with('{') {
            return serde_json::from_str::<Self>(segment)
                .map(Self::normalized)
                .map_err(|e| AppError::BadRequest {
                    message: format!("invalid add-on configuration: {}", e),
                });
        }

        let mut config = Self::default();
        for pair in segment.split('|').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key.trim() {
                "language" => config.language = non_empty(value),
                "include_adult" | "includeAdult" => {
                    config.include_adult = parse_bool("include_adult", value)?
                }
                "rpdbkey" | "rpdb_key" | "rpdbKey" => config.rpdb_key = non_empty(value),
                "session_id" | "sessionId" => config.session_id = non_empty(value),
                other => tracing::debug!(key = %other, "Ignoring unknown add-on configuration key"),
            }
        }
        Ok(config)
    }

    fn normalized(self) -> Self {
        Self {
            language: self.language.as_deref().and_then(non_empty),
            include_adult: self.include_adult,
            rpdb_key: self.rpdb_key.as_deref().and_then(non_empty),
            session_id: self.session_id.as_deref().and_then(non_empty),
        }
    }

    /// Configured language, or `default` when none is set.
    pub fn language_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.language.as_deref().unwrap_or(default)
    }
}
