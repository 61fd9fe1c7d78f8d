//! Engine configuration
//!
//! ```json
//! {
//!   "cache": { "max_size": 20000, "idle_time_ms": 3600000 },
//!   "whitelist": { "mode": "append", "list": ["method java.lang.System getenv java.lang.String"] },
//!   "syntax": { "prefix": "{", "suffix": "}" }
//! }
//! ```
//!
//! Every section and field is optional and falls back to its default.

use gateway_el_diagnostics::{ElError, Result, EL0402};
use gateway_el_eval::{CacheConfig, WhitelistConfig};
use gateway_el_parser::TemplateSyntax;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub whitelist: WhitelistConfig,
    pub syntax: TemplateSyntax,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            ElError::configuration(EL0402, format!("invalid engine configuration: {}", err))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Whitelist settings read from flat gateway properties, other sections defaulted
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            whitelist: WhitelistConfig::from_properties(properties),
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_whitelist(mut self, whitelist: WhitelistConfig) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn with_syntax(mut self, syntax: TemplateSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.syntax.validate()
    }
}
