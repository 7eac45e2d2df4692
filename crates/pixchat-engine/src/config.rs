use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use pixchat_contracts::settings::ModelKind;

pub const BASE_URL_ENV: &str = "PIXCHAT_BASE_API_URL";
pub const FINETUNED_URL_ENV: &str = "PIXCHAT_FINETUNED_API_URL";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// The two independently configured generation services.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub finetuned_url: String,
    pub probe_timeout: Duration,
    pub generation_timeout: Duration,
}

impl EndpointConfig {
    pub fn new(base_url: impl AsRef<str>, finetuned_url: impl AsRef<str>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.as_ref()),
            finetuned_url: normalize_base_url(finetuned_url.as_ref()),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Explicit values win over the environment.
    pub fn resolve(base_url: Option<&str>, finetuned_url: Option<&str>) -> Result<Self> {
        let base = base_url
            .map(normalize_base_url)
            .filter(|value| !value.is_empty())
            .or_else(|| non_empty_env(BASE_URL_ENV));
        let finetuned = finetuned_url
            .map(normalize_base_url)
            .filter(|value| !value.is_empty())
            .or_else(|| non_empty_env(FINETUNED_URL_ENV));
        let Some(base) = base else {
            bail!("{BASE_URL_ENV} not set (or pass --base-url)");
        };
        let Some(finetuned) = finetuned else {
            bail!("{FINETUNED_URL_ENV} not set (or pass --finetuned-url)");
        };
        Ok(Self::new(base, finetuned))
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn endpoint_for(&self, model: ModelKind) -> &str {
        match model {
            ModelKind::Base => &self.base_url,
            ModelKind::FineTuned => &self.finetuned_url,
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| normalize_base_url(&value))
        .filter(|value| !value.is_empty())
}
