use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use pixchat_contracts::status::ApiStatus;
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Liveness check against one endpoint. Never fails: every outcome is an
/// `ApiStatus`.
pub trait StatusProbe {
    fn check(&self, endpoint: &str) -> ApiStatus;
}

pub struct HttpStatusProbe {
    http: HttpClient,
}

impl HttpStatusProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build status probe HTTP client")?;
        Ok(Self { http })
    }
}

impl StatusProbe for HttpStatusProbe {
    fn check(&self, endpoint: &str) -> ApiStatus {
        let url = format!("{endpoint}/");
        let started = Instant::now();
        match self.http.get(&url).send() {
            Ok(response) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                let status = response.status();
                if status == StatusCode::OK {
                    debug!(%url, latency_ms, "liveness probe ok");
                    ApiStatus::connected(latency_ms)
                } else {
                    warn!(%url, status = status.as_u16(), "liveness probe got unexpected status");
                    ApiStatus::bad_status(status.as_u16())
                }
            }
            Err(err) => {
                warn!(%url, error = %err, "liveness probe failed");
                ApiStatus::not_connected()
            }
        }
    }
}
