/// Result of a liveness probe. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiStatus {
    pub reachable: bool,
    pub message: String,
    pub latency_ms: Option<f64>,
}

impl ApiStatus {
    pub fn connected(latency_ms: f64) -> Self {
        Self {
            reachable: true,
            message: format!("API Connected (Latency: {latency_ms:.0}ms)"),
            latency_ms: Some(latency_ms),
        }
    }

    pub fn bad_status(status_code: u16) -> Self {
        Self {
            reachable: false,
            message: format!("API Not Responding Correctly ({status_code})"),
            latency_ms: None,
        }
    }

    pub fn not_connected() -> Self {
        Self {
            reachable: false,
            message: "API Not Connected".to_string(),
            latency_ms: None,
        }
    }
}
