use serde::Serialize;
use thiserror::Error;

use crate::settings::{GenerationSettings, ModelKind};

pub const GENERATE_PATH: &str = "/generate-image/";

/// Flat JSON body of `POST {endpoint}/generate-image/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub negative_prompt: &'a str,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub width: u32,
    pub height: u32,
    pub model: ModelKind,
}

impl<'a> From<&'a GenerationSettings> for GenerationRequest<'a> {
    fn from(settings: &'a GenerationSettings) -> Self {
        Self {
            prompt: &settings.prompt,
            negative_prompt: &settings.negative_prompt,
            num_inference_steps: settings.steps.get(),
            guidance_scale: settings.guidance_scale.get(),
            width: settings.width.get(),
            height: settings.height.get(),
            model: settings.model,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    Unreachable,
    ServiceError,
    Timeout,
    InvalidResponse,
    Unknown,
}

/// Terminal failure of a single generation attempt. `Display` is the text
/// shown to the user as the assistant's reply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Error: Could not connect to the API server. Please check if the server is running.")]
    Unreachable,
    #[error("API Error: {status_code} - {body}")]
    ServiceError { status_code: u16, body: String },
    #[error("Error: API request timed out. The server may be busy or the image generation is taking too long.")]
    Timeout,
    #[error("Error: the API returned data that is not a valid image.")]
    InvalidResponse { detail: String },
    #[error("Error: {message}")]
    Unknown { message: String },
}

impl GenerationError {
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            GenerationError::Unreachable => GenerationErrorKind::Unreachable,
            GenerationError::ServiceError { .. } => GenerationErrorKind::ServiceError,
            GenerationError::Timeout => GenerationErrorKind::Timeout,
            GenerationError::InvalidResponse { .. } => GenerationErrorKind::InvalidResponse,
            GenerationError::Unknown { .. } => GenerationErrorKind::Unknown,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind() {
            GenerationErrorKind::Unreachable => "unreachable",
            GenerationErrorKind::ServiceError => "service_error",
            GenerationErrorKind::Timeout => "timeout",
            GenerationErrorKind::InvalidResponse => "invalid_response",
            GenerationErrorKind::Unknown => "unknown",
        }
    }
}
