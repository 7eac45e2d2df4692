use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_STEPS: u32 = 10;
pub const MAX_STEPS: u32 = 150;
pub const MIN_GUIDANCE: f64 = 1.0;
pub const MAX_GUIDANCE: f64 = 20.0;
pub const DIMENSIONS: [u32; 9] = [512, 576, 640, 704, 768, 832, 896, 960, 1024];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("steps must be between 10 and 150 (got {0})")]
    Steps(u32),
    #[error("guidance scale must be between 1.0 and 20.0 in 0.5 increments (got {0})")]
    Guidance(f64),
    #[error("size must be one of 512, 576, 640, 704, 768, 832, 896, 960, 1024 (got {0})")]
    Dimension(u32),
    #[error("unknown model '{0}' (expected 'base' or 'fine-tuned')")]
    Model(String),
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelKind {
    #[default]
    #[serde(rename = "Base")]
    Base,
    #[serde(rename = "Fine-tuned")]
    FineTuned,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Base, ModelKind::FineTuned];

    /// Label sent on the wire and shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::Base => "Base",
            ModelKind::FineTuned => "Fine-tuned",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelKind::Base => {
                "General-purpose model: balanced quality and speed, works well with detailed prompts."
            }
            ModelKind::FineTuned => {
                "Fine-tuned model: tuned checkpoint served from its own endpoint, may need a different prompting style."
            }
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModelKind {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "base" => Ok(ModelKind::Base),
            "finetuned" | "fine" | "tuned" => Ok(ModelKind::FineTuned),
            _ => Err(ValidationError::Model(raw.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Steps(u32);

impl Steps {
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if (MIN_STEPS..=MAX_STEPS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::Steps(value))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// For compile-time tables whose values are covered by tests.
    pub(crate) const fn known(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for Steps {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<u32>()
            .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;
        Self::new(value)
    }
}

/// Classifier-free guidance weight, constrained to the 0.5 grid in [1.0, 20.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceScale(f64);

impl GuidanceScale {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        let doubled = value * 2.0;
        if value.is_finite()
            && (MIN_GUIDANCE..=MAX_GUIDANCE).contains(&value)
            && doubled.fract() == 0.0
        {
            Ok(Self(value))
        } else {
            Err(ValidationError::Guidance(value))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }

    pub(crate) const fn known(value: f64) -> Self {
        Self(value)
    }
}

impl FromStr for GuidanceScale {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<f64>()
            .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for GuidanceScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension(u32);

impl Dimension {
    pub const DEFAULT: Dimension = Dimension(512);

    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if DIMENSIONS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::Dimension(value))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Dimension {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<u32>()
            .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;
        Self::new(value)
    }
}

/// Everything that goes into one outbound generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: ModelKind,
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: Steps,
    pub guidance_scale: GuidanceScale,
    pub width: Dimension,
    pub height: Dimension,
}

impl GenerationSettings {
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            model: self.model,
            negative_prompt: self.negative_prompt.clone(),
            steps: self.steps,
            guidance_scale: self.guidance_scale,
            width: self.width,
            height: self.height,
        }
    }
}

/// The settings a result was produced with, minus the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub model: ModelKind,
    pub negative_prompt: String,
    pub steps: Steps,
    pub guidance_scale: GuidanceScale,
    pub width: Dimension,
    pub height: Dimension,
}

impl SettingsSnapshot {
    pub fn with_prompt(&self, prompt: impl Into<String>) -> GenerationSettings {
        GenerationSettings {
            model: self.model,
            prompt: prompt.into(),
            negative_prompt: self.negative_prompt.clone(),
            steps: self.steps,
            guidance_scale: self.guidance_scale,
            width: self.width,
            height: self.height,
        }
    }

    pub fn size_label(&self) -> String {
        format!("{}×{}", self.width.get(), self.height.get())
    }

    pub fn details(&self, prompt: &str) -> Vec<(&'static str, String)> {
        vec![
            ("Model", self.model.label().to_string()),
            ("Prompt", prompt.to_string()),
            ("Negative Prompt", self.negative_prompt.clone()),
            ("Steps", self.steps.get().to_string()),
            ("Guidance Scale", self.guidance_scale.to_string()),
            ("Size", self.size_label()),
        ]
    }
}
