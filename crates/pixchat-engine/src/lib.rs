mod client;
mod config;
mod probe;
mod session;

pub use client::{GeneratedImage, HttpGenerationClient, ImageGenerator};
pub use config::{
    EndpointConfig, BASE_URL_ENV, DEFAULT_GENERATION_TIMEOUT, DEFAULT_PROBE_TIMEOUT,
    FINETUNED_URL_ENV,
};
pub use probe::{HttpStatusProbe, StatusProbe};
pub use session::{SessionController, SessionPhase, SessionState, SubmitError, TurnOutcome};
