use std::fmt;

use anyhow::Result;
use pixchat_contracts::conversation::ConversationStore;
use pixchat_contracts::events::{json_object, EventPayload, EventWriter, SessionEvent};
use pixchat_contracts::generation::GenerationError;
use pixchat_contracts::presets::{
    PresetSelection, SettingsOverrides, SettingsResolver, UserSelection, CUSTOM_PRESET,
};
use pixchat_contracts::settings::{Dimension, GenerationSettings, ModelKind};
use pixchat_contracts::status::ApiStatus;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{HttpGenerationClient, ImageGenerator};
use crate::config::EndpointConfig;
use crate::probe::{HttpStatusProbe, StatusProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    CheckingStatus,
    Unreachable,
    Generating,
    Succeeded,
    Failed,
}

impl SessionPhase {
    pub fn progress_label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Ready",
            SessionPhase::CheckingStatus => "Checking API connection...",
            SessionPhase::Unreachable => "API unreachable",
            SessionPhase::Generating => "Generating your image...",
            SessionPhase::Succeeded => "Done",
            SessionPhase::Failed => "Generation failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.progress_label())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("nothing to regenerate yet")]
    NothingToRegenerate,
}

/// How a submitted turn ended. The conversation already holds the
/// corresponding assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Succeeded { timestamp: i64 },
    Unreachable(ApiStatus),
    Failed(GenerationError),
}

/// Everything a single chat session owns. Lives only in memory.
#[derive(Debug, Clone)]
pub struct SessionState {
    store: ConversationStore,
    phase: SessionPhase,
    last_submission: Option<GenerationSettings>,
    pub session_id: String,
    pub selected_model: ModelKind,
    pub preset: String,
    pub overrides: SettingsOverrides,
    pub width: Dimension,
    pub height: Dimension,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            store: ConversationStore::new(),
            phase: SessionPhase::Idle,
            last_submission: None,
            session_id: uuid::Uuid::new_v4().to_string(),
            selected_model: ModelKind::default(),
            preset: CUSTOM_PRESET.to_string(),
            overrides: SettingsOverrides::default(),
            width: Dimension::default(),
            height: Dimension::default(),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SessionPhase::Idle
    }

    pub fn last_submission(&self) -> Option<&GenerationSettings> {
        self.last_submission.as_ref()
    }

    pub fn selection(&self) -> UserSelection {
        UserSelection {
            model: self.selected_model,
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one turn at a time: record the prompt, probe the endpoint, generate,
/// record the outcome, return to idle. Sole writer of the conversation.
pub struct SessionController {
    state: SessionState,
    endpoints: EndpointConfig,
    resolver: SettingsResolver,
    probe: Box<dyn StatusProbe>,
    generator: Box<dyn ImageGenerator>,
    events: Option<EventWriter>,
}

impl SessionController {
    pub fn new(
        endpoints: EndpointConfig,
        probe: Box<dyn StatusProbe>,
        generator: Box<dyn ImageGenerator>,
    ) -> Self {
        Self {
            state: SessionState::new(),
            endpoints,
            resolver: SettingsResolver::default(),
            probe,
            generator,
            events: None,
        }
    }

    pub fn over_http(endpoints: EndpointConfig) -> Result<Self> {
        let probe = HttpStatusProbe::new(endpoints.probe_timeout)?;
        let generator = HttpGenerationClient::new(endpoints.clone())?;
        Ok(Self::new(endpoints, Box::new(probe), Box::new(generator)))
    }

    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    pub fn resolver(&self) -> &SettingsResolver {
        &self.resolver
    }

    pub fn events(&self) -> Option<&EventWriter> {
        self.events.as_ref()
    }

    pub fn emit_session_started(&self) {
        self.emit(
            SessionEvent::SessionStarted,
            json_object(json!({
                "base_url": self.endpoints.base_url,
                "finetuned_url": self.endpoints.finetuned_url,
            })),
        );
    }

    /// Unknown names fall back to Custom; the selection explains why.
    pub fn select_preset(&mut self, requested: &str) -> PresetSelection {
        let selection = self.resolver.select(requested);
        self.state.preset = selection.preset.name.clone();
        selection
    }

    pub fn pending_settings(&self, prompt: &str) -> GenerationSettings {
        self.resolver.resolve(
            &self.state.preset,
            &self.state.overrides,
            &self.state.selection(),
            prompt,
        )
    }

    pub fn check_status(&self) -> ApiStatus {
        let model = self.state.selected_model;
        let status = self.probe.check(self.endpoints.endpoint_for(model));
        self.emit_status(model, &status);
        status
    }

    pub fn submit(&mut self, prompt: &str) -> Result<TurnOutcome, SubmitError> {
        self.submit_with_progress(prompt, &mut |_| {})
    }

    pub fn submit_with_progress(
        &mut self,
        prompt: &str,
        on_phase: &mut dyn FnMut(SessionPhase),
    ) -> Result<TurnOutcome, SubmitError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        let settings = self.pending_settings(prompt);
        Ok(self.run_turn(settings, on_phase))
    }

    /// Resubmits the last prompt with the exact settings it was sent with.
    /// This is a new turn with its own timestamp, not a replay.
    pub fn regenerate(
        &mut self,
        on_phase: &mut dyn FnMut(SessionPhase),
    ) -> Result<TurnOutcome, SubmitError> {
        let Some(settings) = self.state.last_submission.clone() else {
            return Err(SubmitError::NothingToRegenerate);
        };
        Ok(self.run_turn(settings, on_phase))
    }

    fn run_turn(
        &mut self,
        settings: GenerationSettings,
        on_phase: &mut dyn FnMut(SessionPhase),
    ) -> TurnOutcome {
        self.state.store.append_user(settings.prompt.clone());
        self.state.last_submission = Some(settings.clone());
        self.emit(
            SessionEvent::TurnSubmitted,
            json_object(json!({
                "prompt": settings.prompt,
                "settings": settings_json(&settings),
            })),
        );

        self.enter(SessionPhase::CheckingStatus, on_phase);
        let endpoint = self.endpoints.endpoint_for(settings.model);
        let status = self.probe.check(endpoint);
        self.emit_status(settings.model, &status);
        if !status.reachable {
            self.enter(SessionPhase::Unreachable, on_phase);
            self.state.store.append_error(status.message.clone());
            self.enter(SessionPhase::Idle, on_phase);
            return TurnOutcome::Unreachable(status);
        }

        self.enter(SessionPhase::Generating, on_phase);
        let outcome = match self.generator.generate(&settings) {
            Ok(image) => {
                let timestamp = chrono::Utc::now().timestamp();
                info!(
                    prompt = %settings.prompt,
                    bytes = image.bytes.len(),
                    width = image.width,
                    height = image.height,
                    "image generated"
                );
                self.emit(
                    SessionEvent::GenerationSucceeded,
                    json_object(json!({
                        "prompt": settings.prompt,
                        "timestamp": timestamp,
                        "bytes": image.bytes.len(),
                        "width": image.width,
                        "height": image.height,
                    })),
                );
                self.state.store.append_result(
                    format!("Here's your image based on: \"{}\"", settings.prompt),
                    image.bytes,
                    settings.prompt.clone(),
                    settings.snapshot(),
                    timestamp,
                );
                self.enter(SessionPhase::Succeeded, on_phase);
                TurnOutcome::Succeeded { timestamp }
            }
            Err(err) => {
                warn!(prompt = %settings.prompt, kind = err.kind_label(), "generation failed");
                self.emit(
                    SessionEvent::GenerationFailed,
                    json_object(json!({
                        "prompt": settings.prompt,
                        "kind": err.kind_label(),
                        "message": err.to_string(),
                    })),
                );
                self.state.store.append_error(err.to_string());
                self.enter(SessionPhase::Failed, on_phase);
                TurnOutcome::Failed(err)
            }
        };
        self.enter(SessionPhase::Idle, on_phase);
        outcome
    }

    fn enter(&mut self, phase: SessionPhase, on_phase: &mut dyn FnMut(SessionPhase)) {
        debug!(from = ?self.state.phase, to = ?phase, "session phase");
        self.state.phase = phase;
        on_phase(phase);
    }

    fn emit_status(&self, model: ModelKind, status: &ApiStatus) {
        self.emit(
            SessionEvent::ApiStatus,
            json_object(json!({
                "model": model.label(),
                "endpoint": self.endpoints.endpoint_for(model),
                "reachable": status.reachable,
                "message": status.message,
                "latency_ms": status.latency_ms,
            })),
        );
    }

    fn emit(&self, event: SessionEvent, payload: EventPayload) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.emit(event, payload) {
            warn!(%event, error = %err, "failed to write session event");
        }
    }
}

fn settings_json(settings: &GenerationSettings) -> Value {
    json!({
        "model": settings.model.label(),
        "negative_prompt": settings.negative_prompt,
        "steps": settings.steps.get(),
        "guidance_scale": settings.guidance_scale.get(),
        "width": settings.width.get(),
        "height": settings.height.get(),
    })
}
