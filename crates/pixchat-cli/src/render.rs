use pixchat_contracts::conversation::{ConversationStore, ResultTurn, Turn};
use pixchat_contracts::presets::{PresetRegistry, SettingsOverrides};
use pixchat_contracts::settings::{GenerationSettings, ModelKind};
use pixchat_engine::SessionState;

pub fn turn_lines(turn: &Turn, result_number: Option<usize>) -> Vec<String> {
    match turn {
        Turn::User { text } => vec![format!("you> {text}")],
        Turn::AssistantError { text } => vec![format!("pixchat> {text}")],
        Turn::AssistantResult(result) => {
            let mut lines = vec![format!("pixchat> {}", result.text)];
            let label = result_number
                .map(|number| format!("#{number} "))
                .unwrap_or_default();
            lines.push(format!(
                "  [image {label}{} bytes, {}]",
                result.image_bytes.len(),
                result.download().file_name
            ));
            lines.extend(generation_details(result));
            lines
        }
    }
}

/// The "Generation Details" block shown under each image.
pub fn generation_details(result: &ResultTurn) -> Vec<String> {
    let mut lines = vec!["  Generation Details".to_string()];
    for (label, value) in result.settings_used.details(&result.prompt_echo) {
        let value = if value.is_empty() { "-".to_string() } else { value };
        lines.push(format!("    {label}: {value}"));
    }
    lines
}

pub fn history_lines(store: &ConversationStore) -> Vec<String> {
    if store.is_empty() {
        return vec!["No messages yet.".to_string()];
    }
    let mut result_number = 0;
    let mut lines = Vec::new();
    for turn in store.all() {
        let number = if turn.as_result().is_some() {
            result_number += 1;
            Some(result_number)
        } else {
            None
        };
        lines.extend(turn_lines(turn, number));
    }
    lines
}

pub fn settings_lines(
    state: &SessionState,
    pending: &GenerationSettings,
) -> Vec<String> {
    let overrides: &SettingsOverrides = &state.overrides;
    let mark = |overridden: bool| if overridden { " (override)" } else { "" };
    let negative = if pending.negative_prompt.is_empty() {
        "-"
    } else {
        pending.negative_prompt.as_str()
    };
    vec![
        format!("Model: {}", pending.model),
        format!("Preset: {}", state.preset),
        format!(
            "Steps: {}{}",
            pending.steps.get(),
            mark(overrides.steps.is_some())
        ),
        format!(
            "Guidance Scale: {}{}",
            pending.guidance_scale,
            mark(overrides.guidance_scale.is_some())
        ),
        format!(
            "Negative Prompt: {negative}{}",
            mark(overrides.negative_prompt.is_some())
        ),
        format!("Size: {}", pending.snapshot().size_label()),
    ]
}

pub fn preset_lines(registry: &PresetRegistry, current: &str) -> Vec<String> {
    registry
        .list()
        .map(|preset| {
            let marker = if preset.name == current { "*" } else { " " };
            format!(
                "{marker} {} (steps {}, guidance {})",
                preset.name,
                preset.steps.get(),
                preset.guidance_scale
            )
        })
        .collect()
}

pub fn model_lines(current: ModelKind) -> Vec<String> {
    ModelKind::ALL
        .iter()
        .map(|model| {
            let marker = if *model == current { "*" } else { " " };
            format!("{marker} {}: {}", model.label(), model.description())
        })
        .collect()
}

pub fn stats_line(store: &ConversationStore) -> String {
    match store.success_count() {
        1 => "1 image generated this session.".to_string(),
        count => format!("{count} images generated this session."),
    }
}
