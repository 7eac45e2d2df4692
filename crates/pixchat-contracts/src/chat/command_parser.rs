use crate::settings::{Dimension, GuidanceScale, ModelKind, Steps, ValidationError};

use super::command_registry::{find_command, CommandAction};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Noop,
    Submit { prompt: String },
    Help,
    SetModel(ModelKind),
    ListModels,
    SetPreset(String),
    ListPresets,
    SetSteps(Steps),
    SetGuidance(GuidanceScale),
    SetWidth(Dimension),
    SetHeight(Dimension),
    SetNegative(String),
    ResetOverrides,
    ShowSettings,
    Status,
    Stats,
    History,
    Download {
        number: Option<usize>,
        dir: Option<String>,
    },
    Regenerate,
    Quit,
    Invalid {
        command: String,
        reason: String,
    },
    Unknown {
        command: String,
        arg: String,
    },
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_download_args(arg: &str) -> Result<(Option<usize>, Option<String>), String> {
    let mut parts = parse_path_args(arg).into_iter();
    let Some(first) = parts.next() else {
        return Ok((None, None));
    };
    let rest: Vec<String> = parts.collect();
    match first.parse::<usize>() {
        Ok(0) => Err("result numbers start at 1".to_string()),
        Ok(number) => Ok((Some(number), (!rest.is_empty()).then(|| rest.join(" ")))),
        Err(_) => {
            let mut dir = vec![first];
            dir.extend(rest);
            Ok((None, Some(dir.join(" "))))
        }
    }
}

fn invalid(command: &str, err: ValidationError) -> ChatCommand {
    ChatCommand::Invalid {
        command: command.to_string(),
        reason: err.to_string(),
    }
}

fn requires_arg(command: &str, usage: &str) -> ChatCommand {
    ChatCommand::Invalid {
        command: command.to_string(),
        reason: format!("usage: {usage}"),
    }
}

pub fn parse_command(text: &str) -> ChatCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return ChatCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            let Some(spec) = find_command(&command) else {
                return ChatCommand::Unknown {
                    command,
                    arg: arg.to_string(),
                };
            };

            let needs_value = matches!(
                spec.action,
                CommandAction::SetModel
                    | CommandAction::SetPreset
                    | CommandAction::SetSteps
                    | CommandAction::SetGuidance
                    | CommandAction::SetWidth
                    | CommandAction::SetHeight
            );
            if needs_value && arg.is_empty() {
                return requires_arg(spec.command, spec.usage);
            }

            return match spec.action {
                CommandAction::Help => ChatCommand::Help,
                CommandAction::SetModel => match arg.parse::<ModelKind>() {
                    Ok(model) => ChatCommand::SetModel(model),
                    Err(err) => invalid(spec.command, err),
                },
                CommandAction::ListModels => ChatCommand::ListModels,
                CommandAction::SetPreset => ChatCommand::SetPreset(arg.to_string()),
                CommandAction::ListPresets => ChatCommand::ListPresets,
                CommandAction::SetSteps => match arg.parse::<Steps>() {
                    Ok(steps) => ChatCommand::SetSteps(steps),
                    Err(err) => invalid(spec.command, err),
                },
                CommandAction::SetGuidance => match arg.parse::<GuidanceScale>() {
                    Ok(guidance) => ChatCommand::SetGuidance(guidance),
                    Err(err) => invalid(spec.command, err),
                },
                CommandAction::SetWidth => match arg.parse::<Dimension>() {
                    Ok(width) => ChatCommand::SetWidth(width),
                    Err(err) => invalid(spec.command, err),
                },
                CommandAction::SetHeight => match arg.parse::<Dimension>() {
                    Ok(height) => ChatCommand::SetHeight(height),
                    Err(err) => invalid(spec.command, err),
                },
                CommandAction::SetNegative => ChatCommand::SetNegative(arg.to_string()),
                CommandAction::ResetOverrides => ChatCommand::ResetOverrides,
                CommandAction::ShowSettings => ChatCommand::ShowSettings,
                CommandAction::Status => ChatCommand::Status,
                CommandAction::Stats => ChatCommand::Stats,
                CommandAction::History => ChatCommand::History,
                CommandAction::Download => match parse_download_args(arg) {
                    Ok((number, dir)) => ChatCommand::Download { number, dir },
                    Err(reason) => ChatCommand::Invalid {
                        command: spec.command.to_string(),
                        reason,
                    },
                },
                CommandAction::Regenerate => ChatCommand::Regenerate,
                CommandAction::Quit => ChatCommand::Quit,
            };
        }
    }

    ChatCommand::Submit {
        prompt: raw_trimmed.to_string(),
    }
}
