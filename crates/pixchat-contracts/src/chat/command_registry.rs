#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    Help,
    SetModel,
    ListModels,
    SetPreset,
    ListPresets,
    SetSteps,
    SetGuidance,
    SetWidth,
    SetHeight,
    SetNegative,
    ResetOverrides,
    ShowSettings,
    Status,
    Stats,
    History,
    Download,
    Regenerate,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: CommandAction::Help,
        usage: "/help",
        summary: "list commands",
    },
    CommandSpec {
        command: "model",
        action: CommandAction::SetModel,
        usage: "/model base|fine-tuned",
        summary: "select the generation model",
    },
    CommandSpec {
        command: "models",
        action: CommandAction::ListModels,
        usage: "/models",
        summary: "describe the available models",
    },
    CommandSpec {
        command: "preset",
        action: CommandAction::SetPreset,
        usage: "/preset NAME",
        summary: "select a preset style",
    },
    CommandSpec {
        command: "presets",
        action: CommandAction::ListPresets,
        usage: "/presets",
        summary: "list preset styles and their defaults",
    },
    CommandSpec {
        command: "steps",
        action: CommandAction::SetSteps,
        usage: "/steps 10-150",
        summary: "override inference steps",
    },
    CommandSpec {
        command: "guidance",
        action: CommandAction::SetGuidance,
        usage: "/guidance 1.0-20.0",
        summary: "override guidance scale (0.5 increments)",
    },
    CommandSpec {
        command: "width",
        action: CommandAction::SetWidth,
        usage: "/width 512-1024",
        summary: "image width (multiples of 64)",
    },
    CommandSpec {
        command: "height",
        action: CommandAction::SetHeight,
        usage: "/height 512-1024",
        summary: "image height (multiples of 64)",
    },
    CommandSpec {
        command: "negative",
        action: CommandAction::SetNegative,
        usage: "/negative TEXT",
        summary: "override the negative prompt (empty clears it)",
    },
    CommandSpec {
        command: "reset",
        action: CommandAction::ResetOverrides,
        usage: "/reset",
        summary: "drop overrides and use preset defaults",
    },
    CommandSpec {
        command: "settings",
        action: CommandAction::ShowSettings,
        usage: "/settings",
        summary: "show the settings the next prompt will use",
    },
    CommandSpec {
        command: "status",
        action: CommandAction::Status,
        usage: "/status",
        summary: "check the selected model's endpoint",
    },
    CommandSpec {
        command: "stats",
        action: CommandAction::Stats,
        usage: "/stats",
        summary: "show how many images were generated",
    },
    CommandSpec {
        command: "history",
        action: CommandAction::History,
        usage: "/history",
        summary: "replay the conversation",
    },
    CommandSpec {
        command: "download",
        action: CommandAction::Download,
        usage: "/download [N] [DIR]",
        summary: "save result N (default: latest) as PNG",
    },
    CommandSpec {
        command: "regenerate",
        action: CommandAction::Regenerate,
        usage: "/regenerate",
        summary: "resubmit the last prompt with the same settings",
    },
    CommandSpec {
        command: "quit",
        action: CommandAction::Quit,
        usage: "/quit",
        summary: "leave the chat",
    },
];

pub(crate) const ALIASES: &[(&str, &str)] = &[
    ("exit", "quit"),
    ("regen", "regenerate"),
    ("neg", "negative"),
    ("cfg", "guidance"),
    ("save", "download"),
];

pub(crate) fn find_command(command: &str) -> Option<&'static CommandSpec> {
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == command)
        .map(|(_, target)| *target)
        .unwrap_or(command);
    COMMANDS.iter().find(|spec| spec.command == canonical)
}

pub fn help_lines() -> Vec<String> {
    let width = COMMANDS
        .iter()
        .map(|spec| spec.usage.chars().count())
        .max()
        .unwrap_or(0);
    COMMANDS
        .iter()
        .map(|spec| format!("{:<width$}  {}", spec.usage, spec.summary))
        .collect()
}
