use crate::download::DownloadArtifact;
use crate::settings::SettingsSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultTurn {
    pub text: String,
    pub image_bytes: Vec<u8>,
    pub prompt_echo: String,
    pub settings_used: SettingsSnapshot,
    /// Unix seconds. Display and download-name identifier only.
    pub timestamp: i64,
}

impl ResultTurn {
    pub fn download(&self) -> DownloadArtifact {
        DownloadArtifact::png(self.timestamp, self.image_bytes.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User { text: String },
    AssistantResult(ResultTurn),
    AssistantError { text: String },
}

impl Turn {
    pub fn role(&self) -> &'static str {
        match self {
            Turn::User { .. } => "user",
            Turn::AssistantResult(_) | Turn::AssistantError { .. } => "assistant",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Turn::User { text } | Turn::AssistantError { text } => text,
            Turn::AssistantResult(result) => &result.text,
        }
    }

    pub fn as_result(&self) -> Option<&ResultTurn> {
        match self {
            Turn::AssistantResult(result) => Some(result),
            _ => None,
        }
    }
}

/// Append-only conversation log for one session.
///
/// Insertion order is chronological order is display order. There is no
/// removal or in-place mutation; `success_count` tracks result turns.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
    success_count: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::User { text: text.into() });
    }

    pub fn append_result(
        &mut self,
        text: impl Into<String>,
        image_bytes: Vec<u8>,
        prompt_echo: impl Into<String>,
        settings_used: SettingsSnapshot,
        timestamp: i64,
    ) {
        self.turns.push(Turn::AssistantResult(ResultTurn {
            text: text.into(),
            image_bytes,
            prompt_echo: prompt_echo.into(),
            settings_used,
            timestamp,
        }));
        self.success_count += 1;
    }

    pub fn append_error(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::AssistantError { text: text.into() });
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn results(&self) -> impl Iterator<Item = &ResultTurn> {
        self.turns.iter().filter_map(Turn::as_result)
    }

    /// 1-based position among result turns, matching what `/history` shows.
    pub fn result(&self, number: usize) -> Option<&ResultTurn> {
        number.checked_sub(1).and_then(|idx| self.results().nth(idx))
    }

    pub fn latest_result(&self) -> Option<&ResultTurn> {
        self.results().last()
    }
}
