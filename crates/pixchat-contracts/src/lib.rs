pub mod chat;
pub mod conversation;
pub mod download;
pub mod events;
pub mod generation;
pub mod presets;
pub mod settings;
pub mod status;
