mod registry;
mod resolver;

pub use registry::{Preset, PresetRegistry, CUSTOM_PRESET};
pub use resolver::{PresetSelection, SettingsOverrides, SettingsResolver, UserSelection};
