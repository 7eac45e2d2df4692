use crate::settings::{Dimension, GenerationSettings, GuidanceScale, ModelKind, Steps};

use super::registry::{Preset, PresetRegistry};

/// Per-field overrides. `None` means "use the preset default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub steps: Option<Steps>,
    pub guidance_scale: Option<GuidanceScale>,
    pub negative_prompt: Option<String>,
}

impl SettingsOverrides {
    pub fn is_empty(&self) -> bool {
        self.steps.is_none() && self.guidance_scale.is_none() && self.negative_prompt.is_none()
    }
}

/// The parts of a request that never come from a preset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UserSelection {
    pub model: ModelKind,
    pub width: Dimension,
    pub height: Dimension,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresetSelection {
    pub preset: Preset,
    pub requested: String,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsResolver {
    pub registry: PresetRegistry,
}

impl SettingsResolver {
    pub fn new(registry: Option<PresetRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    pub fn select(&self, requested: &str) -> PresetSelection {
        if let Some(preset) = self.registry.get(requested) {
            return PresetSelection {
                preset: preset.clone(),
                requested: requested.to_string(),
                fallback_reason: None,
            };
        }
        PresetSelection {
            preset: Preset::custom(),
            requested: requested.to_string(),
            fallback_reason: Some(format!(
                "Preset '{}' unknown; using Custom defaults.",
                requested.trim()
            )),
        }
    }

    pub fn resolve(
        &self,
        preset: &str,
        overrides: &SettingsOverrides,
        selection: &UserSelection,
        prompt: &str,
    ) -> GenerationSettings {
        let defaults = self.select(preset).preset;
        GenerationSettings {
            model: selection.model,
            prompt: prompt.to_string(),
            negative_prompt: overrides
                .negative_prompt
                .clone()
                .unwrap_or(defaults.negative_prompt),
            steps: overrides.steps.unwrap_or(defaults.steps),
            guidance_scale: overrides.guidance_scale.unwrap_or(defaults.guidance_scale),
            width: selection.width,
            height: selection.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::{Dimension, GuidanceScale, ModelKind, Steps};

    use super::{SettingsOverrides, SettingsResolver, UserSelection};

    fn triple(
        resolver: &SettingsResolver,
        preset: &str,
        overrides: &SettingsOverrides,
    ) -> (u32, f64, String) {
        let settings = resolver.resolve(preset, overrides, &UserSelection::default(), "prompt");
        (
            settings.steps.get(),
            settings.guidance_scale.get(),
            settings.negative_prompt,
        )
    }

    #[test]
    fn every_preset_resolves_to_documented_defaults() {
        let resolver = SettingsResolver::default();
        let none = SettingsOverrides::default();
        assert_eq!(triple(&resolver, "Custom", &none), (50, 7.5, String::new()));
        assert_eq!(
            triple(&resolver, "Photorealistic", &none),
            (70, 8.5, "blurry, low quality, distorted, deformed".to_string())
        );
        assert_eq!(
            triple(&resolver, "Anime Style", &none),
            (40, 9.0, "realistic, photograph, 3d render".to_string())
        );
        assert_eq!(
            triple(&resolver, "Oil Painting", &none),
            (60, 7.0, "digital art, photograph, sketch".to_string())
        );
        assert_eq!(
            triple(&resolver, "Pencil Sketch", &none),
            (30, 6.0, "color, painting, realistic, photograph".to_string())
        );
    }

    #[test]
    fn unknown_preset_falls_back_to_custom() {
        let resolver = SettingsResolver::default();
        let selection = resolver.select("Watercolor");
        assert!(selection.preset.is_custom());
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Preset 'Watercolor' unknown; using Custom defaults.")
        );
        assert_eq!(
            triple(&resolver, "Watercolor", &SettingsOverrides::default()),
            (50, 7.5, String::new())
        );
    }

    #[test]
    fn overrides_win_per_field() -> anyhow::Result<()> {
        let resolver = SettingsResolver::default();

        let steps_only = SettingsOverrides {
            steps: Some(Steps::new(120)?),
            ..SettingsOverrides::default()
        };
        assert_eq!(
            triple(&resolver, "Photorealistic", &steps_only),
            (120, 8.5, "blurry, low quality, distorted, deformed".to_string())
        );

        let guidance_and_negative = SettingsOverrides {
            guidance_scale: Some(GuidanceScale::new(3.0)?),
            negative_prompt: Some(String::new()),
            ..SettingsOverrides::default()
        };
        assert_eq!(
            triple(&resolver, "Anime Style", &guidance_and_negative),
            (40, 3.0, String::new())
        );

        let all = SettingsOverrides {
            steps: Some(Steps::new(10)?),
            guidance_scale: Some(GuidanceScale::new(20.0)?),
            negative_prompt: Some("text".to_string()),
        };
        assert!(!all.is_empty());
        assert_eq!(
            triple(&resolver, "Oil Painting", &all),
            (10, 20.0, "text".to_string())
        );
        Ok(())
    }

    #[test]
    fn model_and_size_come_only_from_selection() -> anyhow::Result<()> {
        let resolver = SettingsResolver::default();
        let selection = UserSelection {
            model: ModelKind::FineTuned,
            width: Dimension::new(1024)?,
            height: Dimension::new(576)?,
        };
        let settings = resolver.resolve(
            "Pencil Sketch",
            &SettingsOverrides::default(),
            &selection,
            "a lighthouse",
        );
        assert_eq!(settings.model, ModelKind::FineTuned);
        assert_eq!(settings.width.get(), 1024);
        assert_eq!(settings.height.get(), 576);
        assert_eq!(settings.prompt, "a lighthouse");
        Ok(())
    }
}
