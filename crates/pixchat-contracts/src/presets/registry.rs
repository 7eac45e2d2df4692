use indexmap::IndexMap;

use crate::settings::{GuidanceScale, Steps};

pub const CUSTOM_PRESET: &str = "Custom";

/// Named defaults for the three preset-controlled fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub steps: Steps,
    pub guidance_scale: GuidanceScale,
    pub negative_prompt: String,
}

impl Preset {
    pub fn custom() -> Self {
        Self {
            name: CUSTOM_PRESET.to_string(),
            steps: Steps::known(50),
            guidance_scale: GuidanceScale::known(7.5),
            negative_prompt: String::new(),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.name == CUSTOM_PRESET
    }
}

#[derive(Debug, Clone)]
pub struct PresetRegistry {
    presets: IndexMap<String, Preset>,
}

impl PresetRegistry {
    pub fn new(presets: Option<IndexMap<String, Preset>>) -> Self {
        Self {
            presets: presets.unwrap_or_else(default_presets),
        }
    }

    /// Lookup ignoring case, spaces, dashes and underscores, so
    /// `anime_style` finds "Anime Style".
    pub fn get(&self, name: &str) -> Option<&Preset> {
        if let Some(preset) = self.presets.get(name) {
            return Some(preset);
        }
        let wanted = lookup_key(name);
        if wanted.is_empty() {
            return None;
        }
        self.presets
            .values()
            .find(|preset| lookup_key(&preset.name) == wanted)
    }

    pub fn list(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

fn lookup_key(name: &str) -> String {
    name.chars()
        .filter(|ch| !matches!(ch, ' ' | '-' | '_'))
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

fn default_presets() -> IndexMap<String, Preset> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, steps: u32, guidance_scale: f64, negative_prompt: &str| {
        map.insert(
            name.to_string(),
            Preset {
                name: name.to_string(),
                steps: Steps::known(steps),
                guidance_scale: GuidanceScale::known(guidance_scale),
                negative_prompt: negative_prompt.to_string(),
            },
        );
    };

    insert(CUSTOM_PRESET, 50, 7.5, "");
    insert(
        "Photorealistic",
        70,
        8.5,
        "blurry, low quality, distorted, deformed",
    );
    insert("Anime Style", 40, 9.0, "realistic, photograph, 3d render");
    insert("Oil Painting", 60, 7.0, "digital art, photograph, sketch");
    insert(
        "Pencil Sketch",
        30,
        6.0,
        "color, painting, realistic, photograph",
    );

    map
}
