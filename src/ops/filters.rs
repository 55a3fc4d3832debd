// ============================================================================
// FILTER PRESETS - named one-tap looks over the six-axis adjustment space
// ============================================================================

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::ops::adjustments::{self, AdjustmentSettings};

/// The closed set of named looks. Each maps to one fixed parameter
/// combination over the same six axes the sliders expose, so a preset render
/// and a slider render go through the identical pixel pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPreset {
    Exposed,
    Alien,
    Faded,
    Grayscale,
    Sepia,
    Vintage,
}

impl FilterPreset {
    pub fn all() -> &'static [FilterPreset] {
        &[
            FilterPreset::Exposed,
            FilterPreset::Alien,
            FilterPreset::Faded,
            FilterPreset::Grayscale,
            FilterPreset::Sepia,
            FilterPreset::Vintage,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterPreset::Exposed => "exposed",
            FilterPreset::Alien => "alien",
            FilterPreset::Faded => "faded",
            FilterPreset::Grayscale => "grayscale",
            FilterPreset::Sepia => "sepia",
            FilterPreset::Vintage => "vintage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FilterPreset::all()
            .iter()
            .copied()
            .find(|preset| preset.label() == name.to_ascii_lowercase())
    }

    /// The fixed parameter combination this preset stands for.
    pub fn settings(&self) -> AdjustmentSettings {
        let neutral = AdjustmentSettings::default();
        match self {
            FilterPreset::Exposed => AdjustmentSettings {
                brightness: 135.0,
                contrast: 110.0,
                ..neutral
            },
            FilterPreset::Alien => AdjustmentSettings {
                hue_rotate: 180.0,
                saturation: 130.0,
                ..neutral
            },
            FilterPreset::Faded => AdjustmentSettings {
                brightness: 110.0,
                contrast: 85.0,
                saturation: 60.0,
                ..neutral
            },
            FilterPreset::Grayscale => AdjustmentSettings {
                grayscale: 100.0,
                ..neutral
            },
            FilterPreset::Sepia => AdjustmentSettings {
                sepia: 100.0,
                ..neutral
            },
            FilterPreset::Vintage => AdjustmentSettings {
                brightness: 105.0,
                contrast: 90.0,
                saturation: 80.0,
                sepia: 50.0,
                ..neutral
            },
        }
    }
}

/// Render a preset onto a bitmap.
pub fn apply(preset: FilterPreset, src: &RgbaImage) -> RgbaImage {
    adjustments::apply(&preset.settings(), src)
}
