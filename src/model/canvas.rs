use serde::{Deserialize, Serialize};

use crate::model::lenient::{f64_lenient, u32_lenient};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    #[default]
    Solid,
    Gradient,
    Image,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientType {
    #[default]
    Linear,
    Radial,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientState {
    #[serde(rename = "type")]
    pub kind: GradientType,
    pub color1: String,
    pub color2: String,
    /// Degrees; 0 points along +x.
    #[serde(deserialize_with = "f64_lenient")]
    pub angle: f64,
}

impl Default for GradientState {
    fn default() -> Self {
        Self {
            kind: GradientType::Linear,
            color1: "#E0E7FF".to_owned(),
            color2: "#FFD1E3".to_owned(),
            angle: 90.0,
        }
    }
}

/// Background image filters. Percentages use 100 as neutral; blur is in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFilters {
    #[serde(deserialize_with = "f64_lenient")]
    pub blur: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub brightness: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub contrast: f64,
}

impl ImageFilters {
    pub const NEUTRAL: ImageFilters = ImageFilters {
        blur: 0.0,
        brightness: 100.0,
        contrast: 100.0,
    };

    pub fn is_neutral(&self) -> bool {
        self.blur <= 0.0 && self.brightness == 100.0 && self.contrast == 100.0
    }
}

impl Default for ImageFilters {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayState {
    pub color: String,
    #[serde(deserialize_with = "f64_lenient")]
    pub opacity: f64,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            color: crate::model::defaults::BRAND_RED.to_owned(),
            opacity: 0.0,
        }
    }
}

/// Canvas-level state: everything that is not a layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    pub background_type: BackgroundType,
    pub bg_color: String,
    pub gradient: GradientState,
    pub bg_image: Option<String>,
    pub bg_image_filters: ImageFilters,
    pub overlay: OverlayState,
    #[serde(deserialize_with = "u32_lenient")]
    pub canvas_width: u32,
    #[serde(deserialize_with = "u32_lenient")]
    pub canvas_height: u32,
}

impl CanvasState {
    /// Background image reference when the background actually uses one.
    pub fn active_bg_image(&self) -> Option<&str> {
        match self.background_type {
            BackgroundType::Image => self.bg_image.as_deref().filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (f64::from(self.canvas_width), f64::from(self.canvas_height))
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        use crate::model::defaults::{CANVAS_BASE_HEIGHT, CANVAS_BASE_WIDTH};
        Self {
            background_type: BackgroundType::Solid,
            bg_color: "#F8F8F8".to_owned(),
            gradient: GradientState::default(),
            bg_image: None,
            bg_image_filters: ImageFilters::NEUTRAL,
            overlay: OverlayState::default(),
            canvas_width: CANVAS_BASE_WIDTH,
            canvas_height: CANVAS_BASE_HEIGHT,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

/// Export preferences stored alongside the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub export_format: ExportFormat,
    /// 0..=1
    #[serde(deserialize_with = "f64_lenient")]
    pub jpeg_quality: f64,
    pub include_transparency: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_format: ExportFormat::Png,
            jpeg_quality: 0.9,
            include_transparency: true,
        }
    }
}
