use serde::{Deserialize, Serialize};

use crate::model::lenient::{f64_lenient, i64_lenient, opt_f64_lenient, string_lenient};

/// Stable layer identifier. Immutable for the lifetime of a document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Discriminant of [`Layer`], used where the variant payload is not needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Text,
    Logo,
    Image,
}

impl LayerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Logo => "logo",
            Self::Image => "image",
        }
    }

    pub(crate) fn id_prefix(self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every layer variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerBase {
    pub id: LayerId,
    pub name: String,
    /// Paint order, ascending. Not necessarily contiguous.
    #[serde(deserialize_with = "i64_lenient")]
    pub z_index: i64,
    pub is_visible: bool,
    #[serde(deserialize_with = "f64_lenient")]
    pub opacity: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub x: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub y: f64,
    /// Degrees, clockwise, around the layer's own visual center.
    #[serde(deserialize_with = "f64_lenient")]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub enabled: bool,
    pub color: String,
    #[serde(deserialize_with = "f64_lenient")]
    pub offset_x: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub offset_y: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub blur_radius: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#000000".to_owned(),
            offset_x: 2.0,
            offset_y: 2.0,
            blur_radius: 4.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    Middle,
    #[default]
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Wrapped, aligned text block. `(x, y)` is an anchor whose meaning follows the alignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    pub content: String,
    pub font_family: String,
    #[serde(deserialize_with = "string_lenient")]
    pub font_weight: String,
    #[serde(deserialize_with = "f64_lenient")]
    pub font_size: f64,
    pub text_color: String,
    #[serde(deserialize_with = "f64_lenient")]
    pub letter_spacing: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub line_height_multiplier: f64,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
    /// Fixed wrap width; derived from the canvas when absent.
    #[serde(
        default,
        deserialize_with = "opt_f64_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub width: Option<f64>,
    pub text_shadow: Shadow,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl TextLayer {
    /// Numeric font weight, `400` when the stored value is not a number.
    pub fn weight_value(&self) -> f32 {
        match self.font_weight.trim() {
            "normal" => 400.0,
            "bold" => 700.0,
            w => w.parse::<f32>().unwrap_or(400.0),
        }
    }
}

/// The document's single protected logo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    pub src: Option<String>,
    /// Render width; height follows the image's native aspect ratio.
    #[serde(deserialize_with = "f64_lenient")]
    pub size: f64,
    pub corner_position: CornerPosition,
    pub is_freely_positioned: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    pub src: String,
    #[serde(deserialize_with = "f64_lenient")]
    pub width: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub height: f64,
    /// width / height, kept when only one dimension changes.
    #[serde(deserialize_with = "f64_lenient")]
    pub original_aspect_ratio: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub border_radius: f64,
    pub shadow: Shadow,
}

/// A canvas layer. Serialized with a `"type"` discriminator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    Text(TextLayer),
    Logo(LogoLayer),
    Image(ImageLayer),
}

impl Layer {
    pub fn base(&self) -> &LayerBase {
        match self {
            Self::Text(l) => &l.base,
            Self::Logo(l) => &l.base,
            Self::Image(l) => &l.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut LayerBase {
        match self {
            Self::Text(l) => &mut l.base,
            Self::Logo(l) => &mut l.base,
            Self::Image(l) => &mut l.base,
        }
    }

    pub fn id(&self) -> &LayerId {
        &self.base().id
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Text(_) => LayerKind::Text,
            Self::Logo(_) => LayerKind::Logo,
            Self::Image(_) => LayerKind::Image,
        }
    }

    pub fn z_index(&self) -> i64 {
        self.base().z_index
    }

    pub fn is_visible(&self) -> bool {
        self.base().is_visible
    }

    /// Image reference painted by this layer, if any.
    pub fn image_src(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Logo(l) => l.src.as_deref().filter(|s| !s.is_empty()),
            Self::Image(l) => Some(l.src.as_str()).filter(|s| !s.is_empty()),
        }
    }

    /// Text shadow or image shadow; logos carry none.
    pub fn shadow(&self) -> Option<&Shadow> {
        match self {
            Self::Text(l) => Some(&l.text_shadow),
            Self::Image(l) => Some(&l.shadow),
            Self::Logo(_) => None,
        }
    }

    pub fn shadow_mut(&mut self) -> Option<&mut Shadow> {
        match self {
            Self::Text(l) => Some(&mut l.text_shadow),
            Self::Image(l) => Some(&mut l.shadow),
            Self::Logo(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/layer.rs"]
mod tests;
