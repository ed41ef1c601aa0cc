//! Resolved style values.
//!
//! Every field is a [`StyleProp`], so a style can say "not specified"
//! ([`Unset`](StyleProp::Unset)) separately from "explicitly removed"
//! ([`Cleared`](StyleProp::Cleared)). In JSON a missing key is unset and
//! `null` clears:
//!
//! ```json
//! { "backgroundColor": "#282a36", "border": null }
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{Color, FontTraits};

// =============================================================================
// StyleProp
// =============================================================================

/// A style field that may be unset, cleared, or set.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StyleProp<T> {
    #[default]
    Unset,
    Cleared,
    Value(T),
}

impl<T> StyleProp<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The value, if set. Cleared and unset both read as `None`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Clone> StyleProp<T> {
    /// Take `over` unless it is unset.
    pub fn merge(&mut self, over: &Self) {
        if !over.is_unset() {
            *self = over.clone();
        }
    }
}

impl<T> From<T> for StyleProp<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Serialize> Serialize for StyleProp<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for StyleProp<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Self::Value(value),
            None => Self::Cleared,
        })
    }
}

// =============================================================================
// Compound values
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub width: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub color: Color,
    pub radius: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
}

/// Per-edge spacing. Deserializes from a number (all edges) or an object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EdgeInsets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl EdgeInsets {
    pub const fn all(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub const fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}

impl<'de> Deserialize<'de> for EdgeInsets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            All(f64),
            Edges {
                #[serde(default)]
                top: f64,
                #[serde(default)]
                right: f64,
                #[serde(default)]
                bottom: f64,
                #[serde(default)]
                left: f64,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::All(value) => Self::all(value),
            Raw::Edges {
                top,
                right,
                bottom,
                left,
            } => Self {
                top,
                right,
                bottom,
                left,
            },
        })
    }
}

/// Font description. Fields merge individually.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Font {
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub family: StyleProp<String>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub size: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub weight: StyleProp<u16>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub traits: StyleProp<FontTraits>,
}

impl Font {
    pub fn merge(&mut self, over: &Self) {
        self.family.merge(&over.family);
        self.size.merge(&over.size);
        self.weight.merge(&over.weight);
        self.traits.merge(&over.traits);
    }
}

// =============================================================================
// ResolvedStyle
// =============================================================================

/// A flattened style, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolvedStyle {
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub background_color: StyleProp<Color>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub text_color: StyleProp<Color>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub corner_radius: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub border: StyleProp<Border>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub shadow: StyleProp<Shadow>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub font: StyleProp<Font>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub padding: StyleProp<EdgeInsets>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub opacity: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub width: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub height: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub min_width: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub min_height: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub max_width: StyleProp<f64>,
    #[serde(skip_serializing_if = "StyleProp::is_unset")]
    pub max_height: StyleProp<f64>,
}

impl ResolvedStyle {
    /// True if no field is set or cleared.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply `over` on top of `self`; its set and cleared fields win.
    pub fn merge(&mut self, over: &Self) {
        self.background_color.merge(&over.background_color);
        self.text_color.merge(&over.text_color);
        self.corner_radius.merge(&over.corner_radius);
        self.border.merge(&over.border);
        self.shadow.merge(&over.shadow);
        match (&mut self.font, &over.font) {
            (StyleProp::Value(base), StyleProp::Value(font)) => base.merge(font),
            (base, font) => base.merge(font),
        }
        self.padding.merge(&over.padding);
        self.opacity.merge(&over.opacity);
        self.width.merge(&over.width);
        self.height.merge(&over.height);
        self.min_width.merge(&over.min_width);
        self.min_height.merge(&over.min_height);
        self.max_width.merge(&over.max_width);
        self.max_height.merge(&over.max_height);
    }

    /// `self` with `over` applied.
    pub fn merged(mut self, over: &Self) -> Self {
        self.merge(over);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_null_and_value() {
        let style: ResolvedStyle = serde_json::from_str(
            r##"{"backgroundColor": "#000", "border": null, "padding": 4}"##,
        )
        .unwrap();
        assert_eq!(style.background_color, StyleProp::Value(Color::BLACK));
        assert_eq!(style.border, StyleProp::Cleared);
        assert_eq!(style.padding, StyleProp::Value(EdgeInsets::all(4.0)));
        assert!(style.text_color.is_unset());
    }

    #[test]
    fn test_merge_precedence() {
        let mut base = ResolvedStyle {
            corner_radius: 8.0.into(),
            text_color: Color::BLACK.into(),
            border: Border {
                width: 1.0,
                color: Color::BLACK,
            }
            .into(),
            ..Default::default()
        };
        let over = ResolvedStyle {
            text_color: Color::WHITE.into(),
            border: StyleProp::Cleared,
            ..Default::default()
        };
        base.merge(&over);
        assert_eq!(base.corner_radius, StyleProp::Value(8.0));
        assert_eq!(base.text_color, StyleProp::Value(Color::WHITE));
        assert_eq!(base.border, StyleProp::Cleared);
    }

    #[test]
    fn test_font_merges_per_field() {
        let base: ResolvedStyle =
            serde_json::from_str(r#"{"font": {"family": "Inter", "size": 14}}"#).unwrap();
        let over: ResolvedStyle =
            serde_json::from_str(r#"{"font": {"size": 18, "traits": ["bold"]}}"#).unwrap();
        let font = base.merged(&over).font;
        let font = font.value().unwrap();
        assert_eq!(font.family, StyleProp::Value("Inter".to_string()));
        assert_eq!(font.size, StyleProp::Value(18.0));
        assert_eq!(font.traits, StyleProp::Value(FontTraits::BOLD));
    }

    #[test]
    fn test_serialize_skips_unset() {
        let style = ResolvedStyle {
            opacity: 0.5.into(),
            shadow: StyleProp::Cleared,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&style).unwrap(),
            r#"{"shadow":null,"opacity":0.5}"#
        );
        assert!(ResolvedStyle::default().is_empty());
    }
}
