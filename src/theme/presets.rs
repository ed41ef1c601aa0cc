//! Built-in design systems.
//!
//! Each preset is a palette plus a fixed set of named styles derived from it:
//! - variants: default, primary, secondary, tertiary, accent, success,
//!   warning, error, info, muted, surface, ghost, outline
//! - text: title, headline, body, caption
//!
//! Palettes:
//! - light (default)
//! - dracula
//! - nord
//! - monokai
//! - gruvbox
//! - tokyoNight

use crate::types::{Color, FontTraits};
use super::resolver::DesignSystemProvider;
use super::style::{Border, EdgeInsets, Font, ResolvedStyle, StyleProp};

/// Minimum WCAG contrast for text on a filled variant.
const MIN_CONTRAST: f64 = 4.5;

/// Colors a preset derives its styles from.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub tertiary: Color,
    pub accent: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_muted: Color,
    pub background: Color,
    pub surface: Color,
    pub border: Color,
    pub border_focus: Color,
}

/// A [`DesignSystemProvider`] backed by a [`Palette`].
#[derive(Debug, Clone, PartialEq)]
pub struct PresetDesignSystem {
    pub name: String,
    pub palette: Palette,
}

impl PresetDesignSystem {
    pub fn new(name: impl Into<String>, palette: Palette) -> Self {
        Self {
            name: name.into(),
            palette,
        }
    }

    /// Style names this preset answers to.
    pub fn style_names() -> &'static [&'static str] {
        &[
            "default", "primary", "secondary", "tertiary", "accent", "success", "warning",
            "error", "info", "muted", "surface", "ghost", "outline", "title", "headline",
            "body", "caption",
        ]
    }

    fn filled(&self, fill: Color) -> ResolvedStyle {
        ResolvedStyle {
            background_color: fill.into(),
            text_color: contrast_text(self.palette.text, fill).into(),
            border: Border {
                width: 1.0,
                color: fill,
            }
            .into(),
            corner_radius: 6.0.into(),
            padding: EdgeInsets::symmetric(8.0, 16.0).into(),
            ..Default::default()
        }
    }

    fn text(&self, size: f64, weight: u16, color: Color) -> ResolvedStyle {
        ResolvedStyle {
            text_color: color.into(),
            font: Font {
                size: size.into(),
                weight: weight.into(),
                traits: if weight >= 600 {
                    StyleProp::Value(FontTraits::BOLD)
                } else {
                    StyleProp::Unset
                },
                ..Default::default()
            }
            .into(),
            ..Default::default()
        }
    }
}

impl DesignSystemProvider for PresetDesignSystem {
    fn resolve_style(&self, name: &str) -> Option<ResolvedStyle> {
        let p = &self.palette;
        let style = match name {
            "default" => ResolvedStyle {
                background_color: p.background.into(),
                text_color: p.text.into(),
                ..Default::default()
            },
            "primary" => self.filled(p.primary),
            "secondary" => self.filled(p.secondary),
            "tertiary" => self.filled(p.tertiary),
            "accent" => self.filled(p.accent),
            "success" => self.filled(p.success),
            "warning" => self.filled(p.warning),
            "error" => self.filled(p.error),
            "info" => self.filled(p.info),
            "muted" => ResolvedStyle {
                background_color: p.surface.into(),
                text_color: p.text_muted.into(),
                ..Default::default()
            },
            "surface" => ResolvedStyle {
                background_color: p.surface.into(),
                text_color: p.text.into(),
                border: Border {
                    width: 1.0,
                    color: p.border,
                }
                .into(),
                corner_radius: 8.0.into(),
                padding: EdgeInsets::all(16.0).into(),
                ..Default::default()
            },
            "ghost" => ResolvedStyle {
                background_color: Color::TRANSPARENT.into(),
                text_color: p.text.into(),
                border: StyleProp::Cleared,
                ..Default::default()
            },
            "outline" => ResolvedStyle {
                background_color: Color::TRANSPARENT.into(),
                text_color: p.primary.into(),
                border: Border {
                    width: 1.0,
                    color: p.primary,
                }
                .into(),
                corner_radius: 6.0.into(),
                ..Default::default()
            },
            "title" => self.text(28.0, 700, p.text),
            "headline" => self.text(20.0, 600, p.text),
            "body" => self.text(16.0, 400, p.text),
            "caption" => self.text(12.0, 400, p.text_muted),
            _ => return None,
        };
        Some(style)
    }
}

/// `preferred` if it reads well on `background`, otherwise black or white.
fn contrast_text(preferred: Color, background: Color) -> Color {
    if preferred.contrast_ratio(background) >= MIN_CONTRAST {
        preferred
    } else {
        background.readable_text()
    }
}

// =============================================================================
// Palettes
// =============================================================================

/// Neutral light palette. The default.
pub fn light() -> PresetDesignSystem {
    PresetDesignSystem::new(
        "light",
        Palette {
            primary: Color::from_rgb_int(0x0066cc),
            secondary: Color::from_rgb_int(0x7b3fc4),
            tertiary: Color::from_rgb_int(0x00838f),
            accent: Color::from_rgb_int(0xffb000),
            success: Color::from_rgb_int(0x2e7d32),
            warning: Color::from_rgb_int(0xed6c02),
            error: Color::from_rgb_int(0xd32f2f),
            info: Color::from_rgb_int(0x0277bd),
            text: Color::from_rgb_int(0x1f1f1f),
            text_muted: Color::from_rgb_int(0x6e6e6e),
            background: Color::WHITE,
            surface: Color::from_rgb_int(0xf4f4f5),
            border: Color::from_rgb_int(0xd4d4d8),
            border_focus: Color::from_rgb_int(0x0066cc),
        },
    )
}

/// Dracula - dark theme with vivid colors.
pub fn dracula() -> PresetDesignSystem {
    PresetDesignSystem::new(
        "dracula",
        Palette {
            primary: Color::from_rgb_int(0xbd93f9),   // purple
            secondary: Color::from_rgb_int(0xff79c6), // pink
            tertiary: Color::from_rgb_int(0x8be9fd),  // cyan
            accent: Color::from_rgb_int(0xf1fa8c),    // yellow
            success: Color::from_rgb_int(0x50fa7b),
            warning: Color::from_rgb_int(0xffb86c),
            error: Color::from_rgb_int(0xff5555),
            info: Color::from_rgb_int(0x8be9fd),
            text: Color::from_rgb_int(0xf8f8f2),
            text_muted: Color::from_rgb_int(0x6272a4),
            background: Color::from_rgb_int(0x282a36),
            surface: Color::from_rgb_int(0x44475a),
            border: Color::from_rgb_int(0x6272a4),
            border_focus: Color::from_rgb_int(0xbd93f9),
        },
    )
}

/// Nord - arctic, bluish colors.
pub fn nord() -> PresetDesignSystem {
    PresetDesignSystem::new(
        "nord",
        Palette {
            primary: Color::from_rgb_int(0x88c0d0),   // frost cyan
            secondary: Color::from_rgb_int(0x81a1c1), // frost blue
            tertiary: Color::from_rgb_int(0x5e81ac),  // frost dark blue
            accent: Color::from_rgb_int(0xd08770),    // aurora orange
            success: Color::from_rgb_int(0xa3be8c),
            warning: Color::from_rgb_int(0xebcb8b),
            error: Color::from_rgb_int(0xbf616a),
            info: Color::from_rgb_int(0x88c0d0),
            text: Color::from_rgb_int(0xeceff4),
            text_muted: Color::from_rgb_int(0x7b88a1),
            background: Color::from_rgb_int(0x2e3440),
            surface: Color::from_rgb_int(0x3b4252),
            border: Color::from_rgb_int(0x4c566a),
            border_focus: Color::from_rgb_int(0x88c0d0),
        },
    )
}

pub fn monokai() -> PresetDesignSystem {
    PresetDesignSystem::new(
        "monokai",
        Palette {
            primary: Color::from_rgb_int(0x66d9ef),
            secondary: Color::from_rgb_int(0xae81ff),
            tertiary: Color::from_rgb_int(0xa6e22e),
            accent: Color::from_rgb_int(0xe6db74),
            success: Color::from_rgb_int(0xa6e22e),
            warning: Color::from_rgb_int(0xfd971f),
            error: Color::from_rgb_int(0xf92672),
            info: Color::from_rgb_int(0x66d9ef),
            text: Color::from_rgb_int(0xf8f8f2),
            text_muted: Color::from_rgb_int(0x75715e),
            background: Color::from_rgb_int(0x272822),
            surface: Color::from_rgb_int(0x3e3d32),
            border: Color::from_rgb_int(0x75715e),
            border_focus: Color::from_rgb_int(0x66d9ef),
        },
    )
}

/// Gruvbox - retro groove, warm colors.
pub fn gruvbox() -> PresetDesignSystem {
    PresetDesignSystem::new(
        "gruvbox",
        Palette {
            primary: Color::from_rgb_int(0x83a598),
            secondary: Color::from_rgb_int(0xd3869b),
            tertiary: Color::from_rgb_int(0x8ec07c),
            accent: Color::from_rgb_int(0xfabd2f),
            success: Color::from_rgb_int(0xb8bb26),
            warning: Color::from_rgb_int(0xfe8019),
            error: Color::from_rgb_int(0xfb4934),
            info: Color::from_rgb_int(0x83a598),
            text: Color::from_rgb_int(0xebdbb2),
            text_muted: Color::from_rgb_int(0xa89984),
            background: Color::from_rgb_int(0x282828),
            surface: Color::from_rgb_int(0x3c3836),
            border: Color::from_rgb_int(0x665c54),
            border_focus: Color::from_rgb_int(0x83a598),
        },
    )
}

pub fn tokyo_night() -> PresetDesignSystem {
    PresetDesignSystem::new(
        "tokyoNight",
        Palette {
            primary: Color::from_rgb_int(0x7aa2f7),
            secondary: Color::from_rgb_int(0xbb9af7),
            tertiary: Color::from_rgb_int(0x7dcfff),
            accent: Color::from_rgb_int(0xe0af68),
            success: Color::from_rgb_int(0x9ece6a),
            warning: Color::from_rgb_int(0xff9e64),
            error: Color::from_rgb_int(0xf7768e),
            info: Color::from_rgb_int(0x7dcfff),
            text: Color::from_rgb_int(0xc0caf5),
            text_muted: Color::from_rgb_int(0x565f89),
            background: Color::from_rgb_int(0x1a1b26),
            surface: Color::from_rgb_int(0x24283b),
            border: Color::from_rgb_int(0x414868),
            border_focus: Color::from_rgb_int(0x7aa2f7),
        },
    )
}

/// Get a preset by name. Case-insensitive; accepts camelCase or snake_case.
pub fn get_preset(name: &str) -> Option<PresetDesignSystem> {
    match name.to_lowercase().replace('_', "").as_str() {
        "light" => Some(light()),
        "dracula" => Some(dracula()),
        "nord" => Some(nord()),
        "monokai" => Some(monokai()),
        "gruvbox" => Some(gruvbox()),
        "tokyonight" => Some(tokyo_night()),
        _ => None,
    }
}

pub fn preset_names() -> &'static [&'static str] {
    &["light", "dracula", "nord", "monokai", "gruvbox", "tokyoNight"]
}
