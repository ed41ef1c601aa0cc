//! Style resolution against a document style table and a preset design system.

use scals_core::theme::{get_preset, StyleDefinition};
use scals_core::{Color, ResolvedStyle, StyleProp, StyleResolver};

const STYLES: &str = r##"{
    "base":      { "cornerRadius": 8, "textColor": "#111111", "padding": { "top": 4, "bottom": 4 } },
    "secondary": { "inherits": "base", "textColor": "#777777" },
    "danger":    { "inherits": "@error", "cornerRadius": 0 },
    "a":         { "inherits": "b", "width": 1 },
    "b":         { "inherits": "c", "height": 2 },
    "c":         { "inherits": "a", "opacity": 0.5 }
}"##;

fn resolver() -> StyleResolver {
    let mut resolver = StyleResolver::from_json(STYLES).unwrap();
    resolver.set_provider(get_preset("dracula").unwrap());
    resolver
}

#[test]
fn test_secondary_inherits_base() {
    let style = resolver().resolve("secondary");
    assert_eq!(style.corner_radius, StyleProp::Value(8.0));
    assert_eq!(style.text_color, StyleProp::Value(Color::from_rgb_int(0x777777)));
    assert_eq!(style.padding.value().map(|p| p.top), Some(4.0));
}

#[test]
fn test_three_level_cycle_terminates() {
    let style = resolver().resolve("a");
    assert_eq!(style.width, StyleProp::Value(1.0));
    assert_eq!(style.height, StyleProp::Value(2.0));
    assert_eq!(style.opacity, StyleProp::Value(0.5));

    // Entering the cycle elsewhere gives the same fields
    let from_c = resolver().resolve("c");
    assert_eq!(from_c.width, style.width);
}

#[test]
fn test_local_style_on_top_of_design_system() {
    let style = resolver().resolve("danger");
    assert_eq!(style.background_color, StyleProp::Value(Color::from_rgb_int(0xff5555)));
    assert_eq!(style.corner_radius, StyleProp::Value(0.0));
}

#[test]
fn test_missing_provider_yields_empty_style() {
    let resolver = StyleResolver::from_json(STYLES).unwrap();
    assert!(resolver.resolve("@primary").is_empty());
    assert_eq!(resolver.resolve("danger").corner_radius, StyleProp::Value(0.0));
}

#[test]
fn test_inline_beats_local_and_design_system() {
    let inline: ResolvedStyle =
        serde_json::from_str(r##"{"backgroundColor": "#000000", "textColor": null}"##).unwrap();

    let style = resolver().resolve_all(&["@primary", "secondary"], Some(&inline));
    assert_eq!(style.background_color, StyleProp::Value(Color::BLACK));
    assert_eq!(style.text_color, StyleProp::Cleared);
    assert_eq!(style.corner_radius, StyleProp::Value(8.0));
}

#[test]
fn test_define_style_replaces_definition() {
    let mut resolver = resolver();
    resolver.define_style(
        "base",
        StyleDefinition::new(ResolvedStyle {
            corner_radius: 12.0.into(),
            ..Default::default()
        }),
    );
    let style = resolver.resolve("secondary");
    assert_eq!(style.corner_radius, StyleProp::Value(12.0));
    assert!(style.padding.is_unset());
}
