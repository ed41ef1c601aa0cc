//! Style system.
//!
//! - [`ResolvedStyle`] - flattened style with tri-state fields
//! - [`StyleResolver`] - `inherits` chains, design-system delegation, inline overrides
//! - Presets - built-in [`DesignSystemProvider`] palettes (light, dracula, nord, ...)
//!
//! # Example
//!
//! ```ignore
//! use scals_core::theme::{get_preset, StyleResolver};
//!
//! let mut resolver = StyleResolver::new();
//! resolver.set_provider(get_preset("nord").unwrap());
//! let card = resolver.resolve("@surface");
//! ```

pub mod presets;
mod resolver;
mod style;

pub use presets::{get_preset, preset_names, Palette, PresetDesignSystem};
pub use resolver::{style_dependency_key, DesignSystemProvider, StyleDefinition, StyleResolver};
pub use style::{Border, EdgeInsets, Font, ResolvedStyle, Shadow, StyleProp};
