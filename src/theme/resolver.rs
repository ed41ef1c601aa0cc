//! Style Resolver - Flattens style ids into [`ResolvedStyle`] values.
//!
//! Local styles form single-parent chains through `inherits`. Resolution
//! applies the chain from the farthest ancestor down, so each style
//! overrides what it inherits. Ids starting with the design-system prefix
//! (`@` by default) are looked up in a [`DesignSystemProvider`] instead.
//!
//! # Example
//!
//! ```ignore
//! let mut resolver = StyleResolver::from_json(r##"{
//!     "base":      { "cornerRadius": 8, "textColor": "#000" },
//!     "secondary": { "inherits": "base", "textColor": "#555" }
//! }"##)?;
//! resolver.set_provider(presets::dracula());
//!
//! let style = resolver.resolve("secondary");        // radius 8, text #555
//! let button = resolver.resolve("@primary");        // from the design system
//! ```
//!
//! Every id consulted is recorded as a tracked read under
//! [`style_dependency_key`], so nodes can be invalidated when a style changes.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::tracker;
use crate::error::ConfigError;
use super::style::ResolvedStyle;

/// Key under which style reads are tracked (`$style.<id>`).
pub fn style_dependency_key(id: &str) -> String {
    format!("$style.{id}")
}

/// A style as written in a document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    #[serde(flatten)]
    pub style: ResolvedStyle,
}

impl StyleDefinition {
    pub fn new(style: ResolvedStyle) -> Self {
        Self {
            inherits: None,
            style,
        }
    }

    pub fn inheriting(parent: &str, style: ResolvedStyle) -> Self {
        Self {
            inherits: Some(parent.to_string()),
            style,
        }
    }
}

/// External source of named styles.
pub trait DesignSystemProvider {
    /// Style for `name` (prefix already stripped), or `None` if unknown.
    fn resolve_style(&self, name: &str) -> Option<ResolvedStyle>;
}

impl<F> DesignSystemProvider for F
where
    F: Fn(&str) -> Option<ResolvedStyle>,
{
    fn resolve_style(&self, name: &str) -> Option<ResolvedStyle> {
        self(name)
    }
}

pub struct StyleResolver {
    styles: BTreeMap<String, StyleDefinition>,
    provider: Option<Rc<dyn DesignSystemProvider>>,
    prefix: char,
}

impl Default for StyleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleResolver {
    pub fn new() -> Self {
        Self {
            styles: BTreeMap::new(),
            provider: None,
            prefix: '@',
        }
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            prefix: config.design_system_prefix,
            ..Self::new()
        }
    }

    pub fn with_styles(styles: BTreeMap<String, StyleDefinition>) -> Self {
        Self {
            styles,
            ..Self::new()
        }
    }

    /// Parse a document style table: `{ "<id>": { "inherits": ..., ...fields } }`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(Self::with_styles(serde_json::from_str(json)?))
    }

    pub fn set_provider(&mut self, provider: impl DesignSystemProvider + 'static) {
        self.provider = Some(Rc::new(provider));
    }

    pub fn clear_provider(&mut self) {
        self.provider = None;
    }

    /// Add or replace a local style.
    ///
    /// Nodes that used it are not invalidated here; pass
    /// `style_dependency_key(id)` to the updater's `invalidate`.
    pub fn define_style(&mut self, id: impl Into<String>, definition: StyleDefinition) {
        self.styles.insert(id.into(), definition);
    }

    pub fn remove_style(&mut self, id: &str) -> Option<StyleDefinition> {
        self.styles.remove(id)
    }

    pub fn style(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.get(id)
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve `id` to a flattened style. Unknown ids resolve to an empty style.
    pub fn resolve(&self, id: &str) -> ResolvedStyle {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut base = ResolvedStyle::default();
        let mut current = Some(id);

        while let Some(style_id) = current {
            tracker::track_read(&style_dependency_key(style_id));

            if let Some(name) = style_id.strip_prefix(self.prefix) {
                base = self.resolve_design_system(name);
                break;
            }
            if !visited.insert(style_id) {
                tracing::warn!(style = id, at = style_id, "style inheritance cycle, chain truncated");
                break;
            }
            let Some(definition) = self.styles.get(style_id) else {
                if style_id != id {
                    tracing::debug!(style = id, missing = style_id, "inherited style not found");
                }
                break;
            };
            chain.push(definition);
            current = definition.inherits.as_deref();
        }

        chain
            .into_iter()
            .rev()
            .fold(base, |resolved, definition| resolved.merged(&definition.style))
    }

    /// Resolve `id`, then apply `inline` on top.
    pub fn resolve_with_inline(&self, id: &str, inline: &ResolvedStyle) -> ResolvedStyle {
        self.resolve(id).merged(inline)
    }

    /// Resolve several ids left to right, later ones winning, then apply `inline`.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        ids: &[S],
        inline: Option<&ResolvedStyle>,
    ) -> ResolvedStyle {
        let resolved = ids
            .iter()
            .fold(ResolvedStyle::default(), |acc, id| acc.merged(&self.resolve(id.as_ref())));
        match inline {
            Some(inline) => resolved.merged(inline),
            None => resolved,
        }
    }

    fn resolve_design_system(&self, name: &str) -> ResolvedStyle {
        self.provider
            .as_ref()
            .and_then(|provider| provider.resolve_style(name))
            .unwrap_or_default()
    }
}

impl fmt::Debug for StyleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleResolver")
            .field("styles", &self.styles.keys().collect::<Vec<_>>())
            .field("provider", &self.provider.is_some())
            .field("prefix", &self.prefix)
            .finish()
    }
}
