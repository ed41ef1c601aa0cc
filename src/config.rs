//! Engine configuration.
//!
//! ```ignore
//! let config = EngineConfig::from_json(r#"{ "matchRule": "exact" }"#)?;
//! let updater = ViewTreeUpdater::with_config(config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a written path is matched against recorded read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathMatchRule {
    /// Equal paths, or one is an ancestor of the other at a segment boundary.
    ///
    /// Writing `items[2].name` affects readers of `items`, `items[2]` and
    /// `items[2].name.first`, but never readers of `items2` or `item`.
    #[default]
    Hierarchical,
    /// Only identical canonical paths match.
    Exact,
}

/// When store notifications turn into pending updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationMode {
    /// Every mutation is processed as it happens.
    #[default]
    Immediate,
    /// Mutations only accumulate; the caller drains them with `process_dirty_paths`.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub match_rule: PathMatchRule,
    pub notification_mode: NotificationMode,
    /// Marker for style ids delegated to the design system.
    pub design_system_prefix: char,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_rule: PathMatchRule::Hierarchical,
            notification_mode: NotificationMode::Immediate,
            design_system_prefix: '@',
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
