//! Per-tool highlighting level lookup.
//!
//! Recording code never reads configuration directly. It is handed a
//! [`LevelLookup`] capability and asks it which [`HighlightLevel`] applies
//! to the tool doing the recording. [`LevelRegistry`] is the standard
//! table-backed implementation.

use std::collections::HashMap;

use crate::models::HighlightLevel;

/// Resolves the highlighting level for a tool name.
pub trait LevelLookup {
    fn level_for(&self, tool: &str) -> HighlightLevel;
}

/// Table of explicit per-tool levels with a fallback for unknown tools.
#[derive(Debug, Clone, Default)]
pub struct LevelRegistry {
    default_level: HighlightLevel,
    levels: HashMap<String, HighlightLevel>,
}

impl LevelRegistry {
    pub fn new(default_level: HighlightLevel) -> Self {
        Self {
            default_level,
            levels: HashMap::new(),
        }
    }

    /// Set the level for `tool`, replacing any previous entry.
    pub fn set(&mut self, tool: impl Into<String>, level: HighlightLevel) {
        self.levels.insert(tool.into(), level);
    }

    /// Builder-style [`set`](LevelRegistry::set).
    pub fn with(mut self, tool: impl Into<String>, level: HighlightLevel) -> Self {
        self.set(tool, level);
        self
    }

    pub fn default_level(&self) -> HighlightLevel {
        self.default_level
    }

    pub fn is_registered(&self, tool: &str) -> bool {
        self.levels.contains_key(tool)
    }
}

impl LevelLookup for LevelRegistry {
    fn level_for(&self, tool: &str) -> HighlightLevel {
        self.levels
            .get(tool)
            .copied()
            .unwrap_or(self.default_level)
    }
}

impl<F> LevelLookup for F
where
    F: Fn(&str) -> HighlightLevel,
{
    fn level_for(&self, tool: &str) -> HighlightLevel {
        self(tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_tool_uses_default() {
        let registry = LevelRegistry::new(HighlightLevel::RenderOnly);
        assert_eq!(registry.level_for("NMEA"), HighlightLevel::RenderOnly);
        assert!(!registry.is_registered("NMEA"));
    }

    #[test]
    fn test_registered_tool_overrides_default() {
        let registry = LevelRegistry::new(HighlightLevel::RenderOnly)
            .with("AIS", HighlightLevel::Disabled)
            .with("REP", HighlightLevel::PersistAndRender);
        assert_eq!(registry.level_for("AIS"), HighlightLevel::Disabled);
        assert_eq!(registry.level_for("REP"), HighlightLevel::PersistAndRender);
        assert_eq!(registry.level_for("GPX"), HighlightLevel::RenderOnly);
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |tool: &str| {
            if tool == "quiet" {
                HighlightLevel::Disabled
            } else {
                HighlightLevel::PersistAndRender
            }
        };
        assert_eq!(lookup.level_for("quiet"), HighlightLevel::Disabled);
        assert_eq!(lookup.level_for("loud"), HighlightLevel::PersistAndRender);
    }
}
