//! Editor configuration.
//!
//! All fields have defaults, so a config file only needs the keys it changes:
//!
//! ```json
//! { "grid_spacing": 10, "layout": { "margin": 60 } }
//! ```

use anyhow::Context;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Module type name that marks a combined (composite) module.
pub const DEFAULT_COMBINED_MODULE_TYPE: &str = "ncnr.refl.combined_module";

/// Editor-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Module moves snap to multiples of this (0 disables snapping).
    pub grid_spacing: f64,
    /// Position given to modules whose document omits `x`.
    pub default_x: f64,
    /// Position given to modules whose document omits `y`.
    pub default_y: f64,
    /// Whether a module's output may be wired back to its own input.
    pub allow_self_wires: bool,
    pub combined_module_type: String,
    /// Size modules to their title text instead of the fixed minimum width.
    pub autosize_modules: bool,
    pub layout: LayoutConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_spacing: 5.0,
            default_x: 100.0,
            default_y: 100.0,
            allow_self_wires: true,
            combined_module_type: DEFAULT_COMBINED_MODULE_TYPE.to_string(),
            autosize_modules: false,
            layout: LayoutConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Load a config from a JSON file; missing keys keep their defaults.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse editor config {}", path))?;
        Ok(config)
    }

    /// Snap a coordinate to the grid.
    pub fn snap(&self, value: f64) -> f64 {
        if self.grid_spacing > 0.0 {
            (value / self.grid_spacing).round() * self.grid_spacing
        } else {
            value
        }
    }
}

/// Spacing used by the composite layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal gap between a module and the next one in a chain.
    pub margin: f64,
    /// Vertical distance between rows (and between a module's terminals).
    pub row_height: f64,
    /// Inner padding around a module's title.
    pub padding: f64,
    /// Minimum title width before padding.
    pub min_width: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 40.0,
            row_height: 30.0,
            padding: 5.0,
            min_width: 75.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_rounds_to_grid() {
        let config = EditorConfig::default();
        assert_eq!(config.snap(12.0), 10.0);
        assert_eq!(config.snap(13.0), 15.0);
        assert_eq!(config.snap(0.0), 0.0);
    }

    #[test]
    fn snap_disabled_with_zero_spacing() {
        let config = EditorConfig {
            grid_spacing: 0.0,
            ..Default::default()
        };
        assert_eq!(config.snap(12.3), 12.3);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"grid_spacing": 10, "layout": {"margin": 60}}"#).unwrap();
        assert_eq!(config.grid_spacing, 10.0);
        assert_eq!(config.layout.margin, 60.0);
        assert_eq!(config.layout.row_height, 30.0);
        assert!(config.allow_self_wires);
        assert_eq!(config.combined_module_type, DEFAULT_COMBINED_MODULE_TYPE);
    }
}
