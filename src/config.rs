//! Engine configuration.
//!
//! [`FlowConfig`] can be built in code or deserialized from JSON; every
//! field has a default so partial documents are accepted.

use crate::error::ConfigError;
use crate::types::{NodeOrigin, Viewport};
use serde::{Deserialize, Serialize};

/// How handles may be paired when drafting a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Only source-to-target pairs are accepted.
    #[default]
    Strict,
    /// Any two distinct handles may be connected.
    Loose,
}

/// How the marquee decides a node is inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// The node rectangle must lie completely inside the marquee.
    #[default]
    Full,
    /// Any overlap selects the node.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub node_origin: NodeOrigin,
    pub connection_mode: ConnectionMode,
    /// Snap distance for connection drafting, in graph units.
    pub connection_radius: f32,
    pub selection_mode: SelectionMode,
    /// Start a marquee on plain background drags, without a modifier.
    pub selection_on_drag: bool,
    /// Pointer travel (screen px) below which a background press is a click.
    pub pane_click_distance: f32,
    pub elevate_nodes_on_select: bool,
    pub elevate_edges_on_select: bool,
    pub snap_to_grid: bool,
    pub snap_grid: [f32; 2],
    pub default_viewport: Viewport,
    pub nodes_draggable: bool,
    pub nodes_connectable: bool,
    pub elements_selectable: bool,
    /// Turn finished connections into edges automatically.
    pub add_edge_on_connect: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 2.0,
            node_origin: [0.0, 0.0],
            connection_mode: ConnectionMode::Strict,
            connection_radius: 20.0,
            selection_mode: SelectionMode::Full,
            selection_on_drag: false,
            pane_click_distance: 1.0,
            elevate_nodes_on_select: true,
            elevate_edges_on_select: false,
            snap_to_grid: false,
            snap_grid: [15.0, 15.0],
            default_viewport: Viewport::default(),
            nodes_draggable: true,
            nodes_connectable: true,
            elements_selectable: true,
            add_edge_on_connect: true,
        }
    }
}

impl FlowConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_zoom <= 0.0 {
            return Err(ConfigError::NonPositiveMinZoom(self.min_zoom));
        }
        if self.max_zoom < self.min_zoom {
            return Err(ConfigError::ZoomRangeInverted {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        let [gx, gy] = self.snap_grid;
        if gx <= 0.0 || gy <= 0.0 {
            return Err(ConfigError::InvalidSnapGrid(gx, gy));
        }
        if self.connection_radius < 0.0 {
            return Err(ConfigError::NegativeConnectionRadius(self.connection_radius));
        }
        Ok(())
    }

    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FlowConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            FlowConfig::from_json_str(r#"{ "maxZoom": 4, "connectionMode": "loose" }"#).unwrap();
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.min_zoom, 0.5);
        assert_eq!(config.connection_mode, ConnectionMode::Loose);
        assert_eq!(config.selection_mode, SelectionMode::Full);
    }

    #[test]
    fn test_inverted_zoom_range_rejected() {
        let err = FlowConfig::from_json_str(r#"{ "minZoom": 3, "maxZoom": 1 }"#).unwrap_err();
        assert_eq!(err, ConfigError::ZoomRangeInverted { min: 3.0, max: 1.0 });
    }

    #[test]
    fn test_bad_snap_grid_rejected() {
        let config = FlowConfig {
            snap_grid: [0.0, 10.0],
            ..FlowConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSnapGrid(0.0, 10.0)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = FlowConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_clamp_zoom() {
        let config = FlowConfig::default();
        assert_eq!(config.clamp_zoom(10.0), 2.0);
        assert_eq!(config.clamp_zoom(0.1), 0.5);
        assert_eq!(config.clamp_zoom(1.3), 1.3);
    }
}
