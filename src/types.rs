//! Plain data types shared by every part of the engine.
//!
//! Nodes and edges are owned by the [`GraphStore`](crate::store::GraphStore);
//! [`InternalNode`] is derived from them and never authored by hand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point in either graph or screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct XYPosition {
    pub x: f32,
    pub y: f32,
}

impl XYPosition {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance_to(self, other: XYPosition) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f32, f32)> for XYPosition {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle (top-left corner plus size).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> XYPosition {
        XYPosition::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn contains_point(&self, p: XYPosition) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Pan offset (screen pixels) and zoom scalar of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub const fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }
}

/// Which end of a connection a handle represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    Source,
    Target,
}

impl HandleType {
    pub fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

/// Side of the node a handle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    Right,
    Bottom,
    Left,
}

impl Position {
    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }
}

/// A connection anchor, in coordinates local to its node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handle {
    /// `None` is the node's single default handle of this type.
    pub id: Option<String>,
    pub node_id: String,
    #[serde(rename = "type")]
    pub handle_type: HandleType,
    pub position: Position,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Handle {
    /// Graph-space point where edges attach, given the owning node's
    /// absolute position: the middle of the side the handle faces.
    pub fn anchor(&self, node_position_absolute: XYPosition) -> XYPosition {
        let x = node_position_absolute.x + self.x;
        let y = node_position_absolute.y + self.y;
        match self.position {
            Position::Top => XYPosition::new(x + self.width / 2.0, y),
            Position::Right => XYPosition::new(x + self.width, y + self.height / 2.0),
            Position::Bottom => XYPosition::new(x + self.width / 2.0, y + self.height),
            Position::Left => XYPosition::new(x, y + self.height / 2.0),
        }
    }

    /// Whether this handle is addressed by `id` (`None` matches the default handle).
    pub fn matches_id(&self, id: Option<&str>) -> bool {
        match id {
            Some(id) => self.id.as_deref() == Some(id),
            None => true,
        }
    }
}

/// Handles reported for one node, split by type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandleBounds {
    pub source: Vec<Handle>,
    pub target: Vec<Handle>,
}

impl HandleBounds {
    pub fn of_type(&self, handle_type: HandleType) -> &[Handle] {
        match handle_type {
            HandleType::Source => &self.source,
            HandleType::Target => &self.target,
        }
    }

    /// Find a handle by type and id. A `None` id resolves to the first
    /// handle of that type.
    pub fn find(&self, handle_type: HandleType, id: Option<&str>) -> Option<&Handle> {
        self.of_type(handle_type).iter().find(|h| h.matches_id(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handle> {
        self.source.iter().chain(self.target.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty()
    }
}

/// Fraction of the node size that `position` refers to. `[0, 0]` is the
/// top-left corner, `[0.5, 0.5]` the centre.
pub type NodeOrigin = [f32; 2];

/// Area a node may be dragged within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeExtent {
    /// Stay inside the parent node's rectangle.
    Parent,
    /// `[[min_x, min_y], [max_x, max_y]]` in graph space.
    Coordinate([[f32; 2]; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub position: XYPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Dimensions>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub dragging: bool,
    #[serde(default)]
    pub resizing: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<NodeOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<NodeExtent>,
    #[serde(default)]
    pub data: Value,
}

impl Node {
    pub fn new(id: impl Into<String>, position: impl Into<XYPosition>) -> Self {
        Self {
            id: id.into(),
            position: position.into(),
            parent_id: None,
            node_type: None,
            width: None,
            height: None,
            initial_width: None,
            initial_height: None,
            measured: None,
            selected: false,
            dragging: false,
            resizing: false,
            hidden: false,
            z_index: None,
            draggable: None,
            selectable: None,
            connectable: None,
            origin: None,
            extent: None,
            data: Value::Null,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set a measured size, as if the renderer had already reported it.
    pub fn with_measured(mut self, width: f32, height: f32) -> Self {
        self.measured = Some(Dimensions::new(width, height));
        self
    }

    /// Declare a fixed width/height on the node itself.
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }

    pub fn with_origin(mut self, origin: NodeOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_extent(mut self, extent: NodeExtent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = Some(selectable);
        self
    }

    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = Some(draggable);
        self
    }

    pub fn connectable(mut self, connectable: bool) -> Self {
        self.connectable = Some(connectable);
        self
    }

    /// Size used for geometry: measured size first, then the declared
    /// width/height, then the initial size, then zero.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(
            self.measured
                .map(|m| m.width)
                .or(self.width)
                .or(self.initial_width)
                .unwrap_or(0.0),
            self.measured
                .map(|m| m.height)
                .or(self.height)
                .or(self.initial_height)
                .unwrap_or(0.0),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default)]
    pub data: Value,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            edge_type: None,
            selected: false,
            hidden: false,
            selectable: None,
            z_index: None,
            data: Value::Null,
        }
    }

    pub fn with_handles(mut self, source_handle: Option<&str>, target_handle: Option<&str>) -> Self {
        self.source_handle = source_handle.map(str::to_string);
        self.target_handle = target_handle.map(str::to_string);
        self
    }

    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    pub fn with_z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = Some(selectable);
        self
    }

    /// Whether this edge joins the same handle pair as `connection`.
    pub fn same_endpoints(&self, connection: &Connection) -> bool {
        self.source == connection.source
            && self.target == connection.target
            && self.source_handle == connection.source_handle
            && self.target_handle == connection.target_handle
    }
}

/// A finished connection between a source handle and a target handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub source_handle: Option<String>,
    pub target: String,
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(
        source: impl Into<String>,
        source_handle: Option<&str>,
        target: impl Into<String>,
        target_handle: Option<&str>,
    ) -> Self {
        Self {
            source: source.into(),
            source_handle: source_handle.map(str::to_string),
            target: target.into(),
            target_handle: target_handle.map(str::to_string),
        }
    }
}

/// Geometry derived from a [`Node`], its ancestors and the renderer's
/// measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalNode {
    /// Copy of the user node this entry was derived from.
    pub node: Node,
    /// Top-left corner in graph space, origin offset already applied.
    pub position_absolute: XYPosition,
    pub measured: Dimensions,
    /// Render order; larger draws on top.
    pub z: i32,
    pub handle_bounds: Option<HandleBounds>,
}

impl InternalNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn rect(&self) -> Rect {
        Rect::new(
            self.position_absolute.x,
            self.position_absolute.y,
            self.measured.width,
            self.measured.height,
        )
    }

    pub fn is_measured(&self) -> bool {
        self.measured.is_positive()
    }

    /// Graph-space anchor of a handle on this node, or `None` if the node
    /// exposes no matching handle.
    pub fn handle_anchor(&self, handle_type: HandleType, id: Option<&str>) -> Option<XYPosition> {
        self.handle_bounds
            .as_ref()?
            .find(handle_type, id)
            .map(|h| h.anchor(self.position_absolute))
    }
}
