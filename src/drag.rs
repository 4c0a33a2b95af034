//! Node dragging driven by externally supplied pointer deltas.
//!
//! The host owns the gesture mechanics; this module turns "drag started on
//! node X", "pointer moved by (dx, dy) since the press" and "released"
//! into `Position` changes applied through the store.

use crate::changes::NodeChange;
use crate::geometry::{clamp_position, snap_position};
use crate::gesture::PointerCapture;
use crate::store::GraphStore;
use crate::types::{Dimensions, NodeExtent, NodeOrigin, XYPosition};
use std::collections::HashSet;

struct DraggedNode {
    id: String,
    /// Absolute top-left at drag start
    start: XYPosition,
    current: XYPosition,
    /// Absolute top-left of the parent, or the graph origin
    parent_offset: XYPosition,
    dimensions: Dimensions,
    origin: NodeOrigin,
    /// Allowed area for the node's top-left corner, graph space
    extent: Option<[[f32; 2]; 2]>,
}

impl DraggedNode {
    /// The node's `position` field for an absolute top-left corner.
    fn user_position(&self, absolute: XYPosition) -> XYPosition {
        XYPosition::new(
            absolute.x - self.parent_offset.x + self.dimensions.width * self.origin[0],
            absolute.y - self.parent_offset.y + self.dimensions.height * self.origin[1],
        )
    }
}

struct ActiveDrag {
    nodes: Vec<DraggedNode>,
    _capture: PointerCapture,
}

/// Node drag state machine: `Idle -> Dragging -> Idle`.
#[derive(Default)]
pub struct NodeDrag {
    drag: Option<ActiveDrag>,
}

impl NodeDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Ids of the nodes moved by the running drag.
    pub fn dragged_ids(&self) -> Vec<String> {
        self.drag
            .as_ref()
            .map(|d| d.nodes.iter().map(|n| n.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Start dragging `node_id`. A selected node drags the whole selection;
    /// an unselected one is selected first (when selectable) and dragged
    /// alone. Returns `false` when the node is unknown or not draggable.
    pub fn start(&mut self, store: &mut GraphStore, node_id: &str, capture: PointerCapture) -> bool {
        let Some(node) = store.get_node(node_id) else {
            return false;
        };
        if !store.is_node_draggable(node) {
            return false;
        }
        let grabbed_selected = node.selected;
        let selectable = store.is_node_selectable(node);

        self.cancel(store);
        if !grabbed_selected && selectable {
            store.select_node(node_id, false);
        }

        let ids: HashSet<String> = if grabbed_selected {
            store.selected_node_ids()
        } else {
            HashSet::from([node_id.to_string()])
        };
        let nodes: Vec<DraggedNode> = store
            .nodes()
            .iter()
            .filter(|n| ids.contains(&n.id) && store.is_node_draggable(n))
            // A child follows its dragged ancestor on its own
            .filter(|n| !has_dragged_ancestor(store, &n.id, &ids))
            .filter_map(|n| dragged_node(store, &n.id))
            .collect();

        if nodes.is_empty() {
            return false;
        }
        let changes = nodes
            .iter()
            .map(|n| NodeChange::Position {
                id: n.id.clone(),
                position: None,
                dragging: Some(true),
            })
            .collect();
        tracing::debug!(node = node_id, count = nodes.len(), "node drag started");
        self.drag = Some(ActiveDrag {
            nodes,
            _capture: capture,
        });
        store.apply_node_changes(changes);
        true
    }

    /// Move the dragged nodes by `delta`, the screen-space pointer offset
    /// since the drag started. Returns `false` when nothing is dragging or
    /// no node actually moved.
    pub fn update(&mut self, store: &mut GraphStore, delta: XYPosition) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let zoom = store.viewport().zoom;
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        let config = store.config();
        let snap = config.snap_to_grid.then_some(config.snap_grid);

        let mut changes = Vec::new();
        for node in &mut drag.nodes {
            let mut next = node.start.offset(delta.x / zoom, delta.y / zoom);
            if let Some(grid) = snap {
                next = snap_position(next, grid);
            }
            if let Some(extent) = node.extent {
                next = clamp_position(next, extent, node.dimensions);
            }
            if next != node.current {
                node.current = next;
                changes.push(NodeChange::position(
                    node.id.clone(),
                    node.user_position(next),
                    Some(true),
                ));
            }
        }
        let moved = !changes.is_empty();
        store.apply_node_changes(changes);
        moved
    }

    /// Finish the drag and clear the `dragging` flags. Returns the ids of
    /// the nodes that were dragged.
    pub fn end(&mut self, store: &mut GraphStore) -> Vec<String> {
        let Some(drag) = self.drag.take() else {
            return Vec::new();
        };
        let changes = drag
            .nodes
            .iter()
            .map(|n| NodeChange::Position {
                id: n.id.clone(),
                position: None,
                dragging: Some(false),
            })
            .collect();
        store.apply_node_changes(changes);
        tracing::debug!(count = drag.nodes.len(), "node drag ended");
        drag.nodes.into_iter().map(|n| n.id).collect()
    }

    /// Abort the drag and put every node back where it started.
    pub fn cancel(&mut self, store: &mut GraphStore) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        let changes = drag
            .nodes
            .iter()
            .map(|n| NodeChange::position(n.id.clone(), n.user_position(n.start), Some(false)))
            .collect();
        store.apply_node_changes(changes);
        tracing::debug!("node drag cancelled");
    }
}

fn has_dragged_ancestor(store: &GraphStore, node_id: &str, dragged: &HashSet<String>) -> bool {
    let mut seen = HashSet::new();
    let mut current = store.get_node(node_id).and_then(|n| n.parent_id.clone());
    while let Some(parent_id) = current {
        if !seen.insert(parent_id.clone()) {
            return false;
        }
        if dragged.contains(&parent_id) {
            return true;
        }
        current = store.get_node(&parent_id).and_then(|n| n.parent_id.clone());
    }
    false
}

fn dragged_node(store: &GraphStore, id: &str) -> Option<DraggedNode> {
    let internal = store.get_internal_node(id)?;
    let node = &internal.node;
    let parent = node
        .parent_id
        .as_deref()
        .and_then(|p| store.get_internal_node(p));
    let parent_offset = parent.map_or(XYPosition::default(), |p| p.position_absolute);
    let extent = match node.extent {
        Some(NodeExtent::Coordinate(extent)) => Some(extent),
        Some(NodeExtent::Parent) => parent.map(|p| {
            let r = p.rect();
            [[r.x, r.y], [r.right(), r.bottom()]]
        }),
        None => None,
    };
    Some(DraggedNode {
        id: id.to_string(),
        start: internal.position_absolute,
        current: internal.position_absolute,
        parent_offset,
        dimensions: internal.measured,
        origin: node.origin.unwrap_or(store.config().node_origin),
        extent,
    })
}
