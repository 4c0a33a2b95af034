//! The graph store: single owner of nodes, edges and the viewport.
//!
//! Every write goes through a `GraphStore` method, which applies the
//! change, rebuilds the derived lookups from the new inputs and queues a
//! [`StoreEvent`]. Hosts (usually the [`FlowController`](crate::controller::FlowController))
//! drain the events with [`GraphStore::take_events`] once the borrow on
//! the store has been released.

use crate::changes::{self, EdgeChange, NodeChange};
use crate::config::FlowConfig;
use crate::connection::{connection_to_edge, ConnectionState, ConnectionValidator};
use crate::error::{ErrorCode, ErrorReporter, FlowError};
use crate::geometry::{
    get_bounds_of_rects, point_to_renderer_point, rect_intersects, renderer_point_to_point,
};
use crate::internals::{AdoptOptions, GeometryCache, SELECTED_NODE_Z};
use crate::registry::{builtin_edge_types, EdgePath, EdgePathBuilder, EdgePathParams, EdgeTypeRegistry, NodeKind, TypeRegistry};
use crate::selection::{SelectionManager, SelectionPreview, UserSelectionRect};
use crate::types::{
    Connection, Dimensions, Edge, HandleBounds, HandleType, InternalNode, Node, Position, Rect,
    Viewport, XYPosition,
};
use crate::viewport::{
    fit_view_viewport, get_viewport_for_bounds, is_fit_target, viewport_centered_on,
    zoom_around, FitViewOptions, Padding, TransitionCallback, ViewportTransition, ZOOM_STEP,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

/// Something observable happened to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    NodesChanged(Vec<NodeChange>),
    EdgesChanged(Vec<EdgeChange>),
    /// The node list was replaced wholesale.
    NodesReset,
    /// The edge list was replaced wholesale.
    EdgesReset,
    ViewportChanged(Viewport),
    /// The renderer reported new handle geometry for a node.
    HandlesChanged(String),
    SelectionChanged {
        nodes: Vec<String>,
        edges: Vec<String>,
    },
    Connected(Connection),
}

/// Target of an intersection query.
#[derive(Debug, Clone, PartialEq)]
pub enum IntersectionTarget {
    Node(String),
    Rect(Rect),
}

/// Elements removed by [`GraphStore::delete_elements`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeletedElements {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Plain snapshot of the authored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub viewport: Viewport,
}

impl FlowSnapshot {
    pub fn to_json(&self) -> Result<String, FlowError> {
        serde_json::to_string(self).map_err(|e| FlowError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        serde_json::from_str(json).map_err(|e| FlowError::Snapshot(e.to_string()))
    }
}

/// Everything a renderer needs to draw one edge. Positions in graph space.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    pub id: String,
    pub source: XYPosition,
    pub source_position: Position,
    pub target: XYPosition,
    pub target_position: Position,
    pub path: EdgePath,
    pub z: i32,
}

pub struct GraphStore {
    config: FlowConfig,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    viewport: Viewport,
    pane: Dimensions,
    internals: GeometryCache,
    /// Edge id -> index into `edges`
    edge_lookup: HashMap<String, usize>,
    /// Node id -> ids of the edges attached to it
    connection_lookup: HashMap<String, Vec<String>>,
    node_kinds: TypeRegistry<NodeKind>,
    edge_types: EdgeTypeRegistry,
    reported_edge_types: HashSet<String>,
    validator: Option<Rc<dyn ConnectionValidator>>,
    reporter: ErrorReporter,
    transition: Option<ViewportTransition>,
    finished_transitions: Vec<(TransitionCallback, bool)>,
    pending_fit_view: Option<FitViewOptions>,
    last_selection: (Vec<String>, Vec<String>),
    /// Set while a combined node and edge selection write is in flight
    selection_deferred: bool,
    events: Vec<StoreEvent>,

    // Gesture state written by the selection and connection engines
    pub(crate) user_selection_active: bool,
    pub(crate) user_selection_rect: Option<UserSelectionRect>,
    pub(crate) selection_preview: Option<SelectionPreview>,
    pub(crate) nodes_selection_active: bool,
    pub(crate) connection: ConnectionState,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl GraphStore {
    pub fn new(config: FlowConfig) -> Self {
        let viewport = clamp_viewport(config.default_viewport, &config);
        Self {
            config,
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport,
            pane: Dimensions::default(),
            internals: GeometryCache::new(),
            edge_lookup: HashMap::new(),
            connection_lookup: HashMap::new(),
            node_kinds: NodeKind::builtin_registry(),
            edge_types: builtin_edge_types(),
            reported_edge_types: HashSet::new(),
            validator: None,
            reporter: ErrorReporter::default(),
            transition: None,
            finished_transitions: Vec::new(),
            pending_fit_view: None,
            last_selection: (Vec::new(), Vec::new()),
            selection_deferred: false,
            events: Vec::new(),
            user_selection_active: false,
            user_selection_rect: None,
            selection_preview: None,
            nodes_selection_active: false,
            connection: ConnectionState::NotConnecting,
        }
    }

    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Replace the configuration. Rejected configurations leave the store untouched.
    pub fn set_config(&mut self, config: FlowConfig) -> Result<(), FlowError> {
        config.validate()?;
        self.config = config;
        self.update_internals();
        let clamped = clamp_viewport(self.viewport, &self.config);
        if clamped != self.viewport {
            self.write_viewport(clamped);
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pane_size(&self) -> Dimensions {
        self.pane
    }

    pub fn internals(&self) -> &GeometryCache {
        &self.internals
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn set_reporter(&mut self, reporter: ErrorReporter) {
        self.reporter = reporter;
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn user_selection_active(&self) -> bool {
        self.user_selection_active
    }

    pub fn user_selection_rect(&self) -> Option<UserSelectionRect> {
        self.user_selection_rect
    }

    pub fn selection_preview(&self) -> Option<&SelectionPreview> {
        self.selection_preview.as_ref()
    }

    pub fn nodes_selection_active(&self) -> bool {
        self.nodes_selection_active
    }

    pub fn node_kinds(&self) -> &TypeRegistry<NodeKind> {
        &self.node_kinds
    }

    pub fn register_node_kind(&mut self, name: impl Into<String>, kind: NodeKind) {
        self.node_kinds.register(name, kind);
        self.update_internals();
    }

    pub fn edge_types(&self) -> &EdgeTypeRegistry {
        &self.edge_types
    }

    pub fn register_edge_type(&mut self, name: impl Into<String>, builder: Rc<dyn EdgePathBuilder>) {
        self.edge_types.register(name, builder);
    }

    pub fn connection_validator(&self) -> Option<&dyn ConnectionValidator> {
        self.validator.as_deref()
    }

    pub fn set_connection_validator(&mut self, validator: Option<Rc<dyn ConnectionValidator>>) {
        self.validator = validator;
    }

    /// Drain the events queued since the last call.
    pub fn take_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_node_selectable(&self, node: &Node) -> bool {
        node.selectable.unwrap_or(self.config.elements_selectable)
    }

    pub fn is_edge_selectable(&self, edge: &Edge) -> bool {
        edge.selectable.unwrap_or(self.config.elements_selectable)
    }

    pub fn is_node_draggable(&self, node: &Node) -> bool {
        node.draggable.unwrap_or(self.config.nodes_draggable)
    }

    pub fn is_node_connectable(&self, node: &Node) -> bool {
        node.connectable.unwrap_or(self.config.nodes_connectable)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.internals.retain_nodes(&ids);
        self.update_internals();
        self.events.push(StoreEvent::NodesReset);
        self.after_node_mutation();
    }

    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges;
        self.rebuild_edge_lookups();
        self.events.push(StoreEvent::EdgesReset);
        self.emit_selection_if_changed();
    }

    pub fn add_nodes(&mut self, nodes: Vec<Node>) {
        let changes = nodes
            .into_iter()
            .map(|item| NodeChange::Add { item, index: None })
            .collect();
        self.apply_node_changes(changes);
    }

    pub fn add_edges(&mut self, edges: Vec<Edge>) {
        let changes = edges
            .into_iter()
            .map(|item| EdgeChange::Add { item, index: None })
            .collect();
        self.apply_edge_changes(changes);
    }

    /// The serialization point for node writes: drag adapters, programmatic
    /// updates and selection all end up here.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        if changes.is_empty() {
            return;
        }
        self.nodes = changes::apply_node_changes(&changes, &self.nodes);
        if changes.iter().any(|c| matches!(c, NodeChange::Remove { .. })) {
            let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
            self.internals.retain_nodes(&ids);
        }
        self.update_internals();
        self.events.push(StoreEvent::NodesChanged(changes));
        self.after_node_mutation();
    }

    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        if changes.is_empty() {
            return;
        }
        self.edges = changes::apply_edge_changes(&changes, &self.edges);
        self.rebuild_edge_lookups();
        self.events.push(StoreEvent::EdgesChanged(changes));
        self.emit_selection_if_changed();
    }

    /// Replace node `id` with the result of `update`.
    pub fn update_node<F>(&mut self, id: &str, update: F) -> Result<(), FlowError>
    where
        F: FnOnce(&mut Node),
    {
        let mut item = self
            .get_node(id)
            .cloned()
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;
        update(&mut item);
        self.apply_node_changes(vec![NodeChange::Replace {
            id: id.to_string(),
            item,
        }]);
        Ok(())
    }

    /// Shallow-merge `patch` into the node's data (objects merge key by key,
    /// anything else replaces the data).
    pub fn update_node_data(&mut self, id: &str, patch: Value) -> Result<(), FlowError> {
        self.update_node(id, |node| merge_data(&mut node.data, patch))
    }

    pub fn update_edge<F>(&mut self, id: &str, update: F) -> Result<(), FlowError>
    where
        F: FnOnce(&mut Edge),
    {
        let mut item = self
            .get_edge(id)
            .cloned()
            .ok_or_else(|| FlowError::EdgeNotFound(id.to_string()))?;
        update(&mut item);
        self.apply_edge_changes(vec![EdgeChange::Replace {
            id: id.to_string(),
            item,
        }]);
        Ok(())
    }

    pub fn update_edge_data(&mut self, id: &str, patch: Value) -> Result<(), FlowError> {
        self.update_edge(id, |edge| merge_data(&mut edge.data, patch))
    }

    /// Remove nodes (with their descendants) and edges, plus every edge
    /// attached to a removed node.
    pub fn delete_elements(&mut self, node_ids: &[&str], edge_ids: &[&str]) -> DeletedElements {
        let mut doomed_nodes: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = node_ids
            .iter()
            .filter(|id| self.internals.get(id).is_some())
            .map(|id| id.to_string())
            .collect();
        while let Some(id) = stack.pop() {
            if doomed_nodes.insert(id.clone()) {
                stack.extend(self.internals.children(&id).iter().cloned());
            }
        }

        let mut doomed_edges: HashSet<String> = edge_ids
            .iter()
            .filter(|id| self.edge_lookup.contains_key(**id))
            .map(|id| id.to_string())
            .collect();
        for id in &doomed_nodes {
            doomed_edges.extend(self.connected_edge_ids(id).iter().cloned());
        }

        let deleted = DeletedElements {
            nodes: self
                .nodes
                .iter()
                .filter(|n| doomed_nodes.contains(&n.id))
                .cloned()
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| doomed_edges.contains(&e.id))
                .cloned()
                .collect(),
        };

        self.apply_edge_changes(
            deleted
                .edges
                .iter()
                .map(|e| EdgeChange::Remove { id: e.id.clone() })
                .collect(),
        );
        self.apply_node_changes(
            deleted
                .nodes
                .iter()
                .map(|n| NodeChange::Remove { id: n.id.clone() })
                .collect(),
        );
        tracing::debug!(
            nodes = deleted.nodes.len(),
            edges = deleted.edges.len(),
            "deleted elements"
        );
        deleted
    }

    /// Record a finished connection; adds the edge when configured to.
    pub fn connect(&mut self, connection: Connection) {
        if self.config.add_edge_on_connect {
            if let Some(edge) = connection_to_edge(&connection, &self.edges) {
                self.add_edges(vec![edge]);
            }
        }
        self.events.push(StoreEvent::Connected(connection));
    }

    // ------------------------------------------------------------------------
    // Renderer reports
    // ------------------------------------------------------------------------

    /// Record renderer-measured sizes for a batch of nodes.
    pub fn update_node_dimensions(&mut self, updates: &[(&str, Dimensions)]) {
        let changes: Vec<NodeChange> = updates
            .iter()
            .filter(|(id, dims)| {
                self.get_node(id)
                    .is_some_and(|n| n.measured != Some(*dims))
            })
            .map(|(id, dims)| NodeChange::Dimensions {
                id: id.to_string(),
                dimensions: Some(*dims),
                resizing: None,
                set_attributes: false,
            })
            .collect();
        self.apply_node_changes(changes);
    }

    /// Record the measured size of a single node. Descendants are recomputed.
    pub fn update_measured_size(&mut self, id: &str, dimensions: Dimensions) {
        self.update_node_dimensions(&[(id, dimensions)]);
    }

    /// Record renderer-measured handle geometry; edges attached to the
    /// node are redrawn from it.
    pub fn update_handle_bounds(&mut self, node_id: &str, bounds: HandleBounds) {
        if self.get_node(node_id).is_none() {
            return;
        }
        self.internals.report_handle_bounds(node_id, bounds);
        self.events.push(StoreEvent::HandlesChanged(node_id.to_string()));
    }

    pub fn set_pane_size(&mut self, width: f32, height: f32) {
        self.pane = Dimensions::new(width, height);
        self.try_pending_fit_view();
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.internals.get(id).map(|n| &n.node)
    }

    pub fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.edge_lookup.get(id).map(|&i| &self.edges[i])
    }

    pub fn get_internal_node(&self, id: &str) -> Option<&InternalNode> {
        self.internals.get(id)
    }

    /// Absolute position computed from the node list alone. Fails on a
    /// cyclic parent chain instead of looping.
    pub fn get_node_absolute_position(&self, id: &str) -> Result<XYPosition, FlowError> {
        crate::internals::get_node_absolute_position(&self.nodes, id, self.config.node_origin)
    }

    /// Nodes intersecting `target`. Without `partially` a node must lie
    /// completely inside the target. A node target is never in its own result.
    pub fn get_intersecting_nodes(
        &self,
        target: &IntersectionTarget,
        partially: bool,
        candidates: Option<&[&str]>,
    ) -> Vec<&Node> {
        let (area, exclude) = match target {
            IntersectionTarget::Rect(rect) => (*rect, None),
            IntersectionTarget::Node(id) => match self.internals.get(id) {
                Some(n) => (n.rect(), Some(id.as_str())),
                None => return Vec::new(),
            },
        };
        self.nodes
            .iter()
            .filter(|n| Some(n.id.as_str()) != exclude)
            .filter(|n| candidates.map_or(true, |c| c.contains(&n.id.as_str())))
            .filter_map(|n| self.internals.get(&n.id))
            .filter(|n| rect_intersects(&n.rect(), &area, partially))
            .map(|n| &n.node)
            .collect()
    }

    pub fn is_intersecting(&self, node_id: &str, area: &Rect, partially: bool) -> bool {
        self.internals
            .get(node_id)
            .is_some_and(|n| rect_intersects(&n.rect(), area, partially))
    }

    /// Ids of the edges attached to `node_id`.
    pub fn connected_edge_ids(&self, node_id: &str) -> &[String] {
        self.connection_lookup
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_connected_edges(&self, node_ids: &[&str]) -> Vec<&Edge> {
        let ids: HashSet<&str> = node_ids.iter().copied().collect();
        self.edges
            .iter()
            .filter(|e| ids.contains(e.source.as_str()) || ids.contains(e.target.as_str()))
            .collect()
    }

    /// Nodes with an edge pointing at `node_id`.
    pub fn get_incomers(&self, node_id: &str) -> Vec<&Node> {
        let sources: HashSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.as_str())
            .collect();
        self.nodes.iter().filter(|n| sources.contains(n.id.as_str())).collect()
    }

    /// Nodes `node_id` has an edge pointing at.
    pub fn get_outgoers(&self, node_id: &str) -> Vec<&Node> {
        let targets: HashSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.source == node_id)
            .map(|e| e.target.as_str())
            .collect();
        self.nodes.iter().filter(|n| targets.contains(n.id.as_str())).collect()
    }

    /// Graph-space bounds of the given nodes (unknown ids are skipped).
    pub fn get_nodes_bounds(&self, node_ids: &[&str]) -> Option<Rect> {
        get_bounds_of_rects(
            node_ids
                .iter()
                .filter_map(|id| self.internals.get(id))
                .map(InternalNode::rect),
        )
    }

    /// Pane coordinates to graph space, snapped when snap-to-grid is on.
    pub fn screen_to_flow_position(&self, position: XYPosition) -> XYPosition {
        let snap = self.config.snap_to_grid.then_some(self.config.snap_grid);
        point_to_renderer_point(position, &self.viewport, snap)
    }

    pub fn flow_to_screen_position(&self, position: XYPosition) -> XYPosition {
        renderer_point_to_point(position, &self.viewport)
    }

    /// Render order of an edge. With edge elevation on, an edge that is
    /// selected or touches a selected node is lifted above its endpoints.
    pub fn edge_z_index(&self, edge: &Edge) -> i32 {
        let base = edge.z_index.unwrap_or(0);
        if !self.config.elevate_edges_on_select {
            return base;
        }
        let source = self.internals.get(&edge.source);
        let target = self.internals.get(&edge.target);
        let endpoint_selected = [source, target]
            .iter()
            .flatten()
            .any(|n| n.node.selected);
        if !(edge.selected || endpoint_selected) {
            return base;
        }
        let endpoints_z = [source, target].iter().flatten().map(|n| n.z).max().unwrap_or(0);
        base + endpoints_z.max(SELECTED_NODE_Z)
    }

    /// Anchors, path and z of an edge, or `None` when an endpoint node or
    /// handle cannot be resolved.
    pub fn edge_geometry(&self, edge_id: &str) -> Option<EdgeGeometry> {
        let edge = self.get_edge(edge_id)?;
        let source_node = self.internals.get(&edge.source)?;
        let target_node = self.internals.get(&edge.target)?;
        let source_handle = source_node
            .handle_bounds
            .as_ref()?
            .find(HandleType::Source, edge.source_handle.as_deref())?;
        let target_handle = target_node
            .handle_bounds
            .as_ref()?
            .find(HandleType::Target, edge.target_handle.as_deref())?;

        let params = EdgePathParams {
            source: source_handle.anchor(source_node.position_absolute),
            source_position: source_handle.position,
            target: target_handle.anchor(target_node.position_absolute),
            target_position: target_handle.position,
        };
        let builder = self.edge_types.resolve(edge.edge_type.as_deref()).value;
        Some(EdgeGeometry {
            id: edge.id.clone(),
            source: params.source,
            source_position: params.source_position,
            target: params.target,
            target_position: params.target_position,
            path: builder.build(&params),
            z: self.edge_z_index(edge),
        })
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn selected_node_ids(&self) -> HashSet<String> {
        self.nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn selected_edge_ids(&self) -> HashSet<String> {
        self.edges
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.id.clone())
            .collect()
    }

    /// Selection as currently shown: the marquee preview while one is
    /// running, the committed flag otherwise.
    pub fn is_node_visually_selected(&self, id: &str) -> bool {
        match &self.selection_preview {
            Some(preview) => preview.nodes.contains(id),
            None => self.get_node(id).is_some_and(|n| n.selected),
        }
    }

    pub fn is_edge_visually_selected(&self, id: &str) -> bool {
        match &self.selection_preview {
            Some(preview) => preview.edges.contains(id),
            None => self.get_edge(id).is_some_and(|e| e.selected),
        }
    }

    /// Make exactly these nodes and edges selected.
    pub fn set_selection(&mut self, node_ids: &HashSet<String>, edge_ids: &HashSet<String>) {
        let node_changes = changes::node_selection_changes(&self.nodes, node_ids);
        let edge_changes = changes::edge_selection_changes(&self.edges, edge_ids);
        self.selection_deferred = true;
        self.apply_node_changes(node_changes);
        self.apply_edge_changes(edge_changes);
        self.selection_deferred = false;
        self.emit_selection_if_changed();
    }

    /// Click on a node. Without the modifier, edges are deselected too.
    pub fn select_node(&mut self, id: &str, multi_select: bool) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        if !self.is_node_selectable(node) {
            return;
        }
        let mut selection = SelectionManager::from_ids(self.selected_node_ids());
        selection.handle_interaction(id, multi_select);
        let edges = if multi_select {
            self.selected_edge_ids()
        } else {
            HashSet::new()
        };
        self.set_selection(selection.ids(), &edges);
        self.nodes_selection_active = false;
    }

    /// Click on an edge. Without the modifier, nodes are deselected too.
    pub fn select_edge(&mut self, id: &str, multi_select: bool) {
        let Some(edge) = self.get_edge(id) else {
            return;
        };
        if !self.is_edge_selectable(edge) {
            return;
        }
        let mut selection = SelectionManager::from_ids(self.selected_edge_ids());
        selection.handle_interaction(id, multi_select);
        let nodes = if multi_select {
            self.selected_node_ids()
        } else {
            HashSet::new()
        };
        self.set_selection(&nodes, selection.ids());
    }

    /// Select the given nodes, replacing the node selection and clearing edges.
    pub fn add_selected_nodes(&mut self, ids: &[&str]) {
        let nodes: HashSet<String> = ids
            .iter()
            .filter(|id| self.get_node(id).is_some_and(|n| self.is_node_selectable(n)))
            .map(|id| id.to_string())
            .collect();
        self.set_selection(&nodes, &HashSet::new());
    }

    /// Select the given edges, replacing the edge selection and clearing nodes.
    pub fn add_selected_edges(&mut self, ids: &[&str]) {
        let edges: HashSet<String> = ids
            .iter()
            .filter(|id| self.get_edge(id).is_some_and(|e| self.is_edge_selectable(e)))
            .map(|id| id.to_string())
            .collect();
        self.set_selection(&HashSet::new(), &edges);
    }

    pub fn select_all(&mut self) {
        let nodes = self
            .nodes
            .iter()
            .filter(|n| !n.hidden && self.is_node_selectable(n))
            .map(|n| n.id.clone())
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| !e.hidden && self.is_edge_selectable(e))
            .map(|e| e.id.clone())
            .collect();
        self.set_selection(&nodes, &edges);
    }

    pub fn unselect_all(&mut self) {
        self.set_selection(&HashSet::new(), &HashSet::new());
        self.nodes_selection_active = false;
    }

    // ------------------------------------------------------------------------
    // Camera
    // ------------------------------------------------------------------------

    /// Jump to `viewport` (zoom clamped to the configured range).
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.transition_to(viewport, None);
    }

    /// Move to `viewport`, animated when `duration` is non-zero.
    pub fn transition_to(&mut self, viewport: Viewport, duration: Option<Duration>) {
        let target = clamp_viewport(viewport, &self.config);
        if let Some(interrupted) = self.transition.take() {
            self.finished_transitions
                .extend(interrupted.into_callbacks().into_iter().map(|cb| (cb, false)));
        }
        match duration.filter(|d| !d.is_zero()) {
            Some(duration) => {
                self.transition = Some(ViewportTransition::new(self.viewport, target, duration));
            }
            None => self.write_viewport(target),
        }
    }

    pub fn get_viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP);
    }

    /// Multiply the zoom by `factor` around the pane centre.
    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom_to(self.target_viewport().zoom * factor);
    }

    /// Set the zoom around the pane centre.
    pub fn zoom_to(&mut self, zoom: f32) {
        let center = XYPosition::new(self.pane.width / 2.0, self.pane.height / 2.0);
        let zoom = self.config.clamp_zoom(zoom);
        let viewport = zoom_around(&self.target_viewport(), center, zoom);
        self.set_viewport(viewport);
    }

    /// Centre the pane on the graph point (`x`, `y`). The zoom defaults to
    /// the maximum zoom.
    pub fn set_center(&mut self, x: f32, y: f32, zoom: Option<f32>) {
        let zoom = self.config.clamp_zoom(zoom.unwrap_or(self.config.max_zoom));
        let viewport = viewport_centered_on(XYPosition::new(x, y), zoom, self.pane);
        self.set_viewport(viewport);
    }

    pub fn reset_viewport(&mut self) {
        self.set_viewport(self.config.default_viewport);
    }

    /// Frame a graph-space rectangle. Fails before the pane has a size.
    pub fn fit_bounds(&mut self, bounds: &Rect, padding: &Padding) -> bool {
        if !self.pane.is_positive() {
            return false;
        }
        let viewport = get_viewport_for_bounds(
            bounds,
            self.pane.width,
            self.pane.height,
            self.config.min_zoom,
            self.config.max_zoom,
            padding,
        );
        self.set_viewport(viewport);
        true
    }

    /// Frame the measured, visible nodes (or `options.nodes`). Returns
    /// `false` without touching the viewport when there is nothing to fit
    /// or the pane has no size yet.
    pub fn fit_view(&mut self, options: &FitViewOptions) -> bool {
        let Some(viewport) = fit_view_viewport(
            self.internals.node_lookup.values(),
            self.pane,
            self.config.min_zoom,
            self.config.max_zoom,
            options,
        ) else {
            tracing::debug!("fit_view: no measured nodes or no pane size");
            return false;
        };
        self.transition_to(viewport, options.duration);
        true
    }

    /// Fit now if possible, otherwise as soon as the pane and every
    /// candidate node have been measured.
    pub fn fit_view_when_ready(&mut self, options: FitViewOptions) {
        self.pending_fit_view = Some(options);
        self.try_pending_fit_view();
    }

    /// Run `callback` when the current transition ends, or right after the
    /// current call when nothing is animating.
    pub fn when_viewport_settled(&mut self, callback: TransitionCallback) {
        match self.transition.as_mut() {
            Some(transition) => transition.on_complete(callback),
            None => self.finished_transitions.push((callback, true)),
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Step the running transition. Returns the new viewport, if any.
    pub fn advance_transitions(&mut self, dt: Duration) -> Option<Viewport> {
        let transition = self.transition.as_mut()?;
        let viewport = transition.advance(dt);
        let finished = transition.is_finished();
        self.write_viewport(viewport);
        if finished {
            if let Some(done) = self.transition.take() {
                self.finished_transitions
                    .extend(done.into_callbacks().into_iter().map(|cb| (cb, true)));
            }
        }
        Some(viewport)
    }

    /// Completion callbacks whose transition has ended. The caller runs them
    /// once it no longer borrows the store.
    pub fn take_transition_callbacks(&mut self) -> Vec<(TransitionCallback, bool)> {
        std::mem::take(&mut self.finished_transitions)
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    pub fn to_object(&self) -> FlowSnapshot {
        FlowSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            viewport: self.viewport,
        }
    }

    pub fn restore(&mut self, snapshot: FlowSnapshot) {
        self.set_nodes(snapshot.nodes);
        self.set_edges(snapshot.edges);
        self.set_viewport(snapshot.viewport);
    }

    // ------------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------------

    fn update_internals(&mut self) {
        self.internals.adopt_user_nodes(
            &self.nodes,
            AdoptOptions {
                node_origin: self.config.node_origin,
                elevate_nodes_on_select: self.config.elevate_nodes_on_select,
                node_kinds: &self.node_kinds,
                reporter: &self.reporter,
            },
        );
    }

    fn after_node_mutation(&mut self) {
        self.emit_selection_if_changed();
        self.try_pending_fit_view();
    }

    fn rebuild_edge_lookups(&mut self) {
        let mut edge_lookup = HashMap::with_capacity(self.edges.len());
        let mut connection_lookup: HashMap<String, Vec<String>> = HashMap::new();
        for (i, edge) in self.edges.iter().enumerate() {
            edge_lookup.entry(edge.id.clone()).or_insert(i);
            connection_lookup
                .entry(edge.source.clone())
                .or_default()
                .push(edge.id.clone());
            if edge.target != edge.source {
                connection_lookup
                    .entry(edge.target.clone())
                    .or_default()
                    .push(edge.id.clone());
            }

            for endpoint in [&edge.source, &edge.target] {
                if self.internals.get(endpoint).is_none() {
                    self.reporter.report(
                        ErrorCode::EdgeEndpointMissing,
                        format!("Couldn't create edge {}: node {endpoint} not found", edge.id),
                    );
                }
            }
            if let Some(edge_type) = edge.edge_type.as_ref() {
                if !self.edge_types.contains(edge_type)
                    && self.reported_edge_types.insert(edge_type.clone())
                {
                    self.reporter.report(
                        ErrorCode::EdgeTypeMissing,
                        format!("Edge type \"{edge_type}\" not found. Using fallback type \"default\"."),
                    );
                }
            }
        }
        self.edge_lookup = edge_lookup;
        self.connection_lookup = connection_lookup;
    }

    fn emit_selection_if_changed(&mut self) {
        if self.selection_deferred {
            return;
        }
        let mut nodes: Vec<String> = self.selected_node_ids().into_iter().collect();
        let mut edges: Vec<String> = self.selected_edge_ids().into_iter().collect();
        nodes.sort();
        edges.sort();
        if (&nodes, &edges) != (&self.last_selection.0, &self.last_selection.1) {
            self.last_selection = (nodes.clone(), edges.clone());
            self.events.push(StoreEvent::SelectionChanged { nodes, edges });
        }
    }

    fn try_pending_fit_view(&mut self) {
        let Some(options) = self.pending_fit_view.as_ref() else {
            return;
        };
        let all_measured = self
            .internals
            .node_lookup
            .values()
            .filter(|n| is_fit_target(n, options))
            .all(InternalNode::is_measured);
        if !all_measured || !self.pane.is_positive() {
            return;
        }
        if let Some(options) = self.pending_fit_view.take() {
            self.fit_view(&options);
        }
    }

    /// Target of the running transition, or the current viewport.
    fn target_viewport(&self) -> Viewport {
        self.transition
            .as_ref()
            .map_or(self.viewport, ViewportTransition::target)
    }

    fn write_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.events.push(StoreEvent::ViewportChanged(viewport));
        }
    }
}

fn clamp_viewport(viewport: Viewport, config: &FlowConfig) -> Viewport {
    Viewport::new(viewport.x, viewport.y, config.clamp_zoom(viewport.zoom))
}

fn merge_data(data: &mut Value, patch: Value) {
    match (data, patch) {
        (Value::Object(existing), Value::Object(patch)) => {
            for (key, value) in patch {
                existing.insert(key, value);
            }
        }
        (data, patch) => *data = patch,
    }
}
