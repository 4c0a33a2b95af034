//! Edge drafting: dragging from a handle, snapping to the closest handle and
//! validating the resulting connection.
//!
//! # Example
//!
//! ```
//! use slint_flow::connection::{CompositeValidator, ConnectionValidator, NoSelfLoops, ValidationError};
//! use slint_flow::types::Connection;
//!
//! let validator = CompositeValidator::new().add(NoSelfLoops);
//! let result = validator.validate(&Connection::new("a", None, "a", None), &[]);
//! assert_eq!(result.error(), Some(&ValidationError::Custom("self loops are not allowed".into())));
//! ```

use crate::config::ConnectionMode;
use crate::error::ErrorCode;
use crate::geometry::{point_to_renderer_point, rect_intersects};
use crate::gesture::PointerCapture;
use crate::store::GraphStore;
use crate::types::{Connection, Edge, Handle, HandleType, Position, Rect, XYPosition};
use thiserror::Error;

/// Extra distance added to the connection radius for the coarse node filter.
pub const HANDLE_SEARCH_PADDING: f32 = 250.0;

/// Addresses one handle on one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleRef {
    pub node_id: String,
    pub handle_id: Option<String>,
    pub handle_type: HandleType,
}

impl HandleRef {
    pub fn new(node_id: impl Into<String>, handle_id: Option<&str>, handle_type: HandleType) -> Self {
        Self {
            node_id: node_id.into(),
            handle_id: handle_id.map(str::to_string),
            handle_type,
        }
    }

    pub fn source(node_id: impl Into<String>) -> Self {
        Self::new(node_id, None, HandleType::Source)
    }

    pub fn target(node_id: impl Into<String>) -> Self {
        Self::new(node_id, None, HandleType::Target)
    }
}

/// A connection being drafted. Positions are in graph space.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInProgress {
    pub from_node: String,
    pub from_handle: Handle,
    pub from: XYPosition,
    pub from_position: Position,
    pub to: XYPosition,
    pub to_position: Position,
    pub to_handle: Option<Handle>,
    pub to_node: Option<String>,
    /// `None` while no handle is in reach, otherwise the legality verdict.
    pub is_valid: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConnectionState {
    #[default]
    NotConnecting,
    InProgress(ConnectionInProgress),
}

impl ConnectionState {
    pub fn in_progress(&self) -> Option<&ConnectionInProgress> {
        match self {
            Self::InProgress(c) => Some(c),
            Self::NotConnecting => None,
        }
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::InProgress(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionOutcome {
    /// No drafting gesture was running.
    Inactive,
    Connected(Connection),
    Cancelled,
}

// ============================================================================
// Validation
// ============================================================================

/// Result of connection validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }
}

/// Reasons a connection is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Cannot connect a handle to itself")]
    SameHandle,
    #[error("Strict mode only connects a source handle to a target handle")]
    IncompatibleTypes,
    #[error("An edge between these handles already exists")]
    DuplicateEdge,
    #[error("Node {0} is not connectable")]
    NotConnectable(String),
    #[error("{0}")]
    Custom(String),
}

/// User-supplied connection rule, consulted after the built-in ones.
pub trait ConnectionValidator {
    fn validate(&self, connection: &Connection, edges: &[Edge]) -> ValidationResult;
}

impl<F> ConnectionValidator for F
where
    F: Fn(&Connection, &[Edge]) -> ValidationResult,
{
    fn validate(&self, connection: &Connection, edges: &[Edge]) -> ValidationResult {
        self(connection, edges)
    }
}

/// Refuses a second edge between the same handle pair
#[derive(Clone, Debug, Default)]
pub struct NoDuplicatesValidator;

impl ConnectionValidator for NoDuplicatesValidator {
    fn validate(&self, connection: &Connection, edges: &[Edge]) -> ValidationResult {
        if duplicate_edge_exists(connection, edges) {
            ValidationResult::Invalid(ValidationError::DuplicateEdge)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Refuses edges whose source and target are the same node
#[derive(Clone, Debug, Default)]
pub struct NoSelfLoops;

impl ConnectionValidator for NoSelfLoops {
    fn validate(&self, connection: &Connection, _edges: &[Edge]) -> ValidationResult {
        if connection.source == connection.target {
            ValidationResult::Invalid(ValidationError::Custom("self loops are not allowed".into()))
        } else {
            ValidationResult::Valid
        }
    }
}

/// All validators must pass; the first error short-circuits.
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn ConnectionValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validators run in the order they were added.
    pub fn add<V: ConnectionValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl ConnectionValidator for CompositeValidator {
    fn validate(&self, connection: &Connection, edges: &[Edge]) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(connection, edges);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

pub fn duplicate_edge_exists(connection: &Connection, edges: &[Edge]) -> bool {
    edges.iter().any(|edge| edge.same_endpoints(connection))
}

/// Orient a handle pair so `source` is the source-type side. In loose mode
/// two handles of the same type keep the drag direction.
pub fn normalize_connection(from: &Handle, to: &Handle) -> Connection {
    let (source, target) = if from.handle_type == HandleType::Target && to.handle_type == HandleType::Source {
        (to, from)
    } else {
        (from, to)
    };
    Connection::new(
        source.node_id.clone(),
        source.id.as_deref(),
        target.node_id.clone(),
        target.id.as_deref(),
    )
}

/// Legality of connecting `from` to `to` against the store's current
/// edges, connection mode and user validator.
pub fn validate_connection(store: &GraphStore, from: &Handle, to: &Handle) -> (Connection, ValidationResult) {
    let connection = normalize_connection(from, to);

    let same_handle = from.node_id == to.node_id && from.id == to.id && from.handle_type == to.handle_type;
    if same_handle {
        return (connection, ValidationResult::Invalid(ValidationError::SameHandle));
    }
    if store.config().connection_mode == ConnectionMode::Strict && from.handle_type == to.handle_type {
        return (connection, ValidationResult::Invalid(ValidationError::IncompatibleTypes));
    }
    if let Some(node) = store.get_node(&to.node_id) {
        if !store.is_node_connectable(node) {
            return (
                connection,
                ValidationResult::Invalid(ValidationError::NotConnectable(to.node_id.clone())),
            );
        }
    }

    let result = NoDuplicatesValidator.validate(&connection, store.edges());
    let result = match store.connection_validator() {
        Some(validator) if result.is_valid() => validator.validate(&connection, store.edges()),
        _ => result,
    };
    (connection, result)
}

/// Turn a connection into an edge with the generated id, unless an edge
/// with the same endpoints exists.
pub fn connection_to_edge(connection: &Connection, edges: &[Edge]) -> Option<Edge> {
    if connection.source.is_empty() || connection.target.is_empty() {
        tracing::warn!("cannot create an edge without both a source and a target");
        return None;
    }
    if duplicate_edge_exists(connection, edges) {
        return None;
    }
    let mut edge = Edge::new(edge_id(connection), connection.source.clone(), connection.target.clone());
    edge.source_handle = connection.source_handle.clone();
    edge.target_handle = connection.target_handle.clone();
    Some(edge)
}

/// Append the edge for `connection`; duplicates leave the list unchanged.
pub fn add_edge(connection: &Connection, edges: &[Edge]) -> Vec<Edge> {
    let mut result = edges.to_vec();
    if let Some(edge) = connection_to_edge(connection, edges) {
        result.push(edge);
    }
    result
}

pub fn edge_id(connection: &Connection) -> String {
    format!(
        "edge__{}{}-{}{}",
        connection.source,
        connection.source_handle.as_deref().unwrap_or(""),
        connection.target,
        connection.target_handle.as_deref().unwrap_or("")
    )
}

// ============================================================================
// Connection engine
// ============================================================================

/// Handle geometry of one node, frozen at the start of a drag.
#[derive(Debug, Clone)]
struct NodeHandles {
    rect: Rect,
    handles: Vec<(Handle, XYPosition)>,
}

struct ConnectionDrag {
    from_handle: Handle,
    /// Every node's handles, so handles hidden mid-gesture still resolve
    snapshot: Vec<NodeHandles>,
    closest: Option<Handle>,
    _capture: PointerCapture,
}

/// Drafting state machine: `Idle -> Connecting -> Idle`.
#[derive(Default)]
pub struct ConnectionEngine {
    drag: Option<ConnectionDrag>,
}

impl ConnectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connecting(&self) -> bool {
        self.drag.is_some()
    }

    /// Start drafting from `handle`. Returns `None` (and releases
    /// `capture`) when the node is unknown, not connectable or has no such
    /// handle.
    pub fn pointer_down(
        &mut self,
        store: &mut GraphStore,
        handle: &HandleRef,
        capture: PointerCapture,
    ) -> Option<ConnectionState> {
        self.cancel(store);

        let Some(internal) = store.get_internal_node(&handle.node_id) else {
            store.reporter().report(
                ErrorCode::UnknownElement,
                format!("Cannot start a connection from unknown node {}", handle.node_id),
            );
            return None;
        };
        if !store.is_node_connectable(&internal.node) {
            return None;
        }
        let Some(from_handle) = internal
            .handle_bounds
            .as_ref()
            .and_then(|b| b.find(handle.handle_type, handle.handle_id.as_deref()))
            .cloned()
        else {
            store.reporter().report(
                ErrorCode::HandleMissing,
                format!(
                    "Couldn't find {:?} handle {:?} on node {}",
                    handle.handle_type, handle.handle_id, handle.node_id
                ),
            );
            return None;
        };
        let from = from_handle.anchor(internal.position_absolute);

        let snapshot = store
            .internals()
            .node_lookup
            .values()
            .filter_map(|n| {
                let bounds = n.handle_bounds.as_ref()?;
                Some(NodeHandles {
                    rect: n.rect(),
                    handles: bounds
                        .iter()
                        .map(|h| (h.clone(), h.anchor(n.position_absolute)))
                        .collect(),
                })
            })
            .collect();

        let state = ConnectionState::InProgress(ConnectionInProgress {
            from_node: handle.node_id.clone(),
            from_position: from_handle.position,
            from,
            to: from,
            to_position: from_handle.position.opposite(),
            to_handle: None,
            to_node: None,
            is_valid: None,
            from_handle: from_handle.clone(),
        });
        store.connection = state.clone();
        self.drag = Some(ConnectionDrag {
            from_handle,
            snapshot,
            closest: None,
            _capture: capture,
        });
        tracing::debug!(node = %handle.node_id, handle = ?handle.handle_id, "connection started");
        Some(state)
    }

    /// Follow the pointer (screen space), snapping to the closest handle in
    /// reach.
    pub fn pointer_move(&mut self, store: &mut GraphStore, screen_position: XYPosition) -> ConnectionState {
        let Some(drag) = self.drag.as_mut() else {
            return ConnectionState::NotConnecting;
        };
        let pointer = point_to_renderer_point(screen_position, &store.viewport(), None);
        let radius = store.config().connection_radius;
        let closest = closest_handle(&drag.snapshot, pointer, &drag.from_handle, radius);

        let is_valid = closest
            .as_ref()
            .map(|(h, _)| validate_connection(store, &drag.from_handle, h).1.is_valid());

        if let ConnectionState::InProgress(c) = &mut store.connection {
            match &closest {
                Some((handle, anchor)) => {
                    c.to = *anchor;
                    c.to_position = handle.position;
                    c.to_handle = Some(handle.clone());
                    c.to_node = Some(handle.node_id.clone());
                }
                None => {
                    c.to = pointer;
                    c.to_position = drag.from_handle.position.opposite();
                    c.to_handle = None;
                    c.to_node = None;
                }
            }
            c.is_valid = is_valid;
        }
        drag.closest = closest.map(|(h, _)| h);
        store.connection.clone()
    }

    /// Finish drafting. A valid hovered handle yields a connection (and an
    /// edge when `add_edge_on_connect` is set); anything else cancels.
    pub fn pointer_up(&mut self, store: &mut GraphStore) -> ConnectionOutcome {
        let Some(drag) = self.drag.take() else {
            return ConnectionOutcome::Inactive;
        };
        store.connection = ConnectionState::NotConnecting;

        let Some(to) = drag.closest.as_ref() else {
            tracing::debug!("connection cancelled: no handle in reach");
            return ConnectionOutcome::Cancelled;
        };
        let (connection, result) = validate_connection(store, &drag.from_handle, to);
        if let Some(err) = result.error() {
            tracing::debug!(%err, "connection refused");
            return ConnectionOutcome::Cancelled;
        }

        store.connect(connection.clone());
        tracing::debug!(source = %connection.source, target = %connection.target, "connection finished");
        ConnectionOutcome::Connected(connection)
    }

    /// Abort drafting; always ends in `Idle` with the capture released.
    pub fn cancel(&mut self, store: &mut GraphStore) {
        if self.drag.take().is_some() {
            store.connection = ConnectionState::NotConnecting;
            tracing::debug!("connection cancelled");
        }
    }
}

/// Closest eligible handle within `radius` of `pointer` (graph space).
///
/// Every handle except the one being dragged is a candidate in both modes.
/// Legality is judged on the result, so in strict mode a same-type handle
/// snaps and reads as invalid. On equal distance an opposite-type handle
/// wins.
fn closest_handle(
    snapshot: &[NodeHandles],
    pointer: XYPosition,
    from: &Handle,
    radius: f32,
) -> Option<(Handle, XYPosition)> {
    let reach = radius + HANDLE_SEARCH_PADDING;
    let search = Rect::new(pointer.x - reach, pointer.y - reach, reach * 2.0, reach * 2.0);
    let opposite = from.handle_type.opposite();

    let mut best: Option<(&Handle, XYPosition, f32)> = None;
    for node in snapshot.iter().filter(|n| rect_intersects(&n.rect, &search, true)) {
        for (handle, anchor) in &node.handles {
            let is_from = handle.node_id == from.node_id
                && handle.id == from.id
                && handle.handle_type == from.handle_type;
            if is_from {
                continue;
            }
            let distance = anchor.distance_to(pointer);
            if distance > radius {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, _, d)) => {
                    distance < d
                        || (distance == d
                            && handle.handle_type == opposite
                            && current.handle_type != opposite)
                }
            };
            if better {
                best = Some((handle, *anchor, distance));
            }
        }
    }
    best.map(|(h, anchor, _)| (h.clone(), anchor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(node: &str, id: Option<&str>, handle_type: HandleType) -> Handle {
        Handle {
            id: id.map(str::to_string),
            node_id: node.into(),
            handle_type,
            position: if handle_type == HandleType::Source { Position::Right } else { Position::Left },
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    fn snapshot_with(handles: Vec<(Handle, XYPosition)>) -> Vec<NodeHandles> {
        vec![NodeHandles {
            rect: Rect::new(0.0, 0.0, 500.0, 500.0),
            handles,
        }]
    }

    // ========================================================================
    // ValidationResult / validators
    // ========================================================================

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::SameHandle.to_string(), "Cannot connect a handle to itself");
        assert_eq!(ValidationError::Custom("nope".into()).to_string(), "nope");
        assert_eq!(ValidationError::NotConnectable("n".into()).to_string(), "Node n is not connectable");
    }

    #[test]
    fn test_no_duplicates_validator() {
        let edges = vec![Edge::new("e", "a", "b").with_handles(Some("out"), Some("in"))];
        let dup = Connection::new("a", Some("out"), "b", Some("in"));
        let other = Connection::new("a", Some("out"), "b", None);
        assert!(!NoDuplicatesValidator.validate(&dup, &edges).is_valid());
        assert!(NoDuplicatesValidator.validate(&other, &edges).is_valid());
    }

    #[test]
    fn test_composite_validator_short_circuits() {
        let validator = CompositeValidator::new()
            .add(NoSelfLoops)
            .add(|_: &Connection, _: &[Edge]| ValidationResult::Invalid(ValidationError::Custom("second".into())));
        let self_loop = validator.validate(&Connection::new("a", None, "a", None), &[]);
        assert_eq!(
            self_loop.error(),
            Some(&ValidationError::Custom("self loops are not allowed".into()))
        );
        let other = validator.validate(&Connection::new("a", None, "b", None), &[]);
        assert_eq!(other.error(), Some(&ValidationError::Custom("second".into())));
    }

    #[test]
    fn test_empty_composite_accepts() {
        let validator = CompositeValidator::new();
        assert!(validator.validate(&Connection::new("a", None, "b", None), &[]).is_valid());
    }

    // ========================================================================
    // normalize_connection() / add_edge()
    // ========================================================================

    #[test]
    fn test_normalize_puts_source_first() {
        let from = handle("b", Some("in"), HandleType::Target);
        let to = handle("a", Some("out"), HandleType::Source);
        assert_eq!(
            normalize_connection(&from, &to),
            Connection::new("a", Some("out"), "b", Some("in"))
        );
    }

    #[test]
    fn test_normalize_same_type_keeps_direction() {
        let from = handle("a", None, HandleType::Source);
        let to = handle("b", None, HandleType::Source);
        assert_eq!(normalize_connection(&from, &to), Connection::new("a", None, "b", None));
    }

    #[test]
    fn test_edge_id_format() {
        assert_eq!(edge_id(&Connection::new("a", Some("out"), "b", Some("in"))), "edge__aout-bin");
        assert_eq!(edge_id(&Connection::new("a", None, "b", None)), "edge__a-b");
    }

    #[test]
    fn test_add_edge_refuses_duplicates() {
        let connection = Connection::new("a", None, "b", None);
        let edges = add_edge(&connection, &[]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].id, "edge__a-b");

        let again = add_edge(&connection, &edges);
        assert_eq!(again, edges);
    }

    #[test]
    fn test_add_edge_requires_endpoints() {
        assert!(add_edge(&Connection::new("", None, "b", None), &[]).is_empty());
    }

    // ========================================================================
    // closest_handle()
    // ========================================================================

    #[test]
    fn test_closest_handle_within_radius() {
        let from = handle("a", None, HandleType::Source);
        let snapshot = snapshot_with(vec![
            (handle("b", None, HandleType::Target), XYPosition::new(100.0, 100.0)),
            (handle("c", None, HandleType::Target), XYPosition::new(110.0, 100.0)),
        ]);
        let found = closest_handle(&snapshot, XYPosition::new(108.0, 100.0), &from, 20.0);
        assert_eq!(found.map(|(h, _)| h.node_id), Some("c".to_string()));
    }

    #[test]
    fn test_closest_handle_out_of_radius() {
        let from = handle("a", None, HandleType::Source);
        let snapshot = snapshot_with(vec![(handle("b", None, HandleType::Target), XYPosition::new(100.0, 100.0))]);
        let found = closest_handle(&snapshot, XYPosition::new(150.0, 100.0), &from, 20.0);
        assert!(found.is_none());
    }

    #[test]
    fn test_same_type_handle_is_a_candidate() {
        let from = handle("a", None, HandleType::Source);
        let snapshot = snapshot_with(vec![(handle("b", None, HandleType::Source), XYPosition::new(100.0, 100.0))]);
        let found = closest_handle(&snapshot, XYPosition::new(100.0, 100.0), &from, 20.0);
        assert_eq!(found.map(|(h, _)| h.handle_type), Some(HandleType::Source));
    }

    #[test]
    fn test_tie_prefers_opposite_type() {
        let from = handle("a", None, HandleType::Source);
        let snapshot = snapshot_with(vec![
            (handle("b", Some("s"), HandleType::Source), XYPosition::new(90.0, 100.0)),
            (handle("b", Some("t"), HandleType::Target), XYPosition::new(110.0, 100.0)),
        ]);
        let found = closest_handle(&snapshot, XYPosition::new(100.0, 100.0), &from, 20.0);
        assert_eq!(found.and_then(|(h, _)| h.id), Some("t".to_string()));
    }

    #[test]
    fn test_dragged_handle_is_skipped() {
        let from = handle("a", None, HandleType::Source);
        let snapshot = snapshot_with(vec![(from.clone(), XYPosition::new(100.0, 100.0))]);
        assert!(closest_handle(&snapshot, XYPosition::new(100.0, 100.0), &from, 20.0).is_none());
    }

    #[test]
    fn test_coarse_filter_skips_far_nodes() {
        let from = handle("a", None, HandleType::Source);
        // Handle anchor near the pointer, but its node rect is far away
        let snapshot = vec![NodeHandles {
            rect: Rect::new(5000.0, 5000.0, 10.0, 10.0),
            handles: vec![(handle("b", None, HandleType::Target), XYPosition::new(100.0, 100.0))],
        }];
        assert!(closest_handle(&snapshot, XYPosition::new(100.0, 100.0), &from, 20.0).is_none());
    }

    // ========================================================================
    // ConnectionEngine
    // ========================================================================

    #[test]
    fn test_engine_idle_after_cancel() {
        let mut store = GraphStore::default();
        store.set_nodes(vec![crate::types::Node::new("a", (0.0, 0.0)).with_measured(100.0, 50.0)]);
        let mut engine = ConnectionEngine::new();

        let state = engine.pointer_down(&mut store, &HandleRef::source("a"), PointerCapture::none());
        assert_eq!(state.and_then(|s| s.in_progress().map(|c| c.from)), Some(XYPosition::new(50.0, 50.0)));
        assert!(engine.is_connecting());

        engine.cancel(&mut store);
        assert!(!engine.is_connecting());
        assert_eq!(store.connection_state(), &ConnectionState::NotConnecting);
    }
}
