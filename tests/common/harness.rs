//! Test harness for a small flow.
//!
//! Provides a controller pre-filled with three measured nodes and two edges,
//! listeners wired to a [`CallbackTracker`], and helpers for simulating
//! user interactions in screen space.

#![allow(dead_code)]

use super::CallbackTracker;
use slint::Model;
use slint_flow::{
    Edge, FlowConfig, FlowController, GraphStore, HandleRef, Node, PanePointerEvent,
    PointerCapture, Viewport, XYPosition,
};
use std::cell::Cell;
use std::rc::Rc;

pub const PANE_WIDTH: f32 = 800.0;
pub const PANE_HEIGHT: f32 = 600.0;

/// Test harness for a flow with nodes `a`, `b`, `c` and edges `a-b`, `b-c`.
pub struct FlowHarness {
    pub ctrl: FlowController,
    pub tracker: CallbackTracker,
}

impl FlowHarness {
    /// Create a harness with the default nodes and edges.
    pub fn new() -> Self {
        Self::with_config(FlowConfig::default())
    }

    pub fn with_config(config: FlowConfig) -> Self {
        Self::with_elements(
            config,
            vec![
                Node::new("a", (0.0, 0.0)).with_measured(100.0, 50.0),
                Node::new("b", (200.0, 0.0)).with_measured(100.0, 50.0),
                Node::new("c", (400.0, 200.0)).with_measured(100.0, 50.0),
            ],
            vec![Edge::new("a-b", "a", "b"), Edge::new("b-c", "b", "c")],
        )
    }

    /// Create a harness with custom nodes and edges. The pane is sized and
    /// the tracker starts empty.
    pub fn with_elements(config: FlowConfig, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let ctrl = FlowController::new(config).expect("valid config");
        let tracker = CallbackTracker::new();
        tracker.attach(&ctrl);
        ctrl.set_pane_size(PANE_WIDTH, PANE_HEIGHT);
        ctrl.batch(move |store| {
            store.set_nodes(nodes);
            store.set_edges(edges);
        });
        tracker.clear();
        Self { ctrl, tracker }
    }

    pub fn read<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R {
        self.ctrl.read(f)
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.ctrl.batch(move |store| store.set_viewport(viewport));
    }

    pub fn position(&self, id: &str) -> XYPosition {
        self.read(|s| s.get_node(id).expect("node exists").position)
    }

    pub fn absolute_position(&self, id: &str) -> XYPosition {
        self.read(|s| s.get_internal_node(id).expect("node exists").position_absolute)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.read(|s| s.get_node(id).map_or(false, |n| n.selected))
    }

    pub fn edge_count(&self) -> usize {
        self.read(|s| s.edges().len())
    }

    /// Ids of the rows currently in the nodes model, in render order.
    pub fn node_rows(&self) -> Vec<String> {
        self.ctrl
            .nodes_model()
            .iter()
            .map(|row| row.id.to_string())
            .collect()
    }

    /// A pointer capture that records when it is released.
    pub fn tracked_capture() -> (PointerCapture, Rc<Cell<u32>>) {
        let released = Rc::new(Cell::new(0));
        let capture = PointerCapture::new({
            let released = released.clone();
            move || released.set(released.get() + 1)
        });
        (capture, released)
    }

    /// Press at `from`, move to `to` and release, all in screen space.
    pub fn marquee(&self, from: (f32, f32), to: (f32, f32), multi_select: bool) {
        let event = PanePointerEvent::background(from.0, from.1).with_multi_select(multi_select);
        self.ctrl.pane_pointer_down(event, PointerCapture::none());
        self.ctrl.pane_pointer_move(to.0, to.1);
        self.ctrl.pane_pointer_up();
    }

    /// Drag a connection from `handle` and release at the screen point `to`.
    pub fn connect_drag(&self, handle: HandleRef, to: (f32, f32)) {
        self.ctrl.handle_pointer_down(handle, PointerCapture::none());
        self.ctrl.connection_pointer_move(to.0, to.1);
        self.ctrl.connection_pointer_up();
    }

    /// Drag `id` by a screen-space offset.
    pub fn drag_node(&self, id: &str, dx: f32, dy: f32) {
        self.ctrl.node_drag_start(id, PointerCapture::none());
        self.ctrl.node_drag_move(dx, dy);
        self.ctrl.node_drag_end();
    }
}
