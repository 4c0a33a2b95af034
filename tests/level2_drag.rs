//! Level 2: Node Drag Tests
//!
//! Tests dragging single nodes and selections, zoom scaling, snapping,
//! extents and pointer capture lifetime.

mod common;

use common::harness::FlowHarness;
use slint::Model;
use slint_flow::{FlowConfig, Node, NodeChange, NodeExtent, PointerCapture, Viewport, XYPosition};

// ============================================================================
// Single node
// ============================================================================

#[test]
fn test_drag_moves_node_by_offset() {
    let harness = FlowHarness::new();
    harness.drag_node("a", 50.0, 20.0);

    assert_eq!(harness.position("a"), XYPosition::new(50.0, 20.0));
    assert!(harness.is_selected("a"));
    assert!(!harness.read(|s| s.get_node("a").unwrap().dragging));
}

#[test]
fn test_drag_offset_is_divided_by_zoom() {
    let harness = FlowHarness::new();
    harness.set_viewport(Viewport::new(30.0, -10.0, 2.0));
    harness.drag_node("a", 100.0, 40.0);
    assert_eq!(harness.position("a"), XYPosition::new(50.0, 20.0));
}

#[test]
fn test_moves_are_relative_to_press() {
    let harness = FlowHarness::new();
    harness.ctrl.node_drag_start("b", PointerCapture::none());
    harness.ctrl.node_drag_move(10.0, 0.0);
    harness.ctrl.node_drag_move(30.0, 5.0);
    harness.ctrl.node_drag_end();
    assert_eq!(harness.position("b"), XYPosition::new(230.0, 5.0));
}

#[test]
fn test_dragging_flag_set_while_moving() {
    let harness = FlowHarness::new();
    harness.ctrl.node_drag_start("c", PointerCapture::none());
    harness.ctrl.node_drag_move(5.0, 5.0);

    let row = harness
        .ctrl
        .nodes_model()
        .iter()
        .find(|r| r.id == "c")
        .unwrap();
    assert!(row.dragging);

    assert_eq!(harness.ctrl.node_drag_end(), vec!["c".to_string()]);
    let last = harness.tracker.nodes_changed.borrow().last().cloned().unwrap();
    assert!(matches!(
        last[0],
        NodeChange::Position { position: None, dragging: Some(false), .. }
    ));
}

#[test]
fn test_position_changes_reach_listener() {
    let harness = FlowHarness::new();
    harness.drag_node("a", 10.0, 10.0);
    let changes = harness.tracker.nodes_changed.borrow();
    let moved = changes.iter().flatten().any(|c| {
        matches!(c, NodeChange::Position { id, position: Some(p), .. }
            if id == "a" && *p == XYPosition::new(10.0, 10.0))
    });
    assert!(moved);
}

// ============================================================================
// Selections
// ============================================================================

#[test]
fn test_selected_group_moves_together() {
    let harness = FlowHarness::new();
    harness.ctrl.node_clicked("a", false);
    harness.ctrl.node_clicked("b", true);

    harness.drag_node("a", 10.0, 0.0);
    assert_eq!(harness.position("a"), XYPosition::new(10.0, 0.0));
    assert_eq!(harness.position("b"), XYPosition::new(210.0, 0.0));
    assert_eq!(harness.position("c"), XYPosition::new(400.0, 200.0));
}

#[test]
fn test_drag_on_unselected_node_replaces_selection() {
    let harness = FlowHarness::new();
    harness.ctrl.node_clicked("a", false);
    harness.drag_node("c", 10.0, 0.0);

    assert_eq!(harness.ctrl.selected_node_ids(), vec!["c".to_string()]);
    assert_eq!(harness.position("a"), XYPosition::new(0.0, 0.0));
}

#[test]
fn test_child_follows_parent_without_own_change() {
    let harness = FlowHarness::with_elements(
        FlowConfig::default(),
        vec![
            Node::new("p", (0.0, 0.0)).with_measured(200.0, 200.0),
            Node::new("child", (10.0, 10.0)).with_measured(50.0, 50.0).with_parent("p"),
        ],
        vec![],
    );
    harness.ctrl.batch(|store| store.select_all());
    harness.drag_node("p", 100.0, 0.0);

    assert_eq!(harness.position("child"), XYPosition::new(10.0, 10.0));
    assert_eq!(harness.absolute_position("child"), XYPosition::new(110.0, 10.0));
}

// ============================================================================
// Constraints
// ============================================================================

#[test]
fn test_snap_to_grid() {
    let config = FlowConfig {
        snap_to_grid: true,
        ..FlowConfig::default()
    };
    let harness = FlowHarness::with_config(config);
    harness.drag_node("a", 22.0, 8.0);
    assert_eq!(harness.position("a"), XYPosition::new(15.0, 15.0));
}

#[test]
fn test_parent_extent_clamps_child() {
    let harness = FlowHarness::with_elements(
        FlowConfig::default(),
        vec![
            Node::new("p", (100.0, 100.0)).with_measured(200.0, 200.0),
            Node::new("child", (10.0, 10.0))
                .with_measured(50.0, 50.0)
                .with_parent("p")
                .with_extent(NodeExtent::Parent),
        ],
        vec![],
    );
    harness.drag_node("child", 500.0, -500.0);

    assert_eq!(harness.absolute_position("child"), XYPosition::new(250.0, 100.0));
    assert_eq!(harness.position("child"), XYPosition::new(150.0, 0.0));
}

#[test]
fn test_coordinate_extent_clamps_node() {
    let harness = FlowHarness::with_elements(
        FlowConfig::default(),
        vec![Node::new("n", (0.0, 0.0))
            .with_measured(20.0, 20.0)
            .with_extent(NodeExtent::Coordinate([[0.0, 0.0], [100.0, 100.0]]))],
        vec![],
    );
    harness.drag_node("n", 300.0, 40.0);
    assert_eq!(harness.position("n"), XYPosition::new(80.0, 40.0));
}

#[test]
fn test_non_draggable_node_does_not_start() {
    let harness = FlowHarness::with_elements(
        FlowConfig::default(),
        vec![Node::new("fixed", (5.0, 5.0)).with_measured(10.0, 10.0).draggable(false)],
        vec![],
    );
    assert!(!harness.ctrl.node_drag_start("fixed", PointerCapture::none()));
    harness.ctrl.node_drag_move(50.0, 50.0);
    assert_eq!(harness.position("fixed"), XYPosition::new(5.0, 5.0));
}

// ============================================================================
// Gesture lifetime
// ============================================================================

#[test]
fn test_cancel_restores_start_positions() {
    let harness = FlowHarness::new();
    harness.ctrl.node_drag_start("b", PointerCapture::none());
    harness.ctrl.node_drag_move(80.0, 80.0);
    harness.ctrl.cancel_node_drag();

    assert_eq!(harness.position("b"), XYPosition::new(200.0, 0.0));
    assert!(!harness.read(|s| s.get_node("b").unwrap().dragging));
}

#[test]
fn test_capture_released_when_drag_ends() {
    let harness = FlowHarness::new();
    let (capture, released) = FlowHarness::tracked_capture();
    assert!(harness.ctrl.node_drag_start("a", capture));
    harness.ctrl.node_drag_move(5.0, 5.0);
    assert_eq!(released.get(), 0);

    harness.ctrl.node_drag_end();
    assert_eq!(released.get(), 1);
}
