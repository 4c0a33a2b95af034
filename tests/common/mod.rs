//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use slint_flow::{Connection, EdgeChange, ErrorCode, FlowController, NodeChange, Viewport};
use std::cell::RefCell;
use std::rc::Rc;

/// Tracks listener invocations for testing.
///
/// Each field records calls to the corresponding listener with their arguments.
#[derive(Default, Clone)]
pub struct CallbackTracker {
    pub nodes_changed: Rc<RefCell<Vec<Vec<NodeChange>>>>,
    pub edges_changed: Rc<RefCell<Vec<Vec<EdgeChange>>>>,
    pub connected: Rc<RefCell<Vec<Connection>>>,
    /// (selected node ids, selected edge ids)
    pub selection_changed: Rc<RefCell<Vec<(Vec<String>, Vec<String>)>>>,
    pub viewport_changed: Rc<RefCell<Vec<Viewport>>>,
    pub errors: Rc<RefCell<Vec<(ErrorCode, String)>>>,
}

impl CallbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every tracked callback on `ctrl`.
    pub fn attach(&self, ctrl: &FlowController) {
        let t = self.clone();
        ctrl.on_nodes_change(move |changes| t.nodes_changed.borrow_mut().push(changes.to_vec()));
        let t = self.clone();
        ctrl.on_edges_change(move |changes| t.edges_changed.borrow_mut().push(changes.to_vec()));
        let t = self.clone();
        ctrl.on_connect(move |c| t.connected.borrow_mut().push(c.clone()));
        let t = self.clone();
        ctrl.on_selection_change(move |nodes, edges| {
            t.selection_changed
                .borrow_mut()
                .push((nodes.to_vec(), edges.to_vec()))
        });
        let t = self.clone();
        ctrl.on_viewport_change(move |vp| t.viewport_changed.borrow_mut().push(vp));
        let t = self.clone();
        ctrl.on_error(move |code, message| t.errors.borrow_mut().push((code, message.to_string())));
    }

    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.errors.borrow().iter().map(|(code, _)| *code).collect()
    }

    /// Clear all recorded callbacks.
    pub fn clear(&self) {
        self.nodes_changed.borrow_mut().clear();
        self.edges_changed.borrow_mut().clear();
        self.connected.borrow_mut().clear();
        self.selection_changed.borrow_mut().clear();
        self.viewport_changed.borrow_mut().clear();
        self.errors.borrow_mut().clear();
    }
}
