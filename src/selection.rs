//! Selection state: click selection and the marquee (rubber-band) gesture.

use crate::config::SelectionMode;
use crate::geometry::{nodes_in_rect, normalize_rect, rect_to_graph};
use crate::gesture::{PanePointerEvent, PointerButton, PointerCapture};
use crate::store::GraphStore;
use crate::types::{Rect, XYPosition};
use slint::{Model, SharedString, VecModel};
use std::collections::HashSet;

#[derive(Default, Debug, Clone, PartialEq)]
pub struct SelectionManager {
    selected: HashSet<String>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Handle selection of an item (node or edge) based on the multi-select modifier
    pub fn handle_interaction(&mut self, id: &str, multi_select: bool) {
        if multi_select {
            if !self.selected.remove(id) {
                self.selected.insert(id.to_string());
            }
        } else {
            if self.selected.len() == 1 && self.selected.contains(id) {
                return;
            }
            self.selected.clear();
            self.selected.insert(id.to_string());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.selected
    }

    /// Sync the selection to a Slint model, sorted for a stable row order
    pub fn sync_to_model(&self, model: &VecModel<SharedString>) {
        let mut ids: Vec<&String> = self.selected.iter().collect();
        ids.sort();
        let rows: Vec<SharedString> = ids.into_iter().map(|id| id.as_str().into()).collect();

        let unchanged = model.row_count() == rows.len()
            && rows.iter().enumerate().all(|(i, id)| model.row_data(i).as_ref() == Some(id));
        if !unchanged {
            model.set_vec(rows);
        }
    }

    /// Replace the selection with the contents of any Slint model
    pub fn sync_from_model(&mut self, model: &dyn Model<Data = SharedString>) {
        self.selected.clear();
        for i in 0..model.row_count() {
            if let Some(id) = model.row_data(i) {
                self.selected.insert(id.to_string());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

// ============================================================================
// Marquee
// ============================================================================

/// Screen-space marquee rectangle of the current gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UserSelectionRect {
    pub start_x: f32,
    pub start_y: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl UserSelectionRect {
    fn at(start: XYPosition) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            x: start.x,
            y: start.y,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Elements inside the marquee, shown as selected but not yet committed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionPreview {
    pub nodes: HashSet<String>,
    pub edges: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// No marquee gesture was running.
    Inactive,
    /// The gesture was a click on the background; all selection was cleared.
    Cleared,
    /// The marquee contents became the selection.
    Committed {
        nodes: HashSet<String>,
        edges: HashSet<String>,
    },
}

struct MarqueeDrag {
    start: XYPosition,
    /// The pointer moved beyond the click distance at least once
    in_progress: bool,
    preview: SelectionPreview,
    _capture: PointerCapture,
}

/// Marquee state machine: `Idle -> Dragging -> Idle`.
#[derive(Default)]
pub struct MarqueeSelection {
    drag: Option<MarqueeDrag>,
}

impl MarqueeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start a marquee if the press qualifies. `capture` is kept for the
    /// whole gesture; when the press is ignored it is released right away.
    pub fn pointer_down(
        &mut self,
        event: &PanePointerEvent,
        store: &mut GraphStore,
        capture: PointerCapture,
    ) -> bool {
        let config = store.config();
        let selecting = event.multi_select || store.user_selection_active || config.selection_on_drag;
        if !config.elements_selectable
            || !selecting
            || event.button != PointerButton::Primary
            || !event.on_background
        {
            return false;
        }

        self.cancel(store);
        store.user_selection_rect = Some(UserSelectionRect::at(event.position));
        self.drag = Some(MarqueeDrag {
            start: event.position,
            in_progress: false,
            preview: SelectionPreview::default(),
            _capture: capture,
        });
        tracing::debug!(x = event.position.x, y = event.position.y, "marquee started");
        true
    }

    /// Update the marquee. Returns the preview when it was first published
    /// or its contents changed.
    pub fn pointer_move(
        &mut self,
        position: XYPosition,
        store: &mut GraphStore,
    ) -> Option<SelectionPreview> {
        let drag = self.drag.as_mut()?;
        let start = drag.start;
        let first = !drag.in_progress;
        if first && start.distance_to(position) <= store.config().pane_click_distance {
            return None;
        }
        drag.in_progress = true;
        store.user_selection_active = true;

        let rect = normalize_rect(start.x, start.y, position.x, position.y);
        store.user_selection_rect = Some(UserSelectionRect {
            start_x: start.x,
            start_y: start.y,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });

        // The first preview is published even when empty
        let preview = marquee_contents(store, &rect);
        if !first && preview == drag.preview {
            return None;
        }
        drag.preview = preview.clone();
        store.selection_preview = Some(preview.clone());
        Some(preview)
    }

    /// Finish the gesture: commit the marquee contents, or clear the
    /// selection when the gesture never became a drag.
    pub fn pointer_up(&mut self, store: &mut GraphStore) -> SelectionOutcome {
        let Some(drag) = self.drag.take() else {
            return SelectionOutcome::Inactive;
        };
        store.user_selection_active = false;
        store.user_selection_rect = None;
        store.selection_preview = None;

        if !drag.in_progress {
            store.unselect_all();
            store.nodes_selection_active = false;
            tracing::debug!("marquee click cleared selection");
            return SelectionOutcome::Cleared;
        }

        let SelectionPreview { nodes, edges } = drag.preview;
        store.set_selection(&nodes, &edges);
        store.nodes_selection_active = !nodes.is_empty();
        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "marquee committed");
        SelectionOutcome::Committed { nodes, edges }
    }

    /// Abort without touching the committed selection.
    pub fn cancel(&mut self, store: &mut GraphStore) {
        if self.drag.take().is_some() {
            store.user_selection_active = false;
            store.user_selection_rect = None;
            store.selection_preview = None;
            tracing::debug!("marquee cancelled");
        }
    }
}

/// Selectable nodes inside the screen-space `rect`, plus the selectable
/// edges attached to them.
fn marquee_contents(store: &GraphStore, rect: &Rect) -> SelectionPreview {
    let graph_rect = rect_to_graph(rect, &store.viewport());
    let partially = store.config().selection_mode == SelectionMode::Partial;

    let candidates = store
        .internals()
        .node_lookup
        .values()
        .filter(|n| !n.node.hidden && store.is_node_selectable(&n.node));
    let nodes: HashSet<String> = nodes_in_rect(&graph_rect, candidates, partially)
        .into_iter()
        .map(|n| n.id().to_string())
        .collect();

    let edges = nodes
        .iter()
        .flat_map(|id| store.connected_edge_ids(id))
        .filter(|edge_id| {
            store
                .get_edge(edge_id)
                .is_some_and(|edge| store.is_edge_selectable(edge))
        })
        .cloned()
        .collect();

    SelectionPreview { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    // ========================================================================
    // SelectionManager::handle_interaction()
    // ========================================================================

    #[test]
    fn test_new_selection_is_empty() {
        let selection = SelectionManager::new();
        assert!(selection.is_empty());
        assert_eq!(selection.len(), 0);
    }

    #[test]
    fn test_click_replaces_selection() {
        let mut selection = SelectionManager::new();
        selection.handle_interaction("a", false);
        selection.handle_interaction("b", false);

        assert!(!selection.contains("a"));
        assert!(selection.contains("b"));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_click_on_already_selected_in_multi_collapses() {
        let mut selection = SelectionManager::from_ids(["a", "b"]);
        selection.handle_interaction("a", false);

        assert!(selection.contains("a"));
        assert!(!selection.contains("b"));
    }

    #[test]
    fn test_multi_select_toggles() {
        let mut selection = SelectionManager::new();
        selection.handle_interaction("a", false);
        selection.handle_interaction("b", true);
        assert_eq!(selection.len(), 2);

        selection.handle_interaction("a", true);
        assert!(!selection.contains("a"));
        assert!(selection.contains("b"));
    }

    // ========================================================================
    // sync_to_model() / sync_from_model()
    // ========================================================================

    #[test]
    fn test_sync_to_model_is_sorted_and_replaces_rows() {
        let selection = SelectionManager::from_ids(["c", "a", "b"]);
        let model: Rc<VecModel<SharedString>> =
            Rc::new(VecModel::from(vec![SharedString::from("stale")]));
        selection.sync_to_model(&model);

        let rows: Vec<SharedString> = model.iter().collect();
        assert_eq!(rows, vec!["a", "b", "c"].into_iter().map(SharedString::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_sync_to_model_empty_selection() {
        let selection = SelectionManager::new();
        let model: Rc<VecModel<SharedString>> = Rc::new(VecModel::from(vec![SharedString::from("x")]));
        selection.sync_to_model(&model);
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn test_sync_from_model_replaces_selection() {
        let mut selection = SelectionManager::from_ids(["old"]);
        let model: Rc<VecModel<SharedString>> =
            Rc::new(VecModel::from(vec![SharedString::from("a"), SharedString::from("b")]));
        selection.sync_from_model(model.as_ref());

        assert!(!selection.contains("old"));
        assert!(selection.contains("a") && selection.contains("b"));
    }

    // ========================================================================
    // UserSelectionRect
    // ========================================================================

    #[test]
    fn test_user_selection_rect_starts_empty() {
        let r = UserSelectionRect::at(XYPosition::new(5.0, 6.0));
        assert_eq!(r.rect(), Rect::new(5.0, 6.0, 0.0, 0.0));
        assert_eq!((r.start_x, r.start_y), (5.0, 6.0));
    }
}
