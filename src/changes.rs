//! Change reducers for nodes and edges.
//!
//! Every mutation of the graph is expressed as a list of [`NodeChange`] /
//! [`EdgeChange`] values and folded over the current list by
//! [`apply_node_changes`] / [`apply_edge_changes`]. The reducers are pure:
//! they never touch the input slice and return a fresh vector.
//!
//! # Example
//!
//! ```
//! use slint_flow::changes::{apply_node_changes, NodeChange};
//! use slint_flow::types::Node;
//!
//! let nodes = vec![Node::new("a", (0.0, 0.0)), Node::new("b", (10.0, 0.0))];
//! let next = apply_node_changes(
//!     &[NodeChange::Select { id: "b".into(), selected: true }],
//!     &nodes,
//! );
//! assert!(next[1].selected);
//! assert!(!nodes[1].selected);
//! ```

use crate::types::{Dimensions, Edge, Node, XYPosition};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    /// Insert `item` at `index`, or append when `index` is `None` or past the end.
    Add { item: Node, index: Option<usize> },
    Remove { id: String },
    Replace { id: String, item: Node },
    Select { id: String, selected: bool },
    Position {
        id: String,
        position: Option<XYPosition>,
        dragging: Option<bool>,
    },
    Dimensions {
        id: String,
        dimensions: Option<Dimensions>,
        resizing: Option<bool>,
        /// Also write the size into the node's declared width/height.
        set_attributes: bool,
    },
}

impl NodeChange {
    pub fn id(&self) -> &str {
        match self {
            Self::Add { item, .. } => &item.id,
            Self::Remove { id }
            | Self::Replace { id, .. }
            | Self::Select { id, .. }
            | Self::Position { id, .. }
            | Self::Dimensions { id, .. } => id,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        Self::Select {
            id: id.into(),
            selected,
        }
    }

    pub fn position(id: impl Into<String>, position: XYPosition, dragging: Option<bool>) -> Self {
        Self::Position {
            id: id.into(),
            position: Some(position),
            dragging,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Add { item: Edge, index: Option<usize> },
    Remove { id: String },
    Replace { id: String, item: Edge },
    Select { id: String, selected: bool },
}

impl EdgeChange {
    pub fn id(&self) -> &str {
        match self {
            Self::Add { item, .. } => &item.id,
            Self::Remove { id } | Self::Replace { id, .. } | Self::Select { id, .. } => id,
        }
    }

    pub fn select(id: impl Into<String>, selected: bool) -> Self {
        Self::Select {
            id: id.into(),
            selected,
        }
    }
}

/// Common view of nodes and edges needed by the reducers and selection helpers.
pub trait Element: Clone {
    fn id(&self) -> &str;
    fn is_selected(&self) -> bool;
    fn set_selected(&mut self, selected: bool);
}

impl Element for Node {
    fn id(&self) -> &str {
        &self.id
    }
    fn is_selected(&self) -> bool {
        self.selected
    }
    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl Element for Edge {
    fn id(&self) -> &str {
        &self.id
    }
    fn is_selected(&self) -> bool {
        self.selected
    }
    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

/// id → position lookup over the working list.
///
/// Removals drop the id from the map and queue the slot. Queued slots are
/// swept in one pass by [`flush`](Self::flush), before an insertion and at
/// the end of a batch. The map is rebuilt only after a flush or an
/// id-changing replace.
struct IdIndex {
    map: HashMap<String, usize>,
    dirty: bool,
    removed: HashSet<usize>,
}

impl IdIndex {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            dirty: true,
            removed: HashSet::new(),
        }
    }

    fn get<T: Element>(&mut self, items: &[T], id: &str) -> Option<usize> {
        if self.dirty {
            debug_assert!(self.removed.is_empty());
            self.map.clear();
            for (i, item) in items.iter().enumerate() {
                // First occurrence wins for duplicated ids
                self.map.entry(item.id().to_string()).or_insert(i);
            }
            self.dirty = false;
        }
        self.map.get(id).copied()
    }

    fn remove<T: Element>(&mut self, items: &[T], id: &str) {
        if let Some(i) = self.get(items, id) {
            self.map.remove(id);
            self.removed.insert(i);
        }
    }

    /// Drop the queued slots from `items`. Indices shift, so the map is
    /// rebuilt on the next lookup.
    fn flush<T>(&mut self, items: &mut Vec<T>) {
        if self.removed.is_empty() {
            return;
        }
        let mut i = 0;
        items.retain(|_| {
            let keep = !self.removed.contains(&i);
            i += 1;
            keep
        });
        self.removed.clear();
        self.dirty = true;
    }
}

/// Change kinds shared by nodes and edges.
enum Common<'a, T> {
    Add(&'a T, Option<usize>),
    Remove(&'a str),
    Replace(&'a str, &'a T),
    Select(&'a str, bool),
}

fn apply_common<T: Element>(result: &mut Vec<T>, index: &mut IdIndex, change: Common<'_, T>) {
    match change {
        Common::Add(item, at) => {
            index.flush(result);
            match at {
                Some(i) if i < result.len() => result.insert(i, item.clone()),
                _ => result.push(item.clone()),
            }
            index.dirty = true;
        }
        Common::Remove(id) => index.remove(result, id),
        Common::Replace(id, item) => {
            if let Some(i) = index.get(result, id) {
                result[i] = item.clone();
                if item.id() != id {
                    index.flush(result);
                    index.dirty = true;
                }
            }
        }
        Common::Select(id, selected) => {
            if let Some(i) = index.get(result, id) {
                result[i].set_selected(selected);
            }
        }
    }
}

/// Apply node changes in order and return the new node list.
///
/// Unknown ids are ignored. `nodes` is left untouched.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &[Node]) -> Vec<Node> {
    let mut result = nodes.to_vec();
    let mut index = IdIndex::new();

    for change in changes {
        match change {
            NodeChange::Add { item, index: at } => {
                apply_common(&mut result, &mut index, Common::Add(item, *at))
            }
            NodeChange::Remove { id } => apply_common(&mut result, &mut index, Common::Remove(id)),
            NodeChange::Replace { id, item } => {
                apply_common(&mut result, &mut index, Common::Replace(id, item))
            }
            NodeChange::Select { id, selected } => {
                apply_common(&mut result, &mut index, Common::Select(id, *selected))
            }
            NodeChange::Position {
                id,
                position,
                dragging,
            } => {
                if let Some(i) = index.get(&result, id) {
                    let node = &mut result[i];
                    if let Some(position) = position {
                        node.position = *position;
                    }
                    if let Some(dragging) = dragging {
                        node.dragging = *dragging;
                    }
                }
            }
            NodeChange::Dimensions {
                id,
                dimensions,
                resizing,
                set_attributes,
            } => {
                if let Some(i) = index.get(&result, id) {
                    let node = &mut result[i];
                    if let Some(dimensions) = dimensions {
                        node.measured = Some(*dimensions);
                        if *set_attributes {
                            node.width = Some(dimensions.width);
                            node.height = Some(dimensions.height);
                        }
                    }
                    if let Some(resizing) = resizing {
                        node.resizing = *resizing;
                    }
                }
            }
        }
    }

    index.flush(&mut result);
    result
}

/// Apply edge changes in order and return the new edge list.
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &[Edge]) -> Vec<Edge> {
    let mut result = edges.to_vec();
    let mut index = IdIndex::new();

    for change in changes {
        let common = match change {
            EdgeChange::Add { item, index: at } => Common::Add(item, *at),
            EdgeChange::Remove { id } => Common::Remove(id),
            EdgeChange::Replace { id, item } => Common::Replace(id, item),
            EdgeChange::Select { id, selected } => Common::Select(id, *selected),
        };
        apply_common(&mut result, &mut index, common);
    }

    index.flush(&mut result);
    result
}

/// Select changes that turn the current selection of `items` into exactly `selected_ids`.
///
/// Only elements whose state actually flips produce a change.
pub fn selection_changes<'a, T, I>(items: I, selected_ids: &HashSet<String>) -> Vec<(String, bool)>
where
    T: Element + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .filter_map(|item| {
            let will_be_selected = selected_ids.contains(item.id());
            (item.is_selected() != will_be_selected)
                .then(|| (item.id().to_string(), will_be_selected))
        })
        .collect()
}

pub fn node_selection_changes(nodes: &[Node], selected_ids: &HashSet<String>) -> Vec<NodeChange> {
    selection_changes(nodes, selected_ids)
        .into_iter()
        .map(|(id, selected)| NodeChange::Select { id, selected })
        .collect()
}

pub fn edge_selection_changes(edges: &[Edge], selected_ids: &HashSet<String>) -> Vec<EdgeChange> {
    selection_changes(edges, selected_ids)
        .into_iter()
        .map(|(id, selected)| EdgeChange::Select { id, selected })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Vec<Node> {
        vec![
            Node::new("a", (0.0, 0.0)),
            Node::new("b", (100.0, 0.0)),
            Node::new("c", (200.0, 0.0)),
        ]
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    // ========================================================================
    // Purity
    // ========================================================================

    #[test]
    fn test_empty_changes_return_equal_list() {
        let input = nodes();
        let out = apply_node_changes(&[], &input);
        assert_eq!(out, input);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = nodes();
        let snapshot = input.clone();
        let _ = apply_node_changes(
            &[
                NodeChange::select("a", true),
                NodeChange::Remove { id: "b".into() },
                NodeChange::position("c", XYPosition::new(5.0, 5.0), Some(true)),
            ],
            &input,
        );
        assert_eq!(input, snapshot);
    }

    // ========================================================================
    // Individual change kinds
    // ========================================================================

    #[test]
    fn test_add_appends_or_inserts() {
        let out = apply_node_changes(
            &[
                NodeChange::Add { item: Node::new("d", (0.0, 0.0)), index: None },
                NodeChange::Add { item: Node::new("e", (0.0, 0.0)), index: Some(1) },
                NodeChange::Add { item: Node::new("f", (0.0, 0.0)), index: Some(99) },
            ],
            &nodes(),
        );
        assert_eq!(ids(&out), vec!["a", "e", "b", "c", "d", "f"]);
    }

    #[test]
    fn test_remove_preserves_order_of_others() {
        let out = apply_node_changes(&[NodeChange::Remove { id: "b".into() }], &nodes());
        assert_eq!(ids(&out), vec!["a", "c"]);
    }

    #[test]
    fn test_bulk_remove_interleaved_with_other_changes() {
        let many: Vec<Node> = (0..1000).map(|i| Node::new(format!("n{i}"), (i as f32, 0.0))).collect();
        let mut changes: Vec<NodeChange> = (0..1000)
            .filter(|i| i % 2 == 0)
            .map(|i| NodeChange::Remove { id: format!("n{i}") })
            .collect();
        changes.push(NodeChange::select("n1", true));
        changes.push(NodeChange::select("n0", true));
        changes.push(NodeChange::Add { item: Node::new("n0", (-1.0, 0.0)), index: Some(1) });
        changes.push(NodeChange::position("n3", XYPosition::new(9.0, 9.0), None));
        changes.push(NodeChange::Remove { id: "n5".into() });

        let out = apply_node_changes(&changes, &many);
        assert_eq!(out.len(), 500);
        assert_eq!(ids(&out[..4]), vec!["n1", "n0", "n3", "n7"]);
        assert!(out[0].selected);
        assert!(!out[1].selected);
        assert_eq!(out[2].position, XYPosition::new(9.0, 9.0));
    }

    #[test]
    fn test_replace_with_new_id_after_removal() {
        let b2 = Node::new("b2", (1.0, 1.0));
        let out = apply_node_changes(
            &[
                NodeChange::Remove { id: "a".into() },
                NodeChange::Replace { id: "b".into(), item: b2 },
                NodeChange::select("b2", true),
                NodeChange::select("b", true),
            ],
            &nodes(),
        );
        assert_eq!(ids(&out), vec!["b2", "c"]);
        assert!(out[0].selected);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let input = nodes();
        let out = apply_node_changes(
            &[
                NodeChange::Remove { id: "zzz".into() },
                NodeChange::select("zzz", true),
                NodeChange::position("zzz", XYPosition::new(1.0, 1.0), None),
            ],
            &input,
        );
        assert_eq!(out, input);
    }

    #[test]
    fn test_replace_swaps_item_in_place() {
        let replacement = Node::new("b", (42.0, 42.0)).with_type("output");
        let out = apply_node_changes(
            &[NodeChange::Replace { id: "b".into(), item: replacement.clone() }],
            &nodes(),
        );
        assert_eq!(out[1], replacement);
    }

    #[test]
    fn test_position_and_dragging() {
        let out = apply_node_changes(
            &[NodeChange::position("a", XYPosition::new(7.0, 8.0), Some(true))],
            &nodes(),
        );
        assert_eq!(out[0].position, XYPosition::new(7.0, 8.0));
        assert!(out[0].dragging);

        let out = apply_node_changes(
            &[NodeChange::Position { id: "a".into(), position: None, dragging: Some(false) }],
            &out,
        );
        assert_eq!(out[0].position, XYPosition::new(7.0, 8.0));
        assert!(!out[0].dragging);
    }

    #[test]
    fn test_dimensions_sets_measured_and_optionally_attributes() {
        let out = apply_node_changes(
            &[NodeChange::Dimensions {
                id: "a".into(),
                dimensions: Some(Dimensions::new(100.0, 40.0)),
                resizing: Some(true),
                set_attributes: false,
            }],
            &nodes(),
        );
        assert_eq!(out[0].measured, Some(Dimensions::new(100.0, 40.0)));
        assert_eq!(out[0].width, None);
        assert!(out[0].resizing);

        let out = apply_node_changes(
            &[NodeChange::Dimensions {
                id: "a".into(),
                dimensions: Some(Dimensions::new(60.0, 30.0)),
                resizing: None,
                set_attributes: true,
            }],
            &out,
        );
        assert_eq!(out[0].width, Some(60.0));
        assert_eq!(out[0].height, Some(30.0));
    }

    #[test]
    fn test_changes_apply_in_array_order() {
        // Remove then re-add: the node ends up at the end of the list
        let out = apply_node_changes(
            &[
                NodeChange::Remove { id: "a".into() },
                NodeChange::Add { item: Node::new("a", (1.0, 1.0)), index: None },
                NodeChange::select("a", true),
            ],
            &nodes(),
        );
        assert_eq!(ids(&out), vec!["b", "c", "a"]);
        assert!(out[2].selected);
    }

    #[test]
    fn test_last_position_wins_within_batch() {
        let out = apply_node_changes(
            &[
                NodeChange::position("a", XYPosition::new(1.0, 1.0), None),
                NodeChange::position("a", XYPosition::new(2.0, 2.0), None),
            ],
            &nodes(),
        );
        assert_eq!(out[0].position, XYPosition::new(2.0, 2.0));
    }

    // ========================================================================
    // Edges
    // ========================================================================

    #[test]
    fn test_edge_changes() {
        let edges = vec![Edge::new("e1", "a", "b"), Edge::new("e2", "b", "c")];
        let out = apply_edge_changes(
            &[
                EdgeChange::select("e2", true),
                EdgeChange::Remove { id: "e1".into() },
                EdgeChange::Add { item: Edge::new("e3", "a", "c"), index: Some(0) },
            ],
            &edges,
        );
        let out_ids: Vec<&str> = out.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(out_ids, vec!["e3", "e2"]);
        assert!(out[1].selected);
        assert_eq!(edges.len(), 2);
    }

    // ========================================================================
    // Selection diffs
    // ========================================================================

    #[test]
    fn test_selection_changes_only_for_flips() {
        let mut input = nodes();
        input[0].selected = true;
        let wanted: HashSet<String> = ["b".to_string()].into_iter().collect();

        let changes = node_selection_changes(&input, &wanted);
        assert_eq!(
            changes,
            vec![NodeChange::select("a", false), NodeChange::select("b", true)]
        );
    }
}
