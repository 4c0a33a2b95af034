//! Slint model views over the store.
//!
//! [`FlowModels`] owns one `VecModel` per collection a UI binds to. After
//! every batch the controller calls [`FlowModels::sync`], which rewrites
//! rows in place and only touches rows whose content changed, so Slint
//! repeaters keep their component instances.
//!
//! ```
//! use slint_flow::{FlowModels, GraphStore, Node};
//! use slint::Model;
//!
//! let mut store = GraphStore::default();
//! store.set_nodes(vec![Node::new("a", (10.0, 20.0)).with_measured(100.0, 40.0)]);
//!
//! let models = FlowModels::new();
//! models.sync(&store);
//! assert_eq!(models.nodes().row_count(), 1);
//! ```

use crate::selection::SelectionManager;
use crate::store::GraphStore;
use slint::{Model, ModelRc, SharedString, VecModel};
use std::rc::Rc;

/// One row per visible node, in render order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeView {
    pub id: SharedString,
    pub node_type: SharedString,
    /// Absolute top-left, graph space
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub z: i32,
    /// Selected, or inside the running marquee
    pub selected: bool,
    pub dragging: bool,
}

/// One row per drawable edge, in render order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeView {
    pub id: SharedString,
    pub source: SharedString,
    pub target: SharedString,
    /// SVG path commands, graph space
    pub path: SharedString,
    pub label_x: f32,
    pub label_y: f32,
    pub z: i32,
    pub selected: bool,
}

/// Write `rows` into `model`, touching only rows that differ.
fn sync_rows<T>(model: &VecModel<T>, rows: Vec<T>)
where
    T: Clone + PartialEq + 'static,
{
    let len = rows.len();
    for (i, row) in rows.into_iter().enumerate() {
        if i < model.row_count() {
            if model.row_data(i).as_ref() != Some(&row) {
                model.set_row_data(i, row);
            }
        } else {
            model.push(row);
        }
    }
    while model.row_count() > len {
        model.remove(model.row_count() - 1);
    }
}

/// Maps the crate's row types into a host-generated Slint struct.
trait ModelSyncer {
    fn sync(&self, store: &GraphStore);
}

struct NodeSyncer<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<P, F> ModelSyncer for NodeSyncer<P, F>
where
    P: Clone + PartialEq + 'static,
    F: Fn(&NodeView) -> P,
{
    fn sync(&self, store: &GraphStore) {
        sync_rows(&self.model, node_rows(store).iter().map(&self.constructor).collect());
    }
}

struct EdgeSyncer<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<P, F> ModelSyncer for EdgeSyncer<P, F>
where
    P: Clone + PartialEq + 'static,
    F: Fn(&EdgeView) -> P,
{
    fn sync(&self, store: &GraphStore) {
        sync_rows(&self.model, edge_rows(store).iter().map(&self.constructor).collect());
    }
}

fn node_rows(store: &GraphStore) -> Vec<NodeView> {
    let mut rows: Vec<(usize, NodeView)> = store
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| !n.hidden)
        .filter_map(|(i, n)| {
            let internal = store.get_internal_node(&n.id)?;
            Some((
                i,
                NodeView {
                    id: n.id.as_str().into(),
                    node_type: n.node_type.as_deref().unwrap_or_default().into(),
                    x: internal.position_absolute.x,
                    y: internal.position_absolute.y,
                    width: internal.measured.width,
                    height: internal.measured.height,
                    z: internal.z,
                    selected: store.is_node_visually_selected(&n.id),
                    dragging: n.dragging,
                },
            ))
        })
        .collect();
    rows.sort_by_key(|(i, row)| (row.z, *i));
    rows.into_iter().map(|(_, row)| row).collect()
}

fn edge_rows(store: &GraphStore) -> Vec<EdgeView> {
    let mut rows: Vec<(usize, EdgeView)> = store
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.hidden)
        .filter(|(_, e)| {
            // Edges into hidden nodes are not drawn
            [&e.source, &e.target]
                .iter()
                .all(|id| store.get_node(id).is_some_and(|n| !n.hidden))
        })
        .filter_map(|(i, e)| {
            let geometry = store.edge_geometry(&e.id)?;
            Some((
                i,
                EdgeView {
                    id: e.id.as_str().into(),
                    source: e.source.as_str().into(),
                    target: e.target.as_str().into(),
                    path: geometry.path.commands.as_str().into(),
                    label_x: geometry.path.label.x,
                    label_y: geometry.path.label.y,
                    z: geometry.z,
                    selected: store.is_edge_visually_selected(&e.id),
                },
            ))
        })
        .collect();
    rows.sort_by_key(|(i, row)| (row.z, *i));
    rows.into_iter().map(|(_, row)| row).collect()
}

/// The Slint models a flow UI binds to.
pub struct FlowModels {
    nodes: Rc<VecModel<NodeView>>,
    edges: Rc<VecModel<EdgeView>>,
    selected_nodes: Rc<VecModel<SharedString>>,
    selected_edges: Rc<VecModel<SharedString>>,
    syncers: Vec<Box<dyn ModelSyncer>>,
}

impl Default for FlowModels {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowModels {
    pub fn new() -> Self {
        Self {
            nodes: Rc::new(VecModel::default()),
            edges: Rc::new(VecModel::default()),
            selected_nodes: Rc::new(VecModel::default()),
            selected_edges: Rc::new(VecModel::default()),
            syncers: Vec::new(),
        }
    }

    pub fn nodes(&self) -> ModelRc<NodeView> {
        ModelRc::from(self.nodes.clone())
    }

    pub fn edges(&self) -> ModelRc<EdgeView> {
        ModelRc::from(self.edges.clone())
    }

    /// Ids of the committed node selection, sorted.
    pub fn selected_nodes(&self) -> ModelRc<SharedString> {
        ModelRc::from(self.selected_nodes.clone())
    }

    pub fn selected_edges(&self) -> ModelRc<SharedString> {
        ModelRc::from(self.selected_edges.clone())
    }

    /// Also keep `model` in sync, converting each [`NodeView`] with
    /// `constructor` (typically into a struct generated from `.slint`).
    pub fn bind_nodes<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + PartialEq + 'static,
        F: Fn(&NodeView) -> P + 'static,
    {
        self.syncers.push(Box::new(NodeSyncer { model, constructor }));
    }

    pub fn bind_edges<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + PartialEq + 'static,
        F: Fn(&EdgeView) -> P + 'static,
    {
        self.syncers.push(Box::new(EdgeSyncer { model, constructor }));
    }

    /// Bring every model up to date with `store`.
    pub fn sync(&self, store: &GraphStore) {
        sync_rows(&self.nodes, node_rows(store));
        sync_rows(&self.edges, edge_rows(store));
        SelectionManager::from_ids(store.selected_node_ids()).sync_to_model(&self.selected_nodes);
        SelectionManager::from_ids(store.selected_edge_ids()).sync_to_model(&self.selected_edges);
        for syncer in &self.syncers {
            syncer.sync(store);
        }
    }
}
