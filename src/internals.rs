use crate::error::{ErrorCode, ErrorReporter, FlowError};
use crate::geometry::get_node_position_with_origin;
use crate::registry::{NodeKind, TypeRegistry};
use crate::types::{HandleBounds, InternalNode, Node, NodeOrigin, XYPosition};
use std::collections::{HashMap, HashSet};

/// z-index boost for selected nodes when elevation is on. Large enough to
/// keep selected nodes above any plausible authored z-index.
pub const SELECTED_NODE_Z: i32 = 1000;

/// Render order for a node: its own `z_index` (or its position in the
/// node list), lifted by [`SELECTED_NODE_Z`] when selected and elevated.
pub fn calculate_z_index(
    node: &Node,
    index_in_array: usize,
    selected_ids: &HashSet<String>,
    elevate_on_select: bool,
) -> i32 {
    let base = node.z_index.unwrap_or(index_in_array as i32);
    if elevate_on_select && selected_ids.contains(&node.id) {
        base + SELECTED_NODE_Z
    } else {
        base
    }
}

/// Inputs of one recomputation pass besides the node list itself.
#[derive(Clone, Copy)]
pub struct AdoptOptions<'a> {
    pub node_origin: NodeOrigin,
    pub elevate_nodes_on_select: bool,
    pub node_kinds: &'a TypeRegistry<NodeKind>,
    pub reporter: &'a ErrorReporter,
}

/// Store-owned memoization of derived node geometry.
///
/// Holds the [`InternalNode`] for every node, the parent → children index
/// and the handle geometry reported by the renderer. Everything here is
/// rebuilt from the node list and can be discarded at any time.
#[derive(Debug, Default, Clone)]
pub struct GeometryCache {
    pub node_lookup: HashMap<String, InternalNode>,
    pub parent_lookup: HashMap<String, Vec<String>>,
    /// Handle geometry reported by the renderer, keyed by node id
    pub handle_bounds: HashMap<String, HandleBounds>,
    /// Node types already reported as missing, to report each only once
    reported_types: HashSet<String>,
}

/// Per-pass memo entry.
#[derive(Clone, Copy)]
struct Resolved {
    position_absolute: XYPosition,
    z: i32,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&InternalNode> {
        self.node_lookup.get(id)
    }

    pub fn children(&self, parent_id: &str) -> &[String] {
        self.parent_lookup
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Record renderer-reported handle geometry for a node.
    pub fn report_handle_bounds(&mut self, node_id: &str, bounds: HandleBounds) {
        if let Some(internal) = self.node_lookup.get_mut(node_id) {
            internal.handle_bounds = Some(bounds.clone());
        }
        self.handle_bounds.insert(node_id.to_string(), bounds);
    }

    /// Drop every cached entry for nodes no longer present.
    pub fn retain_nodes(&mut self, ids: &HashSet<&str>) {
        self.handle_bounds.retain(|id, _| ids.contains(id.as_str()));
    }

    /// Rebuild the lookup tables from `nodes`.
    ///
    /// The new tables are computed completely before they replace the old
    /// ones. Running this twice with the same input yields the same output.
    pub fn adopt_user_nodes(&mut self, nodes: &[Node], options: AdoptOptions<'_>) {
        let by_id: HashMap<&str, (usize, &Node)> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), (i, n)))
            .collect();
        let selected_ids: HashSet<String> = nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect();

        let mut memo: HashMap<&str, Resolved> = HashMap::with_capacity(nodes.len());
        let mut node_lookup = HashMap::with_capacity(nodes.len());
        let mut parent_lookup: HashMap<String, Vec<String>> = HashMap::new();

        for node in nodes {
            let resolved = resolve_node(node, &by_id, &selected_ids, &mut memo, options);

            if let Some(parent_id) = node.parent_id.as_ref().filter(|p| by_id.contains_key(p.as_str())) {
                parent_lookup
                    .entry(parent_id.clone())
                    .or_default()
                    .push(node.id.clone());
            }

            let measured = node.dimensions();
            let kind = options.node_kinds.resolve(node.node_type.as_deref());
            if kind.fell_back {
                if let Some(name) = node.node_type.as_ref() {
                    if !self.reported_types.contains(name) {
                        options.reporter.report(
                            ErrorCode::NodeTypeMissing,
                            format!("Node type \"{name}\" not found. Using fallback type \"default\"."),
                        );
                        self.reported_types.insert(name.clone());
                    }
                }
            }
            let handle_bounds = match self.handle_bounds.get(&node.id) {
                Some(bounds) => Some(bounds.clone()),
                None if measured.is_positive() => {
                    Some(kind.value.default_handles(&node.id, measured))
                }
                None => None,
            };

            node_lookup.insert(
                node.id.clone(),
                InternalNode {
                    node: node.clone(),
                    position_absolute: resolved.position_absolute,
                    measured,
                    z: resolved.z,
                    handle_bounds,
                },
            );
        }

        tracing::trace!(nodes = nodes.len(), "recomputed node internals");
        self.node_lookup = node_lookup;
        self.parent_lookup = parent_lookup;
    }
}

/// Resolve one node's absolute position and z by walking up its parent chain.
///
/// Ancestors resolved earlier in the pass come from `memo`. The walk is
/// bounded by the node count; a parent link that closes a cycle is cut and
/// the node holding it is treated as a root.
fn resolve_node<'a>(
    node: &'a Node,
    by_id: &HashMap<&'a str, (usize, &'a Node)>,
    selected_ids: &HashSet<String>,
    memo: &mut HashMap<&'a str, Resolved>,
    options: AdoptOptions<'_>,
) -> Resolved {
    if let Some(r) = memo.get(node.id.as_str()) {
        return *r;
    }

    // Collect the unresolved part of the chain, child first
    let mut chain: Vec<&'a Node> = vec![node];
    let mut on_chain: HashSet<&str> = HashSet::from([node.id.as_str()]);
    let mut base: Option<Resolved> = None;
    loop {
        let current = chain[chain.len() - 1];
        let Some(parent_id) = current.parent_id.as_deref() else {
            break;
        };
        if let Some(r) = memo.get(parent_id) {
            base = Some(*r);
            break;
        }
        let Some(&(_, parent)) = by_id.get(parent_id) else {
            options.reporter.report(
                ErrorCode::ParentNotFound,
                format!("Parent node {parent_id} not found for node {}; treating it as a root.", current.id),
            );
            break;
        };
        if on_chain.contains(parent_id) || chain.len() > by_id.len() {
            let err = FlowError::CyclicHierarchy {
                node_id: current.id.clone(),
            };
            options.reporter.report(ErrorCode::CyclicHierarchy, err.to_string());
            break;
        }
        on_chain.insert(parent.id.as_str());
        chain.push(parent);
    }

    // Resolve from the top of the chain back down to `node`
    let mut parent = base;
    for &current in chain.iter().rev() {
        let index = by_id.get(current.id.as_str()).map(|&(i, _)| i).unwrap_or(0);
        let origin = current.origin.unwrap_or(options.node_origin);
        let own = get_node_position_with_origin(current.position, current.dimensions(), origin);
        let mut z = calculate_z_index(current, index, selected_ids, options.elevate_nodes_on_select);
        let position_absolute = match parent {
            Some(p) => {
                z = z.max(p.z + 1);
                XYPosition::new(p.position_absolute.x + own.x, p.position_absolute.y + own.y)
            }
            None => own,
        };
        let resolved = Resolved { position_absolute, z };
        memo.insert(current.id.as_str(), resolved);
        parent = Some(resolved);
    }

    memo[node.id.as_str()]
}

/// Absolute position of `id` computed directly from the node list.
///
/// Fails with [`FlowError::CyclicHierarchy`] instead of looping when the
/// parent chain is cyclic. A missing parent ends the walk (the node is
/// treated as a root).
pub fn get_node_absolute_position(
    nodes: &[Node],
    id: &str,
    node_origin: NodeOrigin,
) -> Result<XYPosition, FlowError> {
    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut current = *by_id
        .get(id)
        .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))?;

    let mut position = XYPosition::default();
    let mut visited: HashSet<&str> = HashSet::new();
    loop {
        if !visited.insert(current.id.as_str()) || visited.len() > by_id.len() {
            return Err(FlowError::CyclicHierarchy {
                node_id: current.id.clone(),
            });
        }
        let origin = current.origin.unwrap_or(node_origin);
        let own = get_node_position_with_origin(current.position, current.dimensions(), origin);
        position = position.offset(own.x, own.y);

        match current.parent_id.as_deref().and_then(|p| by_id.get(p).copied()) {
            Some(parent) => current = parent,
            None => return Ok(position),
        }
    }
}
