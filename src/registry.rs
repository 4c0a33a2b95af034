//! Type registries for node kinds and edge path strategies.
//!
//! A [`TypeRegistry`] maps a type name to a value and always carries a
//! `"default"` entry, so resolution can never fail: unknown names fall back
//! to the default and the caller decides how to report it.
//!
//! # Example
//!
//! ```
//! use slint_flow::registry::{NodeKind, TypeRegistry};
//! use slint_flow::types::Position;
//!
//! let mut kinds = TypeRegistry::new(NodeKind::DEFAULT);
//! kinds.register("sink", NodeKind { source: None, target: Some(Position::Left) });
//!
//! assert!(!kinds.resolve(Some("sink")).fell_back);
//! assert!(kinds.resolve(Some("nope")).fell_back);
//! ```

use crate::types::{Dimensions, Handle, HandleBounds, HandleType, Position, XYPosition};
use std::collections::HashMap;
use std::rc::Rc;

pub const DEFAULT_TYPE: &str = "default";

/// Name → value map with a mandatory default entry.
#[derive(Clone, Debug)]
pub struct TypeRegistry<T> {
    entries: HashMap<String, T>,
}

/// Outcome of [`TypeRegistry::resolve`].
pub struct Resolved<'a, T> {
    pub value: &'a T,
    /// The requested name was not registered and the default was used.
    pub fell_back: bool,
}

impl<T> TypeRegistry<T> {
    pub fn new(default: T) -> Self {
        let mut entries = HashMap::new();
        entries.insert(DEFAULT_TYPE.to_string(), default);
        Self { entries }
    }

    /// Register (or replace) a type. Returns the previous value, if any.
    pub fn register(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        self.entries.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn default_entry(&self) -> &T {
        // The default entry is inserted by `new` and `register` can only replace it
        &self.entries[DEFAULT_TYPE]
    }

    /// Look up `name`, falling back to the default entry. `None` means
    /// "untyped" and resolves to the default without counting as a fallback.
    pub fn resolve(&self, name: Option<&str>) -> Resolved<'_, T> {
        match name {
            None => Resolved {
                value: self.default_entry(),
                fell_back: false,
            },
            Some(name) => match self.entries.get(name) {
                Some(value) => Resolved {
                    value,
                    fell_back: false,
                },
                None => Resolved {
                    value: self.default_entry(),
                    fell_back: true,
                },
            },
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// ============================================================================
// Node kinds
// ============================================================================

/// Side length of the handles a [`NodeKind`] generates.
pub const DEFAULT_HANDLE_SIZE: f32 = 6.0;

/// Describes which handles a node type exposes when the renderer has not
/// reported any handle geometry for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeKind {
    pub source: Option<Position>,
    pub target: Option<Position>,
}

impl NodeKind {
    pub const DEFAULT: NodeKind = NodeKind {
        source: Some(Position::Bottom),
        target: Some(Position::Top),
    };
    pub const INPUT: NodeKind = NodeKind {
        source: Some(Position::Bottom),
        target: None,
    };
    pub const OUTPUT: NodeKind = NodeKind {
        source: None,
        target: Some(Position::Top),
    };
    pub const GROUP: NodeKind = NodeKind {
        source: None,
        target: None,
    };

    /// Registry pre-filled with the built-in kinds.
    pub fn builtin_registry() -> TypeRegistry<NodeKind> {
        let mut registry = TypeRegistry::new(Self::DEFAULT);
        registry.register("input", Self::INPUT);
        registry.register("output", Self::OUTPUT);
        registry.register("group", Self::GROUP);
        registry
    }

    /// One default handle per declared side, anchored on the node border.
    pub fn default_handles(&self, node_id: &str, size: Dimensions) -> HandleBounds {
        let make = |handle_type, position| default_handle(node_id, handle_type, position, size);
        HandleBounds {
            source: self
                .source
                .map(|p| vec![make(HandleType::Source, p)])
                .unwrap_or_default(),
            target: self
                .target
                .map(|p| vec![make(HandleType::Target, p)])
                .unwrap_or_default(),
        }
    }
}

fn default_handle(node_id: &str, handle_type: HandleType, position: Position, size: Dimensions) -> Handle {
    let s = DEFAULT_HANDLE_SIZE;
    let (x, y) = match position {
        Position::Top => (size.width / 2.0 - s / 2.0, 0.0),
        Position::Bottom => (size.width / 2.0 - s / 2.0, size.height - s),
        Position::Left => (0.0, size.height / 2.0 - s / 2.0),
        Position::Right => (size.width - s, size.height / 2.0 - s / 2.0),
    };
    Handle {
        id: None,
        node_id: node_id.to_string(),
        handle_type,
        position,
        x,
        y,
        width: s,
        height: s,
    }
}

// ============================================================================
// Edge path strategies
// ============================================================================

/// Endpoints an edge path is built between, in whatever space the caller uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePathParams {
    pub source: XYPosition,
    pub source_position: Position,
    pub target: XYPosition,
    pub target_position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgePath {
    /// SVG path commands, e.g. `"M 0 0 L 10 10"`
    pub commands: String,
    /// Where a label sits along the path
    pub label: XYPosition,
}

/// Strategy for turning edge endpoints into a drawable path.
pub trait EdgePathBuilder {
    fn build(&self, params: &EdgePathParams) -> EdgePath;
}

pub type EdgeTypeRegistry = TypeRegistry<Rc<dyn EdgePathBuilder>>;

/// Built-in edge types: `default` (bezier) and `straight`.
pub fn builtin_edge_types() -> EdgeTypeRegistry {
    let mut registry: EdgeTypeRegistry = TypeRegistry::new(Rc::new(BezierPath::default()));
    registry.register("bezier", Rc::new(BezierPath::default()));
    registry.register("straight", Rc::new(StraightPath));
    registry
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StraightPath;

impl EdgePathBuilder for StraightPath {
    fn build(&self, p: &EdgePathParams) -> EdgePath {
        EdgePath {
            commands: format!("M {} {} L {} {}", p.source.x, p.source.y, p.target.x, p.target.y),
            label: XYPosition::new(
                (p.source.x + p.target.x) / 2.0,
                (p.source.y + p.target.y) / 2.0,
            ),
        }
    }
}

/// Cubic bezier whose control points leave each handle in the direction
/// the handle faces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BezierPath {
    pub curvature: f32,
}

impl Default for BezierPath {
    fn default() -> Self {
        Self { curvature: 0.25 }
    }
}

impl BezierPath {
    fn control_offset(&self, distance: f32) -> f32 {
        if distance >= 0.0 {
            0.5 * distance
        } else {
            self.curvature * 25.0 * (-distance).sqrt()
        }
    }

    fn control_point(&self, from: XYPosition, position: Position, to: XYPosition) -> XYPosition {
        match position {
            Position::Left => XYPosition::new(from.x - self.control_offset(from.x - to.x), from.y),
            Position::Right => XYPosition::new(from.x + self.control_offset(to.x - from.x), from.y),
            Position::Top => XYPosition::new(from.x, from.y - self.control_offset(from.y - to.y)),
            Position::Bottom => XYPosition::new(from.x, from.y + self.control_offset(to.y - from.y)),
        }
    }
}

impl EdgePathBuilder for BezierPath {
    fn build(&self, p: &EdgePathParams) -> EdgePath {
        let c1 = self.control_point(p.source, p.source_position, p.target);
        let c2 = self.control_point(p.target, p.target_position, p.source);
        // Point at t = 0.5
        let label = XYPosition::new(
            p.source.x * 0.125 + c1.x * 0.375 + c2.x * 0.375 + p.target.x * 0.125,
            p.source.y * 0.125 + c1.y * 0.375 + c2.y * 0.375 + p.target.y * 0.125,
        );
        EdgePath {
            commands: format!(
                "M {} {} C {} {} {} {} {} {}",
                p.source.x, p.source.y, c1.x, c1.y, c2.x, c2.y, p.target.x, p.target.y
            ),
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_registered_and_falls_back() {
        let registry = NodeKind::builtin_registry();

        let r = registry.resolve(Some("input"));
        assert_eq!(*r.value, NodeKind::INPUT);
        assert!(!r.fell_back);

        let r = registry.resolve(Some("fancy"));
        assert_eq!(*r.value, NodeKind::DEFAULT);
        assert!(r.fell_back);

        let r = registry.resolve(None);
        assert_eq!(*r.value, NodeKind::DEFAULT);
        assert!(!r.fell_back);
    }

    #[test]
    fn test_registering_default_replaces_it() {
        let mut registry = TypeRegistry::new(1);
        assert_eq!(registry.register(DEFAULT_TYPE, 2), Some(1));
        assert_eq!(*registry.default_entry(), 2);
    }

    #[test]
    fn test_default_handles_sit_on_border() {
        let bounds = NodeKind::DEFAULT.default_handles("n", Dimensions::new(100.0, 40.0));
        let origin = XYPosition::new(0.0, 0.0);

        let source = &bounds.source[0];
        assert_eq!(source.handle_type, HandleType::Source);
        assert_eq!(source.anchor(origin), XYPosition::new(50.0, 40.0));

        let target = &bounds.target[0];
        assert_eq!(target.anchor(origin), XYPosition::new(50.0, 0.0));
    }

    #[test]
    fn test_group_kind_has_no_handles() {
        let bounds = NodeKind::GROUP.default_handles("g", Dimensions::new(10.0, 10.0));
        assert!(bounds.is_empty());
    }

    #[test]
    fn test_straight_path() {
        let path = StraightPath.build(&EdgePathParams {
            source: XYPosition::new(0.0, 0.0),
            source_position: Position::Right,
            target: XYPosition::new(10.0, 20.0),
            target_position: Position::Left,
        });
        assert_eq!(path.commands, "M 0 0 L 10 20");
        assert_eq!(path.label, XYPosition::new(5.0, 10.0));
    }

    #[test]
    fn test_bezier_path_is_cubic_and_symmetric_label() {
        let path = BezierPath::default().build(&EdgePathParams {
            source: XYPosition::new(0.0, 0.0),
            source_position: Position::Right,
            target: XYPosition::new(100.0, 0.0),
            target_position: Position::Left,
        });
        assert!(path.commands.starts_with("M 0 0 C "));
        assert_eq!(path.commands, "M 0 0 C 50 0 50 0 100 0");
        assert_eq!(path.label, XYPosition::new(50.0, 0.0));
    }

    #[test]
    fn test_builtin_edge_types_fallback() {
        let registry = builtin_edge_types();
        assert!(registry.contains("straight"));
        assert!(registry.resolve(Some("smoothstep")).fell_back);
    }
}
