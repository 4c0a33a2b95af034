use crate::types::{Dimensions, InternalNode, NodeOrigin, Rect, Viewport, XYPosition};

/// Trait for anything with a graph-space rectangle that can be hit-tested
pub trait NodeGeometry {
    fn id(&self) -> &str;
    fn rect(&self) -> Rect;
}

impl NodeGeometry for InternalNode {
    fn id(&self) -> &str {
        &self.node.id
    }
    fn rect(&self) -> Rect {
        InternalNode::rect(self)
    }
}

/// Area shared by two rectangles (0 if they do not overlap)
pub fn get_overlapping_area(a: &Rect, b: &Rect) -> f32 {
    let x_overlap = (a.right().min(b.right()) - a.x.max(b.x)).max(0.0);
    let y_overlap = (a.bottom().min(b.bottom()) - a.y.max(b.y)).max(0.0);
    x_overlap * y_overlap
}

/// Whether `inner` lies completely inside `outer` (edges may touch)
pub fn is_rect_within(inner: &Rect, outer: &Rect) -> bool {
    inner.x >= outer.x
        && inner.y >= outer.y
        && inner.right() <= outer.right()
        && inner.bottom() <= outer.bottom()
}

/// Intersection test shared by marquee selection and programmatic queries.
///
/// `partially` accepts any overlap; otherwise `candidate` must be fully
/// contained in `target`. A zero-area candidate counts as a point.
pub fn rect_intersects(candidate: &Rect, target: &Rect, partially: bool) -> bool {
    if candidate.area() <= 0.0 {
        return target.contains_point(XYPosition::new(candidate.x, candidate.y));
    }
    if partially {
        get_overlapping_area(candidate, target) > 0.0
    } else {
        is_rect_within(candidate, target)
    }
}

/// Rectangle spanned by two corner points, in any order
pub fn normalize_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Rect {
    Rect::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
}

/// Smallest rectangle containing every rect in `rects`
pub fn get_bounds_of_rects<I>(rects: I) -> Option<Rect>
where
    I: IntoIterator<Item = Rect>,
{
    let mut iter = rects.into_iter();
    let first = iter.next()?;
    let (mut min_x, mut min_y) = (first.x, first.y);
    let (mut max_x, mut max_y) = (first.right(), first.bottom());
    for r in iter {
        min_x = min_x.min(r.x);
        min_y = min_y.min(r.y);
        max_x = max_x.max(r.right());
        max_y = max_y.max(r.bottom());
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Union bounding box of a set of nodes in graph space
pub fn get_nodes_bounds<'a, N, I>(nodes: I) -> Option<Rect>
where
    N: NodeGeometry + 'a,
    I: IntoIterator<Item = &'a N>,
{
    get_bounds_of_rects(nodes.into_iter().map(|n| n.rect()))
}

/// Top-left corner of a node whose `position` refers to `origin` within its box
pub fn get_node_position_with_origin(
    position: XYPosition,
    dimensions: Dimensions,
    origin: NodeOrigin,
) -> XYPosition {
    XYPosition::new(
        position.x - dimensions.width * origin[0],
        position.y - dimensions.height * origin[1],
    )
}

/// Screen → graph space, optionally snapped to a grid
pub fn point_to_renderer_point(
    point: XYPosition,
    viewport: &Viewport,
    snap_grid: Option<[f32; 2]>,
) -> XYPosition {
    let z = if viewport.zoom > 0.0 { viewport.zoom } else { 1.0 };
    let graph = XYPosition::new((point.x - viewport.x) / z, (point.y - viewport.y) / z);
    match snap_grid {
        Some(grid) => snap_position(graph, grid),
        None => graph,
    }
}

/// Graph → screen space
pub fn renderer_point_to_point(point: XYPosition, viewport: &Viewport) -> XYPosition {
    XYPosition::new(
        point.x * viewport.zoom + viewport.x,
        point.y * viewport.zoom + viewport.y,
    )
}

/// Screen-space rectangle → graph space (pan removed, zoom divided out)
pub fn rect_to_graph(rect: &Rect, viewport: &Viewport) -> Rect {
    let z = if viewport.zoom > 0.0 { viewport.zoom } else { 1.0 };
    Rect::new(
        (rect.x - viewport.x) / z,
        (rect.y - viewport.y) / z,
        rect.width / z,
        rect.height / z,
    )
}

pub fn snap_position(position: XYPosition, [gx, gy]: [f32; 2]) -> XYPosition {
    XYPosition::new((position.x / gx).round() * gx, (position.y / gy).round() * gy)
}

/// Keep a box of `dimensions` at `position` inside `extent`
pub fn clamp_position(
    position: XYPosition,
    extent: [[f32; 2]; 2],
    dimensions: Dimensions,
) -> XYPosition {
    let [[min_x, min_y], [max_x, max_y]] = extent;
    let max_x = (max_x - dimensions.width).max(min_x);
    let max_y = (max_y - dimensions.height).max(min_y);
    XYPosition::new(position.x.clamp(min_x, max_x), position.y.clamp(min_y, max_y))
}

/// Find all nodes inside a graph-space rectangle
pub fn nodes_in_rect<'a, N, I>(rect: &Rect, nodes: I, partially: bool) -> Vec<&'a N>
where
    N: NodeGeometry + 'a,
    I: IntoIterator<Item = &'a N>,
{
    nodes
        .into_iter()
        .filter(|node| rect_intersects(&node.rect(), rect, partially))
        .collect()
}
