//! Camera math: fitting bounds into the pane, zooming around a point and
//! animated viewport transitions.

use crate::geometry::{get_nodes_bounds, renderer_point_to_point};
use crate::types::{Dimensions, InternalNode, Rect, Viewport, XYPosition};
use std::fmt;
use std::time::Duration;

/// Zoom step used by `zoom_in` / `zoom_out`.
pub const ZOOM_STEP: f32 = 1.2;

/// One padding amount, resolved against a pane dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaddingValue {
    /// Fraction of the fitted content: `floor((dim - dim / (1 + p)) / 2)`.
    Ratio(f32),
    /// Absolute screen pixels.
    Px(f32),
    /// Percentage of the pane dimension.
    Percent(f32),
}

impl PaddingValue {
    pub fn resolve(self, dimension: f32) -> f32 {
        match self {
            Self::Ratio(p) => ((dimension - dimension / (1.0 + p)) * 0.5).floor(),
            Self::Px(px) => px.floor(),
            Self::Percent(pct) => (dimension * pct * 0.01).floor(),
        }
    }
}

/// Padding around fitted content, uniform or per side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Padding {
    Ratio(f32),
    Px(f32),
    Percent(f32),
    Sides {
        top: PaddingValue,
        right: PaddingValue,
        bottom: PaddingValue,
        left: PaddingValue,
    },
}

impl Default for Padding {
    fn default() -> Self {
        Self::Ratio(0.1)
    }
}

impl From<f32> for Padding {
    fn from(ratio: f32) -> Self {
        Self::Ratio(ratio)
    }
}

/// Padding resolved to screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Paddings {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Paddings {
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl Padding {
    pub fn resolve(&self, width: f32, height: f32) -> Paddings {
        let uniform = |value: PaddingValue| Paddings {
            top: value.resolve(height),
            right: value.resolve(width),
            bottom: value.resolve(height),
            left: value.resolve(width),
        };
        match *self {
            Self::Ratio(p) => uniform(PaddingValue::Ratio(p)),
            Self::Px(px) => uniform(PaddingValue::Px(px)),
            Self::Percent(pct) => uniform(PaddingValue::Percent(pct)),
            Self::Sides {
                top,
                right,
                bottom,
                left,
            } => Paddings {
                top: top.resolve(height),
                right: right.resolve(width),
                bottom: bottom.resolve(height),
                left: left.resolve(width),
            },
        }
    }
}

/// Options for `fit_view`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitViewOptions {
    pub padding: Padding,
    pub include_hidden_nodes: bool,
    /// Overrides the configured minimum zoom for this fit.
    pub min_zoom: Option<f32>,
    /// Overrides the configured maximum zoom for this fit.
    pub max_zoom: Option<f32>,
    /// Animate over this duration instead of jumping.
    pub duration: Option<Duration>,
    /// Restrict fitting to these node ids.
    pub nodes: Option<Vec<String>>,
}

impl FitViewOptions {
    pub fn with_padding(mut self, padding: impl Into<Padding>) -> Self {
        self.padding = padding.into();
        self
    }

    pub fn with_nodes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Viewport that frames `bounds` inside a `width` × `height` pane.
///
/// Zero-sized bounds are treated as 1 unit wide/high.
pub fn get_viewport_for_bounds(
    bounds: &Rect,
    width: f32,
    height: f32,
    min_zoom: f32,
    max_zoom: f32,
    padding: &Padding,
) -> Viewport {
    let p = padding.resolve(width, height);
    let bounds = Rect::new(bounds.x, bounds.y, bounds.width.max(1.0), bounds.height.max(1.0));

    let x_zoom = (width - p.horizontal()) / bounds.width;
    let y_zoom = (height - p.vertical()) / bounds.height;
    let zoom = x_zoom.min(y_zoom).clamp(min_zoom, max_zoom);

    let center = bounds.center();
    let x = width / 2.0 - center.x * zoom;
    let y = height / 2.0 - center.y * zoom;

    // Shift so that an asymmetric padding is honored where the content fits
    let applied = applied_paddings(&bounds, &Viewport::new(x, y, zoom), width, height);
    let left = (applied.left - p.left).min(0.0);
    let top = (applied.top - p.top).min(0.0);
    let right = (applied.right - p.right).min(0.0);
    let bottom = (applied.bottom - p.bottom).min(0.0);

    Viewport::new(x - left + right, y - top + bottom, zoom)
}

fn applied_paddings(bounds: &Rect, viewport: &Viewport, width: f32, height: f32) -> Paddings {
    let top_left = renderer_point_to_point(XYPosition::new(bounds.x, bounds.y), viewport);
    let bottom_right =
        renderer_point_to_point(XYPosition::new(bounds.right(), bounds.bottom()), viewport);
    Paddings {
        top: top_left.y.floor(),
        right: (width - bottom_right.x).floor(),
        bottom: (height - bottom_right.y).floor(),
        left: top_left.x.floor(),
    }
}

/// Whether a node is selected by the fit options, measured or not.
pub fn is_fit_target(node: &InternalNode, options: &FitViewOptions) -> bool {
    (options.include_hidden_nodes || !node.node.hidden)
        && options
            .nodes
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| *id == node.node.id))
}

/// Whether a node takes part in a fit.
pub fn is_fit_candidate(node: &InternalNode, options: &FitViewOptions) -> bool {
    node.is_measured() && is_fit_target(node, options)
}

/// Viewport framing the fit candidates among `nodes`, or `None` when there
/// are none or the pane has no size.
pub fn fit_view_viewport<'a, I>(
    nodes: I,
    pane: Dimensions,
    min_zoom: f32,
    max_zoom: f32,
    options: &FitViewOptions,
) -> Option<Viewport>
where
    I: IntoIterator<Item = &'a InternalNode>,
{
    if !pane.is_positive() {
        return None;
    }
    let bounds = get_nodes_bounds(nodes.into_iter().filter(|n| is_fit_candidate(n, options)))?;
    Some(get_viewport_for_bounds(
        &bounds,
        pane.width,
        pane.height,
        options.min_zoom.unwrap_or(min_zoom),
        options.max_zoom.unwrap_or(max_zoom),
        &options.padding,
    ))
}

/// Change zoom while keeping the screen point `anchor` fixed.
pub fn zoom_around(viewport: &Viewport, anchor: XYPosition, zoom: f32) -> Viewport {
    let current = if viewport.zoom > 0.0 { viewport.zoom } else { 1.0 };
    let ratio = zoom / current;
    Viewport::new(
        anchor.x - (anchor.x - viewport.x) * ratio,
        anchor.y - (anchor.y - viewport.y) * ratio,
        zoom,
    )
}

/// Viewport that puts the graph point `center` in the middle of the pane.
pub fn viewport_centered_on(center: XYPosition, zoom: f32, pane: Dimensions) -> Viewport {
    Viewport::new(
        pane.width / 2.0 - center.x * zoom,
        pane.height / 2.0 - center.y * zoom,
        zoom,
    )
}

// ============================================================================
// Transitions
// ============================================================================

pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Called once when a transition ends; the flag is `false` when it was
/// interrupted by another viewport change.
pub type TransitionCallback = Box<dyn FnOnce(bool)>;

/// An in-flight animated viewport change.
pub struct ViewportTransition {
    from: Viewport,
    to: Viewport,
    duration: Duration,
    elapsed: Duration,
    callbacks: Vec<TransitionCallback>,
}

impl ViewportTransition {
    pub fn new(from: Viewport, to: Viewport, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            callbacks: Vec::new(),
        }
    }

    pub fn on_complete(&mut self, callback: TransitionCallback) {
        self.callbacks.push(callback);
    }

    pub fn target(&self) -> Viewport {
        self.to
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Viewport at the current point of the animation.
    pub fn current(&self) -> Viewport {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = ease_in_out_cubic(self.elapsed.as_secs_f32() / self.duration.as_secs_f32());
        let lerp = |a: f32, b: f32| a + (b - a) * t;
        Viewport::new(
            lerp(self.from.x, self.to.x),
            lerp(self.from.y, self.to.y),
            lerp(self.from.zoom, self.to.zoom),
        )
    }

    /// Move the animation forward by `dt` and return the new viewport.
    pub fn advance(&mut self, dt: Duration) -> Viewport {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.current()
    }

    /// Consume the transition, handing back its completion callbacks.
    pub fn into_callbacks(self) -> Vec<TransitionCallback> {
        self.callbacks
    }
}

impl fmt::Debug for ViewportTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportTransition")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
