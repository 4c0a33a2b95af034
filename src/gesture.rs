//! Normalized pointer payloads and pointer-capture guards.
//!
//! The engine never registers listeners itself. A host that routes
//! pointer-move/up events to a gesture hands over a [`PointerCapture`]; the
//! gesture keeps it for as long as it runs and dropping it (on completion,
//! cancellation or when the gesture is replaced) calls the host's release
//! closure exactly once.

use crate::types::XYPosition;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// A pointer-down on the pane, pre-filtered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanePointerEvent {
    /// Screen-space position relative to the pane.
    pub position: XYPosition,
    pub button: PointerButton,
    /// The press hit the pane background, not a node or edge.
    pub on_background: bool,
    /// The multi-select modifier is held.
    pub multi_select: bool,
}

impl PanePointerEvent {
    pub fn background(x: f32, y: f32) -> Self {
        Self {
            position: XYPosition::new(x, y),
            button: PointerButton::Primary,
            on_background: true,
            multi_select: false,
        }
    }

    pub fn with_multi_select(mut self, multi_select: bool) -> Self {
        self.multi_select = multi_select;
        self
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

/// RAII token for listeners the host registered on behalf of a gesture.
pub struct PointerCapture {
    release: Option<Box<dyn FnOnce()>>,
}

impl PointerCapture {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A capture with nothing to release (hosts that poll instead of listen).
    pub fn none() -> Self {
        Self { release: None }
    }

    /// Run the release closure now. Later calls and the drop are no-ops.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_held(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for PointerCapture {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for PointerCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerCapture")
            .field("held", &self.is_held())
            .finish()
    }
}
