//! Host-facing controller for flow applications.
//!
//! The [`FlowController`] owns the [`GraphStore`], the gesture engines and
//! the Slint [`FlowModels`], and turns UI callbacks into store mutations.
//!
//! # Example
//!
//! ```ignore
//! use slint_flow::{FlowController, FlowConfig};
//!
//! slint::include_modules!();
//!
//! fn main() {
//!     let window = MainWindow::new().unwrap();
//!     let ctrl = FlowController::new(FlowConfig::default()).unwrap();
//!
//!     window.set_nodes(ctrl.nodes_model());
//!     window.set_edges(ctrl.edges_model());
//!
//!     // Renderer reports
//!     window.on_node_size_changed(ctrl.node_size_changed_callback());
//!     window.on_pane_size_changed(ctrl.pane_size_changed_callback());
//!
//!     // Interaction
//!     window.on_node_clicked(ctrl.node_clicked_callback());
//!     window.on_node_drag_started(ctrl.node_drag_started_callback());
//!     window.on_node_drag_moved(ctrl.node_drag_moved_callback());
//!     window.on_node_drag_ended(ctrl.node_drag_ended_callback());
//!
//!     ctrl.on_viewport_change({
//!         let w = window.as_weak();
//!         move |vp| {
//!             if let Some(w) = w.upgrade() {
//!                 w.set_viewport_x(vp.x);
//!                 w.set_viewport_y(vp.y);
//!                 w.set_zoom(vp.zoom);
//!             }
//!         }
//!     });
//!     ctrl.start_transition_timer();
//!
//!     window.run().unwrap();
//! }
//! ```
//!
//! # Reentrancy
//!
//! Listeners run after the store borrow has been released, so they may read
//! the store freely. Mutations requested while a batch is being applied or
//! while listeners run are queued and applied after the current batch, in
//! the order they were requested.

use crate::changes::{EdgeChange, NodeChange};
use crate::config::FlowConfig;
use crate::connection::{ConnectionEngine, ConnectionOutcome, ConnectionState, HandleRef};
use crate::drag::NodeDrag;
use crate::error::{ErrorCode, ErrorReporter, FlowError};
use crate::gesture::{PanePointerEvent, PointerCapture};
use crate::selection::{MarqueeSelection, SelectionManager, SelectionOutcome};
use crate::store::{GraphStore, StoreEvent};
use crate::types::{Connection, Dimensions, HandleBounds, Viewport, XYPosition};
use crate::views::{EdgeView, FlowModels, NodeView};
use slint::{Model, ModelRc, SharedString, TimerMode, VecModel};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

/// Frame interval of the transition timer.
const TRANSITION_FRAME: Duration = Duration::from_millis(16);

/// The gesture engines, borrowed together with the store.
#[derive(Default)]
struct Gestures {
    marquee: MarqueeSelection,
    connection: ConnectionEngine,
    drag: NodeDrag,
}

type Job = Box<dyn FnOnce(&mut GraphStore, &mut Gestures)>;

#[derive(Default)]
struct Listeners {
    events: RefCell<Vec<Rc<dyn Fn(&StoreEvent)>>>,
    nodes: RefCell<Vec<Rc<dyn Fn(&[NodeChange])>>>,
    edges: RefCell<Vec<Rc<dyn Fn(&[EdgeChange])>>>,
    connect: RefCell<Vec<Rc<dyn Fn(&Connection)>>>,
    selection: RefCell<Vec<Rc<dyn Fn(&[String], &[String])>>>,
    viewport: RefCell<Vec<Rc<dyn Fn(Viewport)>>>,
    error: RefCell<Vec<Rc<dyn Fn(ErrorCode, &str)>>>,
}

/// Snapshot of a listener list, so listeners may register further listeners.
fn snapshot<T: ?Sized>(list: &RefCell<Vec<Rc<T>>>) -> Vec<Rc<T>> {
    list.borrow().clone()
}

struct Inner {
    store: RefCell<GraphStore>,
    gestures: RefCell<Gestures>,
    models: RefCell<FlowModels>,
    listeners: Listeners,
    /// A batch is being applied or listeners are running
    busy: Cell<bool>,
    queue: RefCell<VecDeque<Job>>,
    /// Errors reported during the current batch, delivered once it is done
    errors: Rc<RefCell<Vec<(ErrorCode, String)>>>,
    timer: slint::Timer,
    animate: Cell<bool>,
}

/// Controller that owns the flow state and provides callback implementations.
///
/// Clone this controller to share it across callbacks.
#[derive(Clone)]
pub struct FlowController {
    inner: Rc<Inner>,
}

impl Default for FlowController {
    fn default() -> Self {
        Self::with_store(GraphStore::default())
    }
}

impl FlowController {
    /// Create a controller with an empty graph. Fails on an invalid config.
    pub fn new(config: FlowConfig) -> Result<Self, FlowError> {
        config.validate()?;
        Ok(Self::with_store(GraphStore::new(config)))
    }

    /// Wrap an existing store. Its error reporter is replaced by one that
    /// logs and forwards to [`on_error`](Self::on_error) listeners.
    pub fn with_store(mut store: GraphStore) -> Self {
        let errors: Rc<RefCell<Vec<(ErrorCode, String)>>> = Rc::default();
        store.set_reporter(ErrorReporter::new({
            let errors = errors.clone();
            move |code, message| {
                tracing::warn!(code = code.as_str(), "{}", message);
                errors.borrow_mut().push((code, message.to_string()));
            }
        }));
        let models = FlowModels::new();
        models.sync(&store);
        Self {
            inner: Rc::new(Inner {
                store: RefCell::new(store),
                gestures: RefCell::default(),
                models: RefCell::new(models),
                listeners: Listeners::default(),
                busy: Cell::new(false),
                queue: RefCell::default(),
                errors,
                timer: slint::Timer::default(),
                animate: Cell::new(false),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Apply a batch of store mutations, then sync the models and notify
    /// listeners once. Inside a listener the batch is queued instead.
    pub fn batch<F>(&self, f: F)
    where
        F: FnOnce(&mut GraphStore) + 'static,
    {
        self.apply(move |store, _| f(store));
    }

    /// Read the store. Must not be called from inside [`batch`](Self::batch).
    pub fn read<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R {
        f(&self.inner.store.borrow())
    }

    /// Whether a batch or listener dispatch is in progress.
    pub fn is_dispatching(&self) -> bool {
        self.inner.busy.get()
    }

    /// Run `f` now, or queue it when called during a dispatch (then `None`).
    fn apply<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut GraphStore, &mut Gestures) -> R + 'static,
    {
        if self.inner.busy.get() {
            tracing::debug!("deferring mutation requested during dispatch");
            self.inner
                .queue
                .borrow_mut()
                .push_back(Box::new(move |store, gestures| {
                    f(store, gestures);
                }));
            return None;
        }

        self.inner.busy.set(true);
        let result = self.run(f);
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            match next {
                Some(job) => {
                    self.run(job);
                }
                None => break,
            }
        }
        self.inner.busy.set(false);
        Some(result)
    }

    fn run<R>(&self, f: impl FnOnce(&mut GraphStore, &mut Gestures) -> R) -> R {
        let (result, events, callbacks, transitioning) = {
            let mut store = self.inner.store.borrow_mut();
            let mut gestures = self.inner.gestures.borrow_mut();
            let result = f(&mut *store, &mut *gestures);
            (
                result,
                store.take_events(),
                store.take_transition_callbacks(),
                store.is_transitioning(),
            )
        };

        if !events.is_empty() {
            self.inner.models.borrow().sync(&self.inner.store.borrow());
        }
        self.dispatch(&events);

        let errors = std::mem::take(&mut *self.inner.errors.borrow_mut());
        if !errors.is_empty() {
            let listeners = snapshot(&self.inner.listeners.error);
            for (code, message) in &errors {
                for listener in &listeners {
                    listener(*code, message);
                }
            }
        }

        for (callback, completed) in callbacks {
            callback(completed);
        }
        if transitioning && self.inner.animate.get() && !self.inner.timer.running() {
            self.start_timer();
        }
        result
    }

    fn dispatch(&self, events: &[StoreEvent]) {
        let listeners = &self.inner.listeners;
        for event in events {
            for listener in snapshot(&listeners.events) {
                listener(event);
            }
            match event {
                StoreEvent::NodesChanged(changes) => {
                    for listener in snapshot(&listeners.nodes) {
                        listener(changes);
                    }
                }
                StoreEvent::EdgesChanged(changes) => {
                    for listener in snapshot(&listeners.edges) {
                        listener(changes);
                    }
                }
                StoreEvent::Connected(connection) => {
                    for listener in snapshot(&listeners.connect) {
                        listener(connection);
                    }
                }
                StoreEvent::SelectionChanged { nodes, edges } => {
                    for listener in snapshot(&listeners.selection) {
                        listener(nodes, edges);
                    }
                }
                StoreEvent::ViewportChanged(viewport) => {
                    for listener in snapshot(&listeners.viewport) {
                        listener(*viewport);
                    }
                }
                StoreEvent::NodesReset | StoreEvent::EdgesReset | StoreEvent::HandlesChanged(_) => {}
            }
        }
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    /// Every store event, in order.
    pub fn on_event(&self, f: impl Fn(&StoreEvent) + 'static) {
        self.inner.listeners.events.borrow_mut().push(Rc::new(f));
    }

    pub fn on_nodes_change(&self, f: impl Fn(&[NodeChange]) + 'static) {
        self.inner.listeners.nodes.borrow_mut().push(Rc::new(f));
    }

    pub fn on_edges_change(&self, f: impl Fn(&[EdgeChange]) + 'static) {
        self.inner.listeners.edges.borrow_mut().push(Rc::new(f));
    }

    pub fn on_connect(&self, f: impl Fn(&Connection) + 'static) {
        self.inner.listeners.connect.borrow_mut().push(Rc::new(f));
    }

    /// Called with the sorted ids of the selected nodes and edges.
    pub fn on_selection_change(&self, f: impl Fn(&[String], &[String]) + 'static) {
        self.inner.listeners.selection.borrow_mut().push(Rc::new(f));
    }

    pub fn on_viewport_change(&self, f: impl Fn(Viewport) + 'static) {
        self.inner.listeners.viewport.borrow_mut().push(Rc::new(f));
    }

    /// Recoverable problems (unknown types, missing handles, cycles).
    pub fn on_error(&self, f: impl Fn(ErrorCode, &str) + 'static) {
        self.inner.listeners.error.borrow_mut().push(Rc::new(f));
    }

    // ------------------------------------------------------------------------
    // Models
    // ------------------------------------------------------------------------

    pub fn nodes_model(&self) -> ModelRc<NodeView> {
        self.inner.models.borrow().nodes()
    }

    pub fn edges_model(&self) -> ModelRc<EdgeView> {
        self.inner.models.borrow().edges()
    }

    pub fn selected_nodes_model(&self) -> ModelRc<SharedString> {
        self.inner.models.borrow().selected_nodes()
    }

    pub fn selected_edges_model(&self) -> ModelRc<SharedString> {
        self.inner.models.borrow().selected_edges()
    }

    /// Keep a host model of generated Slint structs in sync with the nodes.
    pub fn bind_nodes_model<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + PartialEq + 'static,
        F: Fn(&NodeView) -> P + 'static,
    {
        self.inner.models.borrow_mut().bind_nodes(model, constructor);
        self.inner.models.borrow().sync(&self.inner.store.borrow());
    }

    pub fn bind_edges_model<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + PartialEq + 'static,
        F: Fn(&EdgeView) -> P + 'static,
    {
        self.inner.models.borrow_mut().bind_edges(model, constructor);
        self.inner.models.borrow().sync(&self.inner.store.borrow());
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        self.read(GraphStore::viewport)
    }

    pub fn selected_node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read(GraphStore::selected_node_ids).into_iter().collect();
        ids.sort();
        ids
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.read(|store| store.connection_state().clone())
    }

    // ------------------------------------------------------------------------
    // Renderer reports
    // ------------------------------------------------------------------------

    /// Measured node size in graph units.
    pub fn update_node_dimensions(&self, id: &str, width: f32, height: f32) {
        let id = id.to_string();
        self.batch(move |store| store.update_measured_size(&id, Dimensions::new(width, height)));
    }

    /// Node size as laid out on screen: converted to graph units first.
    pub fn handle_node_size(&self, id: &str, width: f32, height: f32) {
        let zoom = self.viewport().zoom;
        let z = if zoom > 0.0 { zoom } else { 1.0 };
        self.update_node_dimensions(id, width / z, height / z);
    }

    /// Handle geometry, node-local and in graph units.
    pub fn update_handle_bounds(&self, id: &str, bounds: HandleBounds) {
        let id = id.to_string();
        self.batch(move |store| store.update_handle_bounds(&id, bounds));
    }

    pub fn set_pane_size(&self, width: f32, height: f32) {
        self.batch(move |store| store.set_pane_size(width, height));
    }

    // ------------------------------------------------------------------------
    // Click selection
    // ------------------------------------------------------------------------

    pub fn node_clicked(&self, id: &str, multi_select: bool) {
        let id = id.to_string();
        self.batch(move |store| store.select_node(&id, multi_select));
    }

    pub fn edge_clicked(&self, id: &str, multi_select: bool) {
        let id = id.to_string();
        self.batch(move |store| store.select_edge(&id, multi_select));
    }

    /// Select the nodes listed in a host-edited model (e.g. a list view),
    /// replacing the node selection. Unknown and unselectable ids are skipped.
    pub fn select_nodes_from_model(&self, model: &dyn Model<Data = SharedString>) {
        let mut selection = SelectionManager::new();
        selection.sync_from_model(model);
        let ids: Vec<String> = selection.ids().iter().cloned().collect();
        self.batch(move |store| {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            store.add_selected_nodes(&ids);
        });
    }

    // ------------------------------------------------------------------------
    // Marquee
    // ------------------------------------------------------------------------

    /// Press on the pane. Returns whether a marquee started.
    pub fn pane_pointer_down(&self, event: PanePointerEvent, capture: PointerCapture) -> bool {
        self.apply(move |store, g| g.marquee.pointer_down(&event, store, capture))
            .unwrap_or(false)
    }

    /// Pointer moved during a pane gesture (screen space).
    pub fn pane_pointer_move(&self, x: f32, y: f32) {
        let preview = self.apply(move |store, g| g.marquee.pointer_move(XYPosition::new(x, y), store));
        // The preview lives outside the event stream
        if matches!(preview, Some(Some(_))) {
            self.sync_models();
        }
    }

    pub fn pane_pointer_up(&self) -> SelectionOutcome {
        let outcome = self
            .apply(|store, g| g.marquee.pointer_up(store))
            .unwrap_or(SelectionOutcome::Inactive);
        if outcome != SelectionOutcome::Inactive {
            self.sync_models();
        }
        outcome
    }

    pub fn cancel_selection(&self) {
        if self.apply(|store, g| g.marquee.cancel(store)).is_some() {
            self.sync_models();
        }
    }

    fn sync_models(&self) {
        if self.inner.busy.get() {
            return;
        }
        self.inner.models.borrow().sync(&self.inner.store.borrow());
    }

    // ------------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------------

    /// Press on a handle. Returns whether drafting started.
    pub fn handle_pointer_down(&self, handle: HandleRef, capture: PointerCapture) -> bool {
        self.apply(move |store, g| g.connection.pointer_down(store, &handle, capture).is_some())
            .unwrap_or(false)
    }

    pub fn connection_pointer_move(&self, x: f32, y: f32) -> ConnectionState {
        self.apply(move |store, g| g.connection.pointer_move(store, XYPosition::new(x, y)))
            .unwrap_or_default()
    }

    pub fn connection_pointer_up(&self) -> ConnectionOutcome {
        self.apply(|store, g| g.connection.pointer_up(store))
            .unwrap_or(ConnectionOutcome::Inactive)
    }

    pub fn cancel_connection(&self) {
        self.apply(|store, g| g.connection.cancel(store));
    }

    // ------------------------------------------------------------------------
    // Node dragging
    // ------------------------------------------------------------------------

    pub fn node_drag_start(&self, id: &str, capture: PointerCapture) -> bool {
        let id = id.to_string();
        self.apply(move |store, g| g.drag.start(store, &id, capture))
            .unwrap_or(false)
    }

    /// `dx`/`dy`: screen-space pointer offset since the press.
    pub fn node_drag_move(&self, dx: f32, dy: f32) {
        self.apply(move |store, g| {
            g.drag.update(store, XYPosition::new(dx, dy));
        });
    }

    /// Returns the ids of the nodes that were dragged.
    pub fn node_drag_end(&self) -> Vec<String> {
        self.apply(|store, g| g.drag.end(store)).unwrap_or_default()
    }

    pub fn cancel_node_drag(&self) {
        self.apply(|store, g| g.drag.cancel(store));
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Step the running viewport transition by `dt`. Returns whether a
    /// transition is still running afterwards.
    pub fn advance_transitions(&self, dt: Duration) -> bool {
        self.apply(move |store, _| {
            store.advance_transitions(dt);
            store.is_transitioning()
        })
        .unwrap_or(true)
    }

    /// Drive transitions from a `slint::Timer` whenever one is running.
    pub fn start_transition_timer(&self) {
        self.inner.animate.set(true);
        if self.read(GraphStore::is_transitioning) {
            self.start_timer();
        }
    }

    pub fn stop_transition_timer(&self) {
        self.inner.animate.set(false);
        self.inner.timer.stop();
    }

    fn start_timer(&self) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let mut last = Instant::now();
        self.inner.timer.start(TimerMode::Repeated, TRANSITION_FRAME, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let ctrl = FlowController { inner };
            let now = Instant::now();
            let dt = now - last;
            last = now;
            if !ctrl.advance_transitions(dt) {
                ctrl.inner.timer.stop();
            }
        });
    }

    // === Callback factories ===

    /// Returns a callback for `node-size-changed(id, width, height)` (screen units).
    pub fn node_size_changed_callback(&self) -> impl Fn(SharedString, f32, f32) {
        let ctrl = self.clone();
        move |id, width, height| ctrl.handle_node_size(&id, width, height)
    }

    /// Returns a callback for `pane-size-changed(width, height)`.
    pub fn pane_size_changed_callback(&self) -> impl Fn(f32, f32) {
        let ctrl = self.clone();
        move |width, height| ctrl.set_pane_size(width, height)
    }

    /// Returns a callback for `node-clicked(id, multi-select)`.
    pub fn node_clicked_callback(&self) -> impl Fn(SharedString, bool) {
        let ctrl = self.clone();
        move |id, multi| ctrl.node_clicked(&id, multi)
    }

    /// Returns a callback for `edge-clicked(id, multi-select)`.
    pub fn edge_clicked_callback(&self) -> impl Fn(SharedString, bool) {
        let ctrl = self.clone();
        move |id, multi| ctrl.edge_clicked(&id, multi)
    }

    /// Returns a callback for `node-drag-started(id)`.
    pub fn node_drag_started_callback(&self) -> impl Fn(SharedString) {
        let ctrl = self.clone();
        move |id| {
            ctrl.node_drag_start(&id, PointerCapture::none());
        }
    }

    /// Returns a callback for `node-drag-moved(dx, dy)`.
    pub fn node_drag_moved_callback(&self) -> impl Fn(f32, f32) {
        let ctrl = self.clone();
        move |dx, dy| ctrl.node_drag_move(dx, dy)
    }

    /// Returns a callback for `node-drag-ended()`.
    pub fn node_drag_ended_callback(&self) -> impl Fn() {
        let ctrl = self.clone();
        move || {
            ctrl.node_drag_end();
        }
    }

    /// Returns a callback for `pane-pointer-down(x, y, multi-select)` on the background.
    pub fn pane_pointer_down_callback(&self) -> impl Fn(f32, f32, bool) -> bool {
        let ctrl = self.clone();
        move |x, y, multi| {
            let event = PanePointerEvent::background(x, y).with_multi_select(multi);
            ctrl.pane_pointer_down(event, PointerCapture::none())
        }
    }

    /// Returns a callback for `pane-pointer-moved(x, y)`.
    pub fn pane_pointer_moved_callback(&self) -> impl Fn(f32, f32) {
        let ctrl = self.clone();
        move |x, y| ctrl.pane_pointer_move(x, y)
    }

    /// Returns a callback for `pane-pointer-up()`.
    pub fn pane_pointer_up_callback(&self) -> impl Fn() {
        let ctrl = self.clone();
        move || {
            ctrl.pane_pointer_up();
        }
    }

    /// Returns a callback for `zoom-in()` / `zoom-out()` buttons.
    pub fn zoom_callback(&self, zoom_in: bool) -> impl Fn() {
        let ctrl = self.clone();
        move || {
            ctrl.batch(move |store| {
                if zoom_in {
                    store.zoom_in();
                } else {
                    store.zoom_out();
                }
            })
        }
    }
}
