//! Error types and the error-reporting hook.
//!
//! Hard failures are [`FlowError`]s returned from fallible calls. Everything
//! the engine can recover from on its own (unknown node types, missing
//! handles, a cyclic parent chain during recomputation) is *reported*
//! through an [`ErrorReporter`] instead and never surfaces as an `Err`.

use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Errors returned by fallible store operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// The parent chain of `node_id` loops back onto itself.
    #[error("Cyclic parent hierarchy detected at node {node_id}")]
    CyclicHierarchy { node_id: String },
    #[error("Node {0} not found")]
    NodeNotFound(String),
    #[error("Edge {0} not found")]
    EdgeNotFound(String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Snapshot could not be parsed: {0}")]
    Snapshot(String),
}

/// Reasons a [`FlowConfig`](crate::config::FlowConfig) is rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("min_zoom must be positive, got {0}")]
    NonPositiveMinZoom(f32),
    #[error("max_zoom ({max}) must not be smaller than min_zoom ({min})")]
    ZoomRangeInverted { min: f32, max: f32 },
    #[error("snap_grid values must be positive, got [{0}, {1}]")]
    InvalidSnapGrid(f32, f32),
    #[error("connection_radius must not be negative, got {0}")]
    NegativeConnectionRadius(f32),
    #[error("{0}")]
    Parse(String),
}

/// Codes for recoverable problems reported through the error hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A node references a type that is not registered.
    NodeTypeMissing,
    /// An edge references a type that is not registered.
    EdgeTypeMissing,
    /// A node's `parent_id` points at a node that does not exist.
    ParentNotFound,
    /// A parent chain contains a cycle.
    CyclicHierarchy,
    /// An edge references a node that does not exist.
    EdgeEndpointMissing,
    /// An edge references a handle the node does not expose.
    HandleMissing,
    /// An operation was requested for an id the store does not know.
    UnknownElement,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodeTypeMissing => "node-type-missing",
            Self::EdgeTypeMissing => "edge-type-missing",
            Self::ParentNotFound => "parent-not-found",
            Self::CyclicHierarchy => "cyclic-hierarchy",
            Self::EdgeEndpointMissing => "edge-endpoint-missing",
            Self::HandleMissing => "handle-missing",
            Self::UnknownElement => "unknown-element",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single hook every recoverable error goes through.
///
/// Cloning shares the underlying handler. The default reporter logs at
/// `warn` level.
#[derive(Clone)]
pub struct ErrorReporter {
    handler: Rc<dyn Fn(ErrorCode, &str)>,
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(|code, message| {
            tracing::warn!(code = code.as_str(), "{}", message);
        })
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter").finish_non_exhaustive()
    }
}

impl ErrorReporter {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ErrorCode, &str) + 'static,
    {
        Self {
            handler: Rc::new(handler),
        }
    }

    pub fn report(&self, code: ErrorCode, message: impl AsRef<str>) {
        (self.handler)(code, message.as_ref());
    }
}
