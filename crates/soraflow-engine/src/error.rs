//! Engine error types

use thiserror::Error;

/// Errors raised while planning or applying a stack
#[derive(Error, Debug)]
pub enum EngineError {
    /// Build-time validation failure from graph construction
    #[error(transparent)]
    Graph(#[from] soraflow_core::StackError),

    /// A reference's source had not produced the needed output when the
    /// executor reached the referencing operation. Indicates an ordering
    /// bug in the planner, not a user error.
    #[error("unresolved reference {reference} while applying {node}")]
    UnresolvedReference { node: String, reference: String },

    /// A provider call failed while realizing or destroying a resource
    #[error("provider failed for {node}: {message}")]
    Provider { node: String, message: String },

    #[error("state file error: {0}")]
    State(String),

    #[error("lock acquisition failed: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
