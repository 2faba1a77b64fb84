//! Workflow error types.

use thiserror::Error;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Workflow definition is invalid.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// A plugger addressed a socket the aggregator does not declare.
    #[error("aggregator '{aggregator}' has no socket '{socket}'")]
    UnknownSocket {
        /// Name of the aggregator node.
        aggregator: String,
        /// Name of the missing socket.
        socket: String,
    },

    /// A payload did not match the type a node or link expects.
    #[error("payload mismatch at '{at}': {source}")]
    Payload {
        /// Node or link where the mismatch happened.
        at: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Node execution failed.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        /// Name of the failed node.
        node: String,
        /// Error raised by the node.
        #[source]
        source: Box<WorkflowError>,
    },

    /// Applying a link failed.
    #[error("link {from} -> {to} failed: {source}")]
    LinkFailed {
        /// Name of the source node.
        from: String,
        /// Name of the target node.
        to: String,
        /// Error raised by the link.
        #[source]
        source: Box<WorkflowError>,
    },

    /// Domain error raised from inside a worker or link.
    #[error(transparent)]
    Task(#[from] portage_core::Error),

    /// Workflow execution was cancelled.
    #[error("workflow execution cancelled")]
    Cancelled,

    /// Workflow execution timed out.
    #[error("workflow execution timed out")]
    Timeout,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Creates a payload mismatch error.
    pub fn payload(at: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Payload {
            at: at.into(),
            source,
        }
    }

    /// Wraps this error with the node it came from.
    pub fn in_node(self, node: impl Into<String>) -> Self {
        match self {
            Self::Cancelled | Self::Timeout => self,
            other => Self::NodeFailed {
                node: node.into(),
                source: Box::new(other),
            },
        }
    }

    /// Wraps this error with the link it came from.
    pub fn in_link(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        match self {
            Self::Cancelled | Self::Timeout => self,
            other => Self::LinkFailed {
                from: from.into(),
                to: to.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns true if the failing operation may succeed on retry.
    ///
    /// Only errors raised directly by a worker are considered: failures
    /// already attributed to a nested node were retried there.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Task(error) => error.is_retryable(),
            _ => false,
        }
    }

    /// Returns the innermost error, unwrapping node and link attribution.
    pub fn root_cause(&self) -> &WorkflowError {
        match self {
            Self::NodeFailed { source, .. } | Self::LinkFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_only_for_transient_task_errors() {
        let transient = WorkflowError::from(portage_core::Error::rate_limited());
        assert!(transient.is_retryable());

        let permanent = WorkflowError::from(portage_core::Error::invalid_input());
        assert!(!permanent.is_retryable());

        let attributed = transient.in_node("converter");
        assert!(!attributed.is_retryable());
    }

    #[test]
    fn attribution_keeps_root_cause() {
        let error = WorkflowError::from(portage_core::Error::parse().with_message("bad"))
            .in_node("inner")
            .in_node("outer");
        assert_eq!(
            error.to_string(),
            "node 'outer' failed: node 'inner' failed: parse: bad"
        );
        assert!(matches!(error.root_cause(), WorkflowError::Task(_)));
    }

    #[test]
    fn cancellation_is_not_attributed() {
        let error = WorkflowError::Cancelled.in_node("worker");
        assert!(matches!(error, WorkflowError::Cancelled));
    }
}
