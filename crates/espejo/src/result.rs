//! Result and error types for Espejo.

use crate::adapter::RendererMode;
use crate::renderer::SessionState;
use thiserror::Error;

/// Result type for Espejo operations
pub type EspejoResult<T> = Result<T, EspejoError>;

/// Errors that can occur in Espejo
///
/// Usage and contract violations (wrong mode, wrong lifecycle state,
/// ambiguous host-node resolution) are surfaced here and propagate to the
/// caller. Normalization gaps are deliberately *not* errors: an internal
/// engine shape a normalizer does not recognize collapses to `None` with a
/// diagnostic, so one unrecognized subtree never aborts a whole snapshot.
#[derive(Debug, Error)]
pub enum EspejoError {
    /// Operation is not defined for the renderer's mode
    #[error("{operation} is not supported by a {mode} renderer")]
    ModeUnsupported {
        /// Operation that was attempted
        operation: String,
        /// Mode of the renderer it was attempted on
        mode: RendererMode,
    },

    /// Operation called in the wrong session lifecycle state
    #[error("{operation} is not valid while the session is {state}")]
    InvalidState {
        /// Operation that was attempted
        operation: String,
        /// State the session was in
        state: SessionState,
    },

    /// Mount target is already exclusively owned by a live session
    #[error("mount target is already owned by another live session")]
    TargetInUse,

    /// Host-node resolution hit a multi-node sequence
    #[error("cannot resolve a single host node: {description}")]
    AmbiguousHostNode {
        /// What made the resolution ambiguous
        description: String,
    },

    /// Host-node resolution walked off the end of the rendered chain
    #[error("no host node backs this node: {description}")]
    MissingHostNode {
        /// Where the walk terminated
        description: String,
    },

    /// Simulated event name is not recognized by the event bridge
    #[error("simulated event '{event}' does not exist")]
    UnknownEvent {
        /// Event name as supplied by the caller
        event: String,
    },

    /// Host engine rejected an operation
    #[error("engine error: {message}")]
    Engine {
        /// Error message
        message: String,
    },
}

impl EspejoError {
    /// Convenience constructor for engine-side failures
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Convenience constructor for lifecycle misuse
    #[must_use]
    pub fn invalid_state(operation: impl Into<String>, state: SessionState) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state,
        }
    }

    /// Convenience constructor for mode misuse
    #[must_use]
    pub fn mode_unsupported(operation: impl Into<String>, mode: RendererMode) -> Self {
        Self::ModeUnsupported {
            operation: operation.into(),
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EspejoError::mode_unsupported("get_node", RendererMode::String);
        assert_eq!(
            err.to_string(),
            "get_node is not supported by a string renderer"
        );

        let err = EspejoError::invalid_state("render", SessionState::Unmounted);
        assert_eq!(
            err.to_string(),
            "render is not valid while the session is unmounted"
        );

        let err = EspejoError::UnknownEvent {
            event: "flurb".into(),
        };
        assert_eq!(err.to_string(), "simulated event 'flurb' does not exist");
    }

    #[test]
    fn test_engine_constructor() {
        let err = EspejoError::engine("mount point vanished");
        assert_eq!(err.to_string(), "engine error: mount point vanished");
    }
}
