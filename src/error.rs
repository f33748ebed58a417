//! Error taxonomy for match client operations.
//!
//! Local precondition failures (not-my-turn, occupied cell, inactive match)
//! are not errors; they are returned as rejection values from the optimistic
//! move path. Everything here represents a remote or lifecycle fault that the
//! UI layer should report. No operation retries automatically.

use derive_more::{Display, Error};

/// Failure reported by the Transport Session collaborator.
#[derive(Debug, Clone, Display, Error)]
#[display("transport error: {message}")]
pub struct TransportError {
    /// Human-readable description from the transport layer.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`MatchCoordinator`](crate::MatchCoordinator) operations.
#[derive(Debug, Display, Error)]
pub enum MatchClientError {
    /// Operation requires an active match and none is joined.
    #[display("not in a match")]
    NotInMatch,
    /// Remote matchmaking returned no usable match identifier.
    #[display("matchmaking failed: {reason}")]
    MatchmakingFailed {
        /// Why no match could be obtained.
        reason: String,
    },
    /// Transport-level send failure for a move; no local state was changed.
    #[display("move transmission failed: {source}")]
    MoveTransmissionFailed {
        /// Underlying transport failure.
        source: TransportError,
    },
    /// Session establishment with the authority failed.
    #[display("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Why the session could not be established.
        reason: String,
    },
    /// Any other remote-call failure, propagated verbatim to the caller.
    #[display("{_0}")]
    Transport(TransportError),
}

impl From<TransportError> for MatchClientError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}
