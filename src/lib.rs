//! Gridmatch - match-state synchronization and turn protocol client.
//!
//! Client-side engine for a two-player turn-based match service backed by a
//! remote authority. The authority enforces the game rules; this crate
//! reconciles its opcode-tagged pushes (snapshots, terminal events, errors)
//! with optimistic local input into a single consistent view.
//!
//! # Architecture
//!
//! - **Coordinator**: match lifecycle, serialized join/leave, the optimistic
//!   move path, and the single reconciling event consumer per match
//! - **Reconciler**: wholesale snapshot folding, sticky symbol assignment,
//!   provisional move overlay
//! - **Turn clock**: local 1 Hz countdown against the remote turn deadline
//! - **Score**: deterministic optimistic scoring of terminal outcomes
//! - **Transport**: the trait contract consumed from the external session
//!   layer
//!
//! # Example
//!
//! ```no_run
//! use gridmatch::{GameMode, MatchAction, MatchCoordinator, MatchEvent};
//! # use std::sync::Arc;
//!
//! # async fn example<T: gridmatch::MatchTransport>(transport: Arc<T>) -> Result<(), gridmatch::MatchClientError> {
//! let coordinator = MatchCoordinator::authenticate(transport, "device-1", "ana").await?;
//!
//! coordinator.set_event_handler(|event| match event {
//!     MatchEvent::StateChanged(view) => { /* render */ }
//!     MatchEvent::GameOver { score, .. } => println!("{score}"),
//!     MatchEvent::ErrorMessage(msg) => eprintln!("{msg}"),
//! });
//!
//! let ticket = coordinator
//!     .find_or_join(GameMode::Standard, MatchAction::JoinRandom)
//!     .await?;
//! println!("joined {}", ticket.match_id);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod clock;
mod coordinator;
mod error;
mod protocol;
mod reconciler;
mod score;
mod transport;

// Crate-level exports - errors
pub use error::{MatchClientError, TransportError};

// Crate-level exports - wire contract
pub use protocol::{
    Board, EndReason, ErrorPayload, GameMode, GameStatus, LeaderboardRecord, Mark, MatchAction,
    MatchOutcome, MatchState, MatchTicket, MoveData, PlayerInfo, OP_ERROR, OP_GAME_OVER,
    OP_GAME_STATE, OP_PLAYER_MOVE,
};

// Crate-level exports - transport contract
pub use transport::{EventCallback, MatchTransport, SessionInfo};

// Crate-level exports - reconciliation
pub use reconciler::{LocalMatchView, MoveRejection, OutcomeView, Reconciler};

// Crate-level exports - turn clock
pub use clock::{TurnClock, TurnExpiry};

// Crate-level exports - scoring
pub use score::{compute_score, PlayerResult, ScoreComponent, ScorePolicy, ScoreResult};

// Crate-level exports - coordination
pub use coordinator::{MatchCoordinator, MatchEvent, MoveAttempt};
