//! Contract consumed from the Transport Session collaborator.
//!
//! The session layer (connect, reconnect, token storage) lives outside this
//! crate; the coordinator only depends on this trait, so it is independently
//! testable with a substitute transport.

use crate::error::TransportError;
use crate::protocol::{GameMode, LeaderboardRecord, MatchAction, MatchTicket, MoveData};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Consumer for inbound match events, keyed by opcode.
///
/// Single-slot per match: installing a callback replaces the previous one, so
/// at most one consumer ever observes a given match's pushes.
pub type EventCallback = Box<dyn FnMut(i64, serde_json::Value) + Send>;

/// Authenticated local identity, as established by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Stable identity the authority knows the local player by.
    pub user_id: String,
    /// Display name.
    pub username: String,
}

/// The persistent bidirectional channel to the match authority.
///
/// All calls are one-shot request/response or push registration; pushes for
/// the same match are delivered in arrival order through the registered
/// [`EventCallback`].
#[async_trait]
pub trait MatchTransport: Send + Sync {
    /// Establishes an authenticated session for the given device identity.
    async fn authenticate(
        &self,
        device_id: &str,
        username: &str,
    ) -> Result<SessionInfo, TransportError>;

    /// Requests matchmaking from the authority.
    async fn request_match(
        &self,
        mode: GameMode,
        action: MatchAction,
    ) -> Result<MatchTicket, TransportError>;

    /// Joins the given match on the socket.
    async fn join_match(&self, match_id: &str) -> Result<(), TransportError>;

    /// Leaves the given match on the socket.
    async fn leave_match(&self, match_id: &str) -> Result<(), TransportError>;

    /// Sends a move under the fixed move opcode.
    async fn send_match_move(&self, match_id: &str, mv: MoveData) -> Result<(), TransportError>;

    /// Installs the single inbound-event consumer for the match, replacing
    /// any previous one.
    fn set_event_handler(&self, match_id: &str, handler: EventCallback);

    /// Detaches the inbound-event consumer for the match, if any.
    fn clear_event_handler(&self, match_id: &str);

    /// Persists a score on the remote leaderboard.
    async fn write_leaderboard(
        &self,
        leaderboard_id: &str,
        score: i64,
        subscore: i64,
    ) -> Result<(), TransportError>;

    /// Reads up to `limit` ranked records from the remote leaderboard.
    async fn read_leaderboard(
        &self,
        leaderboard_id: &str,
        limit: u32,
    ) -> Result<Vec<LeaderboardRecord>, TransportError>;
}
