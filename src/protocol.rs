//! Wire contract with the remote match authority.
//!
//! Inbound match events arrive tagged by an integer opcode; the numbering is
//! a fixed protocol contract and must not change. Snapshots replace match
//! state wholesale, never as partial patches.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opcode for an outbound player move.
pub const OP_PLAYER_MOVE: i64 = 1;
/// Opcode for an inbound full state snapshot.
pub const OP_GAME_STATE: i64 = 2;
/// Opcode for the inbound terminal event.
pub const OP_GAME_OVER: i64 = 3;
/// Opcode for an inbound server error message.
pub const OP_ERROR: i64 = 4;

/// Mark assigned to one of the two players.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Mark {
    /// The X mark (first player).
    X,
    /// The O mark (second player).
    O,
}

impl Mark {
    /// Returns the other player's mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// 3x3 board as the client renders it, row-major.
pub type Board = [[Option<Mark>; 3]; 3];

/// Match lifecycle status declared by the authority.
///
/// Monotonic within a match: waiting, then active, then finished.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    /// Waiting for the second player to join.
    #[default]
    Waiting,
    /// Both players present, moves accepted.
    Active,
    /// Terminal; no further moves.
    Finished,
}

/// Game mode, fixed for the lifetime of a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    /// Standard time per move.
    #[default]
    Standard,
    /// Shortened time per move, higher score multiplier.
    Blitz,
}

/// Matchmaking action requested from the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchAction {
    /// Create a fresh match and wait for an opponent.
    CreateNew,
    /// Join any open match, creating one if none exists.
    JoinRandom,
}

/// A player entry in the authoritative snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Stable player identity.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Mark assigned by the authority.
    pub symbol: Mark,
}

/// Authoritative match snapshot, replaced wholesale on every arrival.
///
/// Field names mirror the authority's JSON exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchState {
    /// 3x3 grid of `""`, `"X"` or `"O"` cells.
    pub board: Vec<Vec<String>>,
    /// Players keyed by identity; at most 2 entries.
    pub players: HashMap<String, PlayerInfo>,
    /// Turn order as a sequence of player identities.
    pub player_order: Vec<String>,
    /// Identity of the player on turn; empty before both players join.
    pub current_turn: String,
    /// Authority-side winner bookkeeping; terminal data arrives via opcode 3.
    pub winner: String,
    /// Lifecycle status.
    pub game_status: GameStatus,
    /// Count of accepted moves.
    pub move_count: u32,
    /// Mode, fixed per match.
    pub game_mode: GameMode,
    /// Seconds allowed per turn.
    pub turn_time_limit: i64,
    /// Epoch seconds at which the current turn began.
    pub turn_start_time: i64,
    /// Epoch seconds at which the current turn expires.
    pub move_deadline: i64,
}

impl MatchState {
    /// Converts the wire board into the typed 3x3 grid.
    ///
    /// Short or missing rows read as empty cells; a snapshot is rendering
    /// data, not a command, so malformed cells never abort reconciliation.
    pub fn typed_board(&self) -> Board {
        let mut board: Board = Default::default();
        for (r, row) in board.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = match self.board.get(r).and_then(|row| row.get(c)) {
                    Some(s) if s == "X" => Some(Mark::X),
                    Some(s) if s == "O" => Some(Mark::O),
                    _ => None,
                };
            }
        }
        board
    }

    /// Looks up the mark assigned to the given identity in this snapshot.
    pub fn mark_of(&self, user_id: &str) -> Option<Mark> {
        self.players.get(user_id).map(|p| p.symbol)
    }

    /// The player entry currently on turn, if resolvable in this snapshot.
    pub fn player_on_turn(&self) -> Option<&PlayerInfo> {
        self.players.get(&self.current_turn)
    }
}

/// Why a match ended, as declared by the terminal payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndReason {
    /// A player completed a winning line.
    Victory,
    /// The player on turn ran out of time.
    Timeout,
    /// The board filled with no winner.
    Draw,
    /// A player left mid-match.
    PlayerLeft,
}

/// Terminal payload: arrives once per match under [`OP_GAME_OVER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Winning player, absent on a draw.
    #[serde(default)]
    pub winner: Option<PlayerInfo>,
    /// Why the match ended.
    pub reason: EndReason,
}

/// Outbound move payload, sent under [`OP_PLAYER_MOVE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveData {
    /// Board row, 0-2.
    pub row: usize,
    /// Board column, 0-2.
    pub col: usize,
}

/// Response from the matchmaking remote procedure call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTicket {
    /// Identifier of the match to join.
    pub match_id: String,
    /// Mode the match runs under.
    pub game_mode: GameMode,
    /// Whether the authority created a fresh match for this request.
    pub is_new: bool,
}

/// Payload of an [`OP_ERROR`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Message from the authority, surfaced verbatim.
    pub error: String,
}

/// A ranked leaderboard entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardRecord {
    /// Identity that owns the record.
    pub owner_id: String,
    /// Display name of the owner.
    pub username: String,
    /// Persisted score.
    pub score: i64,
    /// Rank position, 1-based.
    pub rank: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_authority_json() {
        let raw = serde_json::json!({
            "board": [["X", "", ""], ["", "O", ""], ["", "", ""]],
            "players": {
                "u1": {"userId": "u1", "username": "ana", "symbol": "X"},
                "u2": {"userId": "u2", "username": "bo", "symbol": "O"}
            },
            "playerOrder": ["u1", "u2"],
            "currentTurn": "u1",
            "winner": "",
            "gameStatus": "active",
            "moveCount": 2,
            "gameMode": "blitz",
            "turnTimeLimit": 15,
            "turnStartTime": 1000,
            "moveDeadline": 1015
        });
        let state: MatchState = serde_json::from_value(raw).unwrap();
        assert_eq!(state.game_status, GameStatus::Active);
        assert_eq!(state.game_mode, GameMode::Blitz);
        assert_eq!(state.typed_board()[0][0], Some(Mark::X));
        assert_eq!(state.typed_board()[1][1], Some(Mark::O));
        assert_eq!(state.mark_of("u2"), Some(Mark::O));
        assert_eq!(state.player_on_turn().unwrap().username, "ana");
    }

    #[test]
    fn snapshot_tolerates_missing_fields_and_short_rows() {
        let raw = serde_json::json!({
            "board": [["X"]],
            "gameStatus": "waiting"
        });
        let state: MatchState = serde_json::from_value(raw).unwrap();
        assert_eq!(state.typed_board()[0][0], Some(Mark::X));
        assert_eq!(state.typed_board()[2][2], None);
        assert!(state.players.is_empty());
        assert_eq!(state.game_status, GameStatus::Waiting);
    }

    #[test]
    fn end_reason_uses_wire_strings() {
        assert_eq!(
            serde_json::to_value(EndReason::PlayerLeft).unwrap(),
            serde_json::json!("player_left")
        );
        let reason: EndReason = serde_json::from_value(serde_json::json!("timeout")).unwrap();
        assert_eq!(reason, EndReason::Timeout);
    }
}
