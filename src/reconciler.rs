//! Folds authoritative snapshots and optimistic local input into one view.
//!
//! Every inbound snapshot replaces the rendered state wholesale; an
//! optimistic local move is painted over it and erased by the next arrival,
//! so a rejected move self-corrects with no special-case reconciliation.

use crate::protocol::{Board, GameMode, GameStatus, Mark, MatchOutcome, MatchState};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use tracing::{debug, instrument};

/// Why a local move intent was rejected before reaching the network.
///
/// Rejections are expected user input racing the network, not faults; they
/// are silently absorbed at the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// The match is not in the active status.
    MatchNotActive,
    /// It is not the local player's turn.
    NotYourTurn,
    /// The target cell already holds a mark.
    CellOccupied,
    /// Row or column outside 0-2.
    OutOfBounds,
}

/// A terminal outcome as currently rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeView {
    /// The outcome payload.
    pub outcome: MatchOutcome,
    /// True while the outcome is locally synthesized (turn timeout) and the
    /// authoritative terminal push has not yet arrived.
    pub provisional: bool,
}

/// Client-derived view of the match, never sent to the authority.
#[derive(Debug, Clone, Default, Getters)]
pub struct LocalMatchView {
    /// Rendered board: latest authoritative state plus any unconfirmed local
    /// move.
    board: Board,
    /// Mark assigned to the local identity; sticky once set.
    my_symbol: Option<Mark>,
    /// Whether the local player is on turn.
    is_my_turn: bool,
    /// Mark of the player on turn, from the latest snapshot.
    current_mark: Option<Mark>,
    /// Lifecycle status from the latest snapshot.
    status: GameStatus,
    /// Accepted moves so far.
    move_count: u32,
    /// Mode the match runs under.
    game_mode: GameMode,
    /// Seconds allowed per turn.
    turn_time_limit: i64,
    /// Epoch seconds at which the current turn expires.
    move_deadline: i64,
    /// Display names keyed by mark, X first.
    players: Vec<(Mark, String)>,
    /// Terminal outcome, once known.
    outcome: Option<OutcomeView>,
}

impl LocalMatchView {
    /// Seconds until the current turn deadline at `now`, clamped to zero.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.move_deadline - now.timestamp()).max(0)
    }

    /// Seconds until the current turn deadline at the current wall clock.
    pub fn remaining_seconds_now(&self) -> i64 {
        self.remaining_seconds(Utc::now())
    }

    /// Display name of the player holding the given mark, if known.
    pub fn player_name(&self, mark: Mark) -> Option<&str> {
        self.players
            .iter()
            .find(|(m, _)| *m == mark)
            .map(|(_, name)| name.as_str())
    }
}

/// Pure transformation from remote pushes and local intents to the rendered
/// view.
#[derive(Debug)]
pub struct Reconciler {
    user_id: String,
    view: LocalMatchView,
}

impl Reconciler {
    /// Creates a reconciler for the given local identity.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            view: LocalMatchView::default(),
        }
    }

    /// The current rendered view.
    pub fn view(&self) -> &LocalMatchView {
        &self.view
    }

    /// The local identity this reconciler folds snapshots for.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Replaces the view wholesale from an authoritative snapshot.
    ///
    /// `my_symbol` is assigned the first time a snapshot reveals the local
    /// identity's mark and never recomputed afterward, even if a later
    /// snapshot's player map is momentarily incomplete. `is_my_turn` is
    /// derived strictly from the same snapshot's `currentTurn` and player
    /// map; nothing is carried over from a previous snapshot.
    #[instrument(skip_all, fields(status = %state.game_status, move_count = state.move_count))]
    pub fn apply_snapshot(&mut self, state: &MatchState) {
        let my_symbol = self.view.my_symbol.or_else(|| state.mark_of(&self.user_id));
        let current_mark = state.player_on_turn().map(|p| p.symbol);
        let is_my_turn = match (my_symbol, current_mark) {
            (Some(mine), Some(on_turn)) => mine == on_turn,
            _ => false,
        };

        let mut players: Vec<(Mark, String)> = state
            .players
            .values()
            .map(|p| (p.symbol, p.username.clone()))
            .collect();
        players.sort_by_key(|(mark, _)| *mark == Mark::O);

        // The outcome arrives on its own channel (opcode 3); snapshots do not
        // carry it and must not erase it. An authoritative outcome also keeps
        // the view frozen: a stale snapshot cannot reactivate a finished
        // match.
        let outcome = self.view.outcome.clone();
        let frozen = outcome.as_ref().is_some_and(|held| !held.provisional);
        let status = if frozen {
            GameStatus::Finished
        } else {
            state.game_status
        };
        let is_my_turn = is_my_turn && !frozen;

        self.view = LocalMatchView {
            board: state.typed_board(),
            my_symbol,
            is_my_turn,
            current_mark,
            status,
            move_count: state.move_count,
            game_mode: state.game_mode,
            turn_time_limit: state.turn_time_limit,
            move_deadline: state.move_deadline,
            players,
            outcome,
        };

        debug!(
            my_symbol = ?my_symbol,
            is_my_turn,
            "Snapshot folded into local view"
        );
    }

    /// Checks the local preconditions for a move intent at (`row`, `col`).
    pub fn check_move(&self, row: usize, col: usize) -> Result<(), MoveRejection> {
        if row > 2 || col > 2 {
            return Err(MoveRejection::OutOfBounds);
        }
        if self.view.status != GameStatus::Active {
            return Err(MoveRejection::MatchNotActive);
        }
        if !self.view.is_my_turn {
            return Err(MoveRejection::NotYourTurn);
        }
        if self.view.board[row][col].is_some() {
            return Err(MoveRejection::CellOccupied);
        }
        Ok(())
    }

    /// Paints the local mark at (`row`, `col`) and yields the turn.
    ///
    /// Provisional only: the next snapshot replaces the board wholesale, so a
    /// move the authority rejected simply disappears. Callers must have
    /// passed [`Reconciler::check_move`] and sent the move first.
    pub fn apply_optimistic(&mut self, row: usize, col: usize) {
        if let Some(mine) = self.view.my_symbol {
            if let Some(cell) = self
                .view
                .board
                .get_mut(row)
                .and_then(|r| r.get_mut(col))
            {
                *cell = Some(mine);
            }
            self.view.is_my_turn = false;
            debug!(row, col, mark = %mine, "Applied optimistic local move");
        }
    }

    /// Records a terminal outcome and freezes the view.
    ///
    /// An authoritative outcome silently supersedes a provisional one; a
    /// provisional outcome never replaces anything already recorded. Returns
    /// whether the outcome was applied.
    pub fn apply_outcome(&mut self, outcome: MatchOutcome, provisional: bool) -> bool {
        if let Some(existing) = &self.view.outcome {
            if !existing.provisional || provisional {
                debug!(
                    incoming_provisional = provisional,
                    "Ignoring outcome; view already holds one of equal or higher authority"
                );
                return false;
            }
        }
        self.view.status = GameStatus::Finished;
        self.view.is_my_turn = false;
        self.view.outcome = Some(OutcomeView {
            outcome,
            provisional,
        });
        true
    }

    /// Resets the view to its initial undefined form, keeping the identity.
    pub fn reset(&mut self) {
        self.view = LocalMatchView::default();
    }
}
