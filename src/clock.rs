//! Local countdown for the remote-declared turn deadline.
//!
//! The clock is purely local: it never notifies the authority. When it
//! expires it reports the player who was on turn and the inferred winner so
//! the coordinator can render a provisional timeout outcome while waiting for
//! the authoritative terminal push.

use crate::protocol::{GameStatus, MatchState};
use tracing::{debug, info};

/// Fired when the local countdown reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnExpiry {
    /// Identity of the player whose turn ran out.
    pub timed_out_player: Option<String>,
    /// Identity of the player who was not on turn, the inferred winner.
    pub inferred_winner: Option<String>,
}

/// Tick-driven countdown coupled to the authority's turn deadline.
///
/// Driven at one tick per second by the embedding event loop. Arms only while
/// the match is active with both players present, fires at most once per
/// arming, and re-arms only when a fresh snapshot hands the turn to a
/// different player.
#[derive(Debug, Default)]
pub struct TurnClock {
    remaining: i64,
    armed: bool,
    on_turn: Option<String>,
    opponent: Option<String>,
}

impl TurnClock {
    /// Creates a disarmed clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a fresh authoritative snapshot into the countdown.
    ///
    /// Re-arms to the snapshot's time limit only when `currentTurn` changed;
    /// observing the same turn twice is a no-op, so a duplicate snapshot can
    /// never restart or double a countdown.
    pub fn observe_snapshot(&mut self, state: &MatchState) {
        // A non-positive limit means the match carries no clock at all; arming
        // with zero seconds would fire on the very first tick.
        if state.game_status != GameStatus::Active
            || state.players.len() != 2
            || state.turn_time_limit <= 0
        {
            if self.armed {
                debug!(status = %state.game_status, "Match not qualifying; disarming turn clock");
            }
            self.disarm();
            return;
        }

        if self.on_turn.as_deref() == Some(state.current_turn.as_str()) {
            return;
        }

        self.on_turn = Some(state.current_turn.clone());
        self.opponent = state
            .players
            .keys()
            .find(|id| **id != state.current_turn)
            .cloned();
        self.remaining = state.turn_time_limit;
        self.armed = true;
        debug!(
            on_turn = %state.current_turn,
            remaining = self.remaining,
            "Turn clock armed"
        );
    }

    /// Advances the countdown by one second.
    ///
    /// Returns the expiry exactly once when the countdown reaches zero, then
    /// stays silent until a qualifying snapshot re-arms the clock.
    pub fn tick(&mut self) -> Option<TurnExpiry> {
        if !self.armed {
            return None;
        }
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        self.armed = false;
        info!(
            timed_out = ?self.on_turn,
            inferred_winner = ?self.opponent,
            "Turn clock expired locally"
        );
        Some(TurnExpiry {
            timed_out_player: self.on_turn.clone(),
            inferred_winner: self.opponent.clone(),
        })
    }

    /// Cancels the countdown entirely; the next snapshot arms from scratch.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.on_turn = None;
        self.opponent = None;
        self.remaining = 0;
    }

    /// Seconds left on the current countdown, if armed.
    pub fn remaining(&self) -> Option<i64> {
        self.armed.then_some(self.remaining)
    }
}
