//! Deterministic post-game score estimation.
//!
//! The authority persists scores through the leaderboard; this module only
//! derives the value optimistically so the UI can render it immediately. The
//! function is total: every combination of result, reason, move count and
//! mode produces a score, and nothing here can panic.

use crate::protocol::{EndReason, GameMode, MatchOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// How the match ended from the local player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerResult {
    /// The local player won.
    Won,
    /// The local player lost.
    Lost,
    /// Neither player won.
    Draw,
    /// The local player left the match before it ended.
    LeftMatch,
}

impl PlayerResult {
    /// Derives the local result from a terminal payload.
    ///
    /// [`PlayerResult::LeftMatch`] is never produced here: a player who leaves
    /// receives no terminal push, so the caller assigns that case directly.
    pub fn from_outcome(outcome: &MatchOutcome, local_user_id: &str) -> Self {
        if outcome.reason == EndReason::Draw {
            return PlayerResult::Draw;
        }
        match &outcome.winner {
            Some(winner) if winner.user_id == local_user_id => PlayerResult::Won,
            _ => PlayerResult::Lost,
        }
    }
}

/// Named scoring constants.
///
/// [`ScorePolicy::default`] gives the documented values; divergent product
/// variants (participation points for a loss, a larger forfeit bonus) are one
/// custom construction away rather than a code change.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorePolicy {
    /// Base points for a win.
    pub base_win: u32,
    /// Speed bonus for winning in 5 moves or fewer.
    pub speed_bonus_fast: u32,
    /// Speed bonus for winning in exactly 6 moves.
    pub speed_bonus_quick: u32,
    /// Speed bonus for winning in 7 or 8 moves.
    pub speed_bonus_brisk: u32,
    /// Reason bonus when the opponent timed out.
    pub timeout_bonus: u32,
    /// Reason bonus when the opponent left mid-match.
    pub opponent_left_bonus: u32,
    /// Multiplier applied to a blitz-mode win before flooring.
    pub blitz_multiplier: f64,
    /// Points for a draw, mode-invariant.
    pub draw_score: u32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            base_win: 2,
            speed_bonus_fast: 6,
            speed_bonus_quick: 4,
            speed_bonus_brisk: 2,
            timeout_bonus: 2,
            opponent_left_bonus: 1,
            blitz_multiplier: 1.5,
            draw_score: 1,
        }
    }
}

impl ScorePolicy {
    /// Speed bonus tier for the given accepted-move count.
    fn speed_bonus(&self, move_count: u32) -> u32 {
        match move_count {
            0..=5 => self.speed_bonus_fast,
            6 => self.speed_bonus_quick,
            7..=8 => self.speed_bonus_brisk,
            _ => 0,
        }
    }

    /// Reason bonus for a win ended by the given reason.
    fn reason_bonus(&self, reason: EndReason) -> u32 {
        match reason {
            EndReason::Timeout => self.timeout_bonus,
            EndReason::PlayerLeft => self.opponent_left_bonus,
            EndReason::Victory | EndReason::Draw => 0,
        }
    }
}

/// One human-readable component of a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoreComponent {
    /// Base points for the win.
    Base(u32),
    /// Speed bonus earned by a short game.
    Speed {
        /// Accepted moves in the match.
        moves: u32,
        /// Bonus points awarded.
        bonus: u32,
    },
    /// Bonus for the way the win came about.
    Reason {
        /// Display label, e.g. `Timeout` or `Opponent Left`.
        label: String,
        /// Bonus points awarded.
        bonus: u32,
    },
    /// Blitz-mode multiplier applied to the subtotal.
    Mode {
        /// The multiplier value.
        multiplier: f64,
    },
    /// Flat draw award.
    Draw {
        /// Points awarded to each player.
        points: u32,
    },
    /// A loss earns nothing.
    NoPoints,
    /// The local player left the match and earns nothing.
    LeftGame,
}

impl fmt::Display for ScoreComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreComponent::Base(points) => write!(f, "Base: {points}"),
            ScoreComponent::Speed { moves, bonus } => {
                write!(f, "Speed ({moves} moves): +{bonus}")
            }
            ScoreComponent::Reason { label, bonus } => write!(f, "{label}: +{bonus}"),
            ScoreComponent::Mode { multiplier } => write!(f, "Blitz Mode: x{multiplier}"),
            ScoreComponent::Draw { points } => {
                let noun = if *points == 1 { "point" } else { "points" };
                write!(f, "Draw: {points} {noun}")
            }
            ScoreComponent::NoPoints => write!(f, "No points for losing"),
            ScoreComponent::LeftGame => write!(f, "Left game: 0 points"),
        }
    }
}

/// Derived score with its human-readable breakdown; never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Final score, floored to a whole number of points.
    pub score: u32,
    /// Contributing components in fixed order: base, speed, reason, mode.
    pub breakdown: Vec<ScoreComponent>,
}

impl ScoreResult {
    /// Joins the breakdown components for display.
    pub fn breakdown_text(&self) -> String {
        self.breakdown
            .iter()
            .map(ScoreComponent::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl fmt::Display for ScoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.score, self.breakdown_text())
    }
}

/// Computes the optimistic score for a terminal match outcome.
///
/// Wins earn base points plus speed and reason bonuses, multiplied for blitz
/// mode and floored. Draws earn a flat mode-invariant award. Losses and
/// leaving earn nothing.
pub fn compute_score(
    result: PlayerResult,
    reason: EndReason,
    move_count: u32,
    mode: GameMode,
    policy: &ScorePolicy,
) -> ScoreResult {
    let result_value = match result {
        PlayerResult::LeftMatch => ScoreResult {
            score: 0,
            breakdown: vec![ScoreComponent::LeftGame],
        },
        PlayerResult::Lost => ScoreResult {
            score: 0,
            breakdown: vec![ScoreComponent::NoPoints],
        },
        PlayerResult::Draw => ScoreResult {
            score: policy.draw_score,
            breakdown: vec![ScoreComponent::Draw {
                points: policy.draw_score,
            }],
        },
        PlayerResult::Won => {
            let speed = policy.speed_bonus(move_count);
            let reason_bonus = policy.reason_bonus(reason);
            let subtotal = policy.base_win + speed + reason_bonus;
            let multiplier = match mode {
                GameMode::Blitz => policy.blitz_multiplier,
                GameMode::Standard => 1.0,
            };
            let score = (f64::from(subtotal) * multiplier).floor().max(0.0) as u32;

            let mut breakdown = vec![ScoreComponent::Base(policy.base_win)];
            if speed > 0 {
                breakdown.push(ScoreComponent::Speed {
                    moves: move_count,
                    bonus: speed,
                });
            }
            if reason_bonus > 0 {
                let label = match reason {
                    EndReason::Timeout => "Timeout",
                    EndReason::PlayerLeft => "Opponent Left",
                    EndReason::Victory | EndReason::Draw => "Bonus",
                };
                breakdown.push(ScoreComponent::Reason {
                    label: label.to_string(),
                    bonus: reason_bonus,
                });
            }
            if mode == GameMode::Blitz {
                breakdown.push(ScoreComponent::Mode { multiplier });
            }
            ScoreResult { score, breakdown }
        }
    };

    debug!(
        ?result,
        %reason,
        move_count,
        %mode,
        score = result_value.score,
        "Computed optimistic score"
    );
    result_value
}
