//! Match lifecycle coordination against the remote authority.
//!
//! Owns the "no match, joined, active, terminated" lifecycle: issues
//! matchmaking and join/leave requests, installs the single reconciling
//! event consumer per match, applies optimistic moves, drives the turn
//! clock, and exposes the reconciled view to the UI layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, instrument, warn};

use crate::clock::TurnClock;
use crate::error::MatchClientError;
use crate::protocol::{
    EndReason, ErrorPayload, GameMode, LeaderboardRecord, MatchAction, MatchOutcome, MatchState,
    MatchTicket, MoveData, PlayerInfo, OP_ERROR, OP_GAME_OVER, OP_GAME_STATE,
};
use crate::reconciler::{LocalMatchView, MoveRejection, Reconciler};
use crate::score::{compute_score, PlayerResult, ScorePolicy, ScoreResult};
use crate::transport::{EventCallback, MatchTransport, SessionInfo};

/// Reconciled event delivered to the UI layer's handler.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// A snapshot was folded; render this view.
    StateChanged(LocalMatchView),
    /// The match ended; `provisional` is true for a locally synthesized
    /// timeout awaiting the authoritative push.
    GameOver {
        /// Terminal payload.
        outcome: MatchOutcome,
        /// Optimistically derived score for the local player.
        score: ScoreResult,
        /// Whether this outcome is locally synthesized.
        provisional: bool,
    },
    /// The authority pushed an error message, surfaced verbatim.
    ErrorMessage(String),
}

/// Result of the optimistic move path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAttempt {
    /// The move was sent and painted locally.
    Sent,
    /// A local precondition failed; nothing was sent or changed.
    Rejected(MoveRejection),
}

type UiHandler = Box<dyn FnMut(MatchEvent) + Send>;

/// Mutable match state shared with the transport's event callback.
#[derive(Debug)]
struct Shared {
    reconciler: Reconciler,
    clock: TurnClock,
    match_id: Option<String>,
    /// Player roster from the latest snapshot, for resolving the inferred
    /// winner of a local timeout.
    roster: HashMap<String, PlayerInfo>,
}

/// Coordinates one match at a time against the remote authority.
///
/// All lifecycle transitions (find, join, leave) are serialized: a leave
/// issued while a join is in flight waits for the join to settle. The
/// coordinator installs exactly one reconciling consumer per active match;
/// the UI registers its own handler through
/// [`MatchCoordinator::set_event_handler`], a single slot replaced on
/// re-registration.
pub struct MatchCoordinator<T: MatchTransport> {
    transport: Arc<T>,
    session: SessionInfo,
    policy: ScorePolicy,
    shared: Arc<Mutex<Shared>>,
    handler: Arc<Mutex<Option<UiHandler>>>,
    lifecycle: Arc<tokio::sync::Mutex<()>>,
}

impl<T: MatchTransport> MatchCoordinator<T> {
    /// Creates a coordinator for an already-authenticated session.
    #[instrument(skip(transport), fields(user_id = %session.user_id))]
    pub fn new(transport: Arc<T>, session: SessionInfo) -> Self {
        info!("Creating match coordinator");
        let shared = Shared {
            reconciler: Reconciler::new(session.user_id.clone()),
            clock: TurnClock::new(),
            match_id: None,
            roster: HashMap::new(),
        };
        Self {
            transport,
            session,
            policy: ScorePolicy::default(),
            shared: Arc::new(Mutex::new(shared)),
            handler: Arc::new(Mutex::new(None)),
            lifecycle: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Authenticates with the session layer and creates a coordinator.
    #[instrument(skip(transport, device_id))]
    pub async fn authenticate(
        transport: Arc<T>,
        device_id: &str,
        username: &str,
    ) -> Result<Self, MatchClientError> {
        let session = transport
            .authenticate(device_id, username)
            .await
            .map_err(|err| MatchClientError::AuthenticationFailed {
                reason: err.to_string(),
            })?;
        info!(user_id = %session.user_id, "Session established");
        Ok(Self::new(transport, session))
    }

    /// Replaces the scoring policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The authenticated local identity.
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Whether a match is currently joined.
    pub fn in_match(&self) -> bool {
        self.shared.lock().unwrap().match_id.is_some()
    }

    /// Identifier of the joined match, if any.
    pub fn match_id(&self) -> Option<String> {
        self.shared.lock().unwrap().match_id.clone()
    }

    /// A clone of the current reconciled view.
    pub fn view(&self) -> LocalMatchView {
        self.shared.lock().unwrap().reconciler.view().clone()
    }

    /// Installs the UI event handler, replacing any previous one.
    ///
    /// The reconciler's own pre-processing always runs before the handler
    /// sees an event; there is no handler chaining beyond that.
    pub fn set_event_handler(&self, handler: impl FnMut(MatchEvent) + Send + 'static) {
        *self.handler.lock().unwrap() = Some(Box::new(handler));
    }

    /// Removes the UI event handler.
    pub fn clear_event_handler(&self) {
        *self.handler.lock().unwrap() = None;
    }

    /// Requests matchmaking and immediately joins the returned match.
    ///
    /// Holds the lifecycle lock for the whole sequence, so a concurrent
    /// leave observes either no match or a fully joined one.
    #[instrument(skip(self), fields(user_id = %self.session.user_id))]
    pub async fn find_or_join(
        &self,
        mode: GameMode,
        action: MatchAction,
    ) -> Result<MatchTicket, MatchClientError> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.in_match() {
            return Err(MatchClientError::MatchmakingFailed {
                reason: "already in a match".to_string(),
            });
        }

        info!(%mode, %action, "Requesting matchmaking");
        let ticket = self
            .transport
            .request_match(mode, action)
            .await
            .map_err(|err| MatchClientError::MatchmakingFailed {
                reason: err.to_string(),
            })?;

        if ticket.match_id.is_empty() {
            warn!("Authority returned an empty match identifier");
            return Err(MatchClientError::MatchmakingFailed {
                reason: "authority returned no match identifier".to_string(),
            });
        }

        self.transport
            .join_match(&ticket.match_id)
            .await
            .map_err(|err| MatchClientError::MatchmakingFailed {
                reason: format!("join failed: {err}"),
            })?;

        self.transport
            .set_event_handler(&ticket.match_id, self.reconciling_callback());

        {
            let mut shared = self.shared.lock().unwrap();
            shared.reconciler.reset();
            shared.clock.disarm();
            shared.roster.clear();
            shared.match_id = Some(ticket.match_id.clone());
        }

        info!(match_id = %ticket.match_id, is_new = ticket.is_new, "Joined match");
        Ok(ticket)
    }

    /// Leaves the current match.
    ///
    /// Waits for any in-flight join to settle first. The turn clock is
    /// disarmed and the event consumer detached before the local view is
    /// cleared, so no push can fire against a reset view. Local cleanup is
    /// unconditional: a remote leave failure is logged, not propagated.
    #[instrument(skip(self), fields(user_id = %self.session.user_id))]
    pub async fn leave(&self) -> Result<(), MatchClientError> {
        let _lifecycle = self.lifecycle.lock().await;

        let match_id = self
            .shared
            .lock()
            .unwrap()
            .match_id
            .clone()
            .ok_or(MatchClientError::NotInMatch)?;

        self.transport.clear_event_handler(&match_id);
        self.clear_event_handler();
        {
            let mut shared = self.shared.lock().unwrap();
            shared.clock.disarm();
            shared.reconciler.reset();
            shared.roster.clear();
            shared.match_id = None;
        }

        if let Err(err) = self.transport.leave_match(&match_id).await {
            warn!(match_id = %match_id, error = %err, "Remote leave failed; local state already cleared");
        } else {
            info!(match_id = %match_id, "Left match");
        }
        Ok(())
    }

    /// Sends a move to the authority without touching local state.
    ///
    /// Turn legality and cell occupancy are the optimistic path's concern
    /// ([`MatchCoordinator::play_cell`]); this only requires a joined match.
    #[instrument(skip(self))]
    pub async fn send_move(&self, row: usize, col: usize) -> Result<(), MatchClientError> {
        let match_id = self
            .shared
            .lock()
            .unwrap()
            .match_id
            .clone()
            .ok_or(MatchClientError::NotInMatch)?;

        self.transport
            .send_match_move(&match_id, MoveData { row, col })
            .await
            .map_err(|source| MatchClientError::MoveTransmissionFailed { source })
    }

    /// The optimistic move path: local precondition check, send, then paint.
    ///
    /// Precondition failures return [`MoveAttempt::Rejected`] without
    /// contacting the remote. On transport failure the error propagates and
    /// no local state changes. On success the local mark is painted and the
    /// turn yielded provisionally; the next snapshot overwrites both.
    #[instrument(skip(self))]
    pub async fn play_cell(
        &self,
        row: usize,
        col: usize,
    ) -> Result<MoveAttempt, MatchClientError> {
        {
            let shared = self.shared.lock().unwrap();
            if shared.match_id.is_none() {
                return Err(MatchClientError::NotInMatch);
            }
            if let Err(rejection) = shared.reconciler.check_move(row, col) {
                debug!(row, col, ?rejection, "Move rejected locally");
                return Ok(MoveAttempt::Rejected(rejection));
            }
        }

        self.send_move(row, col).await?;

        self.shared
            .lock()
            .unwrap()
            .reconciler
            .apply_optimistic(row, col);
        Ok(MoveAttempt::Sent)
    }

    /// Advances the turn clock by one second.
    ///
    /// Called at a fixed 1-second cadence by the embedding event loop. On
    /// expiry, synthesizes a provisional timeout outcome (the player not on
    /// turn wins), scores it, delivers it through the registered handler and
    /// returns it. The authoritative terminal push later supersedes it
    /// silently.
    pub fn tick(&self) -> Option<MatchEvent> {
        let event = {
            let mut shared = self.shared.lock().unwrap();
            shared.match_id.as_ref()?;
            let expiry = shared.clock.tick()?;

            let winner = expiry
                .inferred_winner
                .as_deref()
                .and_then(|id| shared.roster.get(id))
                .cloned();
            let outcome = MatchOutcome {
                winner,
                reason: EndReason::Timeout,
            };
            if !shared.reconciler.apply_outcome(outcome.clone(), true) {
                return None;
            }
            let score = self.score_outcome(&shared, &outcome);
            info!(
                inferred_winner = ?expiry.inferred_winner,
                "Rendering provisional timeout outcome"
            );
            MatchEvent::GameOver {
                outcome,
                score,
                provisional: true,
            }
        };
        self.dispatch(event.clone());
        Some(event)
    }

    /// Seconds left on the local turn countdown, if armed.
    pub fn clock_remaining(&self) -> Option<i64> {
        self.shared.lock().unwrap().clock.remaining()
    }

    /// Persists an optimistically derived score on the remote leaderboard.
    #[instrument(skip(self, score), fields(score = score.score))]
    pub async fn publish_score(
        &self,
        leaderboard_id: &str,
        score: &ScoreResult,
    ) -> Result<(), MatchClientError> {
        self.transport
            .write_leaderboard(leaderboard_id, i64::from(score.score), 0)
            .await?;
        info!(leaderboard_id, score = score.score, "Score published");
        Ok(())
    }

    /// Reads ranked records from the remote leaderboard.
    pub async fn leaderboard(
        &self,
        leaderboard_id: &str,
        limit: u32,
    ) -> Result<Vec<LeaderboardRecord>, MatchClientError> {
        Ok(self.transport.read_leaderboard(leaderboard_id, limit).await?)
    }

    /// Derives the local player's score for a terminal outcome using the
    /// last known move count and mode.
    fn score_outcome(&self, shared: &Shared, outcome: &MatchOutcome) -> ScoreResult {
        let result = PlayerResult::from_outcome(outcome, &self.session.user_id);
        let view = shared.reconciler.view();
        compute_score(
            result,
            outcome.reason,
            *view.move_count(),
            *view.game_mode(),
            &self.policy,
        )
    }

    /// Forwards a reconciled event to the UI handler, if one is registered.
    ///
    /// The handler slot has its own lock so UI callbacks never run while the
    /// view lock is held.
    fn dispatch(&self, event: MatchEvent) {
        if let Some(handler) = self.handler.lock().unwrap().as_mut() {
            handler(event);
        }
    }

    /// Builds the single reconciling consumer installed on the transport.
    fn reconciling_callback(&self) -> EventCallback {
        let shared = Arc::clone(&self.shared);
        let handler = Arc::clone(&self.handler);
        let policy = self.policy.clone();
        let user_id = self.session.user_id.clone();

        Box::new(move |opcode, payload| {
            let event = match opcode {
                OP_GAME_STATE => {
                    let state: MatchState = match serde_json::from_value(payload) {
                        Ok(state) => state,
                        Err(err) => {
                            warn!(error = %err, "Discarding malformed snapshot");
                            return;
                        }
                    };
                    let mut shared = shared.lock().unwrap();
                    shared.roster = state.players.clone();
                    shared.reconciler.apply_snapshot(&state);
                    shared.clock.observe_snapshot(&state);
                    Some(MatchEvent::StateChanged(shared.reconciler.view().clone()))
                }
                OP_GAME_OVER => {
                    let outcome: MatchOutcome = match serde_json::from_value(payload) {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            warn!(error = %err, "Discarding malformed terminal payload");
                            return;
                        }
                    };
                    let mut shared = shared.lock().unwrap();
                    shared.clock.disarm();
                    if !shared.reconciler.apply_outcome(outcome.clone(), false) {
                        debug!("Duplicate terminal push ignored");
                        return;
                    }
                    let result = PlayerResult::from_outcome(&outcome, &user_id);
                    let view = shared.reconciler.view();
                    let score = compute_score(
                        result,
                        outcome.reason,
                        *view.move_count(),
                        *view.game_mode(),
                        &policy,
                    );
                    info!(reason = %outcome.reason, score = score.score, "Match terminated");
                    Some(MatchEvent::GameOver {
                        outcome,
                        score,
                        provisional: false,
                    })
                }
                OP_ERROR => {
                    // Does not alter match state.
                    let message = serde_json::from_value::<ErrorPayload>(payload.clone())
                        .map(|p| p.error)
                        .unwrap_or_else(|_| payload.to_string());
                    warn!(message = %message, "Authority pushed an error");
                    Some(MatchEvent::ErrorMessage(message))
                }
                other => {
                    debug!(opcode = other, "Ignoring event with unknown opcode");
                    None
                }
            };

            if let Some(event) = event {
                if let Some(ui) = handler.lock().unwrap().as_mut() {
                    ui(event);
                }
            }
        })
    }
}

impl<T: MatchTransport> std::fmt::Debug for MatchCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchCoordinator")
            .field("session", &self.session)
            .field("match_id", &self.match_id())
            .finish_non_exhaustive()
    }
}
