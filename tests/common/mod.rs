//! In-memory transport substitute shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gridmatch::{
    EventCallback, GameMode, GameStatus, LeaderboardRecord, MatchAction, MatchState, MatchTicket,
    MatchTransport, MoveData, PlayerInfo, SessionInfo, TransportError,
};
use tokio::sync::Semaphore;

/// Opt-in tracing output for debugging test runs (`RUST_LOG=debug`).
pub fn trace_init() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Identity the mock authenticates every test session as.
pub const LOCAL_USER: &str = "local-user";
/// The opponent identity used by snapshot helpers.
pub const OPPONENT: &str = "opponent";

#[derive(Default)]
struct MockInner {
    handlers: HashMap<String, EventCallback>,
    handler_installs: usize,
    sent_moves: Vec<(String, MoveData)>,
    left_matches: Vec<String>,
    leaderboard_writes: Vec<(String, i64, i64)>,
    fail_authenticate: bool,
    fail_request: bool,
    fail_send_move: bool,
    fail_leave: bool,
    empty_ticket: bool,
    gate_joins: bool,
}

/// Scripted in-memory stand-in for the Transport Session collaborator.
pub struct MockTransport {
    state: Mutex<MockInner>,
    join_gate: Semaphore,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockInner::default()),
            join_gate: Semaphore::new(0),
        })
    }

    pub fn fail_authenticate(&self, on: bool) {
        self.state.lock().unwrap().fail_authenticate = on;
    }

    pub fn fail_request(&self, on: bool) {
        self.state.lock().unwrap().fail_request = on;
    }

    pub fn fail_send_move(&self, on: bool) {
        self.state.lock().unwrap().fail_send_move = on;
    }

    pub fn fail_leave(&self, on: bool) {
        self.state.lock().unwrap().fail_leave = on;
    }

    pub fn return_empty_ticket(&self, on: bool) {
        self.state.lock().unwrap().empty_ticket = on;
    }

    /// Makes subsequent `join_match` calls block until released.
    pub fn gate_joins(&self) {
        self.state.lock().unwrap().gate_joins = true;
    }

    /// Lets one gated `join_match` call proceed.
    pub fn release_join(&self) {
        self.join_gate.add_permits(1);
    }

    pub fn has_handler(&self, match_id: &str) -> bool {
        self.state.lock().unwrap().handlers.contains_key(match_id)
    }

    pub fn handler_installs(&self) -> usize {
        self.state.lock().unwrap().handler_installs
    }

    pub fn sent_moves(&self) -> Vec<(String, MoveData)> {
        self.state.lock().unwrap().sent_moves.clone()
    }

    pub fn left_matches(&self) -> Vec<String> {
        self.state.lock().unwrap().left_matches.clone()
    }

    pub fn leaderboard_writes(&self) -> Vec<(String, i64, i64)> {
        self.state.lock().unwrap().leaderboard_writes.clone()
    }

    /// Delivers an inbound event to the registered consumer for the match.
    pub fn push_event(&self, match_id: &str, opcode: i64, payload: serde_json::Value) {
        let mut inner = self.state.lock().unwrap();
        if let Some(handler) = inner.handlers.get_mut(match_id) {
            handler(opcode, payload);
        }
    }
}

#[async_trait]
impl MatchTransport for MockTransport {
    async fn authenticate(
        &self,
        _device_id: &str,
        username: &str,
    ) -> Result<SessionInfo, TransportError> {
        if self.state.lock().unwrap().fail_authenticate {
            return Err(TransportError::new("invalid credentials"));
        }
        Ok(SessionInfo {
            user_id: LOCAL_USER.to_string(),
            username: username.to_string(),
        })
    }

    async fn request_match(
        &self,
        mode: GameMode,
        _action: MatchAction,
    ) -> Result<MatchTicket, TransportError> {
        let inner = self.state.lock().unwrap();
        if inner.fail_request {
            return Err(TransportError::new("matchmaker unavailable"));
        }
        Ok(MatchTicket {
            match_id: if inner.empty_ticket {
                String::new()
            } else {
                "match-1".to_string()
            },
            game_mode: mode,
            is_new: true,
        })
    }

    async fn join_match(&self, _match_id: &str) -> Result<(), TransportError> {
        let gated = self.state.lock().unwrap().gate_joins;
        if gated {
            let permit = self
                .join_gate
                .acquire()
                .await
                .map_err(|_| TransportError::new("join gate closed"))?;
            permit.forget();
        }
        Ok(())
    }

    async fn leave_match(&self, match_id: &str) -> Result<(), TransportError> {
        let mut inner = self.state.lock().unwrap();
        if inner.fail_leave {
            return Err(TransportError::new("socket dropped"));
        }
        inner.left_matches.push(match_id.to_string());
        Ok(())
    }

    async fn send_match_move(&self, match_id: &str, mv: MoveData) -> Result<(), TransportError> {
        let mut inner = self.state.lock().unwrap();
        if inner.fail_send_move {
            return Err(TransportError::new("send failed"));
        }
        inner.sent_moves.push((match_id.to_string(), mv));
        Ok(())
    }

    fn set_event_handler(&self, match_id: &str, handler: EventCallback) {
        let mut inner = self.state.lock().unwrap();
        inner.handler_installs += 1;
        inner.handlers.insert(match_id.to_string(), handler);
    }

    fn clear_event_handler(&self, match_id: &str) {
        self.state.lock().unwrap().handlers.remove(match_id);
    }

    async fn write_leaderboard(
        &self,
        leaderboard_id: &str,
        score: i64,
        subscore: i64,
    ) -> Result<(), TransportError> {
        self.state
            .lock()
            .unwrap()
            .leaderboard_writes
            .push((leaderboard_id.to_string(), score, subscore));
        Ok(())
    }

    async fn read_leaderboard(
        &self,
        _leaderboard_id: &str,
        limit: u32,
    ) -> Result<Vec<LeaderboardRecord>, TransportError> {
        let record = LeaderboardRecord {
            owner_id: LOCAL_USER.to_string(),
            username: "ana".to_string(),
            score: 12,
            rank: 1,
        };
        Ok(std::iter::repeat_with(|| record.clone())
            .take(limit.min(1) as usize)
            .collect())
    }
}

/// The session the mock hands out.
pub fn local_session() -> SessionInfo {
    SessionInfo {
        user_id: LOCAL_USER.to_string(),
        username: "ana".to_string(),
    }
}

/// An active two-player snapshot with the given player on turn.
pub fn active_state(on_turn: &str, turn_time_limit: i64) -> MatchState {
    let mut state = MatchState::default();
    state.players.insert(
        LOCAL_USER.to_string(),
        PlayerInfo {
            user_id: LOCAL_USER.to_string(),
            username: "ana".to_string(),
            symbol: gridmatch::Mark::X,
        },
    );
    state.players.insert(
        OPPONENT.to_string(),
        PlayerInfo {
            user_id: OPPONENT.to_string(),
            username: "bo".to_string(),
            symbol: gridmatch::Mark::O,
        },
    );
    state.player_order = vec![LOCAL_USER.to_string(), OPPONENT.to_string()];
    state.current_turn = on_turn.to_string();
    state.game_status = GameStatus::Active;
    state.board = vec![
        vec![String::new(), String::new(), String::new()],
        vec![String::new(), String::new(), String::new()],
        vec![String::new(), String::new(), String::new()],
    ];
    state.turn_time_limit = turn_time_limit;
    state
}

/// Serializes a snapshot the way the authority sends it.
pub fn snapshot_json(state: &MatchState) -> serde_json::Value {
    serde_json::to_value(state).expect("snapshot serializes")
}
