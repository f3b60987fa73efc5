//! Packets exchanged between clients and the server.
//!
//! Every inbound action and outbound notification is its own variant with
//! typed fields, so malformed payloads are rejected by the decoder rather
//! than deep inside the engine.

use crate::{
    BoxContent, ChatMessage, Comparison, GameView, Hint, HistoryEntry, LobbyEntry, MatchId,
    RoomId, RoomSnapshot, RoundOutcome, Rule, Strategy, UserId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientPacket {
    EnterLobby { user_id: UserId },
    Reconnect { user_id: UserId },
    Heartbeat,
    Disconnect,
    Action(Action),
}

/// Strategy-specific fields for `Action::ExecuteAttack`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AttackMove {
    BlindPick {
        box_index: usize,
    },
    Compare {
        box_a: usize,
        box_b: usize,
        guess: Comparison,
    },
    Probe {
        guess_index: usize,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Action {
    CreateRoom {
        room_id: RoomId,
        user_id: UserId,
    },
    JoinRoom {
        room_id: RoomId,
        user_id: UserId,
    },
    LeaveRoom {
        room_id: RoomId,
        user_id: UserId,
    },
    SetReady {
        room_id: RoomId,
        user_id: UserId,
    },
    StartGame {
        room_id: RoomId,
    },
    LockRule {
        room_id: RoomId,
        user_id: UserId,
        rule: Rule,
    },
    SubmitDefense {
        room_id: RoomId,
        user_id: UserId,
        boxes: Vec<BoxContent>,
    },
    SelectStrategy {
        room_id: RoomId,
        user_id: UserId,
        strategy: Strategy,
    },
    ExecuteAttack {
        room_id: RoomId,
        user_id: UserId,
        attack: AttackMove,
    },
    S4SubmitTarget {
        room_id: RoomId,
        user_id: UserId,
        target: u8,
    },
    S4Reveal {
        room_id: RoomId,
        user_id: UserId,
        box_index: usize,
    },
    S4ExecutePick {
        room_id: RoomId,
        user_id: UserId,
        indices: Vec<usize>,
    },
    ConfirmSummary {
        room_id: RoomId,
        user_id: UserId,
    },
    SendChat {
        room_id: RoomId,
        user_id: UserId,
        text: String,
    },
    SyncSelection {
        room_id: RoomId,
        user_id: UserId,
        indices: Vec<usize>,
    },
}

impl Action {
    pub fn room_id(&self) -> &str {
        match self {
            Action::CreateRoom { room_id, .. }
            | Action::JoinRoom { room_id, .. }
            | Action::LeaveRoom { room_id, .. }
            | Action::SetReady { room_id, .. }
            | Action::StartGame { room_id }
            | Action::LockRule { room_id, .. }
            | Action::SubmitDefense { room_id, .. }
            | Action::SelectStrategy { room_id, .. }
            | Action::ExecuteAttack { room_id, .. }
            | Action::S4SubmitTarget { room_id, .. }
            | Action::S4Reveal { room_id, .. }
            | Action::S4ExecutePick { room_id, .. }
            | Action::ConfirmSummary { room_id, .. }
            | Action::SendChat { room_id, .. }
            | Action::SyncSelection { room_id, .. } => room_id,
        }
    }

    /// The acting user, for every action that names one.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Action::StartGame { .. } => None,
            Action::CreateRoom { user_id, .. }
            | Action::JoinRoom { user_id, .. }
            | Action::LeaveRoom { user_id, .. }
            | Action::SetReady { user_id, .. }
            | Action::LockRule { user_id, .. }
            | Action::SubmitDefense { user_id, .. }
            | Action::SelectStrategy { user_id, .. }
            | Action::ExecuteAttack { user_id, .. }
            | Action::S4SubmitTarget { user_id, .. }
            | Action::S4Reveal { user_id, .. }
            | Action::S4ExecutePick { user_id, .. }
            | Action::ConfirmSummary { user_id, .. }
            | Action::SendChat { user_id, .. }
            | Action::SyncSelection { user_id, .. } => Some(user_id),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerPacket {
    LobbyUpdate {
        rooms: Vec<LobbyEntry>,
    },
    JoinSuccess {
        room: RoomSnapshot,
        is_spectator: bool,
        is_reconnect: bool,
    },
    RoomSync {
        room: RoomSnapshot,
    },
    LeaveSuccess,
    GameUpdate(Box<GameView>),
    Chat(ChatMessage),
    RoundSummary {
        match_id: MatchId,
        round: u8,
        refund: i64,
        outcome: RoundOutcome,
    },
    GameSummary {
        history: Vec<HistoryEntry>,
        scores: Vec<(UserId, i64)>,
        winner: Option<UserId>,
    },
    ConfirmCount {
        count: usize,
    },
    ResetToLobby,
    ProbeHint {
        match_id: MatchId,
        hint: Hint,
        count: u32,
    },
    SelectionSync {
        match_id: MatchId,
        indices: Vec<usize>,
    },
    ReconnectResult {
        message: String,
    },
    Error {
        message: String,
    },
}
