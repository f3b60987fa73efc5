//! Role-filtered projections of room and match state.
//!
//! Only [`PublicBox`](shared::PublicBox) data ever leaves through here; the
//! raw table stays inside the match engine.

use crate::match_engine::{AttackState, Match};
use crate::room::Room;
use shared::{GameView, MatchSummary, MatchView, Role, RoomState, UserId};

pub fn match_summary(m: &Match) -> MatchSummary {
    MatchSummary {
        id: m.id.clone(),
        p1: m.p1.clone(),
        p2: m.p2.clone(),
        round: m.round,
        phase: m.game.phase,
    }
}

pub fn match_view(m: &Match) -> MatchView {
    let (attempts, guesses, s4) = match &m.game.attack {
        AttackState::Idle => (None, None, None),
        AttackState::Attempts { remaining } => (Some(*remaining), None, None),
        AttackState::Probe { guesses } => (None, Some(*guesses), None),
        AttackState::TwoPhase(state) => (None, None, Some(state.view())),
    };
    MatchView {
        id: m.id.clone(),
        p1: m.p1.clone(),
        p2: m.p2.clone(),
        defender: m.defender.clone(),
        attacker: m.attacker.clone(),
        round: m.round,
        phase: m.game.phase,
        rule: m.game.rule,
        strategy: m.game.strategy,
        boxes: m
            .game
            .table
            .as_ref()
            .map(|table| table.public().to_vec())
            .unwrap_or_default(),
        attempts,
        guesses,
        s4,
    }
}

/// Role of `user` in the room and the match they watch.
///
/// Participants see their own match; spectators and the bye player watch the
/// room's first match.
pub fn attachment<'a>(room: &'a Room, user: &str) -> (Role, Option<&'a Match>) {
    if room.state == RoomState::Game && room.bye.as_deref() != Some(user) {
        if let Some(m) = room.matches.iter().find(|m| m.has_player(user)) {
            let role = m.role_of(user).unwrap_or(Role::Spectator);
            return (role, Some(m));
        }
    }
    let role = if room.state == RoomState::Game && room.bye.as_deref() == Some(user) {
        Role::Bye
    } else {
        Role::Spectator
    };
    (role, room.matches.first())
}

pub fn compose(room: &Room, user: &str, now: u64) -> GameView {
    let (role, attached) = attachment(room, user);
    GameView {
        room_id: room.id.clone(),
        role,
        match_id: attached.map(|m| m.id.clone()),
        matches: room.matches.iter().map(match_summary).collect(),
        scores: room.ledger.snapshot(),
        current: attached.map(match_view),
        round_deadline: attached.map_or(0, |m| m.clock.deadline_ms()),
        server_time: now,
    }
}

/// Everyone who receives this room's broadcasts.
pub fn audience(room: &Room) -> Vec<UserId> {
    let mut users = room.members.clone();
    users.extend(
        room.spectators
            .iter()
            .filter(|user| !room.members.contains(user))
            .cloned(),
    );
    users
}
