//! A room: membership, the shared ledger, and the matches of one game.

use crate::config::Timings;
use crate::deadline::{ScheduledTimer, Timer};
use crate::error::ActionError;
use crate::ledger::ScoreLedger;
use crate::match_engine::{Advance, Match, RoundContext};
use crate::outbox::Outbox;
use crate::utils::new_match_id;
use crate::view;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    ChatMessage, HistoryEntry, LobbyEntry, RoomId, RoomSnapshot, RoomState, ServerPacket, UserId,
    CHAT_LOG_LIMIT, MAX_CHAT_CHARS, MAX_ROOM_PLAYERS,
};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Seated,
    /// Already a member; nothing changed.
    Returning,
    /// Joined while a game was running.
    Spectator,
}

/// Mutable views into a room that let a match and its context coexist.
pub struct RoomParts<'a> {
    pub matches: &'a mut Vec<Match>,
    pub round: RoundContext<'a>,
}

#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub members: Vec<UserId>,
    pub ready: HashMap<UserId, bool>,
    pub owner: UserId,
    pub state: RoomState,
    pub ledger: ScoreLedger,
    pub matches: Vec<Match>,
    pub history: Vec<HistoryEntry>,
    pub bye: Option<UserId>,
    pub chat: Vec<ChatMessage>,
    pub confirmations: BTreeSet<UserId>,
    pub spectators: BTreeSet<UserId>,
    pub game_over: bool,
    reset_token: Option<u64>,
}

impl Room {
    pub fn new(id: RoomId, creator: &str) -> Self {
        let mut ledger = ScoreLedger::new();
        ledger.open(creator);
        let mut ready = HashMap::new();
        ready.insert(creator.to_string(), false);
        Self {
            id,
            members: vec![creator.to_string()],
            ready,
            owner: creator.to_string(),
            state: RoomState::Lobby,
            ledger,
            matches: Vec::new(),
            history: Vec::new(),
            bye: None,
            chat: Vec::new(),
            confirmations: BTreeSet::new(),
            spectators: BTreeSet::new(),
            game_over: false,
            reset_token: None,
        }
    }

    pub fn is_member(&self, user: &str) -> bool {
        self.members.iter().any(|member| member == user)
    }

    pub fn context<'a>(
        &'a mut self,
        now: u64,
        timings: &'a Timings,
        outbox: &'a mut Outbox,
    ) -> RoomParts<'a> {
        RoomParts {
            matches: &mut self.matches,
            round: RoundContext {
                room_id: &self.id,
                ledger: &mut self.ledger,
                history: &mut self.history,
                outbox,
                timings,
                now,
            },
        }
    }

    pub fn join(&mut self, user: &str) -> Result<JoinKind, ActionError> {
        if self.is_member(user) {
            return Ok(JoinKind::Returning);
        }
        if self.state == RoomState::Game {
            self.spectators.insert(user.to_string());
            return Ok(JoinKind::Spectator);
        }
        if self.members.len() >= MAX_ROOM_PLAYERS {
            return Err(ActionError::RoomFull);
        }
        self.members.push(user.to_string());
        self.ready.insert(user.to_string(), false);
        self.ledger.open(user);
        Ok(JoinKind::Seated)
    }

    /// Removes a member while in the lobby. Spectators may leave at any time;
    /// seated players cannot abandon a running game.
    pub fn leave(&mut self, user: &str) -> Result<(), ActionError> {
        if self.spectators.remove(user) {
            return Ok(());
        }
        if !self.is_member(user) || self.state != RoomState::Lobby {
            return Err(ActionError::Ignored);
        }
        self.members.retain(|member| member != user);
        self.ready.remove(user);
        self.ledger.close(user);
        if self.owner == user {
            if let Some(next) = self.members.first() {
                self.owner = next.clone();
            }
        }
        Ok(())
    }

    pub fn toggle_ready(&mut self, user: &str) -> Result<(), ActionError> {
        let flag = self.ready.get_mut(user).ok_or(ActionError::Ignored)?;
        *flag = !*flag;
        Ok(())
    }

    pub fn send_chat(
        &mut self,
        user: &str,
        text: &str,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        if text.trim().is_empty() {
            return Err(ActionError::Ignored);
        }
        let text: String = text.chars().take(MAX_CHAT_CHARS).collect();
        let message = ChatMessage::chat(user, &text);
        self.chat.push(message.clone());
        if self.chat.len() > CHAT_LOG_LIMIT {
            let excess = self.chat.len() - CHAT_LOG_LIMIT;
            self.chat.drain(..excess);
        }
        outbox.to_room(&self.id, ServerPacket::Chat(message));
        Ok(())
    }

    /// Shuffles the members into pairs and starts round 1 of every match.
    pub fn start_game<R: Rng>(
        &mut self,
        rng: &mut R,
        now: u64,
        timings: &Timings,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        if self.state != RoomState::Lobby {
            return Err(ActionError::Ignored);
        }
        if self.members.len() < 2 {
            return Err(ActionError::NotEnoughPlayers);
        }

        let mut players = self.members.clone();
        players.shuffle(rng);
        self.bye = if players.len() % 2 != 0 {
            players.pop()
        } else {
            None
        };

        self.state = RoomState::Game;
        self.history.clear();
        self.confirmations.clear();
        self.game_over = false;
        self.matches.clear();

        let mut ids: BTreeSet<String> = BTreeSet::new();
        for pair in players.chunks(2) {
            let mut id = new_match_id(rng);
            while !ids.insert(id.clone()) {
                id = new_match_id(rng);
            }
            let RoomParts { matches, mut round } = self.context(now, timings, outbox);
            let new_match = Match::new(id, pair[0].clone(), pair[1].clone(), &mut round);
            matches.push(new_match);
        }

        info!(
            "Room {} started with {} matches (bye: {:?})",
            self.id,
            self.matches.len(),
            self.bye
        );
        self.broadcast_state(now, outbox);
        Ok(())
    }

    /// Runs a match action for `user` and broadcasts the result.
    pub fn play<F>(
        &mut self,
        user: &str,
        now: u64,
        timings: &Timings,
        outbox: &mut Outbox,
        action: F,
    ) -> Result<(), ActionError>
    where
        F: FnOnce(&mut Match, &mut RoundContext) -> Result<(), ActionError>,
    {
        let index = self.match_index(user)?;
        {
            let mut parts = self.context(now, timings, outbox);
            action(&mut parts.matches[index], &mut parts.round)?;
        }
        self.broadcast_state(now, outbox);
        Ok(())
    }

    /// Relays the attacker's selection without a full state broadcast.
    pub fn sync_selection(
        &mut self,
        user: &str,
        indices: &[usize],
        now: u64,
        timings: &Timings,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        let index = self.match_index(user)?;
        let mut parts = self.context(now, timings, outbox);
        parts.matches[index].sync_selection(user, indices, &mut parts.round)
    }

    fn match_index(&self, user: &str) -> Result<usize, ActionError> {
        if self.state != RoomState::Game {
            return Err(ActionError::Ignored);
        }
        self.matches
            .iter()
            .position(|m| m.has_player(user))
            .ok_or(ActionError::Ignored)
    }

    /// Applies an elapsed timer addressed to this room. `reset_tokens` is the
    /// registry-wide counter that game-over reset timers are drawn from.
    pub fn on_timer(
        &mut self,
        timer: &Timer,
        now: u64,
        timings: &Timings,
        reset_tokens: &mut u64,
        outbox: &mut Outbox,
    ) {
        if let Timer::RoomReset { token, .. } = timer {
            if self.reset_token == Some(*token) {
                info!("Room {} reset after game-over delay", self.id);
                self.reset(outbox);
            } else {
                debug!("Stale reset timer for room {}", self.id);
            }
            return;
        }

        let match_id = match timer {
            Timer::PhaseDeadline(deadline) => &deadline.match_id,
            Timer::AdvanceRound { match_id, .. } | Timer::SettleReveal { match_id, .. } => match_id,
            Timer::RoomReset { .. } => return,
        };
        let Some(index) = self.matches.iter().position(|m| &m.id == match_id) else {
            debug!("Timer for vanished match {} in room {}", match_id, self.id);
            return;
        };

        let mut concluded = false;
        let changed = {
            let mut parts = self.context(now, timings, outbox);
            let m = &mut parts.matches[index];
            match timer {
                Timer::PhaseDeadline(deadline) => m.on_deadline(deadline, &mut parts.round),
                Timer::SettleReveal { round, stage, .. } => {
                    m.settle_reveal(*round, *stage, &mut parts.round)
                }
                Timer::AdvanceRound { round, .. } => match m.advance(*round, &mut parts.round) {
                    Advance::Stale => false,
                    Advance::NextRound => true,
                    Advance::Concluded => {
                        concluded = true;
                        true
                    }
                },
                Timer::RoomReset { .. } => false,
            }
        };

        if changed {
            self.broadcast_state(now, outbox);
        }
        if concluded && self.matches.iter().all(|m| m.concluded) {
            self.finish_game(reset_tokens, timings, outbox);
        }
    }

    fn finish_game(&mut self, reset_tokens: &mut u64, timings: &Timings, outbox: &mut Outbox) {
        self.game_over = true;
        let winner = self.ledger.leader();
        outbox.to_room(
            &self.id,
            ServerPacket::GameSummary {
                history: self.history.clone(),
                scores: self.ledger.snapshot(),
                winner: winner.clone(),
            },
        );

        *reset_tokens += 1;
        let token = *reset_tokens;
        self.reset_token = Some(token);
        outbox.schedule(ScheduledTimer {
            delay: timings.game_over_reset,
            timer: Timer::RoomReset {
                room_id: self.id.clone(),
                token,
            },
        });
        info!("Room {} game over, winner {:?}", self.id, winner);
    }

    /// Records a member's acknowledgement of the game summary; resets the room
    /// once every member has confirmed.
    pub fn confirm_summary(&mut self, user: &str, outbox: &mut Outbox) -> Result<(), ActionError> {
        if !self.game_over || !self.is_member(user) {
            return Err(ActionError::Ignored);
        }
        self.confirmations.insert(user.to_string());
        let count = self.confirmations.len();
        outbox.to_room(&self.id, ServerPacket::ConfirmCount { count });
        if count >= self.members.len() {
            info!("Room {} reset by unanimous confirmation", self.id);
            self.reset(outbox);
        }
        Ok(())
    }

    /// Returns the room to the lobby with fresh balances.
    pub fn reset(&mut self, outbox: &mut Outbox) {
        self.state = RoomState::Lobby;
        self.matches.clear();
        self.history.clear();
        self.confirmations.clear();
        self.spectators.clear();
        self.bye = None;
        self.game_over = false;
        self.reset_token = None;
        self.ledger.reset(&self.members);
        for flag in self.ready.values_mut() {
            *flag = false;
        }
        outbox.to_room(&self.id, ServerPacket::ResetToLobby);
        outbox.to_room(&self.id, ServerPacket::RoomSync { room: self.snapshot() });
    }

    pub fn broadcast_state(&self, now: u64, outbox: &mut Outbox) {
        for user in view::audience(self) {
            self.send_state_to(&user, now, outbox);
        }
    }

    pub fn send_state_to(&self, user: &str, now: u64, outbox: &mut Outbox) {
        let game_view = view::compose(self, user, now);
        outbox.to_user(user, ServerPacket::GameUpdate(Box::new(game_view)));
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            owner: self.owner.clone(),
            state: self.state,
            players: self.members.clone(),
            ready: self
                .members
                .iter()
                .map(|user| (user.clone(), self.ready.get(user).copied().unwrap_or(false)))
                .collect(),
            scores: self.ledger.snapshot(),
            bye: self.bye.clone(),
            chat: self.chat.clone(),
        }
    }

    pub fn lobby_entry(&self) -> LobbyEntry {
        LobbyEntry {
            id: self.id.clone(),
            owner: self.owner.clone(),
            count: self.members.len(),
            state: self.state,
        }
    }
}
