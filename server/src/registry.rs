//! Room table and action dispatch.
//!
//! The registry is owned by the server loop, so every action and every fired
//! timer reaches a room through `&mut self` one at a time.

use crate::config::Timings;
use crate::deadline::Timer;
use crate::error::ActionError;
use crate::outbox::Outbox;
use crate::room::{JoinKind, Room};
use crate::view;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Action, LobbyEntry, RoomState, ServerPacket, UserId};
use std::collections::BTreeMap;

pub struct RoomRegistry {
    rooms: BTreeMap<String, Room>,
    timings: Timings,
    rng: StdRng,
    /// Last game-over reset token handed out. Tokens never repeat, so a reset
    /// timer outlives any room that reuses its id.
    reset_tokens: u64,
}

impl RoomRegistry {
    pub fn new(timings: Timings) -> Self {
        Self::with_rng(timings, StdRng::from_entropy())
    }

    pub fn with_rng(timings: Timings, rng: StdRng) -> Self {
        Self {
            rooms: BTreeMap::new(),
            timings,
            rng,
            reset_tokens: 0,
        }
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn lobby(&self) -> Vec<LobbyEntry> {
        self.rooms.values().map(Room::lobby_entry).collect()
    }

    /// Users who receive the room's broadcasts.
    pub fn audience(&self, room_id: &str) -> Vec<UserId> {
        self.rooms.get(room_id).map(view::audience).unwrap_or_default()
    }

    /// The room `user` belongs to, as a member or a spectator.
    pub fn room_of(&self, user: &str) -> Option<&Room> {
        self.rooms
            .values()
            .find(|room| room.is_member(user))
            .or_else(|| self.rooms.values().find(|room| room.spectators.contains(user)))
    }

    pub fn enter_lobby(&self, user: &str, outbox: &mut Outbox) {
        outbox.to_user(user, ServerPacket::LobbyUpdate { rooms: self.lobby() });
    }

    /// Puts a returning user back into the room they were part of.
    pub fn reconnect(&self, user: &str, now: u64, outbox: &mut Outbox) {
        let Some(room) = self.room_of(user) else {
            outbox.to_user(
                user,
                ServerPacket::ReconnectResult {
                    message: "no active room".to_string(),
                },
            );
            self.enter_lobby(user, outbox);
            return;
        };

        outbox.to_user(
            user,
            ServerPacket::JoinSuccess {
                room: room.snapshot(),
                is_spectator: !room.is_member(user),
                is_reconnect: true,
            },
        );
        match room.state {
            RoomState::Game => room.send_state_to(user, now, outbox),
            RoomState::Lobby => {
                outbox.to_user(user, ServerPacket::RoomSync { room: room.snapshot() })
            }
        }
        outbox.to_user(
            user,
            ServerPacket::ReconnectResult {
                message: format!("rejoined room {}", room.id),
            },
        );
        info!("{} reconnected to room {}", user, room.id);
    }

    /// Applies one inbound action. Lobby listings are refreshed for everyone
    /// whenever the action changes a room's public entry.
    pub fn handle_action(
        &mut self,
        action: Action,
        now: u64,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        let room_id = action.room_id().to_string();
        let before = self.rooms.get(&room_id).map(Room::lobby_entry);
        let result = self.dispatch(action, now, outbox);
        let after = self.rooms.get(&room_id).map(Room::lobby_entry);
        if before != after {
            outbox.to_everyone(ServerPacket::LobbyUpdate { rooms: self.lobby() });
        }
        if let Err(e) = &result {
            debug!("Action in room {} rejected: {}", room_id, e);
        }
        result
    }

    fn dispatch(
        &mut self,
        action: Action,
        now: u64,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        let timings = self.timings;
        match action {
            Action::CreateRoom { room_id, user_id } => self.create_room(room_id, &user_id, outbox),
            Action::JoinRoom { room_id, user_id } => {
                self.join_room(&room_id, &user_id, now, outbox)
            }
            Action::LeaveRoom { room_id, user_id } => self.leave_room(&room_id, &user_id, outbox),
            Action::SetReady { room_id, user_id } => {
                let room = self.existing(&room_id)?;
                room.toggle_ready(&user_id)?;
                outbox.to_room(&room.id, ServerPacket::RoomSync { room: room.snapshot() });
                Ok(())
            }
            Action::StartGame { room_id } => {
                let room = self.rooms.get_mut(&room_id).ok_or(ActionError::RoomNotFound)?;
                room.start_game(&mut self.rng, now, &timings, outbox)?;
                outbox.info(&room_id, "Game started");
                Ok(())
            }
            Action::LockRule { room_id, user_id, rule } => self
                .existing(&room_id)?
                .play(&user_id, now, &timings, outbox, |m, _| {
                    m.lock_rule(&user_id, rule)
                }),
            Action::SubmitDefense { room_id, user_id, boxes } => self
                .existing(&room_id)?
                .play(&user_id, now, &timings, outbox, |m, ctx| {
                    m.submit_defense(&user_id, &boxes, ctx)
                }),
            Action::SelectStrategy { room_id, user_id, strategy } => self
                .existing(&room_id)?
                .play(&user_id, now, &timings, outbox, |m, _| {
                    m.select_strategy(&user_id, strategy)
                }),
            Action::ExecuteAttack { room_id, user_id, attack } => self
                .existing(&room_id)?
                .play(&user_id, now, &timings, outbox, |m, ctx| {
                    m.execute_attack(&user_id, &attack, ctx)
                }),
            Action::S4SubmitTarget { room_id, user_id, target } => self
                .existing(&room_id)?
                .play(&user_id, now, &timings, outbox, |m, ctx| {
                    m.s4_submit_target(&user_id, target, ctx)
                }),
            Action::S4Reveal { room_id, user_id, box_index } => self
                .existing(&room_id)?
                .play(&user_id, now, &timings, outbox, |m, ctx| {
                    m.s4_reveal(&user_id, box_index, ctx)
                }),
            Action::S4ExecutePick { room_id, user_id, indices } => self
                .existing(&room_id)?
                .play(&user_id, now, &timings, outbox, |m, ctx| {
                    m.s4_execute_pick(&user_id, &indices, ctx)
                }),
            Action::SyncSelection { room_id, user_id, indices } => self
                .existing(&room_id)?
                .sync_selection(&user_id, &indices, now, &timings, outbox),
            Action::ConfirmSummary { room_id, user_id } => {
                self.existing(&room_id)?.confirm_summary(&user_id, outbox)
            }
            Action::SendChat { room_id, user_id, text } => {
                self.existing(&room_id)?.send_chat(&user_id, &text, outbox)
            }
        }
    }

    /// Game actions against unknown rooms are dropped like any other
    /// out-of-turn action.
    fn existing(&mut self, room_id: &str) -> Result<&mut Room, ActionError> {
        self.rooms.get_mut(room_id).ok_or(ActionError::Ignored)
    }

    fn create_room(
        &mut self,
        room_id: String,
        user: &str,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        if room_id.trim().is_empty() || user.trim().is_empty() {
            return Err(ActionError::Ignored);
        }
        if self.rooms.contains_key(&room_id) {
            return Err(ActionError::RoomExists);
        }
        let room = Room::new(room_id.clone(), user);
        outbox.to_user(
            user,
            ServerPacket::JoinSuccess {
                room: room.snapshot(),
                is_spectator: false,
                is_reconnect: false,
            },
        );
        info!("Room {} created by {}", room_id, user);
        self.rooms.insert(room_id, room);
        Ok(())
    }

    fn join_room(
        &mut self,
        room_id: &str,
        user: &str,
        now: u64,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        let room = self.rooms.get_mut(room_id).ok_or(ActionError::RoomNotFound)?;
        let kind = room.join(user)?;
        outbox.to_user(
            user,
            ServerPacket::JoinSuccess {
                room: room.snapshot(),
                is_spectator: kind == JoinKind::Spectator,
                is_reconnect: kind == JoinKind::Returning,
            },
        );
        match room.state {
            RoomState::Game => room.send_state_to(user, now, outbox),
            RoomState::Lobby => {
                outbox.to_room(room_id, ServerPacket::RoomSync { room: room.snapshot() })
            }
        }
        if kind != JoinKind::Returning {
            outbox.info(room_id, format!("{} joined", user));
            info!("{} joined room {} ({:?})", user, room_id, kind);
        }
        Ok(())
    }

    fn leave_room(
        &mut self,
        room_id: &str,
        user: &str,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        let room = self.rooms.get_mut(room_id).ok_or(ActionError::Ignored)?;
        room.leave(user)?;
        outbox.to_user(user, ServerPacket::LeaveSuccess);

        if room.members.is_empty() && room.state == RoomState::Lobby {
            self.rooms.remove(room_id);
            info!("Room {} closed", room_id);
        } else {
            outbox.to_room(room_id, ServerPacket::RoomSync { room: room.snapshot() });
        }
        outbox.to_user(user, ServerPacket::LobbyUpdate { rooms: self.lobby() });
        Ok(())
    }

    /// Routes a fired timer to its room. Timers for rooms that no longer
    /// exist are dropped.
    pub fn on_timer(&mut self, timer: Timer, now: u64, outbox: &mut Outbox) {
        let timings = self.timings;
        let Some(room) = self.rooms.get_mut(timer.room_id()) else {
            debug!("Timer for closed room {}", timer.room_id());
            return;
        };
        let before = room.lobby_entry();
        room.on_timer(&timer, now, &timings, &mut self.reset_tokens, outbox);
        if room.lobby_entry() != before {
            outbox.to_everyone(ServerPacket::LobbyUpdate { rooms: self.lobby() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::Recipient;
    use shared::Rule;

    fn registry() -> RoomRegistry {
        RoomRegistry::with_rng(Timings::default(), StdRng::seed_from_u64(5))
    }

    fn create(reg: &mut RoomRegistry, room: &str, user: &str, outbox: &mut Outbox) {
        reg.handle_action(
            Action::CreateRoom {
                room_id: room.to_string(),
                user_id: user.to_string(),
            },
            0,
            outbox,
        )
        .unwrap();
    }

    fn join(
        reg: &mut RoomRegistry,
        room: &str,
        user: &str,
        outbox: &mut Outbox,
    ) -> Result<(), ActionError> {
        reg.handle_action(
            Action::JoinRoom {
                room_id: room.to_string(),
                user_id: user.to_string(),
            },
            0,
            outbox,
        )
    }

    #[test]
    fn test_create_and_duplicate_room() {
        let mut reg = registry();
        let mut outbox = Outbox::new();
        create(&mut reg, "r1", "alice", &mut outbox);
        assert!(outbox
            .packets
            .iter()
            .any(|(to, p)| {
                *to == Recipient::Everyone && matches!(p, ServerPacket::LobbyUpdate { .. })
            }));

        let dup = reg.handle_action(
            Action::CreateRoom {
                room_id: "r1".to_string(),
                user_id: "bob".to_string(),
            },
            0,
            &mut outbox,
        );
        assert_eq!(dup, Err(ActionError::RoomExists));
        assert_eq!(reg.lobby().len(), 1);
    }

    #[test]
    fn test_join_unknown_room() {
        let mut reg = registry();
        let mut outbox = Outbox::new();
        assert_eq!(join(&mut reg, "nowhere", "bob", &mut outbox), Err(ActionError::RoomNotFound));
    }

    #[test]
    fn test_room_removed_when_last_member_leaves() {
        let mut reg = registry();
        let mut outbox = Outbox::new();
        create(&mut reg, "r1", "alice", &mut outbox);
        reg.handle_action(
            Action::LeaveRoom {
                room_id: "r1".to_string(),
                user_id: "alice".to_string(),
            },
            0,
            &mut outbox,
        )
        .unwrap();
        assert!(reg.is_empty());
        assert!(outbox
            .packets
            .iter()
            .any(|(to, p)| {
                *to == Recipient::User("alice".to_string()) && *p == ServerPacket::LeaveSuccess
            }));
    }

    #[test]
    fn test_start_game_requires_two_players() {
        let mut reg = registry();
        let mut outbox = Outbox::new();
        create(&mut reg, "r1", "alice", &mut outbox);
        let result = reg.handle_action(
            Action::StartGame {
                room_id: "r1".to_string(),
            },
            0,
            &mut outbox,
        );
        assert_eq!(result, Err(ActionError::NotEnoughPlayers));
        assert_eq!(
            result.unwrap_err().to_string(),
            "at least two players are required"
        );
    }

    #[test]
    fn test_game_actions_for_unknown_room_are_ignored() {
        let mut reg = registry();
        let mut outbox = Outbox::new();
        let result = reg.handle_action(
            Action::LockRule {
                room_id: "ghost".to_string(),
                user_id: "alice".to_string(),
                rule: Rule::Progression,
            },
            0,
            &mut outbox,
        );
        assert_eq!(result, Err(ActionError::Ignored));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_reconnect_restores_room() {
        let mut reg = registry();
        let mut outbox = Outbox::new();
        create(&mut reg, "r1", "alice", &mut outbox);
        join(&mut reg, "r1", "bob", &mut outbox).unwrap();

        let mut replay = Outbox::new();
        reg.reconnect("bob", 0, &mut replay);
        assert!(matches!(
            replay.packets[0].1,
            ServerPacket::JoinSuccess { is_reconnect: true, is_spectator: false, .. }
        ));
        assert!(matches!(replay.packets[1].1, ServerPacket::RoomSync { .. }));

        let mut nothing = Outbox::new();
        reg.reconnect("carol", 0, &mut nothing);
        assert!(matches!(nothing.packets[0].1, ServerPacket::ReconnectResult { .. }));
    }

    #[test]
    fn test_timer_for_closed_room_is_dropped() {
        let mut reg = registry();
        let mut outbox = Outbox::new();
        reg.on_timer(
            Timer::RoomReset {
                room_id: "gone".to_string(),
                token: 1,
            },
            0,
            &mut outbox,
        );
        assert!(outbox.is_empty());
    }
}
