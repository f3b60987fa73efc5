//! Effects produced by engine calls, drained by the network loop.

use crate::deadline::ScheduledTimer;
use shared::{ChatMessage, RoomId, ServerPacket, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(UserId),
    /// Every member and spectator of the room.
    Room(RoomId),
    /// Every online session.
    Everyone,
}

#[derive(Debug, Default)]
pub struct Outbox {
    pub packets: Vec<(Recipient, ServerPacket)>,
    pub timers: Vec<ScheduledTimer>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_user(&mut self, user: &str, packet: ServerPacket) {
        self.packets.push((Recipient::User(user.to_string()), packet));
    }

    pub fn to_room(&mut self, room_id: &str, packet: ServerPacket) {
        self.packets.push((Recipient::Room(room_id.to_string()), packet));
    }

    pub fn to_everyone(&mut self, packet: ServerPacket) {
        self.packets.push((Recipient::Everyone, packet));
    }

    pub fn info(&mut self, room_id: &str, text: impl Into<String>) {
        self.to_room(room_id, ServerPacket::Chat(ChatMessage::info(text)));
    }

    pub fn schedule(&mut self, timer: ScheduledTimer) {
        self.timers.push(timer);
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty() && self.timers.is_empty()
    }
}
