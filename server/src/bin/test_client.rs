use bincode::{deserialize, serialize};
use clap::Parser;
use shared::{
    Action, AttackMove, BoxContent, ClientPacket, Role, Rule, ServerPacket, Strategy, BOX_COUNT,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Plays one scripted round between two local clients.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:5000")]
    server: SocketAddr,
    /// Room to create
    #[clap(short, long, default_value = "smoke")]
    room: String,
}

struct Player {
    name: String,
    socket: UdpSocket,
    server: SocketAddr,
    role: Option<Role>,
}

impl Player {
    async fn connect(name: &str, server: SocketAddr) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        println!("{} bound to {}", name, socket.local_addr()?);
        Ok(Self {
            name: name.to_string(),
            socket,
            server,
            role: None,
        })
    }

    async fn send(&self, packet: ClientPacket) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(&packet)?;
        self.socket.send_to(&data, self.server).await?;
        Ok(())
    }

    /// Prints everything that arrives until the socket goes quiet.
    async fn drain(&mut self) -> Vec<ServerPacket> {
        let mut buf = [0u8; 8192];
        let mut received = Vec::new();
        while let Ok(Ok((len, _))) =
            timeout(Duration::from_millis(300), self.socket.recv_from(&mut buf)).await
        {
            match deserialize::<ServerPacket>(&buf[0..len]) {
                Ok(packet) => {
                    if let ServerPacket::GameUpdate(view) = &packet {
                        self.role = Some(view.role);
                        println!(
                            "[{}] game update: role {:?}, round {:?}",
                            self.name,
                            view.role,
                            view.current.as_ref().map(|m| m.round)
                        );
                    } else {
                        println!("[{}] {:?}", self.name, packet);
                    }
                    received.push(packet);
                }
                Err(e) => println!("[{}] failed to deserialize: {}", self.name, e),
            }
        }
        received
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut alice = Player::connect("alice", args.server).await?;
    let mut bob = Player::connect("bob", args.server).await?;

    for player in [&alice, &bob] {
        player
            .send(ClientPacket::EnterLobby {
                user_id: player.name.clone(),
            })
            .await?;
    }
    alice
        .send(ClientPacket::Action(Action::CreateRoom {
            room_id: args.room.clone(),
            user_id: "alice".to_string(),
        }))
        .await?;
    alice.drain().await;
    bob.send(ClientPacket::Action(Action::JoinRoom {
        room_id: args.room.clone(),
        user_id: "bob".to_string(),
    }))
    .await?;
    bob.drain().await;

    alice
        .send(ClientPacket::Action(Action::StartGame {
            room_id: args.room.clone(),
        }))
        .await?;
    alice.drain().await;
    bob.drain().await;

    let (defender, attacker) = if alice.role == Some(Role::Defender) {
        (&mut alice, &mut bob)
    } else {
        (&mut bob, &mut alice)
    };

    defender
        .send(ClientPacket::Action(Action::LockRule {
            room_id: args.room.clone(),
            user_id: defender.name.clone(),
            rule: Rule::Progression,
        }))
        .await?;
    defender
        .send(ClientPacket::Action(Action::SubmitDefense {
            room_id: args.room.clone(),
            user_id: defender.name.clone(),
            boxes: vec![BoxContent::new(20, 0); BOX_COUNT],
        }))
        .await?;
    defender.drain().await;

    attacker
        .send(ClientPacket::Action(Action::SelectStrategy {
            room_id: args.room.clone(),
            user_id: attacker.name.clone(),
            strategy: Strategy::BlindPick,
        }))
        .await?;
    for box_index in 0..8 {
        attacker
            .send(ClientPacket::Action(Action::ExecuteAttack {
                room_id: args.room.clone(),
                user_id: attacker.name.clone(),
                attack: AttackMove::BlindPick { box_index },
            }))
            .await?;
    }

    let summary = attacker
        .drain()
        .await
        .into_iter()
        .find(|packet| matches!(packet, ServerPacket::RoundSummary { .. }));
    match summary {
        Some(packet) => println!("Round finished: {:?}", packet),
        None => println!("No round summary received"),
    }

    for player in [&alice, &bob] {
        player.send(ClientPacket::Disconnect).await?;
    }
    println!("Test client finished");
    Ok(())
}
