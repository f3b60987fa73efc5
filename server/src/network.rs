//! Server network layer: UDP transport, session bookkeeping and the single
//! loop that owns all room state.

use crate::config::ServerConfig;
use crate::deadline::{DeadlineScheduler, Timer};
use crate::outbox::{Outbox, Recipient};
use crate::registry::RoomRegistry;
use crate::session::SessionManager;
use crate::utils::get_timestamp;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ClientPacket, ServerPacket};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: ClientPacket,
        addr: SocketAddr,
    },
    SessionTimeout {
        user: String,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket {
        packet: ServerPacket,
        addr: SocketAddr,
    },
    /// Every online session.
    BroadcastPacket { packet: ServerPacket },
}

pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: Arc<RwLock<SessionManager>>,
    registry: RoomRegistry,
    scheduler: DeadlineScheduler,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    timer_rx: mpsc::UnboundedReceiver<Timer>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.address).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            sessions: Arc::new(RwLock::new(SessionManager::new(
                config.max_sessions,
                config.session_timeout,
            ))),
            registry: RoomRegistry::new(config.timings),
            scheduler: DeadlineScheduler::new(timer_tx),
            server_tx,
            server_rx,
            out_tx,
            out_rx,
            timer_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender for injecting messages into the main loop, e.g. `Shutdown`.
    pub fn handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 8192];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<ClientPacket>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let sessions = Arc::clone(&self.sessions);
        let mut out_rx = std::mem::replace(&mut self.out_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::BroadcastPacket { packet } => {
                        let addrs = {
                            let sessions_guard = sessions.read().await;
                            sessions_guard.addrs()
                        };

                        for addr in addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    async fn spawn_timeout_checker(&self) {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut sessions_guard = sessions.write().await;
                    sessions_guard.check_timeouts()
                };

                for user in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::SessionTimeout { user }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &ServerPacket,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: ServerPacket, addr: SocketAddr) {
        if let Err(e) = self.out_tx.send(OutboundMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: ServerPacket) {
        if let Err(e) = self.out_tx.send(OutboundMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Resolves recipients to online addresses and queues everything the
    /// engine produced. Offline users simply miss the packet.
    async fn deliver(&self, outbox: Outbox) {
        let Outbox { packets, timers } = outbox;

        for scheduled in timers {
            self.scheduler.schedule(scheduled);
        }
        if packets.is_empty() {
            return;
        }

        let sessions = self.sessions.read().await;
        for (recipient, packet) in packets {
            match recipient {
                Recipient::User(user) => {
                    if let Some(addr) = sessions.addr_of(&user) {
                        self.send_packet(packet, addr);
                    }
                }
                Recipient::Room(room_id) => {
                    for user in self.registry.audience(&room_id) {
                        if let Some(addr) = sessions.addr_of(&user) {
                            self.send_packet(packet.clone(), addr);
                        }
                    }
                }
                Recipient::Everyone => self.broadcast_packet(packet),
            }
        }
    }

    async fn handle_packet(&mut self, packet: ClientPacket, addr: SocketAddr) {
        let now = get_timestamp();
        let mut outbox = Outbox::new();

        match packet {
            ClientPacket::EnterLobby { user_id } | ClientPacket::Reconnect { user_id }
                if user_id.trim().is_empty() =>
            {
                warn!("Empty user id from {}", addr);
                return;
            }
            ClientPacket::EnterLobby { user_id } => {
                if !self.bind(addr, &user_id).await {
                    return;
                }
                self.registry.enter_lobby(&user_id, &mut outbox);
            }
            ClientPacket::Reconnect { user_id } => {
                if !self.bind(addr, &user_id).await {
                    return;
                }
                self.registry.reconnect(&user_id, now, &mut outbox);
            }
            ClientPacket::Heartbeat => {
                let mut sessions = self.sessions.write().await;
                sessions.touch(addr);
            }
            ClientPacket::Disconnect => {
                let mut sessions = self.sessions.write().await;
                sessions.remove(addr);
            }
            ClientPacket::Action(action) => {
                let user = {
                    let mut sessions = self.sessions.write().await;
                    sessions.touch(addr);
                    sessions.user_of(addr)
                };
                let Some(user) = user else {
                    warn!("Action from unknown address {}", addr);
                    return;
                };
                if action.user_id().is_some_and(|claimed| claimed != user) {
                    warn!("{} at {} acted as someone else", user, addr);
                    return;
                }

                if let Err(e) = self.registry.handle_action(action, now, &mut outbox) {
                    if !e.is_silent() {
                        self.send_packet(
                            ServerPacket::Error {
                                message: e.to_string(),
                            },
                            addr,
                        );
                    }
                }
            }
        }

        self.deliver(outbox).await;
    }

    async fn bind(&self, addr: SocketAddr, user: &str) -> bool {
        let bound = {
            let mut sessions = self.sessions.write().await;
            sessions.bind(addr, user)
        };
        if !bound {
            self.send_packet(
                ServerPacket::Error {
                    message: "server full".to_string(),
                },
                addr,
            );
        }
        bound
    }

    async fn handle_timer(&mut self, timer: Timer) {
        let mut outbox = Outbox::new();
        self.registry.on_timer(timer, get_timestamp(), &mut outbox);
        self.deliver(outbox).await;
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::SessionTimeout { user }) => {
                            debug!("Session for {} expired", user);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                Some(timer) = self.timer_rx.recv() => {
                    self.handle_timer(timer).await;
                },
            }
        }

        Ok(())
    }
}
