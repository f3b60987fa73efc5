//! # Box Heist Server Library
//!
//! Authoritative server for the box heist arena: players gather in rooms,
//! get paired into 1v1 matches, and alternate between hiding token value in
//! 22 boxes (the defender) and extracting it with one of four search
//! strategies (the attacker). Every balance change, phase transition and
//! timeout is decided here; clients only ever see role-filtered views.
//!
//! ## Core Responsibilities
//!
//! ### Round Lifecycle
//! Each match runs six rounds of Setup, AttackSelect, Attacking and
//! Finishing. The defender locks a placement rule and deploys a layout that
//! must pass [`defense::validate_defense`]; the attacker then picks a strategy
//! compatible with that rule and plays it out through [`attack`].
//!
//! ### Deadlines
//! Phase deadlines and display pauses are scheduled as [`deadline::Timer`]s
//! that post back into the server loop. Timers are never cancelled: every
//! phase deadline carries the generation it was armed under, and a match
//! ignores any deadline whose generation is no longer current.
//!
//! ### Value Conservation
//! Whatever the defender deploys ends up either with the attacker, back with
//! the defender as an end-of-round refund, or burned by a failed comparative
//! guess. The [`ledger::ScoreLedger`] is the single source of balances.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! [`network::Server`] owns the [`registry::RoomRegistry`] outright. Decoded
//! packets and fired timers arrive over channels and are applied one at a
//! time, so no room state is ever shared between tasks.
//!
//! ### Effects as Data
//! Engine calls never touch the socket. They write packets and timers into an
//! [`outbox::Outbox`], which the loop then delivers: recipients are resolved
//! to online session addresses and timers are handed to the scheduler.
//!
//! ## Module Organization
//!
//! - `defense`: placement-rule validation
//! - `attack`: the box table and the four strategy resolvers
//! - `match_engine`: the per-match phase state machine
//! - `room`, `registry`: membership, pairing, game over and reset
//! - `view`: per-user projections for broadcasting
//! - `deadline`: generation tokens and the timer scheduler
//! - `session`, `network`: UDP transport and online users
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!
//!     // Runs until a Shutdown message arrives:
//!     // - Network Receiver decodes inbound packets
//!     // - Network Sender writes queued packets to sessions
//!     // - Timeout Checker expires silent sessions
//!     // - the main loop applies actions and fired timers in order
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod attack;
pub mod config;
pub mod deadline;
pub mod defense;
pub mod error;
pub mod ledger;
pub mod match_engine;
pub mod network;
pub mod outbox;
pub mod registry;
pub mod room;
pub mod session;
pub mod utils;
pub mod view;
