//! # Hit Registration Client Library
//!
//! Client-side core of a relay-based multiplayer shooter. Every peer runs its
//! own simulation; a relay only assigns connection ids and fans messages out
//! to the other peers without interpreting them.
//!
//! ## Architecture Overview
//!
//! ### Shooter Authority
//! Damage is decided by whoever fired the bullet. The shooting client sweeps
//! its bullet against walls and player hitboxes, applies the damage locally
//! and broadcasts the target's new absolute health. Bullets seen on other
//! peers are replicas that only produce impact effects.
//!
//! ### Single Owner Simulation
//! One [`game::Game`] owns every entity and the session state. A receiver
//! task decodes relay frames onto the [`events::NetworkEventQueue`]; the
//! simulation loop drains it once per tick before stepping, so no game state
//! is ever shared across tasks.
//!
//! ## Module Organization
//!
//! ### Simulation
//! - `geometry`: static boxes and the slab intersection test
//! - `ballistics`: per-tick bullet sweep and the dynamic hitbox ray caster
//! - `entities`: the local player, remote players, bullets and their registry
//! - `weapon`: weapon classes, cooldown and reload state
//! - `hit`: turns a bullet hitting a player into a damage decision
//! - `session`: match phases, team scores, victory and restart seeds
//! - `game`: ties the above together per tick
//!
//! ### Networking
//! - `framing`: length-prefixed frames over async streams
//! - `network`: relay handshake plus receiver and sender tasks
//! - `events`: the mailbox between the receiver and the simulation
//!
//! ### Front End
//! - `input`: console commands to local actions
//! - `presentation`: change notifications and a log-backed presenter
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::events::NetworkEventQueue;
//! use client::game::Game;
//! use client::network;
//! use client::session::SessionConfig;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (events, mut queue) = NetworkEventQueue::channel();
//! let link = network::connect("127.0.0.1:8000", "alice", Duration::from_secs(5), events).await?;
//! let mut game = Game::new(link.client_id(), "alice", &SessionConfig::default());
//!
//! loop {
//!     game.drain_events(&mut queue)?;
//!     game.tick(1.0 / 60.0);
//!     for message in game.take_outbound() {
//!         link.send(message);
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

pub mod ballistics;
pub mod entities;
pub mod error;
pub mod events;
pub mod framing;
pub mod game;
pub mod geometry;
pub mod hit;
pub mod input;
pub mod network;
pub mod presentation;
pub mod session;
pub mod weapon;
