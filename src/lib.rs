//! # Puppet Net
//!
//! Peer-to-peer movement mirroring for a role-playing game. One instance hosts,
//! others join with a secret phrase, and each side sees the other's character
//! as a puppet driven by network updates.
//!
//! ## Crates
//!
//! - `shared`: wire format, session table, UDP transport, the role trait and the
//!   world/behavior collaborator traits
//! - `server`: the hosting role
//! - `client`: the joining role and its handshake
//! - this crate: the [`Network`](network::Network) session manager that owns at
//!   most one active role, and the [`console`] commands built on top of it
//! - `puppet-host` / `puppet-join`: demo binaries driven through the console commands
//!
//! ## Threading
//!
//! Nothing runs in the background. All network progress happens inside
//! [`Network::update`](network::Network::update), which the host application
//! calls once per frame. `connect` blocks for the duration of the handshake.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use puppet_net::network::Network;
//! use shared::config::TransportKind;
//! use shared::packet::Placement;
//! use shared::world::{Appearance, Cell, MemoryWorld};
//!
//! let mut world = MemoryWorld::new(
//!     Appearance::default(),
//!     Cell::Exterior { x: 0, y: 0 },
//!     Placement::default(),
//! );
//! let puppet = world.spawn(&Appearance::default(), &Cell::Exterior { x: 0, y: 0 }, Placement::default());
//!
//! let mut network = Network::default();
//! network.open_server(shared::DEFAULT_PORT, TransportKind::Udp)?;
//! network.create_puppet("alice", &puppet)?;
//!
//! loop {
//!     network.update(&mut world);
//!     world.tick_puppets(&network);
//!     std::thread::sleep(std::time::Duration::from_millis(33));
//! }
//! # Ok::<(), shared::error::NetworkError>(())
//! ```

pub mod console;
pub mod network;

pub use network::{Network, NetworkState};
