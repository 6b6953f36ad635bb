//! # Puppet Client Library
//!
//! The client side of the puppet network. A client joins a server with a
//! secret phrase the host registered for it, then sends its own player's
//! movement to the server and follows the host's puppet.
//!
//! ## Handshake
//!
//! [`Client::connect`](network::Client::connect) sends `NewClientRequest` and
//! waits for `AcceptClient`, retrying a configured number of times. The reply
//! tells the client which cell and placement to move its own player to, and
//! describes the host's character so a puppet can be created for it.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::config::NetworkConfig;
//! use shared::packet::Placement;
//! use shared::role::Role;
//! use shared::session::SessionTable;
//! use shared::world::{Appearance, Cell, MemoryWorld};
//!
//! let mut world = MemoryWorld::new(
//!     Appearance::default(),
//!     Cell::Exterior { x: 0, y: 0 },
//!     Placement::default(),
//! );
//! let mut sessions = SessionTable::new();
//! let mut client = Client::connect(
//!     "127.0.0.1",
//!     "my secret",
//!     &NetworkConfig::default(),
//!     &mut sessions,
//!     &mut world,
//! )?;
//!
//! loop {
//!     client.update(&mut sessions, &mut world);
//!     std::thread::sleep(std::time::Duration::from_millis(33));
//! }
//! # Ok::<(), shared::error::NetworkError>(())
//! ```

pub mod network;
