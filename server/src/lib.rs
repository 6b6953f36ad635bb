//! # Puppet Server Library
//!
//! The server side of the puppet network. A host opens a UDP port, registers a
//! puppet for every secret it is willing to admit, and from then on mirrors
//! its own player to every peer that joined.
//!
//! ## Joining
//!
//! A client sends `NewClientRequest` carrying its secret. If the secret was
//! registered, the server remembers the client's address and answers with
//! `AcceptClient`, describing both the client's puppet (where the client
//! should appear) and the host's own character. Unknown secrets are either
//! ignored or answered with `WrongPassword`, depending on
//! [`UnknownSecretPolicy`](shared::config::UnknownSecretPolicy).
//!
//! ## Broadcasting
//!
//! Every few updates the host's movement is sent to all peers whose address is
//! known. Inbound movement from a peer drives the puppet registered under its
//! secret and refreshes the peer's address.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::config::NetworkConfig;
//! use shared::role::Role;
//! use shared::session::SessionTable;
//! use shared::world::{Appearance, Cell, MemoryWorld};
//! use shared::packet::Placement;
//!
//! let config = NetworkConfig::default();
//! let mut world = MemoryWorld::new(
//!     Appearance::default(),
//!     Cell::Exterior { x: 0, y: 0 },
//!     Placement::default(),
//! );
//! let mut sessions = SessionTable::new();
//! let mut server = Server::open(shared::DEFAULT_PORT, &config)?;
//!
//! loop {
//!     server.update(&mut sessions, &mut world);
//!     std::thread::sleep(std::time::Duration::from_millis(33));
//! }
//! # Ok::<(), shared::error::NetworkError>(())
//! ```

pub mod network;
