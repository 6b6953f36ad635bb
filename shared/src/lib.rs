//! Core of the puppet network: wire format, sessions, transport and roles
//!
//! Both the server and client crates build on the types here. Nothing in this
//! crate spawns threads; all I/O is driven from the caller's update loop.

pub mod config;
pub mod error;
pub mod fixed;
pub mod packet;
pub mod role;
pub mod session;
pub mod transport;
pub mod world;

pub use config::{NetworkConfig, TransportKind, UnknownSecretPolicy};
pub use error::{NetworkError, SessionError, WireError, WorldError};
pub use packet::{
    CharacterMovement, MessageCode, Movement, MovementState, Packet, PacketType, Payload, Placement,
    PuppetInfo,
};
pub use role::Role;
pub use session::{MovementOutcome, MovementSource, PeerSession, SessionTable};
pub use transport::{Inbound, Transport};
pub use world::{Appearance, Cell, EntityRef, MemoryWorld, PuppetBehavior, World};

pub const DEFAULT_PORT: u16 = 5121;

/// Every datagram is padded to exactly this many bytes
pub const PACKET_SIZE: usize = 1024;

/// Secret field width on the wire, including the terminating NUL
pub const SECRET_CAPACITY: usize = 32;
pub const MAX_SECRET_LEN: usize = SECRET_CAPACITY - 1;

pub const CELL_NAME_CAPACITY: usize = 64;
pub const MODEL_NAME_CAPACITY: usize = 48;
pub const SHORT_NAME_CAPACITY: usize = 32;

/// Side length of an exterior cell in world units
pub const CELL_SIZE: f32 = 8192.0;

pub const DEFAULT_TICK_DIVISOR: u32 = 3;
pub const DEFAULT_HOST_SECRET: &str = "host";
