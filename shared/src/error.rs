//! Error taxonomy for the puppet network
//!
//! Configuration and handshake failures surface to callers. Per-packet problems
//! (`WireError` on receipt, stale timestamps, vanished entities) are logged and
//! dropped by the transport and never reach the host application.

use crate::config::TransportKind;
use crate::packet::MessageCode;
use std::io;
use thiserror::Error;

/// Failures while building, encoding or decoding a wire packet
#[derive(Debug, Error)]
pub enum WireError {
    #[error("{field} must be shorter than {capacity} bytes, got {len}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        capacity: usize,
    },
    #[error("{field} contains an embedded NUL byte")]
    EmbeddedNul { field: &'static str },
    #[error("{field} is not NUL-terminated within its {capacity} bytes")]
    Unterminated { field: &'static str, capacity: usize },
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
    #[error("datagram is {actual} bytes, expected {expected}")]
    Size { expected: usize, actual: usize },
    #[error("encoded packet needs {len} bytes but the record holds {capacity}")]
    Oversize { len: usize, capacity: usize },
    #[error("codec failure: {0}")]
    Codec(#[from] bincode::Error),
}

/// Failures of a single peer-session operation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a puppet with the secret phrase '{0}' already exists")]
    Duplicate(String),
    #[error("puppet '{0}' does not exist")]
    NotFound(String),
}

/// Failures reported by the world collaborator
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity '{0}' does not exist")]
    EntityNotFound(String),
    #[error("record '{0}' does not exist")]
    RecordNotFound(String),
    #[error("cell '{0}' does not exist")]
    CellNotFound(String),
}

/// Everything the session manager can report to its caller
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("already in server mode; close the network before joining as a client")]
    AlreadyServer,
    #[error("already connected as a client; close the network first if you want to leave")]
    AlreadyClient,
    #[error("network is already closed")]
    AlreadyClosed,
    #[error("network is not open")]
    NotOpen,
    #[error("unknown transport '{0}', expected udp or tcp")]
    UnknownTransport(String),
    #[error("{0} transport is not implemented")]
    NotImplemented(TransportKind),
    #[error("could not resolve '{address}'")]
    Resolve { address: String },
    #[error("could not connect to {address} after {attempts} attempts")]
    ConnectionTimeout { address: String, attempts: u32 },
    #[error("{address} refused the connection: {code:?}")]
    Rejected { address: String, code: MessageCode },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    World(#[from] WorldError),
}

pub type Result<T, E = NetworkError> = std::result::Result<T, E>;
