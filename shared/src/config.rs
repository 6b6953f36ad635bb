//! Tunables shared by both roles and the session manager

use crate::error::NetworkError;
use crate::{DEFAULT_HOST_SECRET, DEFAULT_TICK_DIVISOR};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the server answers a `NewClientRequest` whose secret has no puppet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownSecretPolicy {
    /// Drop the request; the client eventually times out
    Ignore,
    /// Answer with `OtherMessage { WrongPassword }`
    RejectWithWrongPassword,
}

/// Transport requested when opening a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Udp,
    Tcp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Udp => write!(f, "UDP"),
            TransportKind::Tcp => write!(f, "TCP"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(TransportKind::Udp),
            "tcp" => Ok(TransportKind::Tcp),
            _ => Err(NetworkError::UnknownTransport(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Periodic movement is sent on every `tick_divisor`-th `update()`
    pub tick_divisor: u32,
    /// How long each handshake attempt waits for `AcceptClient`
    pub handshake_timeout: Duration,
    pub handshake_attempts: u32,
    pub unknown_secret_policy: UnknownSecretPolicy,
    /// Forget a peer's address after this long without hearing from it
    pub session_ttl: Option<Duration>,
    /// Secret under which the host's own puppet travels
    pub host_secret: String,
    /// Local interface the server binds to
    pub bind_host: String,
    /// Refuse `create_puppet` while no role is active
    pub require_open_for_puppets: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tick_divisor: DEFAULT_TICK_DIVISOR,
            handshake_timeout: Duration::from_secs(3),
            handshake_attempts: 5,
            unknown_secret_policy: UnknownSecretPolicy::RejectWithWrongPassword,
            session_ttl: None,
            host_secret: DEFAULT_HOST_SECRET.to_string(),
            bind_host: "0.0.0.0".to_string(),
            require_open_for_puppets: false,
        }
    }
}
