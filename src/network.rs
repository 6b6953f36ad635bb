//! Session manager: owns the session table and at most one active role

use client::network::Client;
use log::{info, warn};
use server::network::Server;
use shared::config::{NetworkConfig, TransportKind};
use shared::error::{NetworkError, SessionError};
use shared::packet::{Movement, Secret};
use shared::role::Role;
use shared::session::{MovementSource, PeerSession, SessionTable};
use shared::world::World;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Closed,
    ServerOpen,
    ClientConnected,
}

enum ActiveRole {
    Server(Server),
    Client(Client),
}

impl ActiveRole {
    fn role(&mut self) -> &mut dyn Role {
        match self {
            ActiveRole::Server(server) => server,
            ActiveRole::Client(client) => client,
        }
    }
}

pub struct Network {
    active: Option<ActiveRole>,
    sessions: SessionTable,
    config: NetworkConfig,
}

impl Network {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            active: None,
            sessions: SessionTable::new(),
            config,
        }
    }

    pub fn state(&self) -> NetworkState {
        match self.active {
            None => NetworkState::Closed,
            Some(ActiveRole::Server(_)) => NetworkState::ServerOpen,
            Some(ActiveRole::Client(_)) => NetworkState::ClientConnected,
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    fn ensure_closed(&self) -> Result<(), NetworkError> {
        match self.state() {
            NetworkState::Closed => Ok(()),
            NetworkState::ServerOpen => Err(NetworkError::AlreadyServer),
            NetworkState::ClientConnected => Err(NetworkError::AlreadyClient),
        }
    }

    /// Joins a server as a client.
    ///
    /// Blocks through the whole handshake. On failure the network stays closed.
    pub fn connect(
        &mut self,
        address: &str,
        secret: &str,
        world: &mut dyn World,
    ) -> Result<(), NetworkError> {
        self.ensure_closed()?;
        Secret::new("secret", secret)?;

        let client = Client::connect(address, secret, &self.config, &mut self.sessions, world)?;
        info!("Connected to {} as '{}'", client.server_addr(), secret);
        self.active = Some(ActiveRole::Client(client));
        Ok(())
    }

    /// Hosts a server on `port`; only UDP is available
    pub fn open_server(&mut self, port: u16, transport: TransportKind) -> Result<(), NetworkError> {
        self.ensure_closed()?;
        if transport != TransportKind::Udp {
            return Err(NetworkError::NotImplemented(transport));
        }

        let server = Server::open(port, &self.config)?;
        self.active = Some(ActiveRole::Server(server));
        Ok(())
    }

    /// Tears down the active role; its socket is shut down before this returns
    pub fn close(&mut self) -> Result<(), NetworkError> {
        match self.active.take() {
            Some(ActiveRole::Server(mut server)) => server.close(),
            Some(ActiveRole::Client(mut client)) => client.close(),
            None => return Err(NetworkError::AlreadyClosed),
        }
        info!("Network closed");
        Ok(())
    }

    /// Registers a puppet session for `secret` driving `entity`
    pub fn create_puppet(&mut self, secret: &str, entity: &str) -> Result<(), NetworkError> {
        if self.config.require_open_for_puppets && !self.is_open() {
            return Err(NetworkError::NotOpen);
        }
        Secret::new("secret", secret)?;

        self.sessions.register(secret, entity)?;
        Ok(())
    }

    pub fn remove_puppet(&mut self, secret: &str) -> Result<PeerSession, NetworkError> {
        Ok(self.sessions.remove(secret)?)
    }

    pub fn get_character_movement(&self, secret: &str) -> Result<Movement, NetworkError> {
        Ok(self.sessions.movement(secret)?)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.active {
            Some(ActiveRole::Server(server)) => Some(server.local_addr()),
            Some(ActiveRole::Client(client)) => Some(client.local_addr()),
            None => None,
        }
    }

    /// Drives the active role for one frame; does nothing while closed
    pub fn update(&mut self, world: &mut dyn World) {
        let role = match self.active.as_mut() {
            Some(active) => active.role(),
            None => return,
        };
        role.update(&mut self.sessions, world);

        if let Some(ttl) = self.config.session_ttl {
            for secret in self.sessions.expire_idle(ttl) {
                warn!("Peer '{}' timed out", secret);
            }
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

impl MovementSource for Network {
    fn character_movement(&self, secret: &str) -> Result<Movement, SessionError> {
        self.sessions.movement(secret)
    }
}
