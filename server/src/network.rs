//! Server role: admits clients by secret and broadcasts the host's movement

use log::{debug, error, info, warn};
use shared::config::{NetworkConfig, UnknownSecretPolicy};
use shared::error::NetworkError;
use shared::packet::{CharacterMovement, MessageCode, Packet, Payload};
use shared::role::{self, Role};
use shared::session::{MovementOutcome, SessionTable};
use shared::transport::Transport;
use shared::world::World;
use std::net::{SocketAddr, ToSocketAddrs};

pub struct Server {
    transport: Transport,
    host_secret: String,
    unknown_secret_policy: UnknownSecretPolicy,
}

impl Server {
    /// Binds the configured interface on `port` and starts listening
    pub fn open(port: u16, config: &NetworkConfig) -> Result<Self, NetworkError> {
        let address = format!("{}:{}", config.bind_host, port);
        let addr = address
            .to_socket_addrs()
            .map_err(|_| NetworkError::Resolve {
                address: address.clone(),
            })?
            .find(SocketAddr::is_ipv4)
            .ok_or(NetworkError::Resolve { address })?;

        let mut transport = Transport::bind(addr, config.tick_divisor)?;
        transport.listen_for_one();
        info!("Server listening on {}", transport.local_addr());

        Ok(Self {
            transport,
            host_secret: config.host_secret.clone(),
            unknown_secret_policy: config.unknown_secret_policy,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn close(&mut self) {
        self.transport.shutdown();
    }

    fn accept_client(
        &mut self,
        secret: &str,
        from: SocketAddr,
        sessions: &SessionTable,
        world: &dyn World,
    ) -> Result<(), NetworkError> {
        let entity = match sessions.get(secret) {
            Some(session) => session.entity.clone(),
            None => return Ok(()),
        };

        // The joining peer's own secret never travels back to it
        let client = role::describe_puppet(world, &entity, "")?;
        let host = role::describe_puppet(world, &world.player(), &self.host_secret)?;

        self.transport
            .send_to(Packet::new(Payload::AcceptClient { client, host }), from)
    }
}

impl Role for Server {
    fn transport(&mut self) -> &mut Transport {
        &mut self.transport
    }

    fn interpret_new_client(
        &mut self,
        secret: &str,
        from: SocketAddr,
        sessions: &mut SessionTable,
        world: &mut dyn World,
    ) {
        if sessions.record_peer(secret, from) {
            info!("Client '{}' joined from {}", secret, from);
            // A new connection restarts the peer's clock
            sessions.reset_clock(secret);
            if let Err(e) = self.accept_client(secret, from, sessions, world) {
                error!("Failed to accept client '{}': {}", secret, e);
            }
            return;
        }

        match self.unknown_secret_policy {
            UnknownSecretPolicy::Ignore => {
                debug!("Ignoring join request for unknown secret from {}", from);
            }
            UnknownSecretPolicy::RejectWithWrongPassword => {
                warn!("Rejecting join request for unknown secret from {}", from);
                let reply = Packet::new(Payload::OtherMessage {
                    code: MessageCode::WrongPassword,
                });
                if let Err(e) = self.transport.send_to(reply, from) {
                    error!("Failed to reject {}: {}", from, e);
                }
            }
        }
    }

    fn interpret_character_movement(
        &mut self,
        timestamp: u64,
        update: &CharacterMovement,
        from: SocketAddr,
        sessions: &mut SessionTable,
        world: &mut dyn World,
    ) -> MovementOutcome {
        // Peers whose address expired are picked up again from their traffic
        if let Ok(secret) = update.secret.read("secret") {
            sessions.record_peer(secret, from);
        }
        role::interpret_character_movement(timestamp, update, sessions, world)
    }

    fn send_player_movement(&mut self, sessions: &SessionTable, world: &dyn World) {
        let peers: Vec<SocketAddr> = sessions.peer_addrs().into_iter().map(|(_, addr)| addr).collect();
        if peers.is_empty() {
            return;
        }

        let packet = match role::movement_packet(world, &world.player(), &self.host_secret) {
            Ok(packet) => packet,
            Err(e) => {
                error!("Failed to build host movement: {}", e);
                return;
            }
        };

        if let Err(e) = self.transport.send_to_all(packet, &peers) {
            error!("Failed to broadcast host movement: {}", e);
        }
    }
}
