//! Client role: joins a server by secret and follows the host's puppet

use log::{debug, error, info, warn};
use shared::config::NetworkConfig;
use shared::error::NetworkError;
use shared::packet::{Packet, Payload, PuppetInfo};
use shared::role::{self, Role};
use shared::session::SessionTable;
use shared::transport::{Inbound, Transport};
use shared::world::{EntityRef, PuppetBehavior, World};
use std::net::SocketAddr;
use std::time::Instant;

pub struct Client {
    transport: Transport,
    server_addr: SocketAddr,
    secret: String,
    host_secret: String,
    host_entity: EntityRef,
}

impl Client {
    /// Performs the join handshake and creates the host's puppet.
    ///
    /// Blocks for up to `handshake_attempts * handshake_timeout`. On success the
    /// local player has been moved to where the server placed this client.
    pub fn connect(
        address: &str,
        secret: &str,
        config: &NetworkConfig,
        sessions: &mut SessionTable,
        world: &mut dyn World,
    ) -> Result<Self, NetworkError> {
        let address = with_default_port(address);
        let request = Packet::new_client_request(secret)?;

        let mut transport = Transport::bind(SocketAddr::from(([0, 0, 0, 0], 0)), config.tick_divisor)?;
        let server_addr = transport.resolve(&address)?;
        transport.listen_for_one();

        let (client, host) = Self::handshake(&mut transport, &request, server_addr, &address, config)?;

        let host_secret = host.secret.terminated().read("secret")?.to_string();
        let host_entity = Self::admit(&client, &host, &host_secret, sessions, world)?;

        Ok(Self {
            transport,
            server_addr,
            secret: secret.to_string(),
            host_secret,
            host_entity,
        })
    }

    fn handshake(
        transport: &mut Transport,
        request: &Packet,
        server_addr: SocketAddr,
        address: &str,
        config: &NetworkConfig,
    ) -> Result<(PuppetInfo, PuppetInfo), NetworkError> {
        for attempt in 1..=config.handshake_attempts {
            debug!("Join attempt {} to {}", attempt, server_addr);
            transport.send_to(request.clone(), server_addr)?;

            let deadline = Instant::now() + config.handshake_timeout;
            while let Some(Inbound { packet, from }) = transport.recv_until(deadline) {
                if from != server_addr {
                    debug!("Ignoring packet from {} during handshake", from);
                    continue;
                }

                match packet.payload {
                    Payload::AcceptClient { client, host } => return Ok((client, host)),
                    Payload::OtherMessage { code } => {
                        return Err(NetworkError::Rejected {
                            address: address.to_string(),
                            code,
                        })
                    }
                    other => debug!(
                        "Ignoring {:?} packet during handshake",
                        other.packet_type()
                    ),
                }
            }
        }

        Err(NetworkError::ConnectionTimeout {
            address: address.to_string(),
            attempts: config.handshake_attempts,
        })
    }

    /// Moves the local player to its assigned spot and spawns the host puppet.
    ///
    /// Both descriptions are decoded before the world is touched. A failure
    /// after the puppet was placed removes it again, so a refused join leaves
    /// the world as it was.
    fn admit(
        client: &PuppetInfo,
        host: &PuppetInfo,
        host_secret: &str,
        sessions: &mut SessionTable,
        world: &mut dyn World,
    ) -> Result<EntityRef, NetworkError> {
        let client_cell = client.cell()?;
        let host_cell = host.cell()?;
        let host_appearance = host.appearance()?;

        let record = world.create_record(&host_appearance);
        let entity = world.place(&record, &host_cell, host.placement)?;

        let placed = world
            .attach_puppet(&entity, PuppetBehavior::new(host_secret))
            .and_then(|()| world.change_cell(&client_cell, client.placement));
        if let Err(e) = placed {
            discard(world, &entity);
            return Err(e.into());
        }

        // A puppet left over from an earlier connection is replaced
        if let Ok(stale) = sessions.remove(host_secret) {
            warn!("Replacing stale session for '{}'", host_secret);
            discard(world, &stale.entity);
        }
        sessions.register(host_secret, &entity)?;

        info!("Host puppet created as {}", entity);
        Ok(entity)
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn host_secret(&self) -> &str {
        &self.host_secret
    }

    pub fn host_entity(&self) -> &str {
        &self.host_entity
    }

    pub fn close(&mut self) {
        self.transport.shutdown();
    }
}

impl Role for Client {
    fn transport(&mut self) -> &mut Transport {
        &mut self.transport
    }

    fn interpret_new_client(
        &mut self,
        _secret: &str,
        from: SocketAddr,
        _sessions: &mut SessionTable,
        _world: &mut dyn World,
    ) {
        debug!("Ignoring join request from {}; not a server", from);
    }

    fn send_player_movement(&mut self, _sessions: &SessionTable, world: &dyn World) {
        let packet = match role::movement_packet(world, &world.player(), &self.secret) {
            Ok(packet) => packet,
            Err(e) => {
                error!("Failed to build player movement: {}", e);
                return;
            }
        };

        if let Err(e) = self.transport.send_to(packet, self.server_addr) {
            error!("Failed to send player movement: {}", e);
        }
    }
}

fn discard(world: &mut dyn World, entity: &str) {
    if let Err(e) = world.despawn(entity) {
        debug!("Could not remove puppet {}: {}", entity, e);
    }
}

/// Appends the default port when `address` has none
pub fn with_default_port(address: &str) -> String {
    let address = address.trim();
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, shared::DEFAULT_PORT)
    }
}
