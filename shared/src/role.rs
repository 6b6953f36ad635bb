//! Behavior shared by the server and client roles
//!
//! A role owns a [`Transport`] and borrows the session table and the world for
//! the duration of each call, so neither needs a global locator.

use crate::error::{NetworkError, WorldError};
use crate::packet::{CharacterMovement, Packet, Payload, PuppetInfo, Secret};
use crate::session::{MovementOutcome, SessionTable};
use crate::transport::{Inbound, Transport};
use crate::world::World;
use log::debug;
use std::net::SocketAddr;

pub trait Role {
    fn transport(&mut self) -> &mut Transport;

    /// Handles a peer asking to join under `secret`
    fn interpret_new_client(
        &mut self,
        secret: &str,
        from: SocketAddr,
        sessions: &mut SessionTable,
        world: &mut dyn World,
    );

    /// Sends this side's own movement, driven by the update tick
    fn send_player_movement(&mut self, sessions: &SessionTable, world: &dyn World);

    fn interpret_character_movement(
        &mut self,
        timestamp: u64,
        update: &CharacterMovement,
        _from: SocketAddr,
        sessions: &mut SessionTable,
        world: &mut dyn World,
    ) -> MovementOutcome {
        interpret_character_movement(timestamp, update, sessions, world)
    }

    fn on_receive(&mut self, inbound: Inbound, sessions: &mut SessionTable, world: &mut dyn World) {
        let Inbound { packet, from } = inbound;

        match packet.payload {
            Payload::NewClientRequest { secret } => match secret.read("secret") {
                Ok(secret) => self.interpret_new_client(secret, from, sessions, world),
                Err(e) => debug!("Dropping join request from {}: {}", from, e),
            },
            Payload::CharacterMovement(update) => {
                self.interpret_character_movement(packet.timestamp, &update, from, sessions, world);
            }
            other => debug!(
                "Ignoring {:?} packet from {}",
                other.packet_type(),
                from
            ),
        }
    }

    /// Pumps pending I/O, dispatches what arrived and runs the periodic send
    fn update(&mut self, sessions: &mut SessionTable, world: &mut dyn World) {
        for inbound in self.transport().poll() {
            self.on_receive(inbound, sessions, world);
        }

        if self.transport().tick() {
            self.send_player_movement(sessions, world);
        }
    }
}

/// Applies a movement update to its session, logging anything that was dropped
pub fn interpret_character_movement(
    timestamp: u64,
    update: &CharacterMovement,
    sessions: &mut SessionTable,
    world: &mut dyn World,
) -> MovementOutcome {
    let outcome = sessions.apply_movement(timestamp, update, world);

    match outcome {
        MovementOutcome::Applied | MovementOutcome::Unchanged => {}
        dropped => debug!(
            "Movement for {:?} at {} dropped: {:?}",
            update.secret, timestamp, dropped
        ),
    }
    outcome
}

/// Builds a `CharacterMovement` packet from an entity's current state
pub fn movement_packet(world: &dyn World, entity: &str, secret: &str) -> Result<Packet, NetworkError> {
    let actor = world
        .actor(entity)
        .ok_or_else(|| WorldError::EntityNotFound(entity.to_string()))?;

    Ok(Packet::new(Payload::CharacterMovement(CharacterMovement {
        secret: Secret::new("secret", secret)?,
        state: actor.state,
        movement: actor.movement,
        placement: actor.placement,
    })))
}

/// Describes an entity so a peer can create a puppet for it
pub fn describe_puppet(world: &dyn World, entity: &str, secret: &str) -> Result<PuppetInfo, NetworkError> {
    let missing = || WorldError::EntityNotFound(entity.to_string());

    let actor = world.actor(entity).ok_or_else(missing)?;
    let cell = world.cell_of(entity).ok_or_else(missing)?;
    let appearance = world.appearance(entity).ok_or_else(missing)?;

    Ok(PuppetInfo::describe(secret, &actor, &cell, &appearance)?)
}
