//! Peer session tracking keyed by secret phrase
//!
//! This module holds the last known state of every remote participant:
//! - Explicit registration of a secret against a world entity
//! - Staleness rejection using the sender-local timestamp of each update
//! - Peer address learning for the server's broadcast path
//! - Optional expiry of peers that went quiet
//!
//! Sessions are identified by secret, never by network address, so a peer that
//! changes port keeps driving the same puppet.

use crate::error::SessionError;
use crate::packet::{CharacterMovement, Movement};
use crate::world::{EntityRef, World};
use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Anything that can report a puppet's latest movement by secret
pub trait MovementSource {
    fn character_movement(&self, secret: &str) -> Result<Movement, SessionError>;
}

/// One remote participant and the entity it drives
#[derive(Debug, Clone)]
pub struct PeerSession {
    /// Shared identifier, never shown to other peers
    pub secret: String,
    /// Entity driven by this session; owned by the world
    pub entity: EntityRef,
    /// Sender-local timestamp of the last accepted update
    pub last_update: u64,
    /// Last accepted movement settings
    pub current_movement: Movement,
    /// Where to reply, learned from the peer's first packet
    pub addr: Option<SocketAddr>,
    /// Last time any packet arrived for this session
    pub last_seen: Option<Instant>,
}

impl PeerSession {
    pub fn new(secret: &str, entity: &str) -> Self {
        Self {
            secret: secret.to_string(),
            entity: entity.to_string(),
            last_update: 0,
            current_movement: Movement::default(),
            addr: None,
            last_seen: None,
        }
    }

    /// Returns true if the peer was heard from once but not within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen
            .map_or(false, |seen| seen.elapsed() > timeout)
    }
}

/// What happened to an inbound movement update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementOutcome {
    /// The secret could not be read from the packet
    Malformed,
    UnknownSecret,
    /// The session's entity no longer resolves in the world
    EntityGone,
    /// Timestamp not newer than the last accepted one
    Stale,
    /// Same movement as before; only the timestamp advanced
    Unchanged,
    Applied,
}

/// Session table owned by the session manager and lent to the active role
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, PeerSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a puppet; an existing secret is left untouched
    pub fn register(&mut self, secret: &str, entity: &str) -> Result<(), SessionError> {
        if self.sessions.contains_key(secret) {
            return Err(SessionError::Duplicate(secret.to_string()));
        }

        info!("Puppet '{}' registered for entity {}", secret, entity);
        self.sessions
            .insert(secret.to_string(), PeerSession::new(secret, entity));
        Ok(())
    }

    pub fn remove(&mut self, secret: &str) -> Result<PeerSession, SessionError> {
        self.sessions
            .remove(secret)
            .ok_or_else(|| SessionError::NotFound(secret.to_string()))
    }

    pub fn get(&self, secret: &str) -> Option<&PeerSession> {
        self.sessions.get(secret)
    }

    pub fn contains(&self, secret: &str) -> bool {
        self.sessions.contains_key(secret)
    }

    pub fn movement(&self, secret: &str) -> Result<Movement, SessionError> {
        self.sessions
            .get(secret)
            .map(|session| session.current_movement)
            .ok_or_else(|| SessionError::NotFound(secret.to_string()))
    }

    /// Remembers where a peer talks from. Returns false for unknown secrets.
    pub fn record_peer(&mut self, secret: &str, addr: SocketAddr) -> bool {
        match self.sessions.get_mut(secret) {
            Some(session) => {
                session.addr = Some(addr);
                session.last_seen = Some(Instant::now());
                true
            }
            None => false,
        }
    }

    /// Starts a fresh timestamp sequence for `secret`.
    ///
    /// Sender clocks restart with every connection, so a peer joining again
    /// would otherwise have all of its updates dropped as stale.
    pub fn reset_clock(&mut self, secret: &str) -> bool {
        match self.sessions.get_mut(secret) {
            Some(session) => {
                session.last_update = 0;
                true
            }
            None => false,
        }
    }

    /// Peers with a known address, for the broadcast path
    pub fn peer_addrs(&self) -> Vec<(String, SocketAddr)> {
        self.sessions
            .values()
            .filter_map(|session| session.addr.map(|addr| (session.secret.clone(), addr)))
            .collect()
    }

    /// Applies an inbound movement update to its session and entity.
    ///
    /// Updates whose timestamp does not exceed the last accepted one are
    /// dropped. The entity is only repositioned when the movement differs
    /// bitwise from the stored one; an identical update still advances the
    /// timestamp so an older, different packet arriving later stays stale.
    pub fn apply_movement(
        &mut self,
        timestamp: u64,
        update: &CharacterMovement,
        world: &mut dyn World,
    ) -> MovementOutcome {
        let secret = match update.secret.read("secret") {
            Ok(secret) => secret,
            Err(_) => return MovementOutcome::Malformed,
        };

        let session = match self.sessions.get_mut(secret) {
            Some(session) => session,
            None => return MovementOutcome::UnknownSecret,
        };
        session.last_seen = Some(Instant::now());

        if world.actor(&session.entity).is_none() {
            return MovementOutcome::EntityGone;
        }

        if timestamp <= session.last_update {
            return MovementOutcome::Stale;
        }

        if update.movement.bitwise_eq(&session.current_movement) {
            session.last_update = timestamp;
            return MovementOutcome::Unchanged;
        }

        if world.set_placement(&session.entity, update.placement).is_err() {
            return MovementOutcome::EntityGone;
        }

        session.current_movement = update.movement;
        session.last_update = timestamp;
        MovementOutcome::Applied
    }

    /// Forgets the address of peers silent for longer than `ttl`.
    ///
    /// Registrations survive so the peer can join again with the same secret.
    pub fn expire_idle(&mut self, ttl: Duration) -> Vec<String> {
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if session.addr.is_some() && session.is_timed_out(ttl) {
                debug!("Peer '{}' went quiet, forgetting its address", session.secret);
                session.addr = None;
                expired.push(session.secret.clone());
            }
        }

        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl MovementSource for SessionTable {
    fn character_movement(&self, secret: &str) -> Result<Movement, SessionError> {
        self.movement(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{MovementState, Placement, Secret};
    use crate::world::{Appearance, Cell, MemoryWorld};
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:5121".parse().unwrap()
    }

    fn test_world() -> (MemoryWorld, EntityRef) {
        let mut world = MemoryWorld::new(
            Appearance::default(),
            Cell::Exterior { x: 0, y: 0 },
            Placement::default(),
        );
        let puppet = world.spawn(
            &Appearance::default(),
            &Cell::Exterior { x: 0, y: 0 },
            Placement::default(),
        );
        (world, puppet)
    }

    fn update(secret: &str, x: f32) -> CharacterMovement {
        CharacterMovement {
            secret: Secret::new("secret", secret).unwrap(),
            state: MovementState::Walking,
            movement: Movement::new([x, 1.0, 0.0], [0.0, 0.0, x]),
            placement: Placement::new([x * 10.0, 0.0, 0.0], [0.0, 0.0, x]),
        }
    }

    #[test]
    fn test_session_creation() {
        let session = PeerSession::new("bob", "npc#1");
        assert_eq!(session.secret, "bob");
        assert_eq!(session.entity, "npc#1");
        assert_eq!(session.last_update, 0);
        assert!(session.addr.is_none());
        assert!(!session.is_timed_out(Duration::from_secs(0)));
    }

    #[test]
    fn test_registered_movement_starts_zeroed() {
        let mut table = SessionTable::new();
        table.register("bob", "npc#1").unwrap();

        assert_eq!(table.movement("bob").unwrap(), Movement::default());
        assert_eq!(
            table.movement("carol"),
            Err(SessionError::NotFound("carol".to_string()))
        );
    }

    #[test]
    fn test_duplicate_register_keeps_first_session() {
        let mut table = SessionTable::new();
        table.register("bob", "npc#1").unwrap();

        assert_eq!(
            table.register("bob", "npc#2"),
            Err(SessionError::Duplicate("bob".to_string()))
        );
        assert_eq!(table.get("bob").unwrap().entity, "npc#1");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut table = SessionTable::new();
        table.register("bob", "npc#1").unwrap();

        assert!(table.remove("bob").is_ok());
        assert!(table.is_empty());
        assert!(table.remove("bob").is_err());
    }

    #[test]
    fn test_record_peer_and_addrs() {
        let mut table = SessionTable::new();
        table.register("bob", "npc#1").unwrap();
        table.register("carol", "npc#2").unwrap();

        assert!(table.peer_addrs().is_empty());
        assert!(table.record_peer("bob", test_addr()));
        assert!(!table.record_peer("mallory", test_addr()));

        assert_eq!(table.peer_addrs(), vec![("bob".to_string(), test_addr())]);
    }

    #[test]
    fn test_apply_movement_repositions_entity() {
        let (mut world, puppet) = test_world();
        let mut table = SessionTable::new();
        table.register("bob", &puppet).unwrap();

        let outcome = table.apply_movement(10, &update("bob", 2.0), &mut world);

        assert_eq!(outcome, MovementOutcome::Applied);
        assert_eq!(table.movement("bob").unwrap().position[0], 2.0);
        assert_eq!(world.actor(&puppet).unwrap().placement.position[0], 20.0);
        assert_eq!(table.get("bob").unwrap().last_update, 10);
    }

    #[test]
    fn test_out_of_order_update_is_stale() {
        let (mut world, puppet) = test_world();
        let mut table = SessionTable::new();
        table.register("bob", &puppet).unwrap();

        assert_eq!(
            table.apply_movement(100, &update("bob", 1.0), &mut world),
            MovementOutcome::Applied
        );
        assert_eq!(
            table.apply_movement(50, &update("bob", 5.0), &mut world),
            MovementOutcome::Stale
        );
        assert_eq!(
            table.apply_movement(100, &update("bob", 7.0), &mut world),
            MovementOutcome::Stale
        );

        assert_eq!(table.movement("bob").unwrap().position[0], 1.0);
        assert_eq!(world.actor(&puppet).unwrap().placement.position[0], 10.0);
    }

    #[test]
    fn test_identical_movement_only_advances_timestamp() {
        let (mut world, puppet) = test_world();
        let mut table = SessionTable::new();
        table.register("bob", &puppet).unwrap();

        table.apply_movement(10, &update("bob", 3.0), &mut world);

        // Same movement, different placement: the world must not be touched
        let mut repeat = update("bob", 3.0);
        repeat.placement.position[0] = -1.0;
        assert_eq!(
            table.apply_movement(20, &repeat, &mut world),
            MovementOutcome::Unchanged
        );
        assert_eq!(world.actor(&puppet).unwrap().placement.position[0], 30.0);
        assert_eq!(table.get("bob").unwrap().last_update, 20);

        // A delayed older packet can no longer roll the puppet back
        assert_eq!(
            table.apply_movement(15, &update("bob", 9.0), &mut world),
            MovementOutcome::Stale
        );
    }

    #[test]
    fn test_reset_clock_accepts_restarted_sender() {
        let (mut world, puppet) = test_world();
        let mut table = SessionTable::new();
        table.register("bob", &puppet).unwrap();

        table.apply_movement(2_500_000, &update("bob", 1.0), &mut world);
        assert_eq!(
            table.apply_movement(40, &update("bob", 2.0), &mut world),
            MovementOutcome::Stale
        );

        assert!(table.reset_clock("bob"));
        assert!(!table.reset_clock("carol"));
        assert_eq!(
            table.apply_movement(40, &update("bob", 2.0), &mut world),
            MovementOutcome::Applied
        );
        assert_eq!(world.actor(&puppet).unwrap().placement.position[0], 20.0);
    }

    #[test]
    fn test_unknown_secret_and_vanished_entity() {
        let (mut world, puppet) = test_world();
        let mut table = SessionTable::new();
        table.register("bob", &puppet).unwrap();

        assert_eq!(
            table.apply_movement(1, &update("carol", 1.0), &mut world),
            MovementOutcome::UnknownSecret
        );

        world.remove(&puppet);
        assert_eq!(
            table.apply_movement(2, &update("bob", 1.0), &mut world),
            MovementOutcome::EntityGone
        );
        assert_eq!(table.movement("bob").unwrap(), Movement::default());
    }

    #[test]
    fn test_increasing_timestamps_keep_last_movement() {
        let (mut world, puppet) = test_world();
        let mut table = SessionTable::new();
        table.register("bob", &puppet).unwrap();

        let mut rng = rand::thread_rng();
        let mut timestamp = 0u64;
        let mut last = Movement::default();

        for _ in 0..200 {
            timestamp += rng.gen_range(1..1000);
            let packet = update("bob", rng.gen_range(-1000.0..1000.0));
            table.apply_movement(timestamp, &packet, &mut world);
            last = packet.movement;
        }

        assert!(table.movement("bob").unwrap().bitwise_eq(&last));
    }

    #[test]
    fn test_shuffled_arrival_never_applies_stale_packets() {
        let (mut world, puppet) = test_world();
        let mut table = SessionTable::new();
        table.register("bob", &puppet).unwrap();

        let mut packets: Vec<(u64, CharacterMovement)> = (1..=100)
            .map(|t| (t as u64, update("bob", t as f32)))
            .collect();
        packets.shuffle(&mut rand::thread_rng());

        let mut highest = 0;
        for (timestamp, packet) in &packets {
            let before = table.movement("bob").unwrap();
            let outcome = table.apply_movement(*timestamp, packet, &mut world);

            if *timestamp <= highest {
                assert_eq!(outcome, MovementOutcome::Stale);
                assert!(table.movement("bob").unwrap().bitwise_eq(&before));
            } else {
                highest = *timestamp;
            }
        }

        assert_eq!(table.get("bob").unwrap().last_update, highest);
        assert_eq!(table.movement("bob").unwrap().position[0], highest as f32);
    }

    #[test]
    fn test_expire_idle_forgets_address_only() {
        let mut table = SessionTable::new();
        table.register("bob", "npc#1").unwrap();
        table.register("carol", "npc#2").unwrap();
        table.record_peer("bob", test_addr());
        table.record_peer("carol", test_addr());

        table.sessions.get_mut("bob").unwrap().last_seen =
            Some(Instant::now() - Duration::from_secs(10));

        let expired = table.expire_idle(Duration::from_secs(5));

        assert_eq!(expired, vec!["bob".to_string()]);
        assert!(table.get("bob").unwrap().addr.is_none());
        assert!(table.get("carol").unwrap().addr.is_some());
        assert!(table.contains("bob"));
    }

    #[test]
    fn test_movement_source() {
        let mut table = SessionTable::new();
        table.register("bob", "npc#1").unwrap();

        let source: &dyn MovementSource = &table;
        assert!(source.character_movement("bob").is_ok());
        assert!(source.character_movement("carol").is_err());
    }
}
