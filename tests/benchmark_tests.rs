//! Performance benchmarks for the packet codec and session updates

use shared::packet::{CharacterMovement, Movement, MovementState, Packet, Payload, Placement, PuppetInfo, Secret};
use shared::session::{MovementOutcome, SessionTable};
use shared::world::{ActorState, Appearance, Cell, MemoryWorld};
use std::time::Instant;

fn movement_packet(timestamp: u64, x: f32) -> Packet {
    Packet {
        timestamp,
        payload: Payload::CharacterMovement(CharacterMovement {
            secret: Secret::new("secret", "alice").unwrap(),
            state: MovementState::Running,
            movement: Movement::new([x, 1.0, 0.0], [0.0, 0.0, 0.1]),
            placement: Placement::new([x, x, 0.0], [0.0, 0.0, 0.1]),
        }),
    }
}

/// Benchmarks encoding and decoding of movement packets
#[test]
fn benchmark_movement_codec() {
    let iterations = 50_000;
    let start = Instant::now();

    for i in 0..iterations {
        let data = movement_packet(i as u64, i as f32).encode().unwrap();
        let decoded = Packet::decode(&data).unwrap();
        assert_eq!(decoded.timestamp, i as u64);
    }

    let duration = start.elapsed();
    println!(
        "Movement codec: {} round trips in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_secs() < 5);
}

/// Benchmarks encoding of the largest packet
#[test]
fn benchmark_accept_client_encoding() {
    let appearance = Appearance {
        model: "base_anim.nif".to_string(),
        head: "b_n_high elf_f_head_03".to_string(),
        hair: "b_n_high elf_f_hair_04".to_string(),
        race: "High Elf".to_string(),
        class: "Battlemage".to_string(),
    };
    let cell = Cell::Interior {
        name: "Vivec, St. Delyn Canalworks".to_string(),
    };
    let info = PuppetInfo::describe("alice", &ActorState::default(), &cell, &appearance).unwrap();
    let packet = Packet::new(Payload::AcceptClient {
        client: info.clone(),
        host: info,
    });

    let iterations = 20_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = packet.encode().unwrap();
    }

    let duration = start.elapsed();
    println!(
        "AcceptClient encoding: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}

/// Benchmarks applying movement updates across many sessions
#[test]
fn benchmark_session_updates() {
    let mut world = MemoryWorld::new(
        Appearance::default(),
        Cell::Exterior { x: 0, y: 0 },
        Placement::default(),
    );
    let mut table = SessionTable::new();
    let secrets: Vec<String> = (0..64).map(|i| format!("peer-{}", i)).collect();

    for secret in &secrets {
        let entity = world.spawn(&Appearance::default(), &Cell::Exterior { x: 0, y: 0 }, Placement::default());
        table.register(secret, &entity).unwrap();
    }

    let updates: Vec<CharacterMovement> = secrets
        .iter()
        .enumerate()
        .map(|(i, secret)| CharacterMovement {
            secret: Secret::new("secret", secret).unwrap(),
            state: MovementState::Walking,
            movement: Movement::new([i as f32, 0.0, 0.0], [0.0; 3]),
            placement: Placement::default(),
        })
        .collect();

    let rounds = 2_000u64;
    let start = Instant::now();
    let mut applied = 0;

    for round in 1..=rounds {
        for update in &updates {
            let mut update = update.clone();
            update.movement.rotation[2] = round as f32;
            if table.apply_movement(round, &update, &mut world) == MovementOutcome::Applied {
                applied += 1;
            }
        }
    }

    let duration = start.elapsed();
    let total = rounds as usize * updates.len();
    println!(
        "Session updates: {} updates in {:?} ({:.2} ns/update)",
        total,
        duration,
        duration.as_nanos() as f64 / total as f64
    );

    assert_eq!(applied, total);
    assert!(duration.as_secs() < 5);
}

/// Benchmarks rejection of stale packets
#[test]
fn benchmark_stale_rejection() {
    let mut world = MemoryWorld::new(
        Appearance::default(),
        Cell::Exterior { x: 0, y: 0 },
        Placement::default(),
    );
    let entity = world.spawn(&Appearance::default(), &Cell::Exterior { x: 0, y: 0 }, Placement::default());
    let mut table = SessionTable::new();
    table.register("alice", &entity).unwrap();

    let newest = match movement_packet(1_000_000, 1.0).payload {
        Payload::CharacterMovement(update) => update,
        _ => unreachable!(),
    };
    table.apply_movement(1_000_000, &newest, &mut world);

    let iterations = 100_000u64;
    let start = Instant::now();

    for i in 0..iterations {
        let outcome = table.apply_movement(i, &newest, &mut world);
        assert_eq!(outcome, MovementOutcome::Stale);
    }

    let duration = start.elapsed();
    println!(
        "Stale rejection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}
