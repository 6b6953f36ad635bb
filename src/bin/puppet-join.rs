use clap::Parser;
use log::info;
use puppet_net::console::{self, Report};
use puppet_net::network::Network;
use shared::config::NetworkConfig;
use shared::packet::{Movement, MovementState, Placement};
use shared::world::{Appearance, Cell, MemoryWorld, World};
use std::time::{Duration, Instant};

struct Stdout;

impl Report for Stdout {
    fn report(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Main-method of the joining client.
/// Parses command-line arguments, joins the server, then sways the player back
/// and forth while following the host's puppet.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server address; the default port is used when none is given
        #[clap(short = 's', long, default_value = "127.0.0.1")]
        server: String,
        /// Secret phrase the host registered for this client
        #[clap(short = 'k', long)]
        secret: String,
        /// Update loop frequency in Hz
        #[clap(short, long, default_value = "30")]
        tick_rate: u32,
        /// Send movement every N updates
        #[clap(long, default_value_t = shared::DEFAULT_TICK_DIVISOR)]
        tick_divisor: u32,
        /// Seconds to wait for each join attempt
        #[clap(long, default_value = "3")]
        handshake_timeout: u64,
    }

    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut network = Network::new(NetworkConfig {
        tick_divisor: args.tick_divisor,
        handshake_timeout: Duration::from_secs(args.handshake_timeout),
        ..NetworkConfig::default()
    });

    let mut world = MemoryWorld::new(
        Appearance {
            model: "base_anim.nif".to_string(),
            race: "Dark Elf".to_string(),
            class: "Thief".to_string(),
            ..Appearance::default()
        },
        Cell::Exterior { x: 0, y: 0 },
        Placement::default(),
    );

    console::join(&mut network, &args.server, &args.secret, &mut world, &mut Stdout)?;

    let host_entity = network
        .sessions()
        .get(&network.config().host_secret)
        .map(|session| session.entity.clone())
        .unwrap_or_default();
    let start = world
        .actor(&world.player())
        .map(|actor| actor.placement)
        .unwrap_or_default();
    info!("Placed at {:?} in {:?}", start.position, world.cell_of(&world.player()));

    let frame = Duration::from_secs_f32(1.0 / args.tick_rate.max(1) as f32);
    let started = Instant::now();
    let mut frames: u64 = 0;

    loop {
        let t = started.elapsed().as_secs_f32();
        let mut placement = start;
        placement.position[0] += 200.0 * t.sin();
        world.move_player(
            placement,
            Movement::new([t.cos(), 0.0, 0.0], [0.0; 3]),
            MovementState::Running,
        );

        network.update(&mut world);
        world.tick_puppets(&network);

        frames += 1;
        if frames % args.tick_rate.max(1) as u64 == 0 {
            if let Some(host) = world.actor(&host_entity) {
                info!(
                    "Host at {:?}, moving {:?}",
                    host.placement.position, host.movement.position
                );
            }
        }

        std::thread::sleep(frame);
    }
}
