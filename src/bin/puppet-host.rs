use clap::Parser;
use log::info;
use puppet_net::console::{self, Report};
use puppet_net::network::Network;
use shared::config::{NetworkConfig, UnknownSecretPolicy};
use shared::packet::{Movement, MovementState, Placement};
use shared::world::{Appearance, Cell, MemoryWorld};
use std::time::{Duration, Instant};

/// Console output of the binary
struct Stdout;

impl Report for Stdout {
    fn report(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Main-method of the host.
/// Parses command-line arguments, registers a puppet per secret, opens the server
/// and walks the host's character in a circle until interrupted.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Interface to bind to
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[clap(short, long, default_value_t = shared::DEFAULT_PORT)]
        port: u16,
        /// Transport to host on
        #[clap(long, default_value = "udp")]
        transport: String,
        /// Update loop frequency in Hz
        #[clap(short, long, default_value = "30")]
        tick_rate: u32,
        /// Send the host's movement every N updates
        #[clap(long, default_value_t = shared::DEFAULT_TICK_DIVISOR)]
        tick_divisor: u32,
        /// Secret of a client allowed to join; repeat for several clients
        #[clap(long = "puppet", required = true)]
        puppets: Vec<String>,
        /// Forget peers that stay silent this many seconds
        #[clap(long)]
        ttl: Option<u64>,
        /// Drop join requests for unknown secrets instead of answering
        #[clap(long)]
        silent: bool,
    }

    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut network = Network::new(NetworkConfig {
        tick_divisor: args.tick_divisor,
        session_ttl: args.ttl.map(Duration::from_secs),
        bind_host: args.host.clone(),
        unknown_secret_policy: if args.silent {
            UnknownSecretPolicy::Ignore
        } else {
            UnknownSecretPolicy::RejectWithWrongPassword
        },
        ..NetworkConfig::default()
    });

    let spawn = Placement::new([4096.0, 4096.0, 0.0], [0.0; 3]);
    let mut world = MemoryWorld::new(
        Appearance {
            model: "base_anim.nif".to_string(),
            race: "Imperial".to_string(),
            class: "Warrior".to_string(),
            ..Appearance::default()
        },
        Cell::exterior_at(&spawn),
        spawn,
    );

    let mut out = Stdout;
    for (i, secret) in args.puppets.iter().enumerate() {
        let placement = Placement::new([4096.0 + 100.0 * (i + 1) as f32, 4096.0, 0.0], [0.0; 3]);
        let entity = world.spawn(&Appearance::default(), &Cell::exterior_at(&placement), placement);
        console::register_puppet(&mut network, secret, &entity, &mut world, &mut out)?;
    }
    console::host(&mut network, args.port, &args.transport, &mut out)?;

    let frame = Duration::from_secs_f32(1.0 / args.tick_rate.max(1) as f32);
    let started = Instant::now();
    let mut frames: u64 = 0;

    loop {
        let t = started.elapsed().as_secs_f32();
        world.move_player(
            Placement::new([4096.0 + 500.0 * t.cos(), 4096.0 + 500.0 * t.sin(), 0.0], [0.0, 0.0, t]),
            Movement::new([-t.sin(), t.cos(), 0.0], [0.0, 0.0, 1.0]),
            MovementState::Walking,
        );

        network.update(&mut world);
        world.tick_puppets(&network);

        frames += 1;
        if frames % (args.tick_rate.max(1) as u64 * 10) == 0 {
            for (secret, addr) in network.sessions().peer_addrs() {
                info!("Peer '{}' at {}", secret, addr);
            }
        }

        std::thread::sleep(frame);
    }
}
