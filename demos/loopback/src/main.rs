//! Loopback Example
//!
//! Runs an authoritative server and a predicting client in one process,
//! connected by links that deliver every message a few ticks late. The
//! server applies gusts the client cannot foresee, so the client keeps
//! receiving corrections and replaying from them.
//!
//! Usage: `loopback [config.ron]`

mod link;
mod world;

use link::{DelayedLink, LinkError};
use rewind_core::FixedClock;
use rewind_netcode::{
    InputTrack, ObjectId, Ownership, PeerId, Recipient, RewindConfig, RewindManager,
    RewindableObject, Role, StateTrack, Tick,
};
use serde::Deserialize;
use std::{env, fs};
use thiserror::Error;
use tracing::{info, warn};
use world::{Arena, Controls, Motion, Patrol, Stick};

const PLAYER: ObjectId = ObjectId(1);
const PATROL: ObjectId = ObjectId(2);

#[derive(Debug, Error)]
enum DemoError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid demo config: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error(transparent)]
    Rewind(#[from] rewind_core::Error),

    #[error(transparent)]
    Netcode(#[from] rewind_netcode::Error),

    #[error(transparent)]
    Link(#[from] LinkError),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    rewind: RewindConfig,
    /// One-way delay in ticks
    latency: Tick,
    ticks: Tick,
    destroy_patrol_at: Tick,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            rewind: RewindConfig::default(),
            latency: 3,
            ticks: 120,
            destroy_patrol_at: 60,
        }
    }
}

fn load_config() -> Result<DemoConfig, DemoError> {
    let Some(path) = env::args().nth(1) else {
        return Ok(DemoConfig::default());
    };
    let source = fs::read_to_string(&path).map_err(|source| DemoError::Io {
        path: path.clone(),
        source,
    })?;
    let config: DemoConfig = ron::from_str(&source)?;
    config.rewind.validate()?;
    info!(%path, "loaded config");
    Ok(config)
}

fn player(ownership: Ownership) -> Result<RewindableObject<Arena>, DemoError> {
    let mut object = RewindableObject::new(PLAYER);
    let stick = object.add_input(InputTrack::new(Controls(PLAYER), ownership));
    object.add_state(StateTrack::new(Motion(PLAYER), ownership), Some(stick))?;
    Ok(object)
}

fn patrol() -> Result<RewindableObject<Arena>, DemoError> {
    let mut object = RewindableObject::new(PATROL);
    object.add_state(StateTrack::remote(Patrol(PATROL)), None)?;
    Ok(object)
}

/// Right, rest, left, rest; twenty ticks each
fn scripted_stick(tick: Tick) -> Stick {
    let direction = match (tick / 20) % 4 {
        0 => 1,
        2 => -1,
        _ => 0,
    };
    Stick { direction }
}

fn main() -> Result<(), DemoError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    if config.latency >= config.rewind.history_size() as Tick {
        warn!(
            latency = config.latency,
            history_size = config.rewind.history_size(),
            "latency exceeds history, corrections will be dropped as stale"
        );
    }

    println!("=== Rewind Loopback Example ===\n");
    println!(
        "history {} ticks, display offset {}, latency {} ticks\n",
        config.rewind.history_size(),
        config.rewind.display_offset(),
        config.latency
    );

    let mut clock = FixedClock::new(config.rewind.tick_rate());
    let delta = clock.delta();

    let mut server_world = Arena::authoritative();
    let mut client_world = Arena::default();
    let mut server = RewindManager::new(Role::Server, config.rewind.clone());
    let mut client =
        RewindManager::with_peer(Role::Client, PeerId::new(1), config.rewind.clone());

    server.register(&server_world, player(Ownership::Remote)?);
    server.register(&server_world, patrol()?);
    client.register(&client_world, player(Ownership::Local)?);
    client.register(&client_world, patrol()?);

    let mut uplink = DelayedLink::new(Recipient::Authority, config.latency);
    let mut downlink = DelayedLink::new(Recipient::Observers, config.latency);
    let mut corrections = 0usize;
    let mut send_failures = 0usize;

    while clock.tick() < config.ticks {
        let tick = clock.advance();
        uplink.set_now(tick);
        downlink.set_now(tick);

        for message in uplink.deliver(tick)? {
            server.handle_message(&message)?;
        }
        if tick == config.destroy_patrol_at {
            server.mark_for_destroy(PATROL, tick, &mut downlink)?;
        }
        let server_report = server.tick(&mut server_world, tick, delta, &mut downlink);
        for id in &server_report.despawned {
            println!("Tick {tick:>3}: server despawned {id}");
        }

        for message in downlink.deliver(tick)? {
            client.handle_message(&message)?;
        }
        client_world.held.insert(PLAYER, scripted_stick(tick));
        let client_report = client.tick(&mut client_world, tick, delta, &mut uplink);
        for id in &client_report.despawned {
            println!("Tick {tick:>3}: client despawned {id}");
        }

        if client_report.replay.is_some_and(|range| range.len() > 1) {
            corrections += 1;
        }
        send_failures += server_report.send_failures + client_report.send_failures;

        if tick % 10 == 0 {
            let replay = client_report
                .replay
                .map(|range| range.to_string())
                .unwrap_or_else(|| "-".to_string());
            let patrol = if !client.contains(PATROL) {
                " (despawned)"
            } else if !client_world.is_visible(PATROL) {
                " (gone)"
            } else {
                ""
            };
            println!(
                "Tick {:>3} (display {:>3}): player server {:>6} client {:>6} | patrol {:>6}{} | replay {}",
                tick,
                client_report.display_tick,
                server_world.body(PLAYER).position,
                client_world.body(PLAYER).position,
                client_world.body(PATROL).position,
                patrol,
                replay,
            );
        }
    }

    println!("\n=== Summary ===");
    println!("Ticks simulated:       {}", clock.tick());
    println!("Client replays > 1:    {}", corrections);
    println!("Input commits sent:    {}", uplink.sent());
    println!("State messages sent:   {}", downlink.sent());
    println!("Bytes still in flight: {}", uplink.bytes_in_flight() + downlink.bytes_in_flight());
    println!("Send failures:         {}", send_failures);
    println!("Server objects:        {}", server.len());
    println!("Client objects:        {}", client.len());

    Ok(())
}
