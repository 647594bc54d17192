//! # Tidelock Game Server
//!
//! The authoritative simulation server.
//!
//! ## Usage
//!
//! ```bash
//! tidelock_server --port 7777 --tick-rate 60 --map map.toml
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tidelock_networking::server::{GameServer, MapData, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("Usage: tidelock_server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -p, --port <PORT>            UDP port to bind (default: 7777)");
    println!("  -t, --tick-rate <RATE>       Simulation rate in Hz (default: 60)");
    println!("  -s, --snapshot-rate <RATE>   Snapshot broadcast rate in Hz (default: 20)");
    println!("  -m, --max-players <NUM>      Session capacity (default: 32)");
    println!("  -c, --config <FILE>          Server config TOML");
    println!("      --map <FILE>             Map geometry TOML");
    println!("  -d, --duration <SECS>        Run for N seconds then exit");
    println!("  -h, --help                   Show this help");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Simple flag parsing, no external deps.
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut map_path: Option<PathBuf> = None;
    let mut port: Option<u16> = None;
    let mut tick_rate: Option<u32> = None;
    let mut snapshot_rate: Option<u32> = None;
    let mut max_players: Option<usize> = None;
    let mut duration_secs: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--tick-rate" | "-t" => {
                if i + 1 < args.len() {
                    tick_rate = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--snapshot-rate" | "-s" => {
                if i + 1 < args.len() {
                    snapshot_rate = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--max-players" | "-m" => {
                if i + 1 < args.len() {
                    max_players = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--map" => {
                if i + 1 < args.len() {
                    map_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--duration" | "-d" => {
                if i + 1 < args.len() {
                    duration_secs = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                print_help();
                std::process::exit(2);
            }
        }
        i += 1;
    }

    // File config first, flags override.
    let mut config = match config_path {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(tick_rate) = tick_rate {
        config.tick_rate = tick_rate;
    }
    if let Some(snapshot_rate) = snapshot_rate {
        config.snapshot_rate = snapshot_rate;
    }
    if let Some(max_players) = max_players {
        config.max_players = max_players;
    }

    let map = match map_path {
        Some(path) => match MapData::load(&path) {
            Ok(map) => map,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => MapData::default(),
    };

    let stats_interval = Duration::from_secs(5);
    let mut server = match GameServer::new(config, &map) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let mut last_stats = Instant::now();

    loop {
        if let Some(limit) = duration_secs {
            if start.elapsed().as_secs() >= limit {
                break;
            }
        }

        server.frame();

        if last_stats.elapsed() >= stats_interval {
            last_stats = Instant::now();
            info!(
                uptime_secs = start.elapsed().as_secs(),
                tick = server.tick_count(),
                sessions = server.session_count(),
                entities = server.world().entity_count(),
                "server status"
            );
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    info!(
        ticks = server.tick_count(),
        uptime_secs = start.elapsed().as_secs(),
        "server shutting down"
    );
}
