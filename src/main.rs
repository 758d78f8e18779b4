//! Entry point for the **screenlink** daemon.
//!
//! Spawns the input listener and the cluster link on background threads
//! and applies every incoming command to the canvas on the main thread.

use log::{error, info};
use screenlink::canvas::SpatialCanvas;
use screenlink::command::{Command, OutboundMessage};
use screenlink::config::{config_dir, Config, NetworkConfig};
use screenlink::ipc::cluster::ClusterLink;
use screenlink::ipc::listener::UnixSocketListener;
use screenlink::render::LogSurface;
use screenlink::traits::CommandSource;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Upper bound on how long the stale-focus sweep can lag.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Try to load the config from `$XDG_CONFIG_HOME/screenlink/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();

    let mut canvas = match SpatialCanvas::new(LogSurface, config.canvas) {
        Ok(canvas) => canvas,
        Err(e) => {
            error!("failed to set up canvas: {}", e);
            std::process::exit(1);
        }
    };

    let (out_tx, out_rx) = mpsc::channel::<OutboundMessage>();
    canvas.set_publisher(out_tx);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(&config.network, cmd_tx, out_rx);

    info!("screenlink running");
    loop {
        match cmd_rx.recv_timeout(SWEEP_INTERVAL) {
            Ok(cmd) => {
                if let Err(e) = canvas.handle(cmd) {
                    error!("command error: {}", e);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if let Err(e) = canvas.expire_stale_focus(Instant::now()) {
            error!("stale focus sweep error: {}", e);
        }
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_command_sources(
    network: &NetworkConfig,
    tx: mpsc::Sender<Command>,
    outbound: mpsc::Receiver<OutboundMessage>,
) {
    {
        let tx = tx.clone();
        let path = network.input_socket_path();
        std::thread::spawn(move || {
            let mut source = UnixSocketListener::new(&path);
            if let Err(e) = source.run(tx) {
                error!("socket listener error: {}", e);
            }
        });
    }

    {
        let path = network.cluster_socket_path();
        std::thread::spawn(move || {
            let mut link = ClusterLink::new(&path, outbound);
            if let Err(e) = link.run(tx) {
                error!("cluster link error: {}", e);
            }
        });
    }
}
