//! Unix-socket [`CommandSource`] implementation.
//!
//! This is the input side of the daemon: the UI front end connects, and
//! forwards pointer input and viewport changes as they happen.  One client
//! is served at a time; each line received is parsed as a JSON-encoded
//! [`Command`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"Resize":{"origin":{"x":0,"y":0},"size":{"x":1280,"y":720}}}
//! {"Mouse":{"phase":"mousedown","target":4,"x":310,"y":220}}
//! {"Touch":{"phase":"touchmove","touches":[{"identifier":0,"x":12,"y":40}]}}
//! "Recenter"
//! ```
//!
//! `ChannelFailed` is never accepted from a client.

use super::read_json_lines;
use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info};
use std::io::BufReader;
use std::ops::ControlFlow;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// A [`CommandSource`] that listens on a Unix stream socket for
/// JSON-encoded input commands.
///
/// A client stays connected for as long as the UI is open.  When it
/// disconnects, the listener waits for the next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called
    /// and removed when the source shuts down.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** indefinitely.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        // A previous run may have left its socket file behind.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("accept error: {}", e);
                    continue;
                }
            };
            info!("input client connected");
            let served = read_json_lines(BufReader::new(stream), "command", |cmd: Command| {
                debug!("received {:?}", cmd);
                match sink.send(cmd) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            });
            match served {
                Ok(ControlFlow::Break(())) => {
                    info!("sink closed, shutting down");
                    return Ok(());
                }
                Ok(ControlFlow::Continue(())) => info!("input client disconnected"),
                Err(e) => error!("input client dropped: {}", e),
            }
        }
        Ok(())
    }
}

//  Tests
