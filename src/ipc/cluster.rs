//! Duplex channel to the cluster daemon.
//!
//! [`ClusterLink`] connects to the daemon's Unix socket, asks for the
//! current layout straight away, and then runs two directions at once:
//!
//! * inbound: every `Cluster` message becomes a [`Command::Cluster`];
//!   other message types are dropped;
//! * outbound: every [`OutboundMessage`] the canvas publishes is written as
//!   one line, from a writer thread.
//!
//! # Wire format
//!
//! Newline-delimited JSON, tagged by `"type"`:
//!
//! ```json
//! {"type":"RequestCluster"}
//! {"type":"Cluster","local_screen":0,"screens":{"0":{"name":"Desktop","edges":{}}}}
//! {"type":"Screens","screens":[{"id":0,"name":"Desktop","edges":{}}]}
//! ```
//!
//! A failed connect is reported to the sink as [`Command::ChannelFailed`]
//! so the user sees it; the link does not retry.

use super::read_json_lines;
use crate::command::{Command, InboundMessage, OutboundMessage};
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufReader, Write};
use std::ops::ControlFlow;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// A [`CommandSource`] backed by the cluster daemon's socket.
pub struct ClusterLink {
    path: PathBuf,
    outbound: Option<mpsc::Receiver<OutboundMessage>>,
}

/// Errors produced by the cluster link.
#[derive(Debug, thiserror::Error)]
pub enum ClusterLinkError {
    #[error("cannot connect to {path}: {source}")]
    Connect {
        path: String,
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClusterLink {
    /// `outbound` carries the messages to send once connected, usually the
    /// receiving end of the canvas publisher.
    pub fn new(path: impl AsRef<Path>, outbound: mpsc::Receiver<OutboundMessage>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            outbound: Some(outbound),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_message(stream: &mut UnixStream, msg: &OutboundMessage) -> Result<(), ClusterLinkError> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    stream.write_all(line.as_bytes())?;
    Ok(())
}

impl CommandSource for ClusterLink {
    type Error = ClusterLinkError;

    /// Connect and relay until the daemon closes the connection.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let stream = match UnixStream::connect(&self.path) {
            Ok(stream) => stream,
            Err(e) => {
                let err = ClusterLinkError::Connect {
                    path: self.path.display().to_string(),
                    source: e,
                };
                let _ = sink.send(Command::ChannelFailed(err.to_string()));
                return Err(err);
            }
        };
        info!("connected to cluster daemon at {}", self.path.display());

        let mut writer = stream.try_clone()?;
        write_message(&mut writer, &OutboundMessage::RequestCluster)?;
        if let Some(outbound) = self.outbound.take() {
            std::thread::spawn(move || {
                for msg in outbound {
                    if let Err(e) = write_message(&mut writer, &msg) {
                        error!("cluster write error: {}", e);
                        break;
                    }
                    debug!("published {:?}", msg);
                }
            });
        }

        let relay = |msg: InboundMessage| match msg {
            InboundMessage::Cluster(snapshot) => {
                info!("received cluster with {} screen(s)", snapshot.screens.len());
                match sink.send(Command::Cluster(snapshot)) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            }
            InboundMessage::Unknown => {
                debug!("ignoring cluster message of unknown type");
                ControlFlow::Continue(())
            }
        };
        if read_json_lines(BufReader::new(stream), "cluster message", relay)?.is_break() {
            info!("sink closed, shutting down");
            return Ok(());
        }

        warn!("cluster daemon closed the connection");
        Ok(())
    }
}

//  Tests
