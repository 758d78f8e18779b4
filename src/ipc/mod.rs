//! Unix-socket transports.
//!
//! [`listener`] accepts input commands from the UI front end; [`cluster`]
//! talks to the cluster daemon.  Both are [`CommandSource`]s speaking
//! newline-delimited JSON, decoded by [`read_json_lines`].
//!
//! [`CommandSource`]: crate::traits::CommandSource

pub mod cluster;
pub mod listener;

use log::warn;
use serde::de::DeserializeOwned;
use std::io::{self, BufRead};
use std::ops::ControlFlow;

/// Decode one JSON value per line of `reader` and hand each to `handle`.
///
/// Blank lines are skipped.  Lines that do not decode as `T` are logged
/// under `what` and skipped.  Returns `Break` as soon as `handle` does,
/// `Continue` at end of stream.
pub(crate) fn read_json_lines<T, R, F>(
    reader: R,
    what: &str,
    mut handle: F,
) -> io::Result<ControlFlow<()>>
where
    T: DeserializeOwned,
    R: BufRead,
    F: FnMut(T) -> ControlFlow<()>,
{
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(value) => {
                if handle(value).is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            Err(e) => warn!("bad {} {:?}: {}", what, line, e),
        }
    }
    Ok(ControlFlow::Continue(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Ping {
        n: u32,
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let input = "{\"n\":1}\n\n  \nnope\n{\"n\":\"two\"}\n{\"n\":3}\n";
        let mut seen = Vec::new();
        let flow = read_json_lines(input.as_bytes(), "ping", |p: Ping| {
            seen.push(p.n);
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(seen, vec![1, 3]);
    }

    #[test]
    fn stops_when_the_handler_breaks() {
        let input = "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n";
        let mut seen = Vec::new();
        let flow = read_json_lines(input.as_bytes(), "ping", |p: Ping| {
            seen.push(p.n);
            if p.n == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, vec![1, 2]);
    }
}
