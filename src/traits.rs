//! Core traits that decouple screenlink from its external collaborators.
//!
//! The [`SpatialCanvas`](crate::canvas::SpatialCanvas) draws through a
//! [`RenderSurface`] and is fed by any number of [`CommandSource`]s; it
//! never talks to a window system or a socket directly.

use crate::command::Command;
use crate::render::{ElementId, ElementKind};
use crate::vector::Vector2;
use std::sync::mpsc;

/// Abstraction over whatever turns elements into pixels.
///
/// The canvas allocates element ids itself and issues these primitives
/// after every position or size change and on every structural change.
/// An implementation might drive a browser DOM, a native toolkit, or
/// nothing at all ([`LogSurface`](crate::render::LogSurface)).
pub trait RenderSurface {
    /// The error type produced by this surface.
    type Error: std::error::Error + Send + 'static;

    /// Create an element with the given id.  `text` is the visible label,
    /// if the element has one.
    fn create_element(
        &self,
        id: ElementId,
        kind: ElementKind,
        text: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Place the element's top-left corner at `position`, relative to its
    /// parent.
    fn set_position(&self, id: ElementId, position: Vector2) -> Result<(), Self::Error>;

    fn set_size(&self, id: ElementId, size: Vector2) -> Result<(), Self::Error>;

    /// Add or remove a style class (`dragging`, `local`, …).
    fn set_class(&self, id: ElementId, class: &str, enabled: bool) -> Result<(), Self::Error>;

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already attached.  Being last means being drawn on top.
    fn append(&self, parent: ElementId, child: ElementId) -> Result<(), Self::Error>;

    /// Remove the element and its children.
    fn remove(&self, id: ElementId) -> Result<(), Self::Error>;

    /// Show a blocking notification to the user.
    fn notify(&self, message: &str) -> Result<(), Self::Error>;
}

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (the UI's input socket, the
/// cluster daemon's channel, a test harness) and forward parsed commands
/// into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Commands are sent in the order they were received.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
