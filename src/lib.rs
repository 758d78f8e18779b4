//! **screenlink**: a spatial layout editor for the screens of an
//! input-sharing cluster.
//!
//! Every machine of the cluster is drawn as a screen on an infinite 2D
//! canvas.  Dropping a screen next to another makes the two neighbours in a
//! four-directional adjacency graph (left / right / top / bottom), which is
//! what the cluster uses to decide where the pointer goes when it leaves
//! one machine's display.
//!
//! # Architecture
//!
//! * [`graph::ScreenGraph`] holds the screens and keeps their edge tables
//!   symmetric; [`graph::ScreenGraph::connect`] is the core operation.
//! * [`snapshot`] rebuilds a graph from the cluster daemon's id-based
//!   description and derives the description sent back after edits.
//! * [`focus::PointerFocusRouter`] binds each mouse or touch pointer to at
//!   most one drag target.
//! * [`canvas::SpatialCanvas`] ties these together and is driven by
//!   [`command::Command`]s.
//!
//! The canvas is decoupled from its collaborators by two traits:
//!
//! * [`traits::RenderSurface`]: whatever draws the elements;
//! * [`traits::CommandSource`]: whatever delivers input and snapshots.
//!
//! Concrete sources live in [`ipc`] (Unix sockets).

pub mod canvas;
pub mod command;
pub mod config;
pub mod focus;
pub mod graph;
pub mod ipc;
pub mod render;
pub mod screen;
pub mod snapshot;
pub mod traits;
pub mod vector;
