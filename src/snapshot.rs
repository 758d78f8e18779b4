//! Cluster snapshots: the remote, id-based description of the layout.
//!
//! The cluster daemon owns the authoritative layout and sends it as a
//! [`ClusterSnapshot`]: every screen with its name and the ids of its four
//! neighbours.  Positions are not part of the snapshot; they are rebuilt
//! locally by [`resolve`], which walks the edges from a root screen and
//! places each neighbour one screen-width (or height) away from the screen
//! that reached it.
//!
//! After local edits the canvas sends back a list of [`ScreenRecord`]s
//! derived from the live graph with [`records`].
//!
//! # Wire format
//!
//! ```json
//! {
//!   "local_screen": 0,
//!   "screens": {
//!     "0": { "name": "Desktop", "edges": { "right": 1 } },
//!     "1": { "name": "Laptop",  "edges": { "left": 0 } }
//!   }
//! }
//! ```

use crate::graph::ScreenGraph;
use crate::screen::{Edge, Edges, ScreenId, ScreenNode};
use crate::vector::Vector2;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Neighbour ids by edge name.  Absent keys mean "no neighbour".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeRefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<ScreenId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<ScreenId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<ScreenId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<ScreenId>,
}

impl EdgeRefs {
    pub fn get(&self, edge: Edge) -> Option<ScreenId> {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }

    pub fn set(&mut self, edge: Edge, id: Option<ScreenId>) {
        match edge {
            Edge::Left => self.left = id,
            Edge::Right => self.right = id,
            Edge::Top => self.top = id,
            Edge::Bottom => self.bottom = id,
        }
    }
}

impl From<&Edges> for EdgeRefs {
    fn from(edges: &Edges) -> Self {
        let mut refs = EdgeRefs::default();
        for edge in Edge::ALL {
            refs.set(edge, edges.edge(edge));
        }
        refs
    }
}

/// One screen as the cluster daemon describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotScreen {
    pub name: String,
    #[serde(default)]
    pub edges: EdgeRefs,
}

/// The authoritative description of the whole cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// The screen of the machine this editor runs on.
    pub local_screen: ScreenId,
    pub screens: BTreeMap<ScreenId, SnapshotScreen>,
}

/// One screen of the outbound `Screens` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRecord {
    pub id: ScreenId,
    pub name: String,
    pub edges: EdgeRefs,
}

/// Derive the outbound description of `graph`, in graph order.
pub fn records(graph: &ScreenGraph) -> Vec<ScreenRecord> {
    graph
        .iter()
        .map(|node| ScreenRecord {
            id: node.id,
            name: node.name.clone(),
            edges: EdgeRefs::from(&node.edges),
        })
        .collect()
}

/// Rebuild a graph from `snapshot`.
///
/// `root` is placed at `anchor`; every screen reachable from it through
/// the snapshot's edges is created exactly once, all with the same `size`,
/// and spaced `pad` units from the screen it was reached from.  Screens
/// not reachable from `root` are left out.  Edges naming ids missing from
/// the snapshot resolve to "no neighbour".
pub fn resolve(
    snapshot: &ClusterSnapshot,
    root: ScreenId,
    anchor: Vector2,
    size: Vector2,
    pad: f64,
) -> ScreenGraph {
    let mut resolver = Resolver {
        snapshot,
        graph: ScreenGraph::new(pad),
        resolved: HashSet::new(),
        size,
        pad,
    };
    if resolver.resolve(root, anchor).is_none() {
        warn!("snapshot root screen {} is not part of the snapshot", root);
    }
    resolver.link();
    debug!(
        "resolved {} of {} snapshot screen(s)",
        resolver.graph.len(),
        snapshot.screens.len()
    );
    resolver.graph
}

/// Memoised depth-first walk over the snapshot's edges.
struct Resolver<'a> {
    snapshot: &'a ClusterSnapshot,
    graph: ScreenGraph,
    /// Ids already created.  The edge graph is cyclic, so this is what
    /// keeps the walk finite.
    resolved: HashSet<ScreenId>,
    size: Vector2,
    pad: f64,
}

impl Resolver<'_> {
    fn resolve(&mut self, id: ScreenId, position: Vector2) -> Option<ScreenId> {
        if self.resolved.contains(&id) {
            return Some(id);
        }
        let snapshot = self.snapshot;
        let screen = snapshot.screens.get(&id)?;
        self.resolved.insert(id);

        let mut node = ScreenNode::new(id, screen.name.clone(), position, self.size);
        node.local = id == snapshot.local_screen;
        self.graph.insert(node);

        for edge in Edge::ALL {
            let Some(next) = screen.edges.get(edge) else {
                continue;
            };
            let axis = edge.axis();
            let mut at = position;
            at[axis] += edge.side().sign() * (self.size[axis] + self.pad);
            self.resolve(next, at);
        }
        Some(id)
    }

    /// Install the snapshot's edges between the resolved screens.
    ///
    /// A one-sided edge is completed when the far slot is free and dropped
    /// when the far slot names another screen, so the result is symmetric
    /// even for a sloppy snapshot.
    fn link(&mut self) {
        let snapshot = self.snapshot;
        let ids: Vec<ScreenId> = self.graph.ids().collect();

        for &id in &ids {
            let Some(screen) = snapshot.screens.get(&id) else {
                continue;
            };
            let mut edges = Edges::default();
            for edge in Edge::ALL {
                match screen.edges.get(edge) {
                    Some(n) if n != id && self.graph.contains(n) && !edges.contains(n) => {
                        edges.set(edge.axis(), edge.side(), Some(n));
                    }
                    _ => {}
                }
            }
            if let Some(node) = self.graph.node_mut(id) {
                node.edges = edges;
            }
        }

        let mut pending = Vec::new();
        for node in self.graph.iter() {
            for (axis, side, n) in node.edges.iter() {
                pending.push((node.id, axis, side, n));
            }
        }
        for (id, axis, side, n) in pending {
            if self.graph.neighbor(id, axis, side) != Some(n) {
                continue;
            }
            match self.graph.neighbor(n, axis, side.opposite()) {
                Some(back) if back == id => {}
                None => {
                    if let Some(far) = self.graph.node_mut(n) {
                        far.edges.set(axis, side.opposite(), Some(id));
                    }
                }
                Some(other) => {
                    warn!(
                        "snapshot: dropping {} edge {} -> {}, screen {} already has {} there",
                        Edge::new(axis, side),
                        id,
                        n,
                        n,
                        other
                    );
                    if let Some(node) = self.graph.node_mut(id) {
                        node.edges.set(axis, side, None);
                    }
                }
            }
        }
    }
}

//  Tests
