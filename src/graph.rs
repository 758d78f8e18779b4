//! Screen adjacency graph.
//!
//! The [`ScreenGraph`] owns every [`ScreenNode`] of the session in an
//! arena; edge tables reference neighbours by [`ScreenId`].  All
//! mutations keep the graph *symmetric*: if `a` lists `b` in slot
//! `[axis][side]`, then `b` lists `a` in `[axis][1 - side]`.  No node is
//! ever its own neighbour.
//!
//! The interesting operation is [`connect`](ScreenGraph::connect).  Besides
//! the direct link it walks the existing edges to discover the dropped
//! node's orthogonal neighbours, so a screen placed under the right half of
//! a row picks up its upper neighbour without any further distance check:
//!
//! ```text
//!   B ─ R            B ─ R
//!   │         →      │   │
//!   C   (A)          C ─ A
//! ```

use crate::screen::{Edge, Edges, ScreenId, ScreenNode, Side};
use crate::vector::{Axis, Vector2};
use log::{debug, warn};
use std::collections::HashMap;

/// Spacing kept between the boxes of adjacent screens.
pub const DEFAULT_PAD: f64 = 5.0;

/// Arena of screens plus their adjacency.
#[derive(Debug, Clone)]
pub struct ScreenGraph {
    /// Insertion order; it is also the iteration order of every query.
    nodes: Vec<ScreenNode>,
    /// `id -> index into nodes`.
    index: HashMap<ScreenId, usize>,
    pad: f64,
    /// Next id handed out by [`add`](Self::add).  Only ever grows.
    next_id: u32,
}

impl Default for ScreenGraph {
    fn default() -> Self {
        Self::new(DEFAULT_PAD)
    }
}

impl ScreenGraph {
    /// Create an empty graph that keeps `pad` units between neighbours.
    pub fn new(pad: f64) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            pad,
            next_id: 0,
        }
    }

    //  Accessors

    pub fn pad(&self) -> f64 {
        self.pad
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ScreenId) -> Option<&ScreenNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: ScreenId) -> bool {
        self.index.contains_key(&id)
    }

    /// Screens in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ScreenNode> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = ScreenId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// The neighbour of `id` in slot `[axis][side]`.
    pub fn neighbor(&self, id: ScreenId, axis: Axis, side: Side) -> Option<ScreenId> {
        self.get(id).and_then(|n| n.edges.get(axis, side))
    }

    //  Structure

    /// Add an unconnected screen and return its freshly allocated id.
    pub fn add(&mut self, name: impl Into<String>, position: Vector2, size: Vector2) -> ScreenId {
        let id = ScreenId(self.next_id);
        self.insert(ScreenNode::new(id, name, position, size));
        id
    }

    /// Insert a node that already carries its id (e.g. one taken from a
    /// cluster snapshot).  Returns `false` and leaves the graph untouched
    /// if the id is already present.
    ///
    /// The node's edges are inserted as given; callers that install
    /// pre-made edges are responsible for their symmetry.
    pub(crate) fn insert(&mut self, node: ScreenNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.next_id = self.next_id.max(node.id.0.saturating_add(1));
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Remove every screen, returning the discarded nodes.
    ///
    /// Ids of discarded nodes are not handed out again by
    /// [`add`](Self::add).
    pub fn clear(&mut self) -> Vec<ScreenNode> {
        self.index.clear();
        std::mem::take(&mut self.nodes)
    }

    /// Move a screen by `delta` without touching its edges.  Returns the
    /// new position.
    pub fn translate(&mut self, id: ScreenId, delta: Vector2) -> Option<Vector2> {
        let node = self.node_mut(id)?;
        node.position += delta;
        Some(node.position)
    }

    //  Adjacency

    /// The candidate closest to `node` by squared distance between centres.
    ///
    /// `node` itself and ids not in the graph are skipped.  On a tie the
    /// first candidate wins.  An empty candidate set yields `None`.
    pub fn closest<I>(&self, node: ScreenId, candidates: I) -> Option<ScreenId>
    where
        I: IntoIterator<Item = ScreenId>,
    {
        let origin = self.get(node)?.position;
        let mut best: Option<(ScreenId, f64)> = None;
        for id in candidates {
            if id == node {
                continue;
            }
            let Some(candidate) = self.get(id) else {
                continue;
            };
            let dist = candidate.position.distance_squared(origin);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Make `this` adjacent to `other`.
    ///
    /// The dominant axis of `this.position - other.position` decides the
    /// slot: `this` ends up on that side of `other`.  Orthogonal neighbours
    /// are inherited from `other`'s neighbourhood, `this`'s previous edges
    /// are dropped, and `this` is snapped next to `other` along the
    /// connection axis (the orthogonal coordinate is kept).
    ///
    /// Returns the edge of `other` that `this` now occupies, or `None` if
    /// either id is unknown or both are the same node.
    ///
    /// Repeating the call with no other mutation in between reproduces the
    /// same table and position only while the snapped offset stays the
    /// dominant one.  If the kept orthogonal offset is larger than the snap
    /// distance, the second call sees the other axis dominate and moves
    /// `this` to that side of `other` instead.
    pub fn connect(&mut self, this: ScreenId, other: ScreenId) -> Option<Edge> {
        if this == other {
            return None;
        }
        let (this_pos, this_size) = self.get(this).map(|n| (n.position, n.size))?;
        let (other_pos, other_size) = self.get(other).map(|n| (n.position, n.size))?;

        let delta = this_pos - other_pos;
        let axis = delta.dominant_axis();
        let side = if delta[axis] < 0.0 {
            Side::Negative
        } else {
            Side::Positive
        };

        // Detach first so that no walk below can pass through `this`.
        self.detach(this);

        let mut edges = Edges::default();
        edges.set(axis, side.opposite(), Some(other));

        let ortho = axis.orthogonal();
        for s in Side::ALL {
            let Some(n1) = self.neighbor(other, ortho, s) else {
                continue;
            };
            let Some(n2) = self.neighbor(n1, axis, side) else {
                continue;
            };
            if edges.contains(n2) {
                continue;
            }
            edges.set(ortho, s, Some(n2));

            let n4 = self
                .neighbor(n2, axis, side)
                .and_then(|n3| self.neighbor(n3, ortho, s.opposite()));
            if let Some(n4) = n4 {
                match edges.get(axis, side) {
                    None if !edges.contains(n4) => edges.set(axis, side, Some(n4)),
                    Some(prev) if prev == n4 => {}
                    found => warn!(
                        "screen {}: {} neighbour {} via screen {} disagrees with {:?}",
                        this,
                        Edge::new(axis, side),
                        n4,
                        n2,
                        found
                    ),
                }
            }
        }

        for (a, s, neighbor) in edges.iter() {
            self.link(this, a, s, neighbor);
        }

        let offset = (this_size[axis] + other_size[axis]) / 2.0 + self.pad;
        if let Some(node) = self.node_mut(this) {
            node.position[axis] = other_pos[axis] + side.sign() * offset;
        }

        let edge = Edge::new(axis, side);
        debug!("screen {} connected {} of screen {}", this, edge, other);
        Some(edge)
    }

    /// [`connect`](Self::connect) `node` to its [`closest`](Self::closest)
    /// candidate.  Returns the chosen neighbour; `None` leaves `node`
    /// untouched.
    pub fn connect_closest<I>(&mut self, node: ScreenId, candidates: I) -> Option<ScreenId>
    where
        I: IntoIterator<Item = ScreenId>,
    {
        let target = self.closest(node, candidates)?;
        self.connect(node, target).map(|_| target)
    }

    /// Whether every edge is reciprocated and no node neighbours itself.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.edges.iter().all(|(axis, side, n)| {
                n != node.id && self.neighbor(n, axis, side.opposite()) == Some(node.id)
            })
        })
    }

    //  Internal

    pub(crate) fn node_mut(&mut self, id: ScreenId) -> Option<&mut ScreenNode> {
        let i = *self.index.get(&id)?;
        Some(&mut self.nodes[i])
    }

    fn set_slot(&mut self, id: ScreenId, axis: Axis, side: Side, neighbor: Option<ScreenId>) {
        if let Some(node) = self.node_mut(id) {
            node.edges.set(axis, side, neighbor);
        }
    }

    /// Clear `id`'s slot and the reciprocal slot that points back at it.
    pub(crate) fn unlink(&mut self, id: ScreenId, axis: Axis, side: Side) {
        let Some(neighbor) = self.neighbor(id, axis, side) else {
            return;
        };
        if self.neighbor(neighbor, axis, side.opposite()) == Some(id) {
            self.set_slot(neighbor, axis, side.opposite(), None);
        }
        self.set_slot(id, axis, side, None);
    }

    /// Link `a` to `b` in `a`'s slot `[axis][side]`, releasing whatever
    /// either node held in the two slots involved.
    pub(crate) fn link(&mut self, a: ScreenId, axis: Axis, side: Side, b: ScreenId) {
        if self.neighbor(a, axis, side) != Some(b) {
            self.unlink(a, axis, side);
        }
        if self.neighbor(b, axis, side.opposite()) != Some(a) {
            self.unlink(b, axis, side.opposite());
        }
        self.set_slot(a, axis, side, Some(b));
        self.set_slot(b, axis, side.opposite(), Some(a));
    }

    /// Drop every edge of `id`, on both ends.
    fn detach(&mut self, id: ScreenId) {
        let Some(edges) = self.get(id).map(|n| n.edges) else {
            return;
        };
        for (axis, side, _) in edges.iter() {
            self.unlink(id, axis, side);
        }
    }
}

//  Tests
