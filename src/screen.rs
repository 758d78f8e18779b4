//! Screens and their edge tables.
//!
//! A [`ScreenNode`] is one machine of the cluster as drawn on the canvas:
//! a centre point, a size, and an [`Edges`] table that names at most one
//! neighbouring screen per `[axis][side]` slot.  Neighbours are referenced
//! by [`ScreenId`], never by pointer; the nodes themselves live in the
//! [`ScreenGraph`](crate::graph::ScreenGraph) arena.

use crate::vector::{Axis, Vector2};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Stable identity of a screen.  Never reused while the node lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScreenId(pub u32);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts a number or a numeric string, since snapshot screen ids also
/// appear as JSON object keys.
impl<'de> Deserialize<'de> for ScreenId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = ScreenId;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "screen id as integer or string")
            }
            fn visit_u64<E>(self, n: u64) -> Result<ScreenId, E>
            where
                E: DeError,
            {
                u32::try_from(n)
                    .map(ScreenId)
                    .map_err(|_| DeError::custom(format!("screen id {} out of range", n)))
            }
            fn visit_i64<E>(self, n: i64) -> Result<ScreenId, E>
            where
                E: DeError,
            {
                u32::try_from(n)
                    .map(ScreenId)
                    .map_err(|_| DeError::custom(format!("screen id {} out of range", n)))
            }
            fn visit_str<E>(self, s: &str) -> Result<ScreenId, E>
            where
                E: DeError,
            {
                s.trim()
                    .parse()
                    .map(ScreenId)
                    .map_err(|_| DeError::custom(format!("invalid screen id: {:?}", s)))
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Direction along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Side 0: left or top.
    Negative,
    /// Side 1: right or bottom.
    Positive,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Negative, Side::Positive];

    pub fn index(self) -> usize {
        match self {
            Side::Negative => 0,
            Side::Positive => 1,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Negative => Side::Positive,
            Side::Positive => Side::Negative,
        }
    }

    /// `-1.0` or `1.0`, i.e. `2 * side - 1`.
    pub fn sign(self) -> f64 {
        match self {
            Side::Negative => -1.0,
            Side::Positive => 1.0,
        }
    }
}

/// Named edge slot, the `[axis][side]` pair spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    /// In edge-table order: left, right, top, bottom.
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];

    pub fn new(axis: Axis, side: Side) -> Self {
        match (axis, side) {
            (Axis::Horizontal, Side::Negative) => Edge::Left,
            (Axis::Horizontal, Side::Positive) => Edge::Right,
            (Axis::Vertical, Side::Negative) => Edge::Top,
            (Axis::Vertical, Side::Positive) => Edge::Bottom,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Edge::Left | Edge::Right => Axis::Horizontal,
            Edge::Top | Edge::Bottom => Axis::Vertical,
        }
    }

    pub fn side(self) -> Side {
        match self {
            Edge::Left | Edge::Top => Side::Negative,
            Edge::Right | Edge::Bottom => Side::Positive,
        }
    }

    pub fn opposite(self) -> Edge {
        Edge::new(self.axis(), self.side().opposite())
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Left => write!(f, "left"),
            Edge::Right => write!(f, "right"),
            Edge::Top => write!(f, "top"),
            Edge::Bottom => write!(f, "bottom"),
        }
    }
}

/// The 2×2 adjacency table of a screen, indexed `[axis][side]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges([[Option<ScreenId>; 2]; 2]);

impl Edges {
    pub fn get(&self, axis: Axis, side: Side) -> Option<ScreenId> {
        self.0[axis.index()][side.index()]
    }

    pub fn set(&mut self, axis: Axis, side: Side, neighbor: Option<ScreenId>) {
        self.0[axis.index()][side.index()] = neighbor;
    }

    pub fn edge(&self, edge: Edge) -> Option<ScreenId> {
        self.get(edge.axis(), edge.side())
    }

    /// Whether `id` occupies any slot.
    pub fn contains(&self, id: ScreenId) -> bool {
        self.iter().any(|(_, _, n)| n == id)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Populated slots in `[axis][side]` order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, Side, ScreenId)> + '_ {
        Axis::ALL.into_iter().flat_map(move |axis| {
            Side::ALL
                .into_iter()
                .filter_map(move |side| self.get(axis, side).map(|n| (axis, side, n)))
        })
    }
}

/// A positioned, sized participant in the layout graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenNode {
    pub id: ScreenId,
    /// Display label.
    pub name: String,
    /// Centre point in canvas space.
    pub position: Vector2,
    pub size: Vector2,
    pub edges: Edges,
    /// Whether this node is the machine the editor runs on.
    pub local: bool,
}

impl ScreenNode {
    pub fn new(id: ScreenId, name: impl Into<String>, position: Vector2, size: Vector2) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            size,
            edges: Edges::default(),
            local: false,
        }
    }

    /// Top-left corner, for surfaces that position boxes by their origin.
    pub fn origin(&self) -> Vector2 {
        self.position - self.size / 2.0
    }
}
