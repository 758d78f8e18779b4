//! Commands and wire types used throughout screenlink.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes everything the canvas reacts to, the raw
//! [`MouseInput`] / [`TouchInput`] shapes describe what an input device
//! delivers, and [`InboundMessage`] / [`OutboundMessage`] are the two sides
//! of the cluster channel.
//!
//! Phase and modifier names are parsed leniently (`"down"`, `"mousedown"`,
//! `"touchstart"`, `"Ctrl"`, `"control"`, …) so UI front ends can forward
//! their native event names.

use crate::render::ElementId;
use crate::snapshot::{ClusterSnapshot, ScreenRecord};
use crate::vector::Vector2;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Stage of a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Down,
    Move,
    Up,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Down => write!(f, "down"),
            Phase::Move => write!(f, "move"),
            Phase::Up => write!(f, "up"),
        }
    }
}

/// Lowercase, drop separators and any `mouse`/`touch`/`pointer` prefix.
fn normalize_name(s: &str) -> String {
    let normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect();
    for prefix in ["mouse", "touch", "pointer"] {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    normalized
}

fn parse_phase(s: &str) -> Option<Phase> {
    match normalize_name(s).as_str() {
        "down" | "start" | "begin" => Some(Phase::Down),
        "move" => Some(Phase::Move),
        "up" | "end" => Some(Phase::Up),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_phase(&s).ok_or_else(|| DeError::custom(format!("invalid phase: {:?}", s)))
    }
}

/// A single modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

fn parse_modifier(s: &str) -> Option<Modifier> {
    match normalize_name(s).as_str() {
        "ctrl" | "control" | "ctrlkey" => Some(Modifier::Ctrl),
        "shift" | "shiftkey" => Some(Modifier::Shift),
        "alt" | "option" | "altkey" => Some(Modifier::Alt),
        "meta" | "super" | "cmd" | "command" | "metakey" => Some(Modifier::Meta),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Modifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_modifier(&s).ok_or_else(|| DeError::custom(format!("invalid modifier: {:?}", s)))
    }
}

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn contains(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Ctrl => self.ctrl,
            Modifier::Shift => self.shift,
            Modifier::Alt => self.alt,
            Modifier::Meta => self.meta,
        }
    }
}

/// Single-pointer input in screen space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseInput {
    pub phase: Phase,
    /// Element under the pointer, if the front end knows it.
    #[serde(default)]
    pub target: Option<ElementId>,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub modifiers: Modifiers,
}

/// One contact of a multi-touch event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Device-assigned, stable until the contact is released.
    pub identifier: u32,
    pub x: f64,
    pub y: f64,
}

/// A batch of touch contacts that changed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchInput {
    pub phase: Phase,
    #[serde(default)]
    pub target: Option<ElementId>,
    /// Only the contacts that changed in this event.
    pub touches: Vec<TouchPoint>,
    #[serde(default)]
    pub modifiers: Modifiers,
}

/// Bounding rectangle of the canvas in screen space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Top-left corner.
    pub origin: Vector2,
    pub size: Vector2,
}

impl Viewport {
    pub fn center(&self) -> Vector2 {
        self.size / 2.0
    }
}

/// Everything the [`SpatialCanvas`](crate::canvas::SpatialCanvas) reacts to.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed in delivery order.
///
/// # Wire format
///
/// ```json
/// {"Mouse":{"phase":"down","target":4,"x":310,"y":220,"modifiers":{"ctrl":true}}}
/// {"Touch":{"phase":"touchmove","touches":[{"identifier":0,"x":12,"y":40}]}}
/// {"Resize":{"origin":{"x":0,"y":0},"size":{"x":1280,"y":720}}}
/// "Recenter"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Mouse(MouseInput),
    Touch(TouchInput),

    /// The canvas moved or changed size.
    Resize(Viewport),

    /// Reset the pan offset to the origin.
    Recenter,

    /// Replace every screen with the ones described by the snapshot.
    Cluster(ClusterSnapshot),

    /// The cluster channel could not be opened.  Produced locally only.
    #[serde(skip)]
    ChannelFailed(String),
}

/// Messages received from the cluster daemon.
///
/// Tagged by a `"type"` field; unknown types deserialize to
/// [`InboundMessage::Unknown`] and are dropped by the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// The full, authoritative cluster layout.
    Cluster(ClusterSnapshot),
    #[serde(other)]
    Unknown,
}

/// Messages sent to the cluster daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Ask for the current [`InboundMessage::Cluster`].  Sent on open.
    RequestCluster,
    /// The local layout after an edit.
    Screens { screens: Vec<ScreenRecord> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::ScreenId;
    use crate::snapshot::EdgeRefs;

    #[test]
    fn phase_accepts_native_event_names() {
        for (name, phase) in [
            ("down", Phase::Down),
            ("mousedown", Phase::Down),
            ("touchstart", Phase::Down),
            ("pointer-down", Phase::Down),
            ("Move", Phase::Move),
            ("touchmove", Phase::Move),
            ("mouseup", Phase::Up),
            ("touchend", Phase::Up),
        ] {
            assert_eq!(parse_phase(name), Some(phase), "{name}");
        }
        assert_eq!(parse_phase("hover"), None);
    }

    #[test]
    fn modifier_aliases() {
        assert_eq!(parse_modifier("Control"), Some(Modifier::Ctrl));
        assert_eq!(parse_modifier("ctrlKey"), Some(Modifier::Ctrl));
        assert_eq!(parse_modifier("option"), Some(Modifier::Alt));
        assert_eq!(parse_modifier("SUPER"), Some(Modifier::Meta));
        assert_eq!(parse_modifier("hyper"), None);
    }

    #[test]
    fn modifiers_contains() {
        let m = Modifiers {
            shift: true,
            ..Modifiers::default()
        };
        assert!(m.contains(Modifier::Shift));
        assert!(!m.contains(Modifier::Ctrl));
    }

    #[test]
    fn mouse_command_from_json() {
        let json = r#"{"Mouse":{"phase":"mousedown","target":4,"x":310,"y":220,"modifiers":{"ctrl":true}}}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::Mouse(MouseInput {
                phase: Phase::Down,
                target: Some(ElementId(4)),
                x: 310.0,
                y: 220.0,
                modifiers: Modifiers {
                    ctrl: true,
                    ..Modifiers::default()
                },
            })
        );
    }

    #[test]
    fn touch_command_defaults_target_and_modifiers() {
        let json = r#"{"Touch":{"phase":"touchmove","touches":[{"identifier":0,"x":12,"y":40},{"identifier":3,"x":1,"y":2}]}}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        let Command::Touch(touch) = &cmd else {
            panic!("expected touch, got {cmd:?}");
        };
        assert_eq!(touch.phase, Phase::Move);
        assert_eq!(touch.target, None);
        assert_eq!(touch.touches.len(), 2);
        assert_eq!(touch.touches[1].identifier, 3);
        assert_eq!(touch.modifiers, Modifiers::default());
    }

    #[test]
    fn unit_commands_are_plain_strings() {
        let cmd: Command = serde_json::from_str(r#""Recenter""#).unwrap();
        assert_eq!(cmd, Command::Recenter);
    }

    #[test]
    fn channel_failure_is_not_accepted_from_the_wire() {
        assert!(serde_json::from_str::<Command>(r#"{"ChannelFailed":"x"}"#).is_err());
    }

    #[test]
    fn inbound_cluster_message() {
        let json = r#"{
            "type": "Cluster",
            "local_screen": 1,
            "screens": {
                "0": { "name": "Desktop", "edges": { "right": 1 } },
                "1": { "name": "Laptop", "edges": { "left": 0 } }
            }
        }"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        let InboundMessage::Cluster(snapshot) = &msg else {
            panic!("expected cluster, got {msg:?}");
        };
        assert_eq!(snapshot.local_screen, ScreenId(1));
        assert_eq!(snapshot.screens.len(), 2);
        assert_eq!(snapshot.screens[&ScreenId(1)].edges.left, Some(ScreenId(0)));
    }

    #[test]
    fn unknown_inbound_type_is_tolerated() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type":"Focus","x":1}"#).unwrap();
        assert_eq!(msg, InboundMessage::Unknown);
    }

    #[test]
    fn outbound_messages_are_tagged() {
        let request = serde_json::to_value(OutboundMessage::RequestCluster).unwrap();
        assert_eq!(request, serde_json::json!({ "type": "RequestCluster" }));

        let screens = OutboundMessage::Screens {
            screens: vec![ScreenRecord {
                id: ScreenId(2),
                name: "Kronos".into(),
                edges: EdgeRefs {
                    top: Some(ScreenId(0)),
                    ..EdgeRefs::default()
                },
            }],
        };
        assert_eq!(
            serde_json::to_value(screens).unwrap(),
            serde_json::json!({
                "type": "Screens",
                "screens": [{ "id": 2, "name": "Kronos", "edges": { "top": 0 } }]
            })
        );
    }
}
