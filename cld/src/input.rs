//! Input model: editor modes, modifier keys, selection, and the gesture state machine.
//!
//! `Mode` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `Selection` is the single selected item; it is an enum so a node and
//! an edge can never be selected at once. `InputState` is the gesture tracked
//! between pointer-down and pointer-up.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::doc::{EdgeId, NodeId};

/// Editor interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Click selects, drag moves nodes or starts a connection from an anchor.
    #[default]
    Select,
    /// Any drag from a node body starts a connection.
    Link,
    /// Clicks drop comment pins instead of selecting.
    Comment,
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"n"`, `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// Case-insensitive comparison for single-character accelerators.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive = down.
    pub dy: f64,
}

/// The single selected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edge(EdgeId),
}

impl Selection {
    #[must_use]
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn edge(self) -> Option<EdgeId> {
        match self {
            Self::Edge(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

/// Persistent UI state visible to the host.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub mode: Mode,
    pub selection: Selection,
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging empty canvas pans the view.
    Panning { last_screen: Point },
    /// Moving a node. The original position is kept so release can emit a
    /// single undoable move.
    DraggingNode { id: NodeId, last_world: Point, orig_x: f64, orig_y: f64, moved: bool },
    /// Dragging a provisional link out of `source`. A release back on the
    /// source only makes a self-loop once the cursor has left it.
    Connecting { source: NodeId, cursor_world: Point, left_source: bool },
}
