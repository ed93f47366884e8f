//! Discrete input events fed to the interaction state machine

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::PointerMode;

/// Pointer button that triggered an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Host input, in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    PointerDown { screen: Vec2, button: PointerButton },
    PointerMove { screen: Vec2 },
    PointerUp { screen: Vec2, button: PointerButton },
    KeyUp { key: char },
    /// Wheel steps, positive zooms in
    Wheel { screen: Vec2, delta: f32 },
    /// Explicit mode selection from a menu
    SelectMode { mode: PointerMode, sticky: bool },
}

impl InputEvent {
    /// Screen position carried by the event, if any
    pub fn screen(&self) -> Option<Vec2> {
        match self {
            InputEvent::PointerDown { screen, .. }
            | InputEvent::PointerMove { screen }
            | InputEvent::PointerUp { screen, .. }
            | InputEvent::Wheel { screen, .. } => Some(*screen),
            InputEvent::KeyUp { .. } | InputEvent::SelectMode { .. } => None,
        }
    }
}
