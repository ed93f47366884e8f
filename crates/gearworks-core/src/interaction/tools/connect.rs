//! Mesh connection tool

use glam::Vec2;

use super::{Tool, ToolResponse};
use crate::config::InteractionConfig;
use crate::interaction::{OriginDelta, PointerButton};
use crate::origin::{Connection, EntityId};
use crate::world::World;

/// Connects two gears: first press selects the source, second press meshes
#[derive(Debug, Default)]
pub struct Connector {
    source: Option<EntityId>,
}

impl Connector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gear selected as the connection source
    pub fn source(&self) -> Option<EntityId> {
        self.source
    }
}

impl Tool for Connector {
    fn name(&self) -> &str {
        "Connect"
    }

    fn pointer_down(
        &mut self,
        world: &mut World,
        point: Vec2,
        button: PointerButton,
        _config: &InteractionConfig,
    ) -> ToolResponse {
        if button != PointerButton::Primary {
            return ToolResponse::Ignored;
        }
        let Some(target) = world.origin().hit_test(point) else {
            return ToolResponse::Ignored;
        };

        match self.source {
            // Pressing the source again deselects it
            Some(source) if source == target => {
                self.source = None;
                ToolResponse::Pending
            }
            Some(source) if world.origin().contains(source) => {
                match world.edit(|o| o.connect(source, target)) {
                    Ok(()) => {
                        self.source = None;
                        ToolResponse::Committed(OriginDelta::Connected(Connection::new(
                            source, target,
                        )))
                    }
                    // Source stays selected so the user can pick another target
                    Err(e) => ToolResponse::Rejected(e),
                }
            }
            _ => {
                self.source = Some(target);
                ToolResponse::Pending
            }
        }
    }

    fn cancel(&mut self, _world: &mut World) {
        self.source = None;
    }
}
