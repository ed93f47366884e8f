//! Interaction state machine

use glam::Vec2;

use super::tools::{Connector, ForceGrip, GearPlacer, Preview, Tool, ToolResponse};
use super::{InputEvent, OriginDelta, PointerButton, PointerMode};
use crate::camera::Camera;
use crate::config::{InteractionConfig, SimConfig};
use crate::error::SimError;
use crate::origin::EntityId;
use crate::world::World;

/// Result of handling one input event
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Mode after the event
    pub mode: PointerMode,
    /// Origin edit the event committed, if any
    pub delta: Option<OriginDelta>,
    pub camera_changed: bool,
    /// Edit that was attempted and discarded
    pub rejected: Option<SimError>,
}

impl Outcome {
    fn new(mode: PointerMode) -> Self {
        Self {
            mode,
            delta: None,
            camera_changed: false,
            rejected: None,
        }
    }
}

/// Camera drag in progress
#[derive(Debug, Clone, Copy)]
struct Pan {
    last: Vec2,
    button: PointerButton,
}

/// Editing state: the active mode, its tool and any camera drag
#[derive(Debug)]
pub struct Interaction {
    mode: PointerMode,
    sticky: bool,
    placer: GearPlacer,
    connector: Connector,
    grip: ForceGrip,
    pan: Option<Pan>,
    config: InteractionConfig,
    zoom_speed: f32,
}

impl Interaction {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            mode: PointerMode::Free,
            sticky: false,
            placer: GearPlacer::new(),
            connector: Connector::new(),
            grip: ForceGrip::new(),
            pan: None,
            config: config.interaction.clone(),
            zoom_speed: config.camera.zoom_speed,
        }
    }

    pub fn mode(&self) -> PointerMode {
        self.mode
    }

    /// Whether AddGear stays active after each placement
    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    /// Candidate gear while a placement is in progress
    pub fn preview(&self) -> Option<&Preview> {
        self.placer.preview()
    }

    /// Source gear selected in Connect mode
    pub fn connect_source(&self) -> Option<EntityId> {
        self.connector.source()
    }

    /// Gear currently held by ApplyForce
    pub fn held_gear(&self) -> Option<EntityId> {
        self.grip.held()
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    /// Handle one input event to completion
    pub fn handle(&mut self, event: &InputEvent, world: &mut World, camera: &mut Camera) -> Outcome {
        match *event {
            InputEvent::SelectMode { mode, sticky } => self.select(mode, sticky, world),
            InputEvent::KeyUp { key } => self.key_up(key, world),
            InputEvent::Wheel { screen, delta } => {
                let before = (camera.position(), camera.zoom());
                camera.zoom_at(screen, self.zoom_speed.powf(delta));
                let mut outcome = Outcome::new(self.mode);
                outcome.camera_changed = before != (camera.position(), camera.zoom());
                outcome
            }
            InputEvent::PointerDown { screen, button } => {
                let point = camera.screen_to_world(screen);
                if self.starts_pan(button, point, world) {
                    self.pan = Some(Pan { last: screen, button });
                    return Outcome::new(self.mode);
                }
                let response = self.dispatch(|tool, config| {
                    tool.pointer_down(world, point, button, config)
                });
                self.settle(response)
            }
            InputEvent::PointerMove { screen } => {
                if let Some(pan) = self.pan.as_mut() {
                    let delta = screen - pan.last;
                    pan.last = screen;
                    camera.pan(delta);
                    let mut outcome = Outcome::new(self.mode);
                    outcome.camera_changed = delta != Vec2::ZERO;
                    return outcome;
                }
                let point = camera.screen_to_world(screen);
                let response = self.dispatch(|tool, config| tool.pointer_move(world, point, config));
                self.settle(response)
            }
            InputEvent::PointerUp { screen, button } => {
                if self.pan.is_some_and(|pan| pan.button == button) {
                    self.pan = None;
                    return Outcome::new(self.mode);
                }
                let point = camera.screen_to_world(screen);
                let response = self.dispatch(|tool, config| {
                    tool.pointer_up(world, point, button, config)
                });
                self.settle(response)
            }
        }
    }

    fn key_up(&mut self, key: char, world: &mut World) -> Outcome {
        let keys = &self.config.keys;
        let (mode, sticky) = if key == keys.cancel {
            (PointerMode::Free, false)
        } else if key == keys.add_gear {
            (PointerMode::AddGear, false)
        } else if key == keys.sticky_add_gear {
            (PointerMode::AddGear, true)
        } else if key == keys.connect {
            (PointerMode::Connect, false)
        } else if key == keys.apply_force {
            (PointerMode::ApplyForce, false)
        } else {
            return Outcome::new(self.mode);
        };
        self.select(mode, sticky, world)
    }

    /// Switch mode, discarding every tool's in-progress state
    fn select(&mut self, mode: PointerMode, sticky: bool, world: &mut World) -> Outcome {
        self.placer.cancel(world);
        self.connector.cancel(world);
        self.grip.cancel(world);

        if self.mode != mode {
            log::debug!("Pointer mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.sticky = sticky && mode == PointerMode::AddGear;
        Outcome::new(mode)
    }

    fn starts_pan(&self, button: PointerButton, point: Vec2, world: &World) -> bool {
        match button {
            PointerButton::Middle => true,
            PointerButton::Secondary => self.mode != PointerMode::ApplyForce,
            PointerButton::Primary => {
                self.mode == PointerMode::Free && world.origin().hit_test(point).is_none()
            }
        }
    }

    fn dispatch(
        &mut self,
        f: impl FnOnce(&mut dyn Tool, &InteractionConfig) -> ToolResponse,
    ) -> ToolResponse {
        let Self {
            mode,
            placer,
            connector,
            grip,
            config,
            ..
        } = self;
        let tool: &mut dyn Tool = match mode {
            PointerMode::Free => return ToolResponse::Ignored,
            PointerMode::AddGear => placer,
            PointerMode::Connect => connector,
            PointerMode::ApplyForce => grip,
        };
        f(tool, config)
    }

    fn settle(&mut self, response: ToolResponse) -> Outcome {
        let mut outcome = Outcome::new(self.mode);
        match response {
            ToolResponse::Committed(delta) => {
                log::debug!("Committed {:?} in {} mode", delta, self.mode);
                let finished = match self.mode {
                    PointerMode::AddGear => !self.sticky,
                    PointerMode::Connect => true,
                    PointerMode::Free | PointerMode::ApplyForce => false,
                };
                if finished {
                    self.mode = PointerMode::Free;
                }
                outcome.mode = self.mode;
                outcome.delta = Some(delta);
            }
            ToolResponse::Rejected(err) => {
                log::info!("Discarded {} edit: {}", self.mode, err);
                outcome.rejected = Some(err);
            }
            ToolResponse::Ignored | ToolResponse::Pending => {}
        }
        outcome
    }
}
