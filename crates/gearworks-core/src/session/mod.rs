//! Editing session - owns the world, camera and interaction for one timeline
//!
//! Every call runs to completion on the caller's thread. Input is turned into
//! origin edits (re-derived before returning) and the resulting changes are
//! published on the session's event bus.

mod events;
mod throttle;

pub use events::{EventBus, SessionEvent, Subscription};
pub use throttle::CameraSaveThrottle;

use glam::Vec2;
use web_time::Instant;

use crate::camera::Camera;
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::interaction::{InputEvent, Interaction, Outcome};
use crate::origin::Origin;
use crate::scene::{SceneDescription, emit_scene_with_overlay};
use crate::schema::CameraDocument;
use crate::world::World;

pub struct Session {
    world: World,
    camera: Camera,
    interaction: Interaction,
    config: SimConfig,
    throttle: CameraSaveThrottle,
    events: EventBus,
}

impl Session {
    pub fn new(world: World, viewport: Vec2, config: SimConfig) -> Self {
        log::info!(
            "Session started with {} entities, viewport {}x{}",
            world.origin().len(),
            viewport.x,
            viewport.y
        );
        Self {
            camera: Camera::new(viewport, &config.camera),
            interaction: Interaction::new(&config),
            throttle: CameraSaveThrottle::new(config.persistence.camera_save_interval()),
            events: EventBus::new(),
            world,
            config,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn subscribe(&self, listener: impl FnMut(&SessionEvent) + 'static) -> Subscription {
        self.events.subscribe(listener)
    }

    /// Feed one input event through the interaction state machine
    pub fn handle_input(&mut self, event: &InputEvent) -> Outcome {
        let revision = self.world.origin().revision();
        let mode = self.interaction.mode();

        let outcome = self
            .interaction
            .handle(event, &mut self.world, &mut self.camera);

        self.publish_origin_change(revision);
        if outcome.mode != mode {
            self.events.publish(&SessionEvent::ModeChanged { mode: outcome.mode });
        }
        if outcome.camera_changed {
            self.camera_moved();
        }
        outcome
    }

    /// Commit a programmatic edit, as a host or scripted scenario would
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut Origin) -> SimResult<T>) -> SimResult<T> {
        let revision = self.world.origin().revision();
        let result = self.world.edit(f);
        self.publish_origin_change(revision);
        result
    }

    pub fn tick(&mut self, elapsed: f32) {
        self.world.tick(elapsed);
        self.events.publish(&SessionEvent::Ticked { elapsed });
        if let Some(camera) = self.throttle.poll(Instant::now()) {
            self.events
                .publish(&SessionEvent::CameraSaveRequested { camera });
        }
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        let before = self.camera.viewport();
        self.camera.set_viewport(viewport);
        if self.camera.viewport() != before {
            self.camera_moved();
        }
    }

    /// Restore a persisted camera
    pub fn restore_camera(&mut self, doc: &CameraDocument) -> SimResult<()> {
        self.camera.apply_document(doc)?;
        self.events.publish(&SessionEvent::CameraChanged {
            camera: CameraDocument::from(&self.camera),
        });
        Ok(())
    }

    /// Scene for the current world, including the editing overlay
    pub fn scene(&self) -> SceneDescription {
        emit_scene_with_overlay(&self.world, &self.camera, &self.interaction)
    }

    /// Tear down every subscription and return the camera document still
    /// waiting to be persisted, if any
    pub fn end(mut self) -> (World, Option<CameraDocument>) {
        self.events.close();
        let pending = self.throttle.flush();
        log::info!(
            "Session ended at revision {} (camera save pending: {})",
            self.world.origin().revision(),
            pending.is_some()
        );
        (self.world, pending)
    }

    fn publish_origin_change(&self, revision: u64) {
        let current = self.world.origin().revision();
        if current != revision {
            self.events
                .publish(&SessionEvent::OriginChanged { revision: current });
        }
    }

    fn camera_moved(&mut self) {
        let camera = CameraDocument::from(&self.camera);
        self.events.publish(&SessionEvent::CameraChanged { camera });
        if let Some(camera) = self.throttle.offer(&self.camera, Instant::now()) {
            self.events
                .publish(&SessionEvent::CameraSaveRequested { camera });
        }
    }
}
