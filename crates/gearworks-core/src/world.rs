//! World - origin plus its derived projection, and the tick integrator

use std::f32::consts::TAU;

use crate::config::PhysicsConfig;
use crate::derive::{Derived, derive_world};
use crate::error::SimResult;
use crate::origin::{EntityKind, Origin};

/// The simulated world: authored origin state and the projection derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    origin: Origin,
    derived: Derived,
}

impl Default for World {
    fn default() -> Self {
        Self::new(Origin::default())
    }
}

impl World {
    /// Wrap an origin store, deriving its state immediately
    pub fn new(origin: Origin) -> Self {
        let derived = derive_world(&origin);
        Self { origin, derived }
    }

    pub fn empty(physics: PhysicsConfig) -> Self {
        Self::new(Origin::new(physics))
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn derived(&self) -> &Derived {
        &self.derived
    }

    pub fn into_origin(self) -> Origin {
        self.origin
    }

    /// Commit an edit against the origin store.
    ///
    /// The edit is all-or-nothing: if `f` fails after earlier operations
    /// succeeded, origin is rolled back. Derived state is recomputed whenever
    /// the committed edit changed anything.
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut Origin) -> SimResult<T>) -> SimResult<T> {
        let snapshot = self.origin.clone();
        match f(&mut self.origin) {
            Ok(value) => {
                if !self.derived.is_current(&self.origin) {
                    self.rederive();
                }
                Ok(value)
            }
            Err(err) => {
                if self.origin.revision() != snapshot.revision() {
                    log::debug!("Rolling back partial edit: {}", err);
                    self.origin = snapshot;
                }
                Err(err)
            }
        }
    }

    /// Recompute derived state from the current origin
    pub fn rederive(&mut self) {
        self.derived = derive_world(&self.origin);
    }

    /// Advance the world by `elapsed` seconds.
    ///
    /// Belt items move by `velocity * elapsed`, clamped into [0, 1]. Gear
    /// phases advance by `w * elapsed`. Zero elapsed time changes nothing.
    pub fn tick(&mut self, elapsed: f32) {
        if !elapsed.is_finite() || elapsed < 0.0 {
            log::warn!("Ignoring tick with invalid elapsed time {}", elapsed);
            return;
        }
        if !self.derived.is_current(&self.origin) {
            log::debug!("Derived state stale before tick, rederiving");
            self.rederive();
        }
        if elapsed == 0.0 {
            return;
        }

        integrate(&mut self.origin, &self.derived, elapsed);
        self.rederive();
    }
}

/// Pure-style tick: consume a world and return the advanced one
pub fn tick_world(mut world: World, elapsed: f32) -> World {
    world.tick(elapsed);
    world
}

fn integrate(origin: &mut Origin, derived: &Derived, elapsed: f32) {
    for entity in origin.iter_mut() {
        let id = entity.id;
        match &mut entity.kind {
            EntityKind::Gear(gear) => {
                let w = derived.gear(id).map_or(0.0, |s| s.angular_velocity);
                gear.angle = (gear.angle + w * elapsed).rem_euclid(TAU);
            }
            EntityKind::Belt(belt) => {
                let v = derived.belt(id).map_or(0.0, |s| s.velocity);
                for item in &mut belt.items {
                    item.position = (item.position + v * elapsed).clamp(0.0, 1.0);
                }
            }
        }
    }
    origin.touch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn belt_world(velocity: f32, item: f32) -> (World, crate::origin::EntityId) {
        let mut world = World::default();
        let belt = world
            .edit(|o| {
                let a = o.insert_gear(Vec2::ZERO, 1.0, 1.0)?;
                let b = o.insert_gear(Vec2::new(5.0, 0.0), 1.0, 1.0)?;
                let belt = o.insert_belt(vec![a, b], velocity)?;
                o.add_belt_item(belt, item)?;
                Ok(belt)
            })
            .unwrap();
        (world, belt)
    }

    fn item_position(world: &World, belt: crate::origin::EntityId) -> f32 {
        world.origin().belt(belt).unwrap().items[0].position
    }

    #[test]
    fn test_tick_zero_is_identity() {
        let (world, _) = belt_world(0.3, 0.5);
        let ticked = tick_world(world.clone(), 0.0);
        assert_eq!(ticked, world);
    }

    #[test]
    fn test_tick_clamps_at_end() {
        let (mut world, belt) = belt_world(0.1, 0.98);
        world.tick(1.0);
        assert_eq!(item_position(&world, belt), 1.0);
    }

    #[test]
    fn test_tick_clamps_at_start() {
        let (mut world, belt) = belt_world(-0.5, 0.1);
        world.tick(1.0);
        assert_eq!(item_position(&world, belt), 0.0);
    }

    #[test]
    fn test_tick_is_linear() {
        let (world, belt) = belt_world(0.1, 0.2);
        let once = tick_world(world.clone(), 2.0);
        let twice = tick_world(tick_world(world, 1.0), 1.0);
        assert!((item_position(&once, belt) - item_position(&twice, belt)).abs() < 1e-6);
        assert!((item_position(&once, belt) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_tick_ignores_negative_elapsed() {
        let (mut world, belt) = belt_world(0.1, 0.5);
        let before = world.clone();
        world.tick(-1.0);
        world.tick(f32::NAN);
        assert_eq!(world, before);
        assert_eq!(item_position(&world, belt), 0.5);
    }

    #[test]
    fn test_tick_advances_gear_phase() {
        let mut world = World::default();
        let gear = world
            .edit(|o| {
                let g = o.insert_gear(Vec2::ZERO, 1.0, 1.0)?;
                o.set_anchored(g, true, 1.0)?;
                Ok(g)
            })
            .unwrap();
        world.tick(0.5);
        let (_, state) = world.origin().gear(gear).unwrap();
        assert!((state.angle - 0.5).abs() < 1e-6);
        assert!(world.derived().is_current(world.origin()));
    }

    #[test]
    fn test_failed_edit_keeps_world() {
        let (mut world, _) = belt_world(0.1, 0.5);
        let before = world.clone();
        let result = world.edit(|o| o.insert_gear(Vec2::ZERO, -1.0, 1.0));
        assert!(result.is_err());
        assert_eq!(world, before);
    }

    #[test]
    fn test_partial_edit_rolls_back() {
        let (mut world, _) = belt_world(0.1, 0.5);
        let before = world.clone();
        let result = world.edit(|o| {
            o.insert_gear(Vec2::new(20.0, 0.0), 1.0, 1.0)?;
            o.insert_gear(Vec2::new(30.0, 0.0), 0.0, 1.0)
        });
        assert!(result.is_err());
        assert_eq!(world, before);
    }
}
