//! Demo level generators

use glam::Vec2;

use crate::error::SimResult;
use crate::origin::Origin;

pub fn generate_empty(_origin: &mut Origin) -> SimResult<()> {
    Ok(())
}

/// Motor (r=1, 2 rad/s) -> r=2 -> r=1, in a row
pub fn generate_gear_train(origin: &mut Origin) -> SimResult<()> {
    let motor = origin.insert_gear(Vec2::ZERO, 1.0, 1.0)?;
    origin.set_anchored(motor, true, 2.0)?;
    let large = origin.insert_gear(Vec2::new(3.0, 0.0), 2.0, 2.0)?;
    let small = origin.insert_gear(Vec2::new(6.0, 0.0), 1.0, 1.0)?;
    origin.connect(motor, large)?;
    origin.connect(large, small)?;
    Ok(())
}

/// Motor pulley belted to a free pulley, with a small gear meshed below the motor
pub fn generate_belt_drive(origin: &mut Origin) -> SimResult<()> {
    let motor = origin.insert_gear(Vec2::ZERO, 1.0, 1.0)?;
    origin.set_anchored(motor, true, 0.5)?;
    let pulley = origin.insert_gear(Vec2::new(8.0, 0.0), 1.0, 1.0)?;
    let follower = origin.insert_gear(Vec2::new(0.0, -1.5), 0.5, 0.5)?;
    origin.connect(motor, follower)?;

    let belt = origin.insert_belt(vec![motor, pulley], 0.0)?;
    for position in [0.0, 0.25, 0.5] {
        origin.add_belt_item(belt, position)?;
    }
    Ok(())
}

/// Three equal gears meshed pairwise: an odd cycle
pub fn generate_jammed_triangle(origin: &mut Origin) -> SimResult<()> {
    let height = 3.0_f32.sqrt();
    let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0)?;
    let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0)?;
    let c = origin.insert_gear(Vec2::new(1.0, height), 1.0, 1.0)?;
    origin.set_anchored(a, true, 1.0)?;
    origin.connect(a, b)?;
    origin.connect(b, c)?;
    origin.connect(c, a)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{Validity, derive_world};
    use crate::origin::EntityId;

    #[test]
    fn test_gear_train_speeds() {
        let mut origin = Origin::default();
        generate_gear_train(&mut origin).unwrap();
        let derived = derive_world(&origin);

        let w = |raw| derived.gear(EntityId::from_raw(raw)).unwrap().angular_velocity;
        assert_eq!(w(1), 2.0);
        assert_eq!(w(2), -1.0);
        assert_eq!(w(3), 2.0);
    }

    #[test]
    fn test_jammed_triangle_is_inconsistent() {
        let mut origin = Origin::default();
        generate_jammed_triangle(&mut origin).unwrap();
        let derived = derive_world(&origin);
        assert!(!derived.is_consistent());
        assert_eq!(
            derived.gear(EntityId::from_raw(1)).unwrap().validity,
            Validity::Inconsistent
        );
    }

    #[test]
    fn test_belt_drive_moves_items() {
        let mut origin = Origin::default();
        generate_belt_drive(&mut origin).unwrap();
        let derived = derive_world(&origin);
        let (belt, _) = origin.belts().next().unwrap();
        assert_eq!(derived.belt(belt).unwrap().velocity, 0.5);
    }
}
