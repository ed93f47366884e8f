//! Verification conditions checked against a session after a scenario

use gearworks_core::{EntityId, PointerMode, Session, Validity};
use serde::{Deserialize, Serialize};

/// Conditions that can be verified against session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerificationCondition {
    /// Derived angular velocity of a gear (rad/s)
    GearVelocity {
        gear: u64,
        expected: f32,
        tolerance: f32,
    },

    TotalEnergyAtLeast { energy: f32 },

    /// Active pointer mode
    Mode { mode: PointerMode },

    /// Number of entities in origin
    EntityCount { count: usize },

    /// Number of mesh connections in origin
    ConnectionCount { count: usize },

    /// The gear's component is flagged inconsistent
    ComponentInconsistent { gear: u64 },
}

/// Result of a verification check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub message: String,
    pub actual_value: Option<String>,
}

impl VerificationResult {
    fn check(passed: bool, message: String, actual: impl ToString) -> Self {
        Self {
            passed,
            message,
            actual_value: Some(actual.to_string()),
        }
    }

    fn missing(gear: EntityId) -> Self {
        Self {
            passed: false,
            message: format!("{} does not exist", gear),
            actual_value: None,
        }
    }
}

impl VerificationCondition {
    /// Evaluate condition against session state
    pub fn evaluate(&self, session: &Session) -> VerificationResult {
        let world = session.world();
        let derived = world.derived();

        match self {
            VerificationCondition::GearVelocity {
                gear,
                expected,
                tolerance,
            } => {
                let id = EntityId::from_raw(*gear);
                let Some(state) = derived.gear(id) else {
                    return VerificationResult::missing(id);
                };
                let actual = state.angular_velocity;
                VerificationResult::check(
                    (actual - expected).abs() <= *tolerance,
                    format!(
                        "{} velocity: expected {}±{}, got {}",
                        id, expected, tolerance, actual
                    ),
                    actual,
                )
            }

            VerificationCondition::TotalEnergyAtLeast { energy } => {
                let actual = derived.total_energy();
                VerificationResult::check(
                    actual >= *energy,
                    format!("Total energy: expected at least {}, got {}", energy, actual),
                    actual,
                )
            }

            VerificationCondition::Mode { mode } => {
                let actual = session.interaction().mode();
                VerificationResult::check(
                    actual == *mode,
                    format!("Pointer mode: expected {}, got {}", mode, actual),
                    actual,
                )
            }

            VerificationCondition::EntityCount { count } => {
                let actual = world.origin().len();
                VerificationResult::check(
                    actual == *count,
                    format!("Entity count: expected {}, got {}", count, actual),
                    actual,
                )
            }

            VerificationCondition::ConnectionCount { count } => {
                let actual = world.origin().connections().count();
                VerificationResult::check(
                    actual == *count,
                    format!("Connection count: expected {}, got {}", count, actual),
                    actual,
                )
            }

            VerificationCondition::ComponentInconsistent { gear } => {
                let id = EntityId::from_raw(*gear);
                let Some(state) = derived.gear(id) else {
                    return VerificationResult::missing(id);
                };
                let validity = derived.components()[state.component].validity;
                VerificationResult::check(
                    validity == Validity::Inconsistent,
                    format!("{} component: expected inconsistent, got {:?}", id, validity),
                    format!("{:?}", validity),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearworks_core::config::SimConfig;
    use gearworks_core::levels::find_level;
    use glam::Vec2;

    fn session(level: &str) -> Session {
        let config = SimConfig::default();
        let world = find_level(level)
            .unwrap()
            .build(config.physics.clone())
            .unwrap();
        Session::new(world, Vec2::new(800.0, 600.0), config)
    }

    #[test]
    fn test_gear_velocity() {
        let session = session("gear_train");
        let pass = VerificationCondition::GearVelocity {
            gear: 2,
            expected: -1.0,
            tolerance: 1e-4,
        };
        assert!(pass.evaluate(&session).passed);

        let missing = VerificationCondition::GearVelocity {
            gear: 99,
            expected: 0.0,
            tolerance: 1.0,
        };
        let result = missing.evaluate(&session);
        assert!(!result.passed);
        assert!(result.actual_value.is_none());
    }

    #[test]
    fn test_inconsistent_component() {
        let session = session("jammed_triangle");
        let condition = VerificationCondition::ComponentInconsistent { gear: 2 };
        assert!(condition.evaluate(&session).passed);

        let energy = VerificationCondition::TotalEnergyAtLeast { energy: 0.1 };
        assert!(!energy.evaluate(&session).passed);
    }

    #[test]
    fn test_counts_and_mode() {
        let session = session("gear_train");
        assert!(
            VerificationCondition::EntityCount { count: 3 }
                .evaluate(&session)
                .passed
        );
        assert!(
            VerificationCondition::ConnectionCount { count: 2 }
                .evaluate(&session)
                .passed
        );
        assert!(
            VerificationCondition::Mode {
                mode: PointerMode::Free
            }
            .evaluate(&session)
            .passed
        );
    }
}
