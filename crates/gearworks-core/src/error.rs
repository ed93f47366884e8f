//! Error taxonomy for origin edits and document boundaries

use crate::origin::EntityId;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Entity kind names used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindName {
    Gear,
    Belt,
}

impl std::fmt::Display for KindName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KindName::Gear => write!(f, "gear"),
            KindName::Belt => write!(f, "belt"),
        }
    }
}

/// Why a mesh connection was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionFault {
    /// Both endpoints are the same gear
    SelfConnection,
    /// One of the endpoints is not a gear
    NotAGear,
    /// The pair is already meshed
    AlreadyConnected,
    /// Centre distance does not match the sum of the radii
    NotTangent { distance: f32, expected: f32 },
}

impl std::fmt::Display for ConnectionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionFault::SelfConnection => write!(f, "a gear cannot mesh with itself"),
            ConnectionFault::NotAGear => write!(f, "only gears can mesh"),
            ConnectionFault::AlreadyConnected => write!(f, "gears are already meshed"),
            ConnectionFault::NotTangent { distance, expected } => write!(
                f,
                "centre distance {:.4} does not match radius sum {:.4}",
                distance, expected
            ),
        }
    }
}

/// Errors raised by entity store operations and schema loading
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// The operation referenced an entity id that does not exist
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// The entity exists but has the wrong kind for the operation
    #[error("{id} is not a {expected}")]
    KindMismatch { id: EntityId, expected: KindName },

    /// Geometric or graph constraint violated on connect
    #[error("invalid connection {a} <-> {b}: {reason}")]
    InvalidConnection {
        a: EntityId,
        b: EntityId,
        reason: ConnectionFault,
    },

    /// Entity payload failed validation (radius, mass, pulleys)
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// A gear placement would penetrate an existing gear
    #[error("placement overlaps {with}")]
    PlacementOverlap { with: EntityId },

    /// Malformed world or camera document at a boundary
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl From<ron::error::SpannedError> for SimError {
    fn from(err: ron::error::SpannedError) -> Self {
        SimError::SchemaViolation(err.to_string())
    }
}
