//! World and camera documents (RON)
//!
//! Documents are strict: unknown fields are rejected by serde, and a loaded
//! world is validated as a whole before any of it is accepted.

use anyhow::{Context, Result};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::camera::Camera;
use crate::config::PhysicsConfig;
use crate::error::{SimError, SimResult};
use crate::origin::{Entity, Origin};

/// Current world document format version
pub const WORLD_VERSION: u32 = 1;

/// Serialized origin store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDocument {
    pub version: u32,
    /// Next id the store will allocate
    pub next_id: u64,
    pub entities: Vec<Entity>,
}

/// Persisted camera state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraDocument {
    pub position: Vec2,
    pub zoom: f32,
}

impl CameraDocument {
    fn validate(&self) -> SimResult<()> {
        if !self.position.is_finite() {
            return Err(SimError::SchemaViolation(
                "camera position must be finite".into(),
            ));
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(SimError::SchemaViolation(format!(
                "camera zoom must be positive, got {}",
                self.zoom
            )));
        }
        Ok(())
    }
}

impl From<&Camera> for CameraDocument {
    fn from(camera: &Camera) -> Self {
        Self {
            position: camera.position(),
            zoom: camera.zoom(),
        }
    }
}

impl Camera {
    /// Restore position and zoom from a document (zoom is clamped to range)
    pub fn apply_document(&mut self, doc: &CameraDocument) -> SimResult<()> {
        doc.validate()?;
        self.set_position(doc.position);
        self.set_zoom(doc.zoom);
        Ok(())
    }
}

impl Origin {
    /// Build a store from a document, rejecting it wholesale on any violation
    pub fn from_document(doc: WorldDocument, physics: PhysicsConfig) -> SimResult<Self> {
        if doc.version != WORLD_VERSION {
            return Err(SimError::SchemaViolation(format!(
                "unsupported world version {} (expected {})",
                doc.version, WORLD_VERSION
            )));
        }
        Origin::from_parts(doc.entities, doc.next_id, physics)
    }

    pub fn to_document(&self) -> WorldDocument {
        WorldDocument {
            version: WORLD_VERSION,
            next_id: self.next_id(),
            entities: self.iter().cloned().collect(),
        }
    }
}

fn to_ron<T: Serialize>(value: &T) -> SimResult<String> {
    ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .map_err(|e| SimError::SchemaViolation(e.to_string()))
}

pub fn world_from_ron(text: &str, physics: PhysicsConfig) -> SimResult<Origin> {
    let doc: WorldDocument = ron::from_str(text)?;
    Origin::from_document(doc, physics)
}

pub fn world_to_ron(origin: &Origin) -> SimResult<String> {
    to_ron(&origin.to_document())
}

pub fn camera_from_ron(text: &str) -> SimResult<CameraDocument> {
    let doc: CameraDocument = ron::from_str(text)?;
    doc.validate()?;
    Ok(doc)
}

pub fn camera_to_ron(doc: &CameraDocument) -> SimResult<String> {
    to_ron(doc)
}

/// Load and validate a world document from disk
pub fn load_world_file(path: &Path, physics: PhysicsConfig) -> Result<Origin> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read world file {}", path.display()))?;
    let origin = world_from_ron(&text, physics)
        .with_context(|| format!("Failed to load world from {}", path.display()))?;
    log::info!(
        "Loaded {} entities from {}",
        origin.len(),
        path.display()
    );
    Ok(origin)
}

pub fn save_world_file(path: &Path, origin: &Origin) -> Result<()> {
    let text = world_to_ron(origin).context("Failed to serialize world")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write world file {}", path.display()))?;
    log::info!("Saved {} entities to {}", origin.len(), path.display());
    Ok(())
}
