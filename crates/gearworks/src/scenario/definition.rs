//! Scenario definition and RON file loading

use anyhow::{Context, Result};
use gearworks_core::InputEvent;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::verification::VerificationCondition;

fn default_level() -> String {
    "empty".to_string()
}

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioAction {
    /// Feed an input event to the session
    Input(InputEvent),
    /// Advance `seconds` of simulated time in `steps` equal ticks
    Tick { seconds: f32, steps: usize },
    Log { message: String },
}

/// Top-level scenario definition loaded from RON files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Demo level the session starts from
    #[serde(default = "default_level")]
    pub level: String,

    pub actions: Vec<ScenarioAction>,

    /// Checks run after every action completed
    #[serde(default)]
    pub verify: Vec<VerificationCondition>,
}

impl ScenarioDefinition {
    /// Load scenario from RON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

        let scenario = ron::from_str(&content)
            .with_context(|| format!("Failed to parse RON scenario: {}", path.display()))?;

        Ok(scenario)
    }
}
