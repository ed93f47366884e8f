//! Scenario execution engine

use anyhow::{Result, anyhow};
use gearworks_core::config::SimConfig;
use gearworks_core::levels::find_level;
use gearworks_core::{Session, World};
use glam::Vec2;
use std::time::Instant;

use super::definition::{ScenarioAction, ScenarioDefinition};
use super::results::ExecutionReport;

/// Executes scenario actions against a fresh session
pub struct ScenarioExecutor {
    config: SimConfig,
    /// Viewport of the simulated screen
    viewport: Vec2,
    verbose: bool,
    log: Vec<String>,
    ticks: usize,
    simulated: f32,
    rejected: usize,
}

impl ScenarioExecutor {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            viewport: Vec2::new(800.0, 600.0),
            verbose: false,
            log: Vec::new(),
            ticks: 0,
            simulated: 0.0,
            rejected: 0,
        }
    }

    pub fn with_viewport(mut self, viewport: Vec2) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Execute a complete scenario, returning the report and the final world
    pub fn execute_scenario(
        &mut self,
        scenario: &ScenarioDefinition,
    ) -> Result<(ExecutionReport, World)> {
        let start_time = Instant::now();
        let mut report = ExecutionReport::new(scenario.name.clone());

        self.log.clear();
        self.ticks = 0;
        self.simulated = 0.0;
        self.rejected = 0;

        self.log(&format!("Starting scenario: {}", scenario.name));
        if !scenario.description.is_empty() {
            self.log(&format!("Description: {}", scenario.description));
        }

        let level = find_level(&scenario.level)
            .ok_or_else(|| anyhow!("Unknown level '{}'", scenario.level))?;
        let world = level.build(self.config.physics.clone())?;
        let mut session = Session::new(world, self.viewport, self.config.clone());

        self.log(&format!("Running {} actions", scenario.actions.len()));
        for (idx, action) in scenario.actions.iter().enumerate() {
            if let Err(e) = self.execute_action(action, &mut session) {
                let msg = format!("Action {} failed: {}", idx, e);
                self.log(&msg);
                report.log = self.log.clone();
                return Err(anyhow!(msg));
            }
        }
        report.actions_executed = scenario.actions.len();

        if !scenario.verify.is_empty() {
            self.log(&format!("Running {} verifications", scenario.verify.len()));
            for condition in &scenario.verify {
                let result = condition.evaluate(&session);
                self.log(&format!(
                    "  {} {}",
                    if result.passed { "✓" } else { "✗" },
                    result.message
                ));
                if !result.passed {
                    report.verification_failures.push(result);
                }
            }
        }

        let (world, _) = session.end();

        report.ticks_executed = self.ticks;
        report.simulated_seconds = self.simulated;
        report.rejected_inputs = self.rejected;
        report.passed = report.success();
        report.duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        self.log(&format!("Scenario complete: {}", report.summary()));
        report.log = self.log.clone();

        Ok((report, world))
    }

    fn execute_action(&mut self, action: &ScenarioAction, session: &mut Session) -> Result<()> {
        if self.verbose {
            self.log(&format!("Executing: {:?}", action));
        }

        match action {
            ScenarioAction::Input(event) => {
                let outcome = session.handle_input(event);
                if let Some(err) = outcome.rejected {
                    self.rejected += 1;
                    self.log(&format!("Input rejected: {}", err));
                }
            }
            ScenarioAction::Tick { seconds, steps } => {
                if *steps == 0 || !seconds.is_finite() || *seconds < 0.0 {
                    return Err(anyhow!(
                        "Tick needs a non-negative duration and at least one step"
                    ));
                }
                let dt = seconds / *steps as f32;
                for _ in 0..*steps {
                    session.tick(dt);
                }
                self.ticks += steps;
                self.simulated += seconds;
            }
            ScenarioAction::Log { message } => self.log(message),
        }
        Ok(())
    }

    fn log(&mut self, message: &str) {
        log::info!("[SCENARIO] {}", message);
        self.log.push(message.to_string());
    }
}
