//! Scripted scenarios: drive a session with recorded input and check the result

mod definition;
mod executor;
mod results;
mod verification;

pub use definition::{ScenarioAction, ScenarioDefinition};
pub use executor::ScenarioExecutor;
pub use results::ExecutionReport;
pub use verification::{VerificationCondition, VerificationResult};
