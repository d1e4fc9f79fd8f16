//! DeploymentOrchestrator.

mod orchestrator;
mod target;

pub use orchestrator::{DeployStep, DeployedContract, Deployment, DeploymentOrchestrator};
pub use target::DeployTarget;

#[cfg(test)]
mod tests;
