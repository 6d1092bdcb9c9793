pub mod clients;
pub mod config;
pub mod encoding;
pub mod models;
pub mod service;
pub mod submission;
pub mod tasks;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use config::WizardConfig;
pub use models::*;
pub use service::{AppState, build_router};
pub use submission::SubmissionServices;
pub use workflow::{build_wizard_graph, create_flow_runner, create_wizard_session, wizard_view};
