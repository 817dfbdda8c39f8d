//! hn-scenario: declarative scenario files for heatnet networks.
//!
//! A scenario lists materials, blocks, fluxes, solver settings and named
//! batch cases. Files are read and written as YAML or JSON, validated on
//! both paths, and assembled into a [`hn_solver::Problem`] with
//! [`build_problem`].

pub mod build;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use build::{
    apply_case, build_problem, case_scenario, material_registry, sim_options, steady_options,
};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_scenario};

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown case: {name}")]
    UnknownCase { name: String },

    #[error("Material error: {0}")]
    Material(#[from] hn_materials::MaterialError),

    #[error("Network error: {0}")]
    Graph(#[from] hn_graph::GraphError),

    #[error("Problem error: {0}")]
    Solver(#[from] hn_solver::SolverError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &Path) -> ScenarioResult<Scenario> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}

pub fn load_yaml(path: &Path) -> ScenarioResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_yaml::from_str(&content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn save_yaml(path: &Path, scenario: &Scenario) -> ScenarioResult<()> {
    validate_scenario(scenario)?;
    let content = serde_yaml::to_string(scenario)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ScenarioResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn save_json(path: &Path, scenario: &Scenario) -> ScenarioResult<()> {
    validate_scenario(scenario)?;
    let content = serde_json::to_string_pretty(scenario)?;
    std::fs::write(path, content)?;
    Ok(())
}
