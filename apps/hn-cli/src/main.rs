mod report;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use hn_materials::MaterialRegistry;
use hn_scenario::{
    Scenario, ScenarioError, TransientDef, build_problem, case_scenario, sim_options,
    steady_options,
};
use hn_sim::{IntegratorType, SimError, solve_transient};
use hn_solver::{
    Problem, Propagation, SensitivityOptions, SolverError, solve_steady, source_row_sigma,
};
use nalgebra::DVector;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("{0}")]
    Scenario(#[from] ScenarioError),

    #[error("Steady solve failed: {0}")]
    Solver(#[from] SolverError),

    #[error("Transient solve failed: {0}")]
    Sim(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what}")]
    Usage { what: String },

    #[error("{failed} of {total} cases failed")]
    CasesFailed { failed: usize, total: usize },
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "heatnet")]
#[command(about = "heatnet - lumped thermal network solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file and check that it assembles
    Validate {
        /// Path to the scenario file (YAML, or JSON by extension)
        scenario: PathBuf,
    },
    /// Solve for the steady state
    Steady {
        scenario: PathBuf,
        /// Apply a named case before solving
        #[arg(long)]
        case: Option<String>,
        /// Time at which boundaries are driven
        #[arg(long)]
        time: Option<f64>,
        /// Output CSV file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Integrate through time
    Transient {
        scenario: PathBuf,
        #[arg(long)]
        case: Option<String>,
        /// Start time; overrides the scenario
        #[arg(long)]
        t_start: Option<f64>,
        /// End time; overrides the scenario
        #[arg(long)]
        t_end: Option<f64>,
        /// Number of output times including both ends
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long, value_enum)]
        integrator: Option<IntegratorArg>,
        /// Largest step for fixed-step integrators
        #[arg(long)]
        dt: Option<f64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Steady solve followed by uncertainty propagation
    Sensitivity {
        scenario: PathBuf,
        #[arg(long)]
        case: Option<String>,
        /// Deviation applied to every block that carries a source
        #[arg(long, default_value_t = 0.1)]
        sigma: f64,
        #[arg(long, value_enum, default_value_t = PropagationArg::Correlated)]
        propagation: PropagationArg,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Steady solve of every case in parallel, one row per case
    Batch {
        scenario: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IntegratorArg {
    DormandPrince,
    Rk4,
    ForwardEuler,
}

impl From<IntegratorArg> for IntegratorType {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::DormandPrince => IntegratorType::DormandPrince,
            IntegratorArg::Rk4 => IntegratorType::RK4,
            IntegratorArg::ForwardEuler => IntegratorType::ForwardEuler,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PropagationArg {
    Correlated,
    Independent,
}

impl From<PropagationArg> for Propagation {
    fn from(arg: PropagationArg) -> Self {
        match arg {
            PropagationArg::Correlated => Propagation::Correlated,
            PropagationArg::Independent => Propagation::Independent,
        }
    }
}

fn main() -> CliResult<()> {
    // Logs go to stderr so CSV on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario } => cmd_validate(&scenario),
        Commands::Steady {
            scenario,
            case,
            time,
            output,
        } => cmd_steady(&scenario, case.as_deref(), time, output.as_deref()),
        Commands::Transient {
            scenario,
            case,
            t_start,
            t_end,
            samples,
            integrator,
            dt,
            output,
        } => cmd_transient(
            &scenario,
            case.as_deref(),
            TransientOverrides {
                t_start,
                t_end,
                samples,
                integrator,
                dt,
            },
            output.as_deref(),
        ),
        Commands::Sensitivity {
            scenario,
            case,
            sigma,
            propagation,
            output,
        } => cmd_sensitivity(
            &scenario,
            case.as_deref(),
            sigma,
            propagation.into(),
            output.as_deref(),
        ),
        Commands::Batch { scenario, output } => cmd_batch(&scenario, output.as_deref()),
    }
}

/// Scenario with `case` applied, if any.
fn load_scenario(path: &Path, case: Option<&str>) -> CliResult<Scenario> {
    let scenario = hn_scenario::load(path)?;
    Ok(match case {
        Some(name) => case_scenario(&scenario, name)?,
        None => scenario,
    })
}

fn build(scenario: &Scenario) -> CliResult<Problem> {
    Ok(build_problem(scenario, &MaterialRegistry::builtin())?)
}

fn emit(output: Option<&Path>, csv: &str, rows: usize) -> CliResult<()> {
    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            eprintln!("✓ Wrote {} rows to {}", rows, path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> CliResult<()> {
    eprintln!("Validating scenario: {}", path.display());
    let scenario = hn_scenario::load(path)?;
    let problem = build(&scenario)?;
    for case in &scenario.cases {
        build(&hn_scenario::apply_case(&scenario, case)?)?;
    }
    eprintln!("✓ Scenario is valid");
    eprintln!("  Blocks:   {}", scenario.blocks.len());
    eprintln!("  Fluxes:   {}", scenario.fluxes.len());
    eprintln!("  Unknowns: {}", problem.len());
    eprintln!("  Cases:    {}", scenario.cases.len());
    Ok(())
}

fn cmd_steady(
    path: &Path,
    case: Option<&str>,
    time: Option<f64>,
    output: Option<&Path>,
) -> CliResult<()> {
    let scenario = load_scenario(path, case)?;
    let mut problem = build(&scenario)?;
    let mut options = steady_options(&scenario);
    if time.is_some() {
        options.time = time;
    }
    let solution = solve_steady(&mut problem, &options)?;
    eprintln!(
        "✓ Converged in {} iterations (residual {:.3e})",
        solution.iterations, solution.residual_norm
    );
    let name = case.unwrap_or("base").to_string();
    let csv = report::state_table(&problem.labels(), &[(name, solution.x)]);
    emit(output, &csv, 1)
}

struct TransientOverrides {
    t_start: Option<f64>,
    t_end: Option<f64>,
    samples: Option<usize>,
    integrator: Option<IntegratorArg>,
    dt: Option<f64>,
}

impl TransientOverrides {
    fn apply(&self, base: Option<&TransientDef>) -> CliResult<TransientDef> {
        let mut def = match (base, self.t_end, self.samples) {
            (Some(def), _, _) => def.clone(),
            (None, Some(t_end), Some(samples)) => TransientDef {
                t_start: 0.0,
                t_end,
                samples,
                integrator: Default::default(),
                dt: None,
                rtol: None,
                atol: None,
            },
            (None, _, _) => {
                return Err(CliError::Usage {
                    what: "scenario has no transient section; pass --t-end and --samples"
                        .to_string(),
                });
            }
        };
        if let Some(t) = self.t_start {
            def.t_start = t;
        }
        if let Some(t) = self.t_end {
            def.t_end = t;
        }
        if let Some(n) = self.samples {
            def.samples = n;
        }
        if self.dt.is_some() {
            def.dt = self.dt;
        }
        Ok(def)
    }
}

fn cmd_transient(
    path: &Path,
    case: Option<&str>,
    overrides: TransientOverrides,
    output: Option<&Path>,
) -> CliResult<()> {
    let scenario = load_scenario(path, case)?;
    let transient = overrides.apply(scenario.transient.as_ref())?;
    let mut problem = build(&scenario)?;
    problem.set_time(transient.t_start);

    let mut options = sim_options(&transient);
    if let Some(integrator) = overrides.integrator {
        options.integrator = integrator.into();
    }
    let times = transient.output_times();
    info!(samples = times.len(), integrator = ?options.integrator, "starting transient");
    let trajectory = solve_transient(&mut problem, &times, &options)?;
    eprintln!(
        "✓ Integrated to t = {} ({} samples)",
        transient.t_end,
        trajectory.len()
    );
    emit(output, &trajectory.to_csv(), trajectory.len())
}

fn cmd_sensitivity(
    path: &Path,
    case: Option<&str>,
    sigma: f64,
    propagation: Propagation,
    output: Option<&Path>,
) -> CliResult<()> {
    let scenario = load_scenario(path, case)?;
    let mut problem = build(&scenario)?;
    let solution = solve_steady(&mut problem, &steady_options(&scenario))?;
    let deviations = source_row_sigma(&problem, sigma);
    if deviations.iter().all(|u| *u == 0.0) {
        warn!("no solvable block carries a source; all deviations are zero");
    }
    let uncertainty = problem.uncertainty(
        &deviations,
        &SensitivityOptions {
            propagation,
            ..SensitivityOptions::default()
        },
    )?;
    let labels = problem.labels();
    let csv = report::uncertainty_table(&labels, &solution.x, &uncertainty);
    emit(output, &csv, labels.len())
}

fn cmd_batch(path: &Path, output: Option<&Path>) -> CliResult<()> {
    let scenario = hn_scenario::load(path)?;
    if scenario.cases.is_empty() {
        return Err(CliError::Usage {
            what: format!("scenario '{}' defines no cases", scenario.name),
        });
    }
    // Assemble the base once so a broken scenario fails before fan-out
    let labels = build(&scenario)?.labels();

    let results: Vec<(String, CliResult<DVector<f64>>)> = scenario
        .cases
        .par_iter()
        .map(|case| {
            let run = || -> CliResult<DVector<f64>> {
                let variant = hn_scenario::apply_case(&scenario, case)?;
                let mut problem = build(&variant)?;
                Ok(solve_steady(&mut problem, &steady_options(&variant))?.x)
            };
            (case.name.clone(), run())
        })
        .collect();

    let total = results.len();
    let mut rows = Vec::with_capacity(total);
    for (name, result) in results {
        match result {
            Ok(x) => rows.push((name, x)),
            Err(e) => warn!(case = %name, error = %e, "case failed"),
        }
    }
    let csv = report::state_table(&labels, &rows);
    emit(output, &csv, rows.len())?;

    let failed = total - rows.len();
    if failed > 0 {
        return Err(CliError::CasesFailed { failed, total });
    }
    Ok(())
}
