use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use did_stepwise::estimator::{HorizonSelection, assign_selection, prepare};
use did_stepwise::input::{
    InputError, LoadedPanel, load_panel, write_groups, write_observations, write_panel,
};
use did_stepwise::model::{ComparisonConfig, Estimator};
use did_stepwise::pipeline::full_comparison;
use did_stepwise::pipeline::stage2_comparisons::{QueryError, compare_controls};
use did_stepwise::pipeline::stage5_weights::WeightError;
use did_stepwise::pipeline::stage6_report::write_reports;
use did_stepwise::report::bootstrap::{
    BootstrapError, BootstrapOptions, bootstrap, bootstrap_describe, bootstrap_summary,
};
use did_stepwise::report::csv::{create, write_bootstrap, write_bootstrap_summary, write_frame};
use did_stepwise::report::text::{overview, overview_time, render_bootstrap, render_describe};
use did_stepwise::report::{AggLevel, ReportError};
use did_stepwise::sim::{SimError, SimPanel, SimParams, simulate_groups};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Weights(#[from] WeightError),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "did-stepwise", version, about = "Stepwise vs sequential DiD comparison groups")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build both comparison groups, estimate and write all reports.
    Compare {
        #[command(flatten)]
        panel: PanelArgs,
        #[arg(short, long, default_value = "did-stepwise-out")]
        out: PathBuf,
    },
    /// Print the comparison-group rows of one (cohort, horizon) cell as CSV.
    Query {
        #[command(flatten)]
        panel: PanelArgs,
        #[arg(short = 'E', long)]
        cohort: i64,
        #[arg(long)]
        horizon: i64,
        #[arg(long, default_value = "swdd")]
        estimator: Estimator,
    },
    /// Unit-resampling bootstrap of the aggregated estimates.
    Bootstrap {
        #[command(flatten)]
        panel: PanelArgs,
        #[arg(short = 'B', long, default_value_t = 200)]
        replicates: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value = "dynamic")]
        level: AggLevel,
        #[arg(short, long, default_value = "bootstrap.csv")]
        out: PathBuf,
        /// Per-group mean and standard deviation of the replicates.
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// First-difference the panel and append horizon weight columns.
    Weights {
        #[command(flatten)]
        panel: PanelArgs,
        /// event, static, all, or a comma-separated horizon list.
        #[arg(long, default_value = "event")]
        horizons: HorizonSelection,
        #[arg(short, long, default_value = "weights.csv")]
        out: PathBuf,
    },
    /// Write a simulated staggered-adoption panel.
    Simulate {
        /// JSON file with simulation parameters.
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long)]
        units: Option<usize>,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Effect reduction for units in group F = 1.
        #[arg(long)]
        group_effect: Option<f64>,
        /// Also write each unit's group indicator as `id,F`.
        #[arg(long)]
        groups: Option<PathBuf>,
        #[arg(short, long, default_value = "panel.csv")]
        out: PathBuf,
    },
}

#[derive(Debug, Args)]
struct PanelArgs {
    /// Panel CSV (optionally .gz).
    #[arg(short, long)]
    input: PathBuf,
    /// JSON comparison config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    max_horizon: Option<usize>,
    #[arg(long, allow_hyphen_values = true)]
    never_treated: Option<i64>,
    /// Unit-constant weight column.
    #[arg(long)]
    weight: Option<String>,
}

impl PanelArgs {
    fn config(&self) -> Result<ComparisonConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ComparisonConfig::from_json_file(path)?,
            None => ComparisonConfig::default(),
        };
        if let Some(h) = self.max_horizon {
            config.max_horizon = h;
        }
        if let Some(code) = self.never_treated {
            config.never_treated = code;
        }
        if self.weight.is_some() {
            config.columns.weight = self.weight.clone();
        }
        Ok(config)
    }

    fn load(&self) -> Result<(ComparisonConfig, LoadedPanel), CliError> {
        let config = self.config()?;
        let loaded = load_panel(&self.input, &config)?;
        Ok((config, loaded))
    }
}

fn main() {
    let cli = Cli::parse();
    did_stepwise::tracing::init(cli.verbose);
    if let Err(err) = run(cli.command) {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Compare { panel, out } => compare(&panel, &out),
        Command::Query {
            panel,
            cohort,
            horizon,
            estimator,
        } => query(&panel, cohort, horizon, estimator),
        Command::Bootstrap {
            panel,
            replicates,
            seed,
            level,
            out,
            summary,
        } => {
            let (config, loaded) = panel.load()?;
            let options = BootstrapOptions {
                replicates,
                seed,
                level,
                max_horizon: config.max_horizon,
            };
            let rows = bootstrap(&loaded.panel, &options)?;
            write_bootstrap(create(&out)?, &rows)?;

            let stats = bootstrap_summary(&rows);
            print!("{}", render_bootstrap(&stats));
            for (cohort, horizon, sgdd, swdd) in bootstrap_describe(&rows) {
                let group = group_label(cohort, horizon);
                print!("{}", render_describe(&format!("SGDD {group}"), sgdd.as_ref()));
                print!("{}", render_describe(&format!("SWDD {group}"), swdd.as_ref()));
            }
            if let Some(path) = summary {
                write_bootstrap_summary(create(&path)?, &stats)?;
            }
            Ok(())
        }
        Command::Weights {
            panel,
            horizons,
            out,
        } => weights(&panel, horizons, &out),
        Command::Simulate {
            params,
            units,
            seed,
            group_effect,
            groups,
            out,
        } => {
            let mut params = match params {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)?;
                    serde_json::from_str::<SimParams>(&text).map_err(InputError::from)?
                }
                None => SimParams::default(),
            };
            if let Some(n) = units {
                params.n_units = n;
            }
            if let Some(g) = group_effect {
                params.group_effect = g;
            }
            let mut rng = StdRng::seed_from_u64(seed);
            let SimPanel { panel, groups: flags } = simulate_groups(&params, &mut rng)?;
            let config = ComparisonConfig {
                never_treated: params.never_treated,
                ..ComparisonConfig::default()
            };
            write_panel(create(&out)?, &panel, &config)?;
            if let Some(path) = groups {
                write_groups(create(&path)?, &panel, &flags)?;
            }
            tracing::info!(path = %out.display(), units = panel.n_units(), "simulated panel written");
            Ok(())
        }
    }
}

fn compare(args: &PanelArgs, out: &Path) -> Result<(), CliError> {
    let (config, loaded) = args.load()?;
    let panel = &loaded.panel;
    let results = full_comparison(panel, config.max_horizon);

    print!("{}", overview_time(panel));
    println!();
    print!("{}", overview(&compare_controls(&results.comparisons)));

    write_reports(panel, &results, out)?;
    Ok(())
}

fn query(args: &PanelArgs, cohort: i64, horizon: i64, estimator: Estimator) -> Result<(), CliError> {
    let (config, loaded) = args.load()?;
    let results = full_comparison(&loaded.panel, config.max_horizon);
    let rows = results
        .comparisons
        .query_comparisons(cohort, horizon, estimator)?;

    write_observations(io::stdout().lock(), &loaded.panel, &rows, &config)?;
    io::stdout().flush()?;
    Ok(())
}

fn weights(args: &PanelArgs, horizons: HorizonSelection, out: &Path) -> Result<(), CliError> {
    let (_, loaded) = args.load()?;
    let frame = prepare(&loaded.panel, loaded.unit_weights.as_deref());
    let frame = assign_selection(frame, &horizons)?;
    write_frame(create(out)?, &frame)?;
    tracing::info!(path = %out.display(), rows = frame.len(), "weights written");
    Ok(())
}

fn group_label(cohort: Option<i64>, horizon: Option<i64>) -> String {
    match (cohort, horizon) {
        (Some(e), Some(h)) => format!("E={e} h={h}"),
        (None, Some(h)) => format!("h={h}"),
        _ => "total".to_string(),
    }
}
