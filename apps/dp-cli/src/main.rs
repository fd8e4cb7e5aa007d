use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use dp_app::{AppResult, RunOptions, project_service, query, run_service};
use dp_sim::SimProgress;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dpsim")]
#[command(about = "Dynamic-phasor and EMT power-system simulation", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate {
        /// Path to a YAML or JSON scenario
        scenario_path: PathBuf,
    },
    /// List constructible registry paths
    Catalog,
    /// Run a scenario
    Run {
        /// Path to a YAML or JSON scenario
        scenario_path: PathBuf,
        /// Log directory (defaults to the scenario's output.dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Override the simulated duration in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Override the timestep in seconds
        #[arg(long)]
        timestep: Option<f64>,
    },
    /// List stored runs in a log directory
    Runs {
        /// Log directory
        dir: PathBuf,
    },
    /// Show details of a stored run
    ShowRun {
        /// Log directory
        dir: PathBuf,
        /// Simulation name
        name: String,
    },
    /// Export one column of a stored run
    ExportSeries {
        /// Log directory
        dir: PathBuf,
        /// Simulation name
        name: String,
        /// Column label, e.g. n1.re
        column: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool, scenario_level: Option<&str>) {
    let default = if verbose {
        "debug"
    } else {
        scenario_level.unwrap_or("info")
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = cli.verbose;
    let result = match cli.command {
        Commands::Run {
            scenario_path,
            out,
            duration,
            timestep,
        } => {
            let options = RunOptions {
                output_dir: out,
                duration,
                timestep,
            };
            cmd_run(&scenario_path, options, verbose)
        }
        Commands::Validate { scenario_path } => {
            init_tracing(verbose, None);
            cmd_validate(&scenario_path)
        }
        Commands::Catalog => {
            init_tracing(verbose, None);
            cmd_catalog()
        }
        Commands::Runs { dir } => {
            init_tracing(verbose, None);
            cmd_runs(&dir)
        }
        Commands::ShowRun { dir, name } => {
            init_tracing(verbose, None);
            cmd_show_run(&dir, &name)
        }
        Commands::ExportSeries {
            dir,
            name,
            column,
            output,
        } => {
            init_tracing(verbose, None);
            cmd_export_series(&dir, &name, &column, output.as_deref())
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(scenario_path: &Path) -> AppResult<bool> {
    println!("Validating scenario: {}", scenario_path.display());
    let summary = project_service::validate_file(scenario_path)?;
    println!("✓ Scenario is valid");
    println!(
        "  {} ({}): {} nodes, {} entities, {} topologies, {} events",
        summary.name,
        summary.domain,
        summary.node_count,
        summary.entity_count,
        summary.topology_count,
        summary.event_count
    );
    println!(
        "  duration={}s timestep={}s",
        summary.duration, summary.timestep
    );
    Ok(true)
}

fn cmd_catalog() -> AppResult<bool> {
    for entry in project_service::list_catalog()? {
        println!("  {:<32} {}", entry.path, entry.kind);
    }
    Ok(true)
}

fn cmd_run(scenario_path: &Path, options: RunOptions, verbose: bool) -> AppResult<bool> {
    let scenario = match project_service::load_scenario(scenario_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            init_tracing(verbose, None);
            return Err(e);
        }
    };
    init_tracing(verbose, scenario.log_level.as_deref());
    println!("Running scenario: {}", scenario.name);

    let mut last_emit = Instant::now();
    let response = run_service::run_scenario_with_progress(
        &scenario,
        &options,
        Some(&mut |progress: SimProgress| {
            let done = progress.step == progress.total_steps;
            if done || last_emit.elapsed().as_millis() >= 100 {
                render_cli_progress(&progress);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.succeeded() {
        println!("✓ Simulation completed: {}", response.run_id);
    } else {
        println!(
            "✗ Simulation {}: {}",
            response.final_state,
            response.manifest.failure.as_deref().unwrap_or("no details")
        );
    }
    println!("  Steps: {}", response.steps);
    println!("  Log: {}", response.log_path.display());
    println!("  Wall time: {:.3}s", response.wall_time_s);
    Ok(response.succeeded())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(progress: &SimProgress) {
    let width = 28usize;
    let fraction = progress.fraction_complete();
    let filled = ((fraction * width as f64).round() as usize).min(width);
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    print!(
        "\r[{}] {:>6.2}%  t={:.4}/{:.4}s  step={}/{}",
        bar,
        fraction * 100.0,
        progress.time,
        progress.duration,
        progress.step,
        progress.total_steps
    );
    let _ = io::stdout().flush();
}

fn cmd_runs(dir: &Path) -> AppResult<bool> {
    let runs = query::list_runs(dir)?;

    if runs.is_empty() {
        println!("No runs found in {}", dir.display());
    } else {
        println!("Runs in {}:", dir.display());
        for manifest in runs {
            println!(
                "  {} [{}] {} ({})",
                manifest.name, manifest.final_state, manifest.run_id, manifest.timestamp
            );
        }
    }
    Ok(true)
}

fn cmd_show_run(dir: &Path, name: &str) -> AppResult<bool> {
    println!("Loading run: {}", name);

    let run = query::load_run(dir, name)?;
    let manifest = &run.manifest;

    println!("\nRun Summary:");
    println!("  Run ID: {}", manifest.run_id);
    println!("  State: {}", manifest.final_state);
    if let Some(failure) = &manifest.failure {
        println!("  Failure: {}", failure);
    }
    println!("  Domain: {}", manifest.domain);
    println!("  Solver: {}", manifest.solver_version);

    match query::get_run_summary(&run.series) {
        Ok(summary) => {
            println!("  Time points: {}", summary.record_count);
            println!(
                "  Time range: {:.6} - {:.6} s",
                summary.time_range.0, summary.time_range.1
            );
            println!("\nColumns:");
            for label in summary.labels {
                println!("  {}", label);
            }
        }
        Err(_) => println!("  No samples recorded"),
    }

    Ok(true)
}

fn cmd_export_series(
    dir: &Path,
    name: &str,
    column: &str,
    output: Option<&Path>,
) -> AppResult<bool> {
    let run = query::load_run(dir, name)?;
    let series = query::extract_series(&run.series, column)?;

    let mut csv = String::from("time_s,value\n");
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(true)
}
