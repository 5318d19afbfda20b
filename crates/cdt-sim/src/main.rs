use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use cdt_core::{Couplings, RngHandle};
use cdt_foliation::{make_filename, write_off, Manifold3};
use cdt_mcmc::{
    action, build_universe, resume, run, ActionCounts, Algorithm, RunConfig, RunSummary,
};
use cdt_tds::canonical_hash;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cdt-sim", about = "Causal dynamical triangulations in 2+1 dimensions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a foliated sphere and write it as an OFF file.
    Generate(GenerateArgs),
    /// Run the Metropolis chain described by a YAML configuration.
    Run(RunArgs),
    /// Continue a run from a checkpoint file.
    Resume(ResumeArgs),
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Desired number of simplices.
    #[arg(long)]
    simplices: usize,
    /// Number of timeslices.
    #[arg(long)]
    timeslices: usize,
    /// Seed for the generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Radius of the first timeslice.
    #[arg(long, default_value_t = cdt_foliation::INITIAL_RADIUS)]
    initial_radius: f64,
    /// Radial distance between timeslices.
    #[arg(long, default_value_t = cdt_foliation::FOLIATION_SPACING)]
    foliation_spacing: f64,
    /// Edge length ratio coupling.
    #[arg(long, default_value_t = Couplings::default().alpha, allow_hyphen_values = true)]
    alpha: f64,
    /// Inverse gravitational coupling.
    #[arg(long, default_value_t = Couplings::default().k)]
    k: f64,
    /// Cosmological constant.
    #[arg(long, default_value_t = Couplings::default().lambda, allow_hyphen_values = true)]
    lambda: f64,
    /// Output directory for the OFF file.
    #[arg(long)]
    out: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// YAML configuration describing the run.
    #[arg(long)]
    config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    out: PathBuf,
    /// Override the configured number of passes.
    #[arg(long)]
    passes: Option<usize>,
    /// Override the configured master seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Apply every proposal instead of running the Metropolis test.
    #[arg(long)]
    move_always: bool,
}

#[derive(ClapArgs, Debug)]
struct ResumeArgs {
    /// Checkpoint JSON written by a previous run.
    #[arg(long)]
    checkpoint: PathBuf,
    /// Directory for `summary.json`; printed to stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Run(args) => run_chain(args),
        Command::Resume(args) => run_resume(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    let couplings = Couplings {
        alpha: args.alpha,
        k: args.k,
        lambda: args.lambda,
    };
    let mut rng = RngHandle::from_seed(args.seed);
    let manifold = Manifold3::with_parameters(
        args.simplices,
        args.timeslices,
        args.initial_radius,
        args.foliation_spacing,
        &mut rng,
    )?;
    let path = args.out.join(make_filename(
        args.timeslices,
        manifold.n3(),
        args.initial_radius,
        args.foliation_spacing,
    ));
    write_off(&manifold, &path)?;

    let report = json!({
        "file": path,
        "geometry": manifold.geometry(),
        "action": action(&ActionCounts::from_geometry(manifold.geometry()), &couplings)?,
        "couplings": couplings,
        "hash": canonical_hash(manifold.tds())?,
        "min_time": manifold.min_time(),
        "max_time": manifold.max_time(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_chain(args: RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let mut config = RunConfig::load(&args.config)?;
    config.output.run_directory = Some(args.out.clone());
    if let Some(passes) = args.passes {
        config.passes = passes;
    }
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }
    if args.move_always {
        config.algorithm = Algorithm::MoveAlways;
    }

    let manifold = build_universe(&config)?;
    let outcome = run(&config, manifold)?;
    write_json(args.out.join("summary.json"), &outcome.summary)?;
    fs::write(args.out.join("config.yaml"), serde_yaml::to_string(&config)?)?;
    report(&outcome.summary);
    Ok(())
}

fn run_resume(args: ResumeArgs) -> Result<(), Box<dyn Error>> {
    let outcome = resume(&args.checkpoint)?;
    match args.out {
        Some(out) => write_json(out.join("summary.json"), &outcome.summary)?,
        None => println!("{}", serde_json::to_string_pretty(&outcome.summary)?),
    }
    report(&outcome.summary);
    Ok(())
}

fn report(summary: &RunSummary) {
    info!(
        algorithm = summary.algorithm.as_str(),
        hash = %summary.final_hash,
        n3 = summary.final_geometry.n3,
        n0 = summary.final_geometry.n0,
        action = summary.final_action,
        succeeded = summary.statistics.succeeded.total(),
        failed = summary.statistics.failed.total(),
        "finished"
    );
}

fn write_json<P: AsRef<Path>, T: serde::Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
