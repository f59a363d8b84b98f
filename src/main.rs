use std::path::PathBuf;
use std::process::ExitCode;

use apbd_sim::{create_model_sample, Model, ModelConfig, ModelState, SimResult};
use clap::Parser;
use log::{debug, error, info};

/// Position-based rigid/affine body simulator
///
/// Runs a built-in sample or a JSON scenario and prints the final body poses.
#[derive(Parser, Debug)]
#[command(name = "apbd-sim")]
#[command(version, long_about = None)]
struct Cli {
    /// Built-in sample id (1, 2, 3 or 10)
    #[arg(value_name = "SAMPLE_ID", conflicts_with = "config")]
    sample: Option<u32>,

    /// Load the scene from a JSON scenario file instead
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after at most this many steps
    #[arg(long, value_name = "N")]
    steps: Option<u32>,
}

impl Cli {
    fn build(&self) -> SimResult<Model> {
        match &self.config {
            Some(path) => ModelConfig::load(path)?.build(),
            None => create_model_sample(self.sample.unwrap_or(10)),
        }
    }
}

fn run(cli: &Cli) -> SimResult<()> {
    let mut model = cli.build()?;
    let limit = cli.steps.unwrap_or(u32::MAX);

    while model.state() != ModelState::Finished && model.step_count() < limit {
        model.step()?;
        for (i, body) in model.bodies().iter().enumerate() {
            debug!(
                "t = {:.4} body {i}: p = {:?}",
                model.time(),
                Into::<[f32; 3]>::into(body.position())
            );
        }
    }
    info!("stopped after {} steps, t = {}", model.step_count(), model.time());

    println!("{:>4} {:>7} {:>10} {:>10} {:>10}", "body", "kind", "x", "y", "z");
    for (i, body) in model.bodies().iter().enumerate() {
        let p = body.position();
        println!(
            "{i:>4} {:>7} {:>10.4} {:>10.4} {:>10.4}",
            format!("{:?}", body.kind()),
            p.x,
            p.y,
            p.z
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
