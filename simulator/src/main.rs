use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline driver for sigflow pipelines")]
struct Args {
    /// Also drain the streaming pipeline over a synthetic signal
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 256)]
    rows: usize,
    #[arg(long, default_value_t = 4)]
    columns: usize,
    #[arg(long, default_value_t = 32)]
    chunk_rows: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 3)]
    passes: usize,
    /// Print the port wiring of every pipeline as JSON
    #[arg(long, default_value_t = false)]
    dump_ports: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.rows, args.columns, args.chunk_rows, args.seed, args.passes)?
    };
    let runner = Runner::new(workflow_config);

    if args.dump_ports {
        let maps = runner.describe()?;
        let json = serde_json::to_string_pretty(&maps).context("serializing port maps")?;
        println!("{}", json);
        return Ok(());
    }

    let comparison = runner.run_comparison()?;
    println!(
        "Comparison -> passes {}, agreed {}, min {:?}, max {:?}",
        comparison.passes, comparison.agreements, comparison.min, comparison.max
    );

    if args.offline {
        let streaming = runner.run_streaming()?;
        println!(
            "Streaming -> chunks {}, mean line length {:?}, peak magnitude {:.4}",
            streaming.chunks, streaming.mean, streaming.peak_magnitude
        );
    }

    Ok(())
}
