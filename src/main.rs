use std::time::Duration;

use abd_register::{
    common::config::{ClusterConfig, DEFAULT_FAULTY, DEFAULT_OPERATIONS, DEFAULT_REPLICAS},
    common::error::ClusterError,
    network::run_cluster,
};
use clap::Parser;
use tracing::info;

/// Run an ABD register cluster with f crashed replicas.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Number of replicas (N).
    #[arg(short = 'n', long, default_value_t = DEFAULT_REPLICAS)]
    replicas: usize,

    /// Replicas crashed before launch (f). Must satisfy N > 2f.
    #[arg(short = 'f', long, default_value_t = DEFAULT_FAULTY)]
    faulty: usize,

    /// Puts, and then Gets, performed by every correct replica (M).
    #[arg(short = 'm', long, default_value_t = DEFAULT_OPERATIONS)]
    operations: usize,

    /// Seed for choosing the faulty replicas.
    #[arg(long)]
    seed: Option<u64>,

    /// How long to wait for the correct replicas to finish.
    #[arg(long, default_value_t = 10_000)]
    wait_ms: u64,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> Result<(), ClusterError> {
    init_tracing();
    let args = Args::parse();

    let config = ClusterConfig {
        n: args.replicas,
        f: args.faulty,
        m: args.operations,
        seed: args.seed,
        wait: Duration::from_millis(args.wait_ms),
    };
    info!(n = config.n, f = config.f, m = config.m, "=== system start ===");

    let report = run_cluster(config).await?;

    info!(faulty = ?report.faulty, correct = ?report.correct, "run finished");
    for (id, completions) in &report.completions {
        for completion in completions {
            info!(
                replica = id,
                seq = completion.seq,
                value = completion.value,
                timestamp = completion.timestamp,
                "{}",
                completion.kind
            );
        }
    }
    for (id, register) in &report.registers {
        info!(replica = id, value = register.value, timestamp = register.timestamp, "final register");
    }
    Ok(())
}
