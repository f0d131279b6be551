//! Stress a bakery lock with a shared counter.
//!
//! `bakery-rs [THREADS] [ITERATIONS] [--variant naive|ordered|bounded]`
//!
//! NOTE: the naive variant is expected to fail on a multiprocessor now and
//! then; `--pin single` puts every thread on one CPU, where it holds.
use std::process::ExitCode;

use bakery_rs::harness::{self, HarnessConfig, Pinning, Variant};
use clap::builder::TypedValueParser;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Lamport's bakery lock, checked by counting.
#[derive(Parser, Debug)]
#[command(name = "bakery-rs")]
struct Args {
    /// Number of participant threads
    #[arg(default_value_t = harness::DEFAULT_PARTICIPANTS, value_parser = clap::value_parser!(u64).range(1..).try_map(usize::try_from))]
    threads: usize,

    /// Lock/unlock cycles per thread
    #[arg(default_value_t = harness::DEFAULT_ITERATIONS, value_parser = clap::value_parser!(u64).range(1..).try_map(usize::try_from))]
    iterations: usize,

    #[arg(long, value_enum, default_value_t = Variant::default())]
    variant: Variant,

    /// Ticket ceiling for the bounded variant
    #[arg(long, default_value_t = harness::DEFAULT_CEILING)]
    ceiling: usize,

    #[arg(long, value_enum, default_value_t = Pinning::default())]
    pin: Pinning,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    setup_tracing(args.verbose);

    let config = HarnessConfig {
        participants: args.threads,
        iterations: args.iterations,
        variant: args.variant,
        ceiling: args.ceiling,
        pinning: args.pin,
    };
    let report = harness::run(&config)?;
    println!("{report}");

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Log filter comes from `BAKERY_LOG`, e.g. `BAKERY_LOG=bakery.gate=debug`.
fn setup_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BAKERY_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
