mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over -v so a single module can be traced.
    let fallback = match verbose {
        0 => "warn",
        1 => "beamsec=debug",
        _ => "beamsec=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    let Some(report) = cli::execute(cli)? else {
        return Ok(ExitCode::SUCCESS);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    // Partial runs still changed the model; only total failure is an error exit.
    Ok(match report.status {
        beamsec::RunStatus::Success | beamsec::RunStatus::PartialSuccess => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
