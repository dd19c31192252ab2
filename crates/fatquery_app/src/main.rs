use anyhow::{Context, Result};
use clap::Parser;
use fatquery::cli::Cli;
use fatquery::{parse_sector_arg, run_query};
use fatquery_core::ByteStream;
use fatquery_io::Source;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let sectors = parse_sector_arg(&cli.sectors)?;

    let mut source = Source::open(&cli.source, &cli.stream_options())
        .with_context(|| format!("Cannot open the drive: {}", cli.source))?;

    let geometry = source.geometry().copied();
    let report = run_query(&cli.source, &mut source, geometry.as_ref(), &sectors, cli.dump);
    source.close();
    let report = report?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(())
}
