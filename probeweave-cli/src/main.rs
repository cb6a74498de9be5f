mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })?;

    let cli = Cli::parse();

    // engine logs go to stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("probeweave", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Inspect { path } => commands::inspect::run(path, &cli.global),
        Command::Rewrite {
            input,
            output,
            agent_args,
            dry_run,
        } => commands::rewrite::run(
            input,
            output,
            agent_args.as_deref(),
            *dry_run,
            &cli.global,
        ),
        Command::Disasm {
            path,
            method,
            bytes,
        } => commands::disasm::run(path, method.as_deref(), *bytes),
    }
}
