// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::io;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Cook {
            target,
            recipe,
            build,
            output,
            keep_builddir,
            no_verify,
        } => commands::cmd_cook(&target, &recipe, &build, &output, keep_builddir, !no_verify),
        Commands::Fetch {
            recipe,
            cache,
            dest,
        } => commands::cmd_fetch(&recipe, &cache, &dest),
        Commands::Plan {
            target,
            recipe,
            build,
        } => commands::cmd_plan(&target, &recipe, &build),
        Commands::Info { target, recipe } => commands::cmd_info(&target, &recipe),
        Commands::Verify {
            package_dir,
            recipe,
        } => commands::cmd_verify(&package_dir, &recipe),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "ragel-installer",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
