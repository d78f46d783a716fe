//! Caisson CLI
//!
//! Resolves the project configuration and the command line into a container
//! run, then executes it (or prints it with `--dry-run`).

mod cli;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use caisson_config::{Entrypoint, EnvMap, env_var_spec};
use caisson_launch::{Dive, DiveOptions};
use cli::Cli;
use error::{CliError, Result};

fn main() {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    match run(cli) {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(e.exit_status());
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut env = EnvMap::new();
    for spec in &cli.env {
        let Some((key, value)) = env_var_spec(spec) else {
            return Err(CliError::user(format!("invalid --env specification: {spec}")));
        };
        env.insert(key, value);
    }

    let options = DiveOptions {
        command: cli.command,
        image_override: cli.image,
        shell_override: cli.shell,
        entrypoint_override: cli.entrypoint.map(|program| {
            if program.is_empty() {
                Entrypoint::Cleared
            } else {
                Entrypoint::Set(program)
            }
        }),
        as_root: cli.as_root,
        verbose: cli.verbose,
        env,
        docker_args: cli.docker_args,
        init_binary: None,
    };

    let dive = Dive::prepare(options)?;
    if cli.dry_run {
        println!("{}", dive.command_line());
        return Ok(0);
    }
    Ok(dive.run()?)
}
