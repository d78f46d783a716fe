//! CLI argument parsing using clap derive

use clap::Parser;

/// Caisson - Run project commands inside a container
#[derive(Parser, Debug)]
#[command(name = "caisson")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Override the image named in .caisson.yml
    #[arg(long)]
    pub image: Option<String>,

    /// Override the shell used to run scripts
    #[arg(long)]
    pub shell: Option<String>,

    /// Override the entrypoint (an empty string suppresses the image's)
    #[arg(long)]
    pub entrypoint: Option<String>,

    /// Run as root inside the container
    #[arg(short = 'r', long = "root")]
    pub as_root: bool,

    /// Print the docker command line instead of running it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Extra environment variables (KEY=VALUE, or KEY to pass through)
    #[arg(short, long = "env", value_name = "KEY[=VALUE]")]
    pub env: Vec<String>,

    /// Extra arguments passed to `docker run`
    #[arg(short = 'd', long = "docker-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub docker_args: Vec<String>,

    /// Command (or alias) to run in the container; empty runs the image's
    /// default command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
