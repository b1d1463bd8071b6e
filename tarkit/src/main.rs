use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod error;
mod util;

use cli::{CliOpts, Commands};

fn main() -> miette::Result<()> {
    let opts = CliOpts::from_iter(wild::args_os());

    let filter = if opts.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match opts.cmd {
        Commands::Create { archive, source } => commands::create(archive, source, opts.verbose)?,
        Commands::Extract {
            archive,
            output,
            retries,
            retry_delay,
        } => commands::extract(archive, output, retries, retry_delay, opts.verbose)?,
        Commands::List { archive } => commands::list(archive, opts.verbose)?,
    };

    Ok(())
}
