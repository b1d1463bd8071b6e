use std::path::PathBuf;

use structopt::clap::AppSettings::*;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub enum Commands {
    #[structopt(
        name = "c",
        visible_alias = "create",
        about = "Create an archive from the contents of a directory"
    )]
    Create {
        #[structopt(name = "tarfile", parse(from_os_str), help = "Path to the .tar archive")]
        archive: PathBuf,

        #[structopt(
            name = "source",
            parse(from_os_str),
            help = "Directory whose contents are archived"
        )]
        source: PathBuf,
    },

    #[structopt(
        name = "x",
        visible_alias = "extract",
        about = "Extract an archive into a directory"
    )]
    Extract {
        #[structopt(name = "tarfile", parse(from_os_str), help = "Path to the .tar archive")]
        archive: PathBuf,

        #[structopt(
            short,
            long,
            parse(from_os_str),
            default_value = ".",
            help = "Directory to extract into"
        )]
        output: PathBuf,

        #[structopt(
            long,
            default_value = "10",
            help = "Attempts made to open each extracted file"
        )]
        retries: u32,

        #[structopt(
            long,
            default_value = "25",
            help = "Delay between open attempts, in milliseconds"
        )]
        retry_delay: u64,
    },

    #[structopt(name = "l", visible_alias = "list", about = "List the entries of an archive")]
    List {
        #[structopt(name = "tarfile", parse(from_os_str), help = "Path to the .tar archive")]
        archive: PathBuf,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "tarkit",
    about = "Create, list and extract tar archives.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "tarkit (c|l|x) [FLAGS|OPTIONS] <tarfile> [source]"
)]
pub struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub cmd: Commands,
}
