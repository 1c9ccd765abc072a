mod commands;
mod driver;
mod error;
mod filter;
mod hashing;
mod util;

use std::path::PathBuf;

use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use driver::Driver;
use filter::Filters;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "list",
        visible_alias = "l",
        about = "List every leaf with its size, checksum and modification time"
    )]
    List {
        #[structopt(
            name = "paths",
            parse(from_os_str),
            required = true,
            help = "Files or directories to look into"
        )]
        paths: Vec<PathBuf>,
    },

    #[structopt(name = "sum", about = "Print the CRC-32 of every leaf")]
    Sum {
        #[structopt(
            name = "paths",
            parse(from_os_str),
            required = true,
            help = "Files or directories to look into"
        )]
        paths: Vec<PathBuf>,
    },

    #[structopt(name = "grep", about = "Print lines of every leaf containing a literal string")]
    Grep {
        #[structopt(help = "Literal text to search for")]
        needle: String,

        #[structopt(
            name = "paths",
            parse(from_os_str),
            required = true,
            help = "Files or directories to look into"
        )]
        paths: Vec<PathBuf>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "nestbox",
    about = "Looks into nested archives and compressed files.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands]
)]
struct CliOpts {
    #[structopt(short, long, help = "Show debug output", global = true)]
    verbose: bool,

    #[structopt(
        long,
        help = "Treat every file as plain content, never looking inside",
        global = true
    )]
    no_look_into: bool,

    #[structopt(
        short = "L",
        long,
        number_of_values = 1,
        help = "Only look into FORMAT streams whose path matches GLOB [FORMAT:GLOB, repeatable]",
        global = true
    )]
    look_into: Vec<String>,

    #[structopt(
        short,
        long,
        number_of_values = 1,
        help = "Only report leaves whose path matches GLOB [repeatable]",
        global = true
    )]
    include: Vec<String>,

    #[structopt(
        short,
        long,
        help = "Skip entries and files that fail instead of aborting",
        global = true
    )]
    keep_going: bool,

    #[structopt(long, help = "Print JSON instead of text", global = true)]
    json: bool,

    #[structopt(
        short,
        long,
        help = "Number of files processed in parallel [default: one per CPU]",
        global = true
    )]
    jobs: Option<usize>,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn main() -> anyhow::Result<()> {
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

    let filters = Filters::new(opts.no_look_into, &opts.look_into, &opts.include)?;
    let driver = Driver::new(filters, opts.keep_going, opts.jobs);

    match opts.cmd {
        Commands::List { paths } => commands::list(&driver, &paths, opts.json)?,
        Commands::Sum { paths } => commands::sum(&driver, &paths, opts.json)?,
        Commands::Grep { needle, paths } => commands::grep(&driver, &paths, &needle, opts.json)?,
    };

    driver.finish()?;
    Ok(())
}
