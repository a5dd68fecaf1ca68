#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use tscflow_core::Config;

#[derive(Parser, Debug)]
#[command(name = "tscflow")]
#[command(author, version, about = "Compile TypeScript through tsc into a destination tree", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information, including the detected tsc
    Version {
        /// Options file used to locate tsc (defaults to tscflow.json)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Compile the matched files and write the outputs under --dest
    Compile {
        /// Input globs, relative to the working directory
        #[arg(required = true, value_name = "GLOB")]
        globs: Vec<String>,

        /// Additional comma-separated input set compiled as its own request (repeatable)
        #[arg(long = "group", value_name = "GLOB[,GLOB...]")]
        groups: Vec<String>,

        /// Destination directory for outputs
        #[arg(long, value_name = "DIR")]
        dest: PathBuf,

        /// Options file (defaults to tscflow.json when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Concatenate everything into one output with this name
        #[arg(long, value_name = "NAME")]
        out: Option<String>,

        /// Output root, relative to the working directory
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Emit source maps
        #[arg(long)]
        sourcemap: bool,

        /// Fixed sourceRoot for emitted maps
        #[arg(long, value_name = "ROOT")]
        source_root: Option<String>,

        /// Emit declaration files
        #[arg(long)]
        declaration: bool,

        /// Drop the outputs of units that produced warnings
        #[arg(long)]
        safe: bool,

        /// Report compilation errors as diagnostics instead of failing
        #[arg(long)]
        no_emit_error: bool,

        /// Rewrite output paths starting with FROM to start with TO (repeatable, first match wins)
        #[arg(long = "path-filter", value_name = "FROM=TO")]
        path_filter: Vec<String>,
    },
}

/// Split one `--group` value into its globs.
fn split_group(group: &str) -> Vec<String> {
    group
        .split(',')
        .map(str::trim)
        .filter(|glob| !glob.is_empty())
        .map(String::from)
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        None => commands::version::run(&config, cli.json),
        Some(Commands::Version { config: file }) => {
            commands::version::run(&config.with_options_file(file), cli.json)
        }
        Some(Commands::Compile {
            globs,
            groups,
            dest,
            config: file,
            out,
            out_dir,
            sourcemap,
            source_root,
            declaration,
            safe,
            no_emit_error,
            path_filter,
        }) => {
            let mut sets = vec![globs];
            sets.extend(groups.iter().map(|group| split_group(group)));
            let action = commands::compile::CompileAction {
                groups: sets,
                dest,
                out,
                out_dir,
                sourcemap,
                source_root,
                declaration,
                safe,
                no_emit_error,
                path_filter,
            };
            commands::compile::run(&config.with_options_file(file), action, cli.json)
        }
    }
}
