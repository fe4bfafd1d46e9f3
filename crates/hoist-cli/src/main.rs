#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use hoist_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hoist")]
#[command(author, version, about = "A scope-hoisting JavaScript bundler", long_about = None)]
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
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Bundle an ES module graph into one file
    Bundle {
        /// Entry point file
        entry: PathBuf,

        /// Output file (if not specified, prints to stdout)
        #[arg(long, short = 'o')]
        outfile: Option<PathBuf>,

        /// Shorten local names and print compact output
        #[arg(long)]
        minify: bool,

        /// Generate a source map next to the output file
        #[arg(long)]
        sourcemap: bool,

        /// Keep relative imports that leave the entry's directory
        #[arg(long)]
        library: bool,

        /// Specifiers to keep as imports
        #[arg(long, value_delimiter = ',')]
        external: Vec<String>,

        /// Options file (defaults to hoist.json in the working directory)
        #[arg(long, value_name = "PATH", env = "HOIST_CONFIG")]
        config: Option<PathBuf>,
    },
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

    match cli.command {
        Commands::Version => {
            if config.json_logs {
                println!("{}", serde_json::json!({ "ok": true, "version": hoist_core::VERSION }));
            } else {
                println!("hoist {}", hoist_core::VERSION);
            }
            Ok(())
        }
        Commands::Bundle {
            entry,
            outfile,
            minify,
            sourcemap,
            library,
            external,
            config: options_file,
        } => {
            logging::init(config.verbosity, config.json_logs);
            let action = commands::bundle::BundleAction {
                entry: config.resolve(&entry),
                outfile: outfile.map(|path| config.resolve(&path)),
                config: options_file.map(|path| config.resolve(&path)),
                cwd: config.cwd.clone(),
                minify,
                sourcemap,
                library,
                external,
            };
            commands::bundle::run(action, config.json_logs)
        }
    }
}
