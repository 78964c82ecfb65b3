use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;

use ctxcat_core::run::{run, RunOptions};

const DEFAULT_OUTPUT: &str = "context.txt";
const DEFAULT_EXCLUDE: &str = "LICENSE;CHANGELOG.md";
const DEFAULT_DELIMITER: &str = "\n---\n";

#[derive(Parser, Debug)]
#[command(name = "ctxcat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregate a folder's files into a single context blob")]
struct Args {
    /// Show verbose debug information
    #[arg(short, long)]
    verbose: bool,

    /// Input folder path
    #[arg(short, long, default_value = ".")]
    input: PathBuf,

    /// Output file path [default: context.txt]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// File patterns to include, separated by semicolon
    #[arg(long)]
    include: Option<String>,

    /// File patterns to exclude, separated by semicolon
    /// [default: LICENSE;CHANGELOG.md]
    #[arg(long)]
    exclude: Option<String>,

    /// Config file name inside the input folder
    #[arg(short, long, default_value = ".ctxcat.yml")]
    config: String,

    /// Disable usage of the .gitignore file to exclude files
    #[arg(short = 'g', long)]
    disable_gitignore: bool,

    /// Do not add the folder tree to the context
    #[arg(long)]
    disable_folder_tree: bool,

    /// Do not include subfolders
    #[arg(long)]
    non_recursive: bool,

    /// Delimiter between files in the output [default: "\n---\n"]
    #[arg(long)]
    delimiter: Option<String>,

    /// Skip calculating the token count
    #[arg(long)]
    skip_tokens: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let file_config = config::load(&args.input.join(&args.config))?;
        let options = build_options(args, file_config);
        run(options).await?;
        Ok(())
    })
}

/// Merges command-line flags over the config file over built-in defaults.
/// Boolean flags are additive: set in either place means on.
fn build_options(args: Args, config: config::FileConfig) -> RunOptions {
    let output = args
        .output
        .or(config.output.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let include = args.include.or(config.include).unwrap_or_default();
    let exclude = args
        .exclude
        .or(config.exclude)
        .unwrap_or_else(|| DEFAULT_EXCLUDE.to_string());
    let delimiter = args
        .delimiter
        .or(config.delimiter)
        .unwrap_or_else(|| DEFAULT_DELIMITER.to_string());

    RunOptions {
        input: args.input,
        output,
        include: split_patterns(&include),
        exclude: split_patterns(&exclude),
        use_gitignore: !(args.disable_gitignore || config.disable_gitignore.unwrap_or(false)),
        folder_tree: !(args.disable_folder_tree || config.disable_folder_tree.unwrap_or(false)),
        recursive: !(args.non_recursive || config.non_recursive.unwrap_or(false)),
        delimiter,
        skip_tokens: args.skip_tokens || config.skip_tokens.unwrap_or(false),
    }
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(';')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn setup_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
