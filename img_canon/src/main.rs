use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use img_canon::config::{CanonConfig, CollisionPolicy};
use img_canon::interactive;
use img_canon::orchestrator::convert_inputs;
use img_canon::recipes::{run_recipe, Recipe};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::thread_manager::build_thread_pool;
use shared_utils::check_safe_for_destructive;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Level;

/// Legacy exit status for "no directory selected" on Windows.
#[cfg(windows)]
const EXIT_NO_DIRECTORY: i32 = 144;

#[derive(Parser)]
#[command(name = "img-canon")]
#[command(
    version,
    about = "Normalize textures: opaque images to RGB PNG, transparent ones to RLE RGBA TGA",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every image under the given directories (and any files named
    /// directly), deleting superseded sources afterwards.
    Convert {
        #[arg(value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Overwrite or refuse when the canonical path holds another file.
        #[arg(long, default_value = "refuse", value_name = "POLICY")]
        collision: CollisionPolicy,

        /// Only look at the top level of each directory.
        #[arg(long)]
        no_recursive: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Append a horizontally mirrored copy of each image to its right.
    Mirror {
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Cut each eye-texture atlas into eight tiles (`_1`..`_8`).
    #[command(name = "split-eyes")]
    SplitEyes {
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Worker threads (0 = one per logical CPU).
    #[arg(short = 'j', long, default_value_t = 0)]
    threads: usize,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,

    #[arg(long)]
    no_progress: bool,

    #[arg(short, long)]
    verbose: bool,

    /// Also write a daily-rotated log file into this directory.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

impl CommonArgs {
    fn show_progress(&self) -> bool {
        !self.no_progress && !self.json
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let common = match &cli.command {
        Commands::Convert { common, .. }
        | Commands::Mirror { common, .. }
        | Commands::SplitEyes { common, .. } => common,
    };
    setup_logging(common);
    let cancel = install_cancel_handler();

    match cli.command {
        Commands::Convert {
            inputs,
            collision,
            no_recursive,
            common,
        } => run_convert(inputs, collision, !no_recursive, &common, &cancel),
        Commands::Mirror { files, common } => {
            run_recipe_command(files, Recipe::MirrorConcat, &common, &cancel)
        }
        Commands::SplitEyes { files, common } => {
            run_recipe_command(files, Recipe::SplitEyes, &common, &cancel)
        }
    }
}

fn setup_logging(common: &CommonArgs) {
    let mut config = LogConfig::new().with_level(if common.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });
    if let Some(dir) = &common.log_dir {
        config = config.with_log_dir(dir);
    }
    if let Err(e) = init_logging("img-canon", config) {
        eprintln!("⚠️  Logging disabled: {:#}", e);
    }
}

/// First Ctrl-C stops new files from starting; in-flight ones finish.
fn install_cancel_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::SeqCst) {
            eprintln!("\n⏹️  Cancelling: waiting for running files to finish...");
        }
    }) {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }
    cancel
}

fn exit_no_directory() -> anyhow::Result<()> {
    #[cfg(windows)]
    std::process::exit(EXIT_NO_DIRECTORY);

    #[cfg(not(windows))]
    Ok(())
}

fn run_convert(
    mut inputs: Vec<PathBuf>,
    collision: CollisionPolicy,
    recursive: bool,
    common: &CommonArgs,
    cancel: &AtomicBool,
) -> anyhow::Result<()> {
    if inputs.is_empty() && console::user_attended() {
        if let Some(dir) = interactive::prompt_directory().context("Directory prompt failed")? {
            inputs.push(dir);
        }
    }

    inputs.retain(|input| {
        let exists = input.exists();
        if !exists {
            tracing::warn!(path = %input.display(), "Input does not exist");
        }
        exists
    });
    if inputs.is_empty() {
        tracing::info!("No directory selected");
        return exit_no_directory();
    }

    // directories only
    for dir in inputs.iter().filter(|p| p.is_dir()) {
        if let Err(e) = check_safe_for_destructive(dir, "convert") {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    let config = CanonConfig::new()
        .with_collision_policy(collision)
        .with_recursive(recursive)
        .with_threads(common.threads)
        .with_progress(common.show_progress());
    let pool = build_thread_pool(config.threads).context("Failed to create thread pool")?;

    let report = convert_inputs(&inputs, &config, &pool, cancel);

    if common.json {
        println!("{}", report.to_json()?);
    } else {
        report.print();
    }
    Ok(())
}

fn run_recipe_command(
    mut files: Vec<PathBuf>,
    recipe: Recipe,
    common: &CommonArgs,
    cancel: &AtomicBool,
) -> anyhow::Result<()> {
    if files.is_empty() && console::user_attended() {
        files = interactive::prompt_files().context("File prompt failed")?;
    }
    if files.is_empty() {
        tracing::info!("Nothing selected");
        return Ok(());
    }

    let pool = build_thread_pool(common.threads).context("Failed to create thread pool")?;
    let report = run_recipe(&files, recipe, &pool, cancel, common.show_progress());

    if common.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print(recipe);
    }
    Ok(())
}
