use std::{
    fs,
    io::Read,
    panic,
    path::PathBuf,
    process,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use renderpod_core::{JobContext, JobRequest, StorageSettings, WorkerSettings};
use tracing::level_filters::LevelFilter;

use crate::logging::init_logging;

mod logging;

pub const DEFAULT_LOG_PATH: &str = "./logs/renderpod.log";

#[derive(Parser, Debug)]
#[command(name = "renderpod")]
#[command(about = "Serverless Blender animation render worker", version)]
struct Cli {
    /// Log file path
    #[arg(long)]
    logs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one render job and print the response JSON to stdout
    Run {
        /// Job request JSON file; `-` reads from stdin
        #[arg(short, long)]
        job: String,

        /// Root directory for per-job workspaces
        #[arg(long)]
        workroot: Option<PathBuf>,

        /// Leave the job workspace on disk after a successful job
        #[arg(long, action)]
        keep_workspace: bool,
    },

    /// Validate the deployment: external binaries and storage settings
    Check,
}

fn main() -> Result<()> {
    let orig_hook = panic::take_hook();
    // Catch panics in child threads
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(1);
    }));
    run()
}

#[tokio::main]
async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let logs = cli.logs.unwrap_or_else(|| cwd.join(DEFAULT_LOG_PATH));
    let _guard = init_logging(LevelFilter::INFO, &logs, LevelFilter::DEBUG)?;

    match cli.command {
        Commands::Run {
            job,
            workroot,
            keep_workspace,
        } => {
            let request = read_request(&job)?;
            let mut settings = WorkerSettings::from_env();
            if let Some(workroot) = workroot {
                settings.workroot = path_abs::PathAbs::new(&workroot)?.as_path().to_path_buf();
            }
            settings.keep_workspace |= keep_workspace;

            // The response is the deliverable, error payloads included; only
            // worker-level faults exit non-zero.
            let response = JobContext::new(settings).run(&request).await;
            println!("{}", serde_json::to_string(&response)?);
        },
        Commands::Check => check(&WorkerSettings::from_env())?,
    }

    Ok(())
}

fn read_request(source: &str) -> Result<JobRequest> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read job request from stdin")?;
        buffer
    } else {
        fs::read_to_string(source)
            .with_context(|| format!("failed to read job request from {source}"))?
    };
    serde_json::from_str(&raw).context("job request is not valid JSON")
}

fn check(settings: &WorkerSettings) -> Result<()> {
    let mut problems = 0usize;

    match which::which(&settings.blender) {
        Ok(path) => println!("blender:  {}", path.display()),
        Err(e) => {
            problems += 1;
            println!("blender:  `{}` not usable: {e}", settings.blender);
        },
    }
    match which::which(&settings.zip) {
        Ok(path) => println!("zip:      {}", path.display()),
        Err(e) => {
            problems += 1;
            println!("zip:      `{}` not usable: {e}", settings.zip);
        },
    }
    match StorageSettings::from_env() {
        Ok(storage) => println!("storage:  s3://{} ({})", storage.bucket, storage.region),
        Err(e) => {
            problems += 1;
            println!("storage:  {e}");
        },
    }
    println!("workroot: {}", settings.workroot.display());

    if problems > 0 {
        bail!("deployment check found {problems} problem(s)");
    }
    Ok(())
}
