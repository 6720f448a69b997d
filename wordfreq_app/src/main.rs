use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wordfreq::{
    DirStore, FileSource, FinalResult, IntermediateStore, JobConfig, LocalFileSource,
    MemoryStore, Scheduler,
};

const INTERMEDIATE_FOLDER: &str = "./intermediate/";
const FINAL_RESULT_FILE: &str = "result.txt";

/// Count word frequencies of a text file with parallel map and reduce tasks.
#[derive(Debug, Parser)]
#[command(name = "wordfreq", version)]
struct Args {
    /// Text file to count.
    input: PathBuf,

    /// Where to write the sorted `word:count` lines.
    #[arg(short, long, default_value = FINAL_RESULT_FILE)]
    output: PathBuf,

    /// JSON file with job settings; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bytes per map task.
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Maximum number of tasks running at once.
    #[arg(long)]
    workers: Option<usize>,

    /// Directory for the per-partition intermediate records.
    #[arg(long, default_value = INTERMEDIATE_FOLDER, conflicts_with = "in_memory")]
    intermediate_dir: PathBuf,

    /// Keep intermediate records in memory instead of on disk.
    #[arg(long)]
    in_memory: bool,

    /// Remove intermediate records once the job has succeeded.
    #[arg(long)]
    discard_intermediate: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn job_config(&self) -> anyhow::Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => JobConfig::default(),
        };
        if let Some(chunk_size) = self.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.discard_intermediate {
            config = config.with_retain_intermediate(false);
        }
        Ok(config)
    }
}

fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .init();
}

async fn count<F: FileSource, S: IntermediateStore>(
    config: JobConfig,
    source: F,
    store: S,
    input: &Path,
) -> anyhow::Result<FinalResult> {
    let result = Scheduler::new(config, source, store)
        .run(input)
        .await
        .with_context(|| format!("word count of {} failed", input.display()))?;
    Ok(result)
}

fn save_result(result: &FinalResult, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    result
        .write_to(BufWriter::new(file))
        .with_context(|| format!("failed to write {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.job_config()?;
    let result = if args.in_memory {
        count(config, LocalFileSource, MemoryStore::new(), &args.input).await?
    } else {
        let store = DirStore::open(&args.intermediate_dir).with_context(|| {
            format!(
                "failed to open intermediate dir {}",
                args.intermediate_dir.display()
            )
        })?;
        info!(dir = %store.dir().display(), "storing intermediate records");
        count(config, LocalFileSource, store, &args.input).await?
    };

    save_result(&result, &args.output)?;
    info!(
        words = result.len(),
        output = %args.output.display(),
        "result written"
    );
    Ok(())
}
