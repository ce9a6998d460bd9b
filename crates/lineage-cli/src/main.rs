use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{Level, info, warn};

use lineage_core::impls::{FsRecordStore, NoThrottle, RandomThrottle};
use lineage_core::ports::{Queue, Throttle};
use lineage_core::queue::InMemoryQueue;
use lineage_core::source::HttpSourceReader;
use lineage_core::traversal::seed;
use lineage_core::worker::wait_drained;
use lineage_core::{AncestorId, Config, TraversalWorker, WorkerGroup};

/// Discover the ancestors of one person, level by level, and store one JSON
/// record per (level, person).
#[derive(Debug, Parser)]
#[command(name = "lineage", version)]
struct Args {
    /// Source identifier of the person to start from.
    #[arg(long)]
    ancestor_id: u64,

    /// Deepest level to discover (1 = only the starting person, at most 16).
    #[arg(long, default_value_t = 1)]
    max_depth: u32,

    /// Concurrent workers (overrides LINEAGE_WORKERS).
    #[arg(long)]
    workers: Option<usize>,

    /// Record directory (overrides LINEAGE_STORE_DIR).
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Skip the random pause between pages.
    #[arg(long)]
    no_throttle: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }
    if let Some(dir) = args.store_dir {
        config.store_dir = dir;
    }

    let source = Arc::new(
        HttpSourceReader::new(&config.source).context("Failed to create source reader")?,
    );
    let store = Arc::new(
        FsRecordStore::open(&config.store_dir)
            .await
            .context("Failed to open record store")?,
    );
    info!("Record store at {:?}", store.dir());

    let queue = Arc::new(InMemoryQueue::new(config.retry.clone()));
    let throttle: Arc<dyn Throttle> = if args.no_throttle {
        Arc::new(NoThrottle)
    } else {
        Arc::new(RandomThrottle::new(config.throttle_min, config.throttle_max))
    };

    let worker = TraversalWorker::new(source, store, queue.clone(), throttle);
    let group = WorkerGroup::spawn(config.workers, queue.clone(), worker, config.task_timeout);
    info!(workers = config.workers, "Workers started");

    if let Err(e) = seed(&*queue, AncestorId::new(args.ancestor_id), args.max_depth).await {
        group.shutdown_and_join().await;
        return Err(e).context("Failed to seed traversal");
    }

    let drained = tokio::select! {
        counts = wait_drained(&*queue, Duration::from_millis(200)) => Some(counts?),
        _ = tokio::signal::ctrl_c() => None,
    };
    group.shutdown_and_join().await;

    let Some(counts) = drained else {
        let counts = queue.counts_by_state().await?;
        warn!(?counts, "Interrupted before the traversal finished");
        return Ok(());
    };

    info!(
        processed = counts.succeeded,
        dead = counts.dead,
        "Traversal finished"
    );
    for dead in queue.dead_letters().await {
        warn!(
            message_id = %dead.id,
            body = %dead.body,
            receives = dead.receive_count,
            error = dead.last_error.as_deref().unwrap_or("-"),
            "Dead-lettered task"
        );
    }
    if counts.dead > 0 {
        anyhow::bail!("{} task(s) could not be processed", counts.dead);
    }
    Ok(())
}
