//! Run the engine against in-memory stores.
//!
//! Phase 1 syncs a batch of generated files. Phase 2 edits one file on both
//! sides, syncs it into a conflict and resolves it with the active
//! strategy's preference.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sync_core::content_hash;
use sync_engine::{
    ChannelObserver, EngineConfig, FileId, FileRepository, InstantScheduler, MemoryCloudRepository,
    MemoryFileRepository, StrategyFactory, StrategyKind, SyncEvent, SyncOrchestrator,
};

/// Simulated latency of local store calls.
const LOCAL_LATENCY: Duration = Duration::from_millis(2);
/// Simulated latency of cloud calls.
const CLOUD_LATENCY: Duration = Duration::from_millis(25);

/// Run the demo command.
pub async fn run(
    file_count: usize,
    strategy: Option<StrategyKind>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(kind) = strategy {
        config.sync.strategy = kind;
    }

    let files = MemoryFileRepository::new().with_latency(LOCAL_LATENCY);
    let cloud = MemoryCloudRepository::new().with_latency(CLOUD_LATENCY);
    seed(&files, file_count);

    // Scheduled delays are recorded, not slept.
    let factory = StrategyFactory::new()
        .with_filter(config.selective.clone())
        .with_scheduler(Arc::new(InstantScheduler::new()));
    let orchestrator = SyncOrchestrator::with_factory(
        &config,
        Arc::new(files.clone()),
        Arc::new(cloud.clone()),
        factory,
    );

    let (observer, mut events) = ChannelObserver::new();
    orchestrator.add_observer(observer.clone());
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    println!(
        "=== cloudsync demo ({} files, {} strategy, {} concurrent) ===",
        file_count,
        config.sync.strategy,
        config.sync.max_concurrent_syncs
    );
    println!();

    let results = orchestrator.synchronize_all_pending().await?;
    let transferred: u64 = results.iter().map(|r| r.bytes_transferred()).sum();
    let failed = results.iter().filter(|r| !r.is_success()).count();

    if let Some(first) = files.files().into_iter().find(|f| f.status.is_synced()) {
        conflict_round(&orchestrator, &files, &cloud, first.id).await?;
    }

    drop(observer);
    printer.await.context("Event printer panicked")?;

    println!();
    println!("Summary:");
    println!("  Files:       {}", results.len());
    println!("  Failed:      {}", failed);
    println!("  Transferred: {} bytes", transferred);
    println!("  Uploads:     {}", cloud.uploads().len());
    println!(
        "  Peak concurrent uploads: {}",
        cloud.peak_concurrent_uploads()
    );
    Ok(())
}

/// Add generated files, every third one an image.
fn seed(files: &MemoryFileRepository, count: usize) {
    for n in 0..count {
        let (name, mime) = if n % 3 == 2 {
            (format!("photo-{n}.png"), "image/png")
        } else {
            (format!("document-{n}.txt"), "text/plain")
        };
        let content = format!("{name}\n").repeat(64 * (n + 1)).into_bytes();
        files.add_file(&name, "/demo", mime, content);
    }
}

/// Edit `id` locally and remotely, sync into a conflict, then resolve it.
async fn conflict_round(
    orchestrator: &SyncOrchestrator,
    files: &MemoryFileRepository,
    cloud: &MemoryCloudRepository,
    id: FileId,
) -> Result<()> {
    let Some(mut remote) = cloud.remote(&id) else {
        return Ok(());
    };

    println!();
    println!("--- conflict round: {} ---", remote.name);

    let remote_content = b"edited on another device\n".to_vec();
    remote.version += 2;
    remote.content_hash = content_hash(&remote_content);
    remote.size = remote_content.len() as u64;
    remote.modified_at = remote.modified_at + chrono::Duration::minutes(1);
    cloud.put_remote(remote, remote_content);

    let local = files
        .save_file_content(id, b"edited here\n".to_vec())
        .await?;
    let result = orchestrator.synchronize(local).await?;
    if result.conflicting_remote().is_none() {
        return Ok(());
    }

    let resolved = orchestrator.resolve_conflict_automatically(id).await?;
    println!(
        "Resolved {} -> version {} ({})",
        resolved.name,
        resolved.version,
        resolved.status.label()
    );
    Ok(())
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::Started(file) => println!("  started    {}", file.name),
        SyncEvent::Progress { file, progress } => {
            tracing::debug!("{} at {:.0}%", file.name, progress * 100.0);
        }
        SyncEvent::Completed(result) => println!(
            "  completed  {} ({} bytes in {:?})",
            result.file().name,
            result.bytes_transferred(),
            result.time_taken()
        ),
        SyncEvent::Failed(result) => println!(
            "  failed     {}: {}",
            result.file().name,
            result.error_message().unwrap_or("unknown error")
        ),
        SyncEvent::ConflictDetected { local, remote } => println!(
            "  conflict   {} (local v{}, remote v{})",
            local.name, local.version, remote.version
        ),
        SyncEvent::BatchStarted { count } => println!("Batch of {} files started", count),
        SyncEvent::BatchCompleted(results) => {
            println!("Batch finished with {} results", results.len())
        }
        SyncEvent::QueueUpdated { pending } => tracing::debug!("{} files queued", pending),
    }
}
