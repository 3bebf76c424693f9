//! Classification workers.
//!
//! The control plane publishes store snapshots on a watch channel. Each
//! worker takes the latest snapshot at the start of a batch and keeps it
//! for the whole batch, so a publish never changes the rules under a frame
//! being classified.

use std::sync::Arc;

use acl_dataplane::{classify_frame, AclStore, Verdict};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

/// A classification run that did not produce a verdict for every frame.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("classification worker failed, {unclassified} frames unclassified: {source}")]
    Join {
        unclassified: usize,
        #[source]
        source: JoinError,
    },

    #[error("{unclassified} frames unclassified")]
    Incomplete { unclassified: usize },
}

type WorkerOutput = (Vec<(usize, Verdict)>, ClassifyStats);

/// Publishes store snapshots to workers.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<AclStore>>,
    generation: u64,
}

impl SnapshotPublisher {
    pub fn new(initial: Arc<AclStore>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, generation: 0 }
    }

    /// Replaces the current snapshot. Batches already running keep the one
    /// they started with.
    pub fn publish(&mut self, store: Arc<AclStore>) {
        self.generation += 1;
        info!(
            generation = self.generation,
            tables = store.table_count(),
            rules = store.rule_count(),
            "Publishing ACL snapshot"
        );
        self.tx.send_replace(store);
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AclStore>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<AclStore> {
        self.tx.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifyStats {
    pub frames: u64,
    pub matched: u64,
    pub exhausted: u64,
    pub skipped: u64,
    pub batches: u64,
}

impl ClassifyStats {
    fn record(&mut self, verdict: &Verdict) {
        self.frames += 1;
        match verdict {
            Verdict::Matched { .. } => self.matched += 1,
            Verdict::Exhausted => self.exhausted += 1,
            Verdict::Skipped(_) => self.skipped += 1,
        }
    }

    fn merge(&mut self, other: &ClassifyStats) {
        self.frames += other.frames;
        self.matched += other.matched;
        self.exhausted += other.exhausted;
        self.skipped += other.skipped;
        self.batches += other.batches;
    }
}

/// Verdicts in input order plus counters.
#[derive(Debug, Clone, Default)]
pub struct ClassifyReport {
    pub verdicts: Vec<Verdict>,
    pub stats: ClassifyStats,
}

/// Fixed-size pool classifying frames against published snapshots.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    batch_size: usize,
}

impl WorkerPool {
    /// Both sizes are clamped to at least one.
    pub fn new(workers: usize, batch_size: usize) -> Self {
        Self {
            workers: workers.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Classifies `frames`, dealing batches to workers round robin.
    ///
    /// Fails if any worker dies before reporting its verdicts.
    pub async fn run(
        &self,
        snapshots: watch::Receiver<Arc<AclStore>>,
        frames: Arc<Vec<Vec<u8>>>,
    ) -> Result<ClassifyReport, WorkerError> {
        let batches: Vec<(usize, usize)> = (0..frames.len())
            .step_by(self.batch_size)
            .map(|start| (start, (start + self.batch_size).min(frames.len())))
            .collect();

        let mut tasks = JoinSet::new();
        for worker in 0..self.workers {
            let assigned: Vec<(usize, usize)> = batches
                .iter()
                .copied()
                .skip(worker)
                .step_by(self.workers)
                .collect();
            if assigned.is_empty() {
                continue;
            }
            let rx = snapshots.clone();
            let frames = Arc::clone(&frames);
            tasks.spawn(async move { classify_batches(worker, rx, frames, assigned).await });
        }

        join_workers(tasks, frames.len()).await
    }
}

async fn join_workers(
    mut tasks: JoinSet<WorkerOutput>,
    frames: usize,
) -> Result<ClassifyReport, WorkerError> {
    let mut slots: Vec<Option<Verdict>> = vec![None; frames];
    let mut stats = ClassifyStats::default();
    let mut failure = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((results, worker_stats)) => {
                for (index, verdict) in results {
                    slots[index] = Some(verdict);
                }
                stats.merge(&worker_stats);
            }
            Err(e) => {
                error!(error = %e, "Classification worker failed");
                failure.get_or_insert(e);
            }
        }
    }

    let unclassified = slots.iter().filter(|slot| slot.is_none()).count();
    if let Some(source) = failure {
        return Err(WorkerError::Join {
            unclassified,
            source,
        });
    }
    if unclassified != 0 {
        return Err(WorkerError::Incomplete { unclassified });
    }

    let verdicts = slots.into_iter().flatten().collect();
    Ok(ClassifyReport { verdicts, stats })
}

async fn classify_batches(
    worker: usize,
    snapshots: watch::Receiver<Arc<AclStore>>,
    frames: Arc<Vec<Vec<u8>>>,
    batches: Vec<(usize, usize)>,
) -> WorkerOutput {
    let mut results = Vec::new();
    let mut stats = ClassifyStats::default();

    for (start, end) in batches {
        let store = snapshots.borrow().clone();
        for (index, frame) in frames[start..end].iter().enumerate() {
            let verdict = classify_frame(&store, frame);
            stats.record(&verdict);
            results.push((start + index, verdict));
        }
        stats.batches += 1;
        debug!(worker, start, end, "Batch classified");
        tokio::task::yield_now().await;
    }

    (results, stats)
}
