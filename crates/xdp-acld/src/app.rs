//! Subcommand implementations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use acl_dataplane::{AclStore, AclTable, Verdict, MAX_BUCKET_RULES};
use acl_orch::allocator::table_shape;
use acl_orch::{AclOrch, AclOrchConfig, Inconsistency, RulesFile};
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::dump::{load_dump, save_dump};
use crate::frames::{load_frames, Frame};
use crate::worker::{ClassifyStats, SnapshotPublisher, WorkerPool};

/// Where the store to classify against comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    Rules(PathBuf),
    Dump(PathBuf),
}

impl StoreSource {
    /// A dump if one is given, otherwise the rules file or the configured
    /// default.
    pub fn resolve(config: &DaemonConfig, rules: Option<PathBuf>, dump: Option<PathBuf>) -> Self {
        match dump {
            Some(path) => StoreSource::Dump(path),
            None => StoreSource::Rules(rules_path(config, rules)),
        }
    }
}

pub fn rules_path(config: &DaemonConfig, rules: Option<PathBuf>) -> PathBuf {
    rules.unwrap_or_else(|| config.rules.default_file.clone())
}

/// Loads a rules file into a fresh control plane.
pub fn build_orch(config: &DaemonConfig, rules: &Path) -> Result<AclOrch> {
    let file = RulesFile::load(rules)?;
    let mut orch = AclOrch::new(AclOrchConfig {
        max_tables: config.dataplane.max_tables,
        table_id_seed: config.rules.table_id_seed,
    });
    let count = orch
        .load_rules(&file)
        .with_context(|| format!("Failed to install rules from {}", rules.display()))?;
    info!(
        rules = count,
        tables = orch.table_count(),
        path = %rules.display(),
        "Rules loaded"
    );
    Ok(orch)
}

pub fn load_store(config: &DaemonConfig, source: &StoreSource) -> Result<Arc<AclStore>> {
    match source {
        StoreSource::Rules(path) => Ok(build_orch(config, path)?.snapshot()),
        StoreSource::Dump(path) => {
            let store = load_dump(path)?;
            info!(
                tables = store.table_count(),
                rules = store.rule_count(),
                path = %path.display(),
                "Store dump loaded"
            );
            Ok(Arc::new(store))
        }
    }
}

// ============ check ============

/// Summary printed by `check`.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub tables: Vec<AclTable>,
    pub rules: usize,
    pub buckets: usize,
    pub fullest_bucket: usize,
    pub issues: Vec<Inconsistency>,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tables: {}", self.tables.len())?;
        for table in &self.tables {
            let (src, dst) = table_shape(table);
            writeln!(f, "  {:#010x}  src /{:<2}  dst /{}", table.id, src, dst)?;
        }
        writeln!(f, "rules: {}", self.rules)?;
        writeln!(
            f,
            "buckets: {} (fullest {}/{})",
            self.buckets, self.fullest_bucket, MAX_BUCKET_RULES
        )?;
        for issue in &self.issues {
            writeln!(f, "inconsistent: {}", issue)?;
        }
        Ok(())
    }
}

pub fn check(config: &DaemonConfig, rules: &Path) -> Result<CheckReport> {
    let orch = build_orch(config, rules)?;
    let store = orch.store();
    let report = CheckReport {
        tables: orch.tables().to_vec(),
        rules: store.rule_count(),
        buckets: store.bucket_count(),
        fullest_bucket: store.buckets().map(|(_, b)| b.len()).max().unwrap_or(0),
        issues: orch.validate(),
    };
    for issue in &report.issues {
        warn!(%issue, "Store inconsistency");
    }
    Ok(report)
}

// ============ classify ============

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameVerdict {
    pub line: usize,
    pub verdict: Verdict,
}

impl fmt::Display for FrameVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            Verdict::Matched { table_id, action } => {
                write!(f, "{}: {} table={:#010x}", self.line, action, table_id)
            }
            Verdict::Exhausted => write!(f, "{}: {} no-match", self.line, self.verdict.action()),
            Verdict::Skipped(skip) => {
                write!(f, "{}: {} skipped={:?}", self.line, self.verdict.action(), skip)
            }
        }
    }
}

pub async fn classify(
    config: &DaemonConfig,
    source: &StoreSource,
    frames: &Path,
    workers: Option<usize>,
) -> Result<(Vec<FrameVerdict>, ClassifyStats)> {
    let store = load_store(config, source)?;
    let frames: Vec<Frame> = load_frames(frames)?;
    let lines: Vec<usize> = frames.iter().map(|f| f.line).collect();
    let bytes: Vec<Vec<u8>> = frames.into_iter().map(|f| f.bytes).collect();

    let publisher = SnapshotPublisher::new(store);
    let pool = WorkerPool::new(
        workers.unwrap_or(config.dataplane.workers),
        config.dataplane.batch_size,
    );
    let report = pool.run(publisher.subscribe(), Arc::new(bytes)).await?;

    info!(
        frames = report.stats.frames,
        matched = report.stats.matched,
        skipped = report.stats.skipped,
        workers = pool.workers(),
        "Classification finished"
    );

    let verdicts = lines
        .into_iter()
        .zip(report.verdicts)
        .map(|(line, verdict)| FrameVerdict { line, verdict })
        .collect();
    Ok((verdicts, report.stats))
}

// ============ dump ============

pub fn dump(config: &DaemonConfig, rules: &Path, out: &Path) -> Result<usize> {
    let orch = build_orch(config, rules)?;
    let issues = orch.validate();
    if !issues.is_empty() {
        bail!("refusing to dump an inconsistent store ({} issues)", issues.len());
    }
    let written = save_dump(orch.store(), out)?;
    info!(bytes = written, path = %out.display(), "Store dump written");
    Ok(written)
}
