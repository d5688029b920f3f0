//! Pipeline execution implementation.

use super::config::OrganiserConfig;
use super::report::{CleanupFailure, DuplicateGroup, Relocation, RunReport, StageFailure};
use crate::core::destination::resolve_destination;
use crate::core::fingerprint::{encode, fingerprint};
use crate::core::loader::load_content;
use crate::core::metadata::{enrich_metadata, DateFallback, ExifProvider, MetadataProvider};
use crate::core::record::{group_duplicates, ContentDigest, FileRecord};
use crate::core::relocate::{OperationMode, RelocationAction, Relocator};
use crate::core::scanner::{FileSource, WalkDirDiscovery};
use crate::error::{OrganiserError, RecordError, Result};
use crate::events::{
    null_sender, DiscoveryEvent, Event, EventSender, PipelineEvent, PipelinePhase, RecordEvent,
    Stage,
};
use crossbeam_channel::{bounded, unbounded};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared shutdown signal for a run.
///
/// Cancelling stops discovery from feeding new records; records already
/// queued or in flight are finished.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Builder for organiser configuration
pub struct OrganiserBuilder {
    config: OrganiserConfig,
    source: Option<Box<dyn FileSource>>,
    provider: Option<Box<dyn MetadataProvider>>,
    cancel: CancellationToken,
}

impl OrganiserBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: OrganiserConfig::default(),
            source: None,
            provider: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: OrganiserConfig) -> Self {
        self.config = config;
        self
    }

    /// Directory to discover files under
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Root of the organised tree
    pub fn storage_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = Some(path.into());
        self
    }

    /// Regex matched against file names
    pub fn filename_filter(mut self, pattern: impl Into<String>) -> Self {
        self.config.filename_filter = pattern.into();
        self
    }

    pub fn operation(mut self, operation: OperationMode) -> Self {
        self.config.operation = operation;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn date_fallback(mut self, fallback: DateFallback) -> Self {
        self.config.date_fallback = fallback;
        self
    }

    pub fn prune_empty_dirs(mut self, prune: bool) -> Self {
        self.config.prune_empty_dirs = prune;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    /// Feed the pipeline from a custom source instead of walking `base_dir`
    pub fn source(mut self, source: Box<dyn FileSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Read tags with a custom provider instead of EXIF
    pub fn metadata_provider(mut self, provider: Box<dyn MetadataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Validate the configuration and build the organiser
    pub fn build(self) -> Result<Organiser> {
        let filter = self.config.validate()?;
        let source = match self.source {
            Some(source) => source,
            None => Box::new(
                WalkDirDiscovery::new(self.config.base_dir.clone(), filter)
                    .follow_symlinks(self.config.follow_symlinks),
            ),
        };

        Ok(Organiser {
            config: self.config,
            source,
            provider: self
                .provider
                .unwrap_or_else(|| Box::new(ExifProvider::new())),
            cancel: self.cancel,
        })
    }
}

impl Default for OrganiserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What a worker hands back for one record.
enum WorkerOutput {
    Planned(FileRecord),
    Relocated {
        record: FileRecord,
        action: RelocationAction,
        pruned: Vec<PathBuf>,
        cleanup: Option<RecordError>,
    },
    Failed(StageFailure),
}

/// The photo organising pipeline
pub struct Organiser {
    config: OrganiserConfig,
    source: Box<dyn FileSource>,
    provider: Box<dyn MetadataProvider>,
    cancel: CancellationToken,
}

impl Organiser {
    /// Create a new organiser builder
    pub fn builder() -> OrganiserBuilder {
        OrganiserBuilder::new()
    }

    pub fn config(&self) -> &OrganiserConfig {
        &self.config
    }

    /// Token that stops this organiser's runs when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<RunReport> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    ///
    /// Only discovery and worker-pool start-up failures are returned as
    /// errors; every per-record failure ends up in [`RunReport::failed`].
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunReport> {
        let start_time = Instant::now();
        let config = &self.config;

        tracing::info!(
            base_dir = %config.base_dir.display(),
            storage_dir = %config.storage_root().display(),
            operation = ?config.operation,
            dry_run = config.dry_run,
            workers = config.workers,
            "starting run"
        );
        events.send(Event::Pipeline(PipelineEvent::Started {
            dry_run: config.dry_run,
        }));

        // Phase 1: Discovery
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Discovering,
        }));
        events.send(Event::Discovery(DiscoveryEvent::Started {
            base_dir: config.base_dir.clone(),
        }));

        let files = match self.source.files() {
            Ok(files) => files,
            Err(error) => {
                tracing::error!(%error, "discovery failed");
                events.send(Event::Pipeline(PipelineEvent::Error {
                    message: error.to_string(),
                }));
                return Err(error.into());
            }
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|index| format!("organiser-worker-{}", index))
            .build()
            .map_err(|e| OrganiserError::Config(format!("failed to start worker pool: {}", e)))?;

        // Phase 2: Processing, overlapping with discovery
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Processing,
        }));

        let relocator = Relocator::new(config.operation);
        let (work_tx, work_rx) = bounded::<FileRecord>(config.queue_capacity);
        let (result_tx, result_rx) = unbounded::<WorkerOutput>();
        let mut collector = Collector::new(events);

        pool.in_place_scope(|scope| {
            for _ in 0..config.workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let relocator = &relocator;
                scope.spawn(move |_| {
                    for record in work_rx.iter() {
                        if result_tx.send(self.process(record, relocator)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(work_rx);
            drop(result_tx);

            for record in files {
                if self.cancel.is_cancelled() {
                    tracing::info!("cancelled, no further files will be queued");
                    break;
                }
                // The walk is lazy, so it can reach files this run already placed.
                if relocator.claims().is_claimed(record.source_path()) {
                    tracing::debug!(path = %record.source_path().display(), "skipping file placed by this run");
                    continue;
                }
                collector.discovered(&record);
                if work_tx.send(record).is_err() {
                    break;
                }
                while let Ok(output) = result_rx.try_recv() {
                    collector.collect(output);
                }
            }
            drop(work_tx);

            events.send(Event::Discovery(DiscoveryEvent::Completed {
                total_files: collector.report.discovered,
            }));

            for output in result_rx.iter() {
                collector.collect(output);
            }
        });

        // Phase 3: Reporting
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Reporting,
        }));

        let mut report = collector.finish();
        report.cancelled = self.cancel.is_cancelled();
        report.duration_ms = start_time.elapsed().as_millis() as u64;

        if report.cancelled {
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }

        let summary = report.summary();
        tracing::info!(
            discovered = summary.discovered,
            relocated = summary.relocated,
            planned = summary.planned,
            failed = summary.failed,
            duplicate_groups = summary.duplicate_groups,
            duration_ms = summary.duration_ms,
            "run finished"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed { summary }));

        Ok(report)
    }

    /// Carry one record through every stage on a worker thread.
    fn process(&self, record: FileRecord, relocator: &Relocator) -> WorkerOutput {
        match self.advance(record, relocator) {
            Ok(output) => output,
            Err(failure) => {
                tracing::warn!(
                    stage = %failure.stage,
                    kind = failure.failed.cause.kind(),
                    "{}",
                    failure.failed
                );
                WorkerOutput::Failed(failure)
            }
        }
    }

    fn advance(
        &self,
        record: FileRecord,
        relocator: &Relocator,
    ) -> std::result::Result<WorkerOutput, StageFailure> {
        let config = &self.config;

        let record = load_content(record).map_err(|f| StageFailure::new(Stage::Loading, f))?;
        let record = fingerprint(record);
        let record = enrich_metadata(record, self.provider.as_ref(), config.date_fallback);
        let record = resolve_destination(config.storage_root(), record)
            .map_err(|f| StageFailure::new(Stage::Resolving, f))?;

        if config.dry_run {
            return Ok(WorkerOutput::Planned(record));
        }

        let (record, action) = relocator
            .relocate(record)
            .map_err(|f| StageFailure::new(Stage::Relocating, f))?;

        let mut pruned = Vec::new();
        let mut cleanup = None;
        if action == RelocationAction::Moved && config.prune_empty_dirs {
            match relocator.prune_source_dirs(&record, Some(&config.base_dir)) {
                Ok(removed) => pruned = removed,
                Err(error) => cleanup = Some(error),
            }
        }

        Ok(WorkerOutput::Relocated {
            record,
            action,
            pruned,
            cleanup,
        })
    }
}

/// Accumulates worker outputs. Lives on the orchestrator thread only.
struct Collector<'a> {
    events: &'a EventSender,
    report: RunReport,
    /// Digest and source path of every fingerprinted record, failed or not.
    fingerprints: Vec<(ContentDigest, PathBuf)>,
}

impl<'a> Collector<'a> {
    fn new(events: &'a EventSender) -> Self {
        Self {
            events,
            report: RunReport::default(),
            fingerprints: Vec::new(),
        }
    }

    fn discovered(&mut self, record: &FileRecord) {
        self.report.discovered += 1;
        self.events.send(Event::Discovery(DiscoveryEvent::FileFound {
            path: record.source_path().to_path_buf(),
        }));
    }

    fn collect(&mut self, output: WorkerOutput) {
        match output {
            WorkerOutput::Planned(record) => {
                self.events.send(Event::Record(RecordEvent::Planned {
                    source: record.source_path().to_path_buf(),
                    destination: record.destination_path.clone(),
                }));
                self.report.planned.push(relocation_of(&record));
                self.remember(&record);
            }
            WorkerOutput::Relocated {
                record,
                action,
                pruned,
                cleanup,
            } => {
                if action == RelocationAction::AlreadyInPlace {
                    self.events.send(Event::Record(RecordEvent::AlreadyInPlace {
                        path: record.source_path().to_path_buf(),
                    }));
                    self.report
                        .already_in_place
                        .push(record.source_path().to_path_buf());
                } else {
                    self.events.send(Event::Record(RecordEvent::Relocated {
                        source: record.source_path().to_path_buf(),
                        destination: record.destination_path.clone(),
                    }));
                    self.report.relocated.push(relocation_of(&record));
                }

                for dir in pruned {
                    self.events
                        .send(Event::Record(RecordEvent::DirectoryPruned { path: dir.clone() }));
                    self.report.pruned_directories.push(dir);
                }

                if let Some(cause) = cleanup {
                    self.events.send(Event::Record(RecordEvent::Failed {
                        path: record.source_path().to_path_buf(),
                        stage: Stage::Cleaning,
                        message: cause.to_string(),
                    }));
                    self.report.cleanup_failures.push(CleanupFailure {
                        source: record.source_path().to_path_buf(),
                        cause,
                    });
                }

                self.remember(&record);
            }
            WorkerOutput::Failed(failure) => {
                self.events.send(Event::Record(RecordEvent::Failed {
                    path: failure.failed.source_path().to_path_buf(),
                    stage: failure.stage,
                    message: failure.failed.cause.to_string(),
                }));
                self.remember(&failure.failed.record);
                self.report.failed.push(failure);
            }
        }
    }

    fn remember(&mut self, record: &FileRecord) {
        if let Some(digest) = record.content_digest {
            self.fingerprints
                .push((digest, record.source_path().to_path_buf()));
        }
    }

    fn finish(mut self) -> RunReport {
        let groups = group_duplicates(&self.fingerprints, |(digest, _)| Some(*digest));
        self.report.duplicate_groups = groups
            .into_iter()
            .filter_map(|members| {
                let (digest, _) = members.first()?;
                Some(DuplicateGroup {
                    digest: encode(digest),
                    paths: members.iter().map(|(_, path)| path.clone()).collect(),
                })
            })
            .collect();
        self.report
    }
}

fn relocation_of(record: &FileRecord) -> Relocation {
    Relocation {
        source: record.source_path().to_path_buf(),
        destination: record.destination_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::StaticTags;
    use crate::core::scanner::StaticSource;
    use crate::events::EventChannel;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn tagged(date: &str) -> Vec<(&'static str, String)> {
        vec![("EXIF DateTimeOriginal", date.to_string())]
    }

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn builder_applies_settings() {
        let organiser = Organiser::builder()
            .base_dir("/photos/inbox")
            .storage_dir("/photos/library")
            .workers(5)
            .dry_run(true)
            .operation(OperationMode::Copy)
            .build()
            .unwrap();

        assert_eq!(organiser.config().workers, 5);
        assert!(organiser.config().dry_run);
        assert_eq!(organiser.config().storage_root(), Path::new("/photos/library"));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        assert!(matches!(
            Organiser::builder().workers(0).build(),
            Err(OrganiserError::Config(_))
        ));
        assert!(matches!(
            Organiser::builder().queue_capacity(0).build(),
            Err(OrganiserError::Config(_))
        ));
    }

    #[test]
    fn invalid_filter_discovers_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir.path().join("IMG_4228.JPG"), b"photo");

        let report = Organiser::builder()
            .base_dir(temp_dir.path())
            .filename_filter("[")
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.discovered, 0);
        assert!(!report.has_failures());
        assert!(temp_dir.path().join("IMG_4228.JPG").exists());
    }

    #[test]
    fn missing_base_dir_is_fatal() {
        let (sender, receiver) = EventChannel::new();
        let organiser = Organiser::builder()
            .base_dir("/nonexistent/inbox/for/organiser")
            .build()
            .unwrap();

        let result = organiser.run_with_events(&sender);
        drop(sender);

        assert!(matches!(result, Err(OrganiserError::Discovery(_))));
        let saw_error = receiver
            .iter()
            .any(|event| matches!(event, Event::Pipeline(PipelineEvent::Error { .. })));
        assert!(saw_error);
    }

    #[test]
    fn empty_directory_produces_empty_report() {
        let temp_dir = TempDir::new().unwrap();
        let report = Organiser::builder()
            .base_dir(temp_dir.path())
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.discovered, 0);
        assert!(report.relocated.is_empty());
        assert!(!report.has_failures());
    }

    #[test]
    fn failures_are_isolated_per_record() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path().join("inbox");
        write(&inbox.join("dated.jpg"), b"dated");
        write(&inbox.join("undated.jpg"), b"undated");

        let provider = StaticTags::new().with(b"dated".to_vec(), tagged("2015:05:04 12:00:00"));
        let source = StaticSource::new(vec![
            inbox.join("dated.jpg"),
            inbox.join("undated.jpg"),
            inbox.join("vanished.jpg"),
        ]);

        let report = Organiser::builder()
            .base_dir(&inbox)
            .operation(OperationMode::Copy)
            .source(Box::new(source))
            .metadata_provider(Box::new(provider))
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.discovered, 3);
        assert_eq!(report.relocated.len(), 1);
        assert_eq!(report.relocated[0].destination, inbox.join("2015/05/dated.jpg"));

        let mut failures: Vec<_> = report
            .failed
            .iter()
            .map(|f| (f.stage, f.failed.cause.kind()))
            .collect();
        failures.sort_by_key(|(_, kind)| *kind);
        assert_eq!(
            failures,
            vec![(Stage::Resolving, "missing-date"), (Stage::Loading, "read")]
        );
    }

    #[test]
    fn dry_run_plans_without_touching_files() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("IMG_1.JPG");
        write(&source, b"one");

        let report = Organiser::builder()
            .base_dir(temp_dir.path())
            .dry_run(true)
            .metadata_provider(Box::new(
                StaticTags::new().with(b"one".to_vec(), tagged("2019:12:31 23:59:59")),
            ))
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.planned.len(), 1);
        assert_eq!(
            report.planned[0].destination,
            temp_dir.path().join("2019/12/IMG_1.JPG")
        );
        assert!(report.relocated.is_empty());
        assert!(source.exists());
        assert!(!temp_dir.path().join("2019").exists());
    }

    #[test]
    fn cancelled_run_queues_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir.path().join("a.jpg"), b"a");

        let organiser = Organiser::builder()
            .base_dir(temp_dir.path())
            .build()
            .unwrap();
        organiser.cancellation_token().cancel();

        let (sender, receiver) = EventChannel::new();
        let report = organiser.run_with_events(&sender).unwrap();
        drop(sender);

        assert!(report.cancelled);
        assert_eq!(report.discovered, 0);
        assert!(temp_dir.path().join("a.jpg").exists());
        let saw_cancel = receiver
            .iter()
            .any(|event| matches!(event, Event::Pipeline(PipelineEvent::Cancelled)));
        assert!(saw_cancel);
    }

    #[test]
    fn identical_content_is_reported_as_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir.path().join("a/one.jpg"), b"same bytes");
        write(&temp_dir.path().join("b/two.jpg"), b"same bytes");
        write(&temp_dir.path().join("c/three.jpg"), b"other bytes");

        let report = Organiser::builder()
            .base_dir(temp_dir.path())
            .dry_run(true)
            .build()
            .unwrap()
            .run()
            .unwrap();

        // No EXIF in these bytes, so every record fails resolution, but the
        // digests were already taken.
        assert_eq!(report.failed.len(), 3);
        assert_eq!(report.duplicate_groups.len(), 1);
        assert_eq!(report.duplicate_groups[0].paths.len(), 2);
        assert_eq!(report.duplicate_groups[0].digest.len(), 64);
    }
}
