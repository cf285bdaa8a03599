//! Index build orchestrator.
//!
//! The orchestrator owns the corpus and the published snapshot. A build runs
//! the codebase and grep indexers over a corpus and, only if both finish and
//! nothing newer has started, swaps in a fresh [`Snapshot`]. Readers clone the
//! `Arc` and never see a half-built index.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use astra_config::{IndexConfig, ValidatorConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::codebase::{BuildStats, CodebaseIndex};
use crate::corpus::{Corpus, SourceFile};
use crate::error::{IndexError, Result};
use crate::grep::{GrepIndex, GrepOptions};
use crate::progress::{BuildObserver, BuildPhase, ProgressStats};
use crate::validator::ResponseValidator;

/// A failure recorded by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildError {
    pub phase: BuildPhase,
    pub message: String,
}

/// Both indexes and the corpus they were built from.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub corpus: Corpus,
    pub codebase: CodebaseIndex,
    pub grep: GrepIndex,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    /// Corpus of the most recently requested build
    corpus: Corpus,
    snapshot: Option<Arc<Snapshot>>,
    errors: Vec<BuildError>,
    /// Token of the build currently allowed to publish
    cancel: CancellationToken,
}

/// Forwards progress to the caller's observer and mirrors the counters.
///
/// Once its build is cancelled it stops mirroring, so a replaced build
/// cannot overwrite the progress of the build that replaced it.
struct MirrorObserver<'a> {
    inner: &'a mut (dyn BuildObserver + Send),
    progress: Arc<Mutex<ProgressStats>>,
    cancel: CancellationToken,
}

impl BuildObserver for MirrorObserver<'_> {
    fn on_progress(&mut self, percent: u8, message: &str, stats: Option<&ProgressStats>) {
        if let Some(stats) = stats {
            if !self.cancel.is_cancelled() {
                if let Ok(mut progress) = self.progress.lock() {
                    *progress = *stats;
                }
            }
        }
        self.inner.on_progress(percent, message, stats);
    }

    fn on_chat_message(&mut self, message: &str) {
        self.inner.on_chat_message(message);
    }
}

/// Coordinates full rebuilds and publishes snapshots.
pub struct IndexOrchestrator {
    config: IndexConfig,
    state: RwLock<OrchestratorState>,
    progress: Arc<Mutex<ProgressStats>>,
}

impl IndexOrchestrator {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            state: RwLock::new(OrchestratorState::default()),
            progress: Arc::new(Mutex::new(ProgressStats::default())),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Rebuild everything from `corpus`.
    ///
    /// Starting a build cancels any build still in flight; the replaced build
    /// returns [`IndexError::Cancelled`] and publishes nothing.
    pub async fn build(
        &self,
        corpus: Corpus,
        observer: &mut (dyn BuildObserver + Send),
    ) -> Result<BuildStats> {
        let cancel = {
            let mut state = self.state.write().await;
            state.cancel.cancel();
            state.cancel = CancellationToken::new();
            state.corpus = corpus.clone();
            state.cancel.clone()
        };
        self.set_phase(BuildPhase::Parsing);

        let start = Instant::now();
        info!("Orchestrated build of {} files", corpus.len());
        observer.on_chat_message(&format!("Indexing {} files...", corpus.len()));

        let mut mirror = MirrorObserver {
            inner: observer,
            progress: Arc::clone(&self.progress),
            cancel: cancel.clone(),
        };
        let outcome = self.build_snapshot(&corpus, &mut mirror, &cancel).await;

        let mut state = self.state.write().await;
        match outcome {
            Ok(_) if cancel.is_cancelled() => {
                info!("Discarding build superseded before publication");
                Err(IndexError::Cancelled(BuildPhase::Complete))
            }
            Ok((snapshot, stats)) => {
                state.snapshot = Some(Arc::new(snapshot));
                self.set_phase(BuildPhase::Complete);
                info!(
                    "Published snapshot: {} files, {} symbols in {}ms",
                    stats.files,
                    stats.symbols,
                    start.elapsed().as_millis()
                );
                mirror.inner.on_chat_message(&format!(
                    "Indexed {} files ({} symbols, {} functions)",
                    stats.files, stats.symbols, stats.functions
                ));
                Ok(stats)
            }
            Err(IndexError::Cancelled(phase)) => {
                info!("Build cancelled during {}", phase);
                Err(IndexError::Cancelled(phase))
            }
            Err(e) => {
                let phase = e.phase().unwrap_or_else(|| self.progress().phase);
                error!("Index build failed during {}: {}", phase, e);
                state.errors.push(BuildError {
                    phase,
                    message: e.to_string(),
                });
                if !cancel.is_cancelled() {
                    self.set_phase(BuildPhase::Failed);
                }
                Err(e)
            }
        }
    }

    async fn build_snapshot(
        &self,
        corpus: &Corpus,
        observer: &mut MirrorObserver<'_>,
        cancel: &CancellationToken,
    ) -> Result<(Snapshot, BuildStats)> {
        let (codebase, stats) =
            CodebaseIndex::build_cancellable(corpus, &self.config, observer, cancel).await?;
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled(BuildPhase::Complete));
        }
        let grep = GrepIndex::build(corpus, &GrepOptions::from(&self.config))?;
        Ok((
            Snapshot {
                corpus: corpus.clone(),
                codebase,
                grep,
            },
            stats,
        ))
    }

    /// Add or replace one file, then rebuild.
    pub async fn add_file(
        &self,
        path: &str,
        file: SourceFile,
        observer: &mut (dyn BuildObserver + Send),
    ) -> Result<BuildStats> {
        let corpus = self.state.read().await.corpus.with_file(path, file);
        self.build(corpus, observer).await
    }

    /// Remove one file, then rebuild.
    pub async fn remove_file(
        &self,
        path: &str,
        observer: &mut (dyn BuildObserver + Send),
    ) -> Result<BuildStats> {
        let corpus = self.state.read().await.corpus.without_file(path);
        self.build(corpus, observer).await
    }

    /// Drop the corpus and snapshot, cancelling any running build.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.corpus = Corpus::new();
        state.snapshot = None;
        state.errors.clear();
        if let Ok(mut progress) = self.progress.lock() {
            *progress = ProgressStats::default();
        }
        info!("Index cleared");
    }

    /// The most recently published snapshot.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.read().await.snapshot.clone()
    }

    /// Counters of the latest build.
    pub fn progress(&self) -> ProgressStats {
        self.progress
            .lock()
            .map(|p| *p)
            .unwrap_or_default()
    }

    pub fn phase(&self) -> BuildPhase {
        self.progress().phase
    }

    /// Failures recorded since the last [`clear`](Self::clear).
    pub async fn errors(&self) -> Vec<BuildError> {
        self.state.read().await.errors.clone()
    }

    pub async fn corpus(&self) -> Corpus {
        self.state.read().await.corpus.clone()
    }

    /// A validator over the published snapshot, or over nothing if no
    /// build has completed. Files of a build still in flight are unknown.
    pub async fn validator(&self, config: &ValidatorConfig) -> ResponseValidator {
        let snapshot = self.snapshot().await.unwrap_or_default();
        ResponseValidator::new(&snapshot.codebase, &snapshot.corpus, config.clone())
    }

    /// Attach a summary to a symbol of the published snapshot.
    pub async fn set_summary(&self, path: &str, name: &str, summary: &str) -> bool {
        let mut state = self.state.write().await;
        match state.snapshot.as_mut() {
            Some(snapshot) => Arc::make_mut(snapshot)
                .codebase
                .set_summary(path, name, summary),
            None => false,
        }
    }

    pub async fn set_file_summary(&self, path: &str, summary: &str) -> bool {
        let mut state = self.state.write().await;
        match state.snapshot.as_mut() {
            Some(snapshot) => Arc::make_mut(snapshot)
                .codebase
                .set_file_summary(path, summary),
            None => false,
        }
    }

    fn set_phase(&self, phase: BuildPhase) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.phase = phase;
        }
    }
}

impl Default for IndexOrchestrator {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}
