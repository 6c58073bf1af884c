use anyhow::{Context, Result};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::graph::{DependencyRecorder, Edge, RunResult};
use super::package::{Package, PackageNameResolver, DEFAULT_SENTINEL};
use super::resolver::SymbolCanonicalizer;
use super::scanner::PackageScanner;
use super::walker::{walk_type_references, TypeReferenceNode};
use crate::semantic::{
    CompiledModel, ConfigError, Diagnostic, FileId, SemanticEngine, Severity, TypeScriptEngine,
};

/// Library-level settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Name of the folder whose children are packages
    pub sentinel: String,
    /// Worker count; 1 keeps the run strictly sequential
    pub jobs: usize,
    /// Collapse identical edges within a package
    pub dedupe: bool,
    /// Restrict the run to these packages; empty means all of them
    pub packages: Vec<String>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            jobs: 1,
            dedupe: false,
            packages: Vec::new(),
        }
    }
}

impl AnalyzerOptions {
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Error)]
pub enum PackageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("analysis panicked: {0}")]
    Panicked(String),
}

/// What happened to one package
#[derive(Debug)]
pub enum PackageOutcome {
    Analyzed { package: String, edges: Vec<Edge> },
    Failed { package: String, error: PackageError },
}

/// Counters for a streamed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub analyzed: usize,
    pub failed: usize,
    pub edges: usize,
    pub cancelled: bool,
}

impl RunStats {
    fn record(&mut self, outcome: &PackageOutcome) {
        match outcome {
            PackageOutcome::Analyzed { edges, .. } => {
                self.analyzed += 1;
                self.edges += edges.len();
            }
            PackageOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Drives one pass over every package of a repository
pub struct DependencyAnalyzer<E = TypeScriptEngine> {
    engine: E,
    options: AnalyzerOptions,
    names: PackageNameResolver,
    cancelled: Arc<AtomicBool>,
}

impl DependencyAnalyzer<TypeScriptEngine> {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self::with_engine(TypeScriptEngine::new(), options)
    }
}

impl Default for DependencyAnalyzer<TypeScriptEngine> {
    fn default() -> Self {
        Self::new(AnalyzerOptions::default())
    }
}

impl<E> DependencyAnalyzer<E>
where
    E: SemanticEngine + Sync,
{
    pub fn with_engine(engine: E, options: AnalyzerOptions) -> Self {
        let names = PackageNameResolver::new(options.sentinel.clone());
        Self {
            engine,
            options,
            names,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the flag stops the run before the next package starts
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Packages this run will visit, in name order
    pub fn enumerate(&self, root: &Path) -> Result<Vec<Package>> {
        let packages = PackageScanner::new(self.options.sentinel.clone()).scan_packages(root)?;
        if self.options.packages.is_empty() {
            return Ok(packages);
        }

        for wanted in &self.options.packages {
            if !packages.iter().any(|package| &package.name == wanted) {
                log::warn!("package '{wanted}' not found under {}", root.display());
            }
        }
        Ok(packages
            .into_iter()
            .filter(|package| self.options.packages.contains(&package.name))
            .collect())
    }

    /// Run to completion and collect everything in memory
    pub fn analyze(&self, root: &Path) -> Result<RunResult> {
        let mut result = RunResult::default();
        self.analyze_streaming(root, |outcome| match outcome {
            PackageOutcome::Analyzed { edges, .. } => result.edges.extend(edges),
            PackageOutcome::Failed { package, .. } => result.failed.push(package),
        })?;
        Ok(result)
    }

    /// Hand each package's outcome to `sink` as soon as it is known.
    ///
    /// With more than one job the sink is called from worker threads, one
    /// call at a time, in completion order.
    pub fn analyze_streaming<F>(&self, root: &Path, sink: F) -> Result<RunStats>
    where
        F: FnMut(PackageOutcome) + Send,
    {
        let packages = self.enumerate(root)?;
        let jobs = self.options.jobs.max(1);
        log::info!("analyzing {} packages with {} job(s)", packages.len(), jobs);

        let stats = if jobs == 1 {
            self.run_sequential(&packages, sink)
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("failed to start worker pool")?;
            pool.install(|| self.run_parallel(&packages, sink))
        };

        log::info!(
            "analyzed {} packages, {} failed, {} edges",
            stats.analyzed,
            stats.failed,
            stats.edges
        );
        Ok(stats)
    }

    fn run_sequential<F>(&self, packages: &[Package], mut sink: F) -> RunStats
    where
        F: FnMut(PackageOutcome),
    {
        let mut stats = RunStats::default();
        for package in packages {
            if self.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            let outcome = self.analyze_package(package);
            stats.record(&outcome);
            sink(outcome);
        }
        stats
    }

    fn run_parallel<F>(&self, packages: &[Package], sink: F) -> RunStats
    where
        F: FnMut(PackageOutcome) + Send,
    {
        let shared = Mutex::new((sink, RunStats::default()));
        packages.par_iter().for_each(|package| {
            if self.is_cancelled() {
                return;
            }
            let outcome = self.analyze_package(package);
            let mut guard = lock(&shared);
            let (sink, stats) = &mut *guard;
            stats.record(&outcome);
            sink(outcome);
        });

        let (_, mut stats) = shared.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        stats.cancelled = self.is_cancelled();
        stats
    }

    /// Analyze one package; failures become a [`PackageOutcome::Failed`]
    pub fn analyze_package(&self, package: &Package) -> PackageOutcome {
        log::debug!("analyzing {}", package.name);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.collect_edges(package)))
            .unwrap_or_else(|payload| Err(PackageError::Panicked(panic_message(payload))));

        match result {
            Ok(edges) => PackageOutcome::Analyzed {
                package: package.name.clone(),
                edges,
            },
            Err(error) => {
                log::warn!("skipping {}: {error}", package.name);
                PackageOutcome::Failed {
                    package: package.name.clone(),
                    error,
                }
            }
        }
    }

    fn collect_edges(&self, package: &Package) -> Result<Vec<Edge>, PackageError> {
        let mut on_diagnostic = |diagnostic: &Diagnostic| match diagnostic.severity {
            Severity::Unrecoverable => log::warn!("{}: {diagnostic}", package.name),
            Severity::Recoverable => log::debug!("{}: {diagnostic}", package.name),
        };
        let model = self.engine.compile(&package.config_path, &mut on_diagnostic)?;

        let canonicalizer = SymbolCanonicalizer::new(&package.name, &self.names);
        let mut recorder =
            DependencyRecorder::new(package.name.clone()).with_dedupe(self.options.dedupe);

        for (index, file) in model.source_files().iter().enumerate() {
            // Dependency files are resolution targets only
            if self.names.package_of(&file.path) != package.name {
                continue;
            }
            let file_id = FileId(index as u32);
            walk_type_references(file.tree.root_node(), &mut |reference: TypeReferenceNode<'_>| {
                for dependency in canonicalizer.resolve(&model, file_id, &reference) {
                    log::trace!(
                        "{}:{} -> {}::{} (declared on line {})",
                        file.path.display(),
                        reference.line(),
                        dependency.package,
                        dependency.type_name,
                        dependency.declared_at
                    );
                    recorder.record(dependency);
                }
            });
        }

        log::debug!("{}: {} edges", package.name, recorder.len());
        Ok(recorder.into_edges())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
