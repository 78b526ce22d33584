//! Discovery engine: find source files, parse them in parallel, merge results

use crate::cache::{DiscoveryCache, SourceHash};
use crate::error::{DiscoveryError, Result};
use crate::materialize::{materialize_scope, ModuleModel, Scope};
use crate::syntax::{parse_module, ParsedModule};
use crate::visitor::discover_entities;
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wetwire_model::{DiscoveredEntity, EntityKind};

/// Default package whose constructor imports are tracked
pub const DEFAULT_PACKAGE: &str = "wetwire_github";

/// Discovery configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// File extensions (without dot) treated as source modules
    pub extensions: Vec<String>,
    /// Package name whose imports may alias constructors
    pub package: String,
    /// Maximum walk depth below the root
    pub max_depth: Option<usize>,
    /// Honor `.gitignore` files while walking
    pub respect_gitignore: bool,
}

impl DiscoveryOptions {
    /// With extensions
    #[inline]
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// With constructor package
    #[inline]
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// With max walk depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            package: DEFAULT_PACKAGE.to_string(),
            max_depth: None,
            respect_gitignore: true,
        }
    }
}

/// Result of discovering a set of files
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Successfully parsed modules, in path order
    pub modules: Vec<Arc<ParsedModule>>,
    /// Discovered entities, in module then binding order
    pub entities: Vec<DiscoveredEntity>,
    /// File-scoped failures
    pub errors: Vec<DiscoveryError>,
}

impl DiscoveryReport {
    /// Name-resolution scope over every parsed module
    #[must_use]
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(self.modules.iter().map(Arc::as_ref))
    }

    /// Materialize workflows across all modules
    #[must_use]
    pub fn model(&self) -> ModuleModel {
        materialize_scope(&self.scope())
    }

    /// Entities of one kind
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &DiscoveredEntity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Whether every file parsed
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Finds and parses declarative source modules
#[derive(Debug, Clone, Default)]
pub struct DiscoveryEngine {
    options: DiscoveryOptions,
    cache: Option<DiscoveryCache>,
}

impl DiscoveryEngine {
    /// Create engine
    #[inline]
    #[must_use]
    pub fn new(options: DiscoveryOptions) -> Self {
        Self {
            options,
            cache: None,
        }
    }

    /// Attach a parse cache
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: DiscoveryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Options in use
    #[inline]
    #[must_use]
    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Source files under `root`, sorted.
    ///
    /// A file root is returned as-is. Hidden entries and `__pycache__` are skipped.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::RootNotFound`] if `root` does not exist.
    pub fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
        }
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(root)
            .max_depth(self.options.max_depth)
            .hidden(true)
            .git_ignore(self.options.respect_gitignore)
            .git_global(false)
            .git_exclude(false)
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != "__pycache__")
            .build();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Failed to read directory entry");
                    continue;
                }
            };
            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            if is_file && self.options.accepts(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        debug!(root = %root.display(), files = files.len(), "collected source files");
        Ok(files)
    }

    /// Parse a source text, consulting the cache
    ///
    /// # Errors
    /// Returns [`DiscoveryError::Syntax`] for unparsable source.
    pub fn parse_source(&self, path: &Path, source: &str) -> Result<Arc<ParsedModule>> {
        let parse = || parse_module(path, source, &self.options.package);
        match &self.cache {
            Some(cache) => cache.get_or_try_insert_with(SourceHash::compute(path, source), parse),
            None => parse().map(Arc::new),
        }
    }

    /// Read and parse one file
    ///
    /// # Errors
    /// Returns [`DiscoveryError::Io`] or [`DiscoveryError::Syntax`].
    pub fn parse_file(&self, path: &Path) -> Result<Arc<ParsedModule>> {
        let source =
            std::fs::read_to_string(path).map_err(|e| DiscoveryError::io_error(path, e))?;
        self.parse_source(path, &source)
    }

    /// Discover entities in `files`.
    ///
    /// Files are parsed in parallel; results are merged afterwards in the
    /// given order. Per-file failures land in [`DiscoveryReport::errors`].
    #[must_use]
    pub fn discover(&self, files: &[PathBuf]) -> DiscoveryReport {
        let parsed: Vec<Result<Arc<ParsedModule>>> =
            files.par_iter().map(|path| self.parse_file(path)).collect();

        let mut report = DiscoveryReport::default();
        for result in parsed {
            match result {
                Ok(module) => {
                    report.entities.extend(discover_entities(&module));
                    report.modules.push(module);
                }
                Err(err) => {
                    warn!(error = %err, "Skipping file");
                    report.errors.push(err);
                }
            }
        }
        info!(
            files = files.len(),
            entities = report.entities.len(),
            errors = report.errors.len(),
            "discovery complete"
        );
        report
    }

    /// Collect files under `root` and discover them
    ///
    /// # Errors
    /// Returns [`DiscoveryError::RootNotFound`] if `root` does not exist.
    pub fn discover_directory(&self, root: &Path) -> Result<DiscoveryReport> {
        let files = self.collect_files(root)?;
        Ok(self.discover(&files))
    }
}
