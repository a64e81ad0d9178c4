use crate::catalog::{Catalog, ErrorKind, ErrorRecord, FileId, FileRecord, FileTimes};
use crate::codec::PathCodec;
use crate::config::CatalogConfig;
use crate::entity::EntityRecord;
use crate::error::{CatalogError, Result};
use crate::validate::Validator;
use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// What happened to one candidate file.
enum Outcome {
    Indexed(FileRecord),
    Rejected(ErrorRecord),
    Skipped,
    Cancelled,
}

/// Walks a dataset root and builds a [`Catalog`].
///
/// ```no_run
/// use bids_catalog::{CatalogConfig, Scanner};
/// use tokio_util::sync::CancellationToken;
///
/// let token = CancellationToken::new();
/// let catalog = Scanner::new(CatalogConfig::default())
///     .with_cancellation(token.clone())
///     .scan("/data/study", "*")?;
/// println!("{}", catalog.summary());
/// # Ok::<(), bids_catalog::CatalogError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    config: CatalogConfig,
    codec: PathCodec,
    validator: &'static Validator,
    cancel: Option<CancellationToken>,
}

impl Scanner {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            codec: PathCodec::new(),
            validator: Validator::global(),
            cancel: None,
        }
    }

    /// Stop scanning once `token` is cancelled. Checked between files.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Scan with the pattern encoded from the fields set in `query`.
    pub fn scan_query(&self, root: impl AsRef<Path>, query: &EntityRecord) -> Result<Catalog> {
        let pattern = self.codec.encode_pattern(query);
        self.scan(root, &pattern)
    }

    /// Index every regular file matching `root/**/<pattern>`.
    ///
    /// Files that fail to decode, validate or stat land in the error table;
    /// only problems with `root` itself fail the scan.
    pub fn scan(&self, root: impl AsRef<Path>, pattern: &str) -> Result<Catalog> {
        let root = check_root(root.as_ref())?;
        crate::profile_scope!(format!("scan {}", root.display()));

        log::info!("Scanning {} for '{}'", root.display(), pattern);

        let (candidates, mut errors) = self.candidates(&root, pattern)?;
        log::debug!("{} candidate file(s) under {}", candidates.len(), root.display());

        let outcomes: Vec<Outcome> = if self.config.parallel {
            candidates.par_iter().map(|path| self.index_file(path)).collect()
        } else {
            candidates.iter().map(|path| self.index_file(path)).collect()
        };

        let mut records = Vec::with_capacity(outcomes.len());
        let mut skipped = 0usize;
        for outcome in outcomes {
            match outcome {
                Outcome::Indexed(record) => records.push(record),
                Outcome::Rejected(error) => errors.push(error),
                Outcome::Skipped => skipped += 1,
                Outcome::Cancelled => return Err(CatalogError::ScanCancelled),
            }
        }
        if self.is_cancelled() {
            return Err(CatalogError::ScanCancelled);
        }

        log::info!(
            "Indexed {} file(s) under {} ({} rejected, {} skipped)",
            records.len(),
            root.display(),
            errors.len(),
            skipped
        );

        Ok(Catalog::from_records(root, records, errors))
    }

    /// Like [`Scanner::scan`], but fails with [`CatalogError::DirtyCatalog`]
    /// if any file was rejected.
    pub fn strict_scan(&self, root: impl AsRef<Path>, pattern: &str) -> Result<Catalog> {
        let catalog = self.scan(root, pattern)?;
        let errors = catalog.errors();
        if errors.is_empty() {
            return Ok(catalog);
        }

        let count_of = |kind: ErrorKind| errors.iter().filter(|e| e.kind() == kind).count();
        Err(CatalogError::DirtyCatalog {
            count: errors.len(),
            summary: format!(
                "decode: {}, validation: {}, io: {}",
                count_of(ErrorKind::Decode),
                count_of(ErrorKind::Validation),
                count_of(ErrorKind::Io)
            ),
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Regular files matching the pattern, plus traversal failures.
    fn candidates(&self, root: &Path, pattern: &str) -> Result<(Vec<PathBuf>, Vec<ErrorRecord>)> {
        let full = format!(
            "{}/**/{}",
            Pattern::escape(&root.to_string_lossy()),
            pattern.trim_start_matches('/')
        );
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: !self.config.follow_hidden,
        };

        let mut files = Vec::new();
        let mut errors = Vec::new();
        for entry in glob::glob_with(&full, options)? {
            if self.is_cancelled() {
                return Err(CatalogError::ScanCancelled);
            }
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Cannot read {}: {}", e.path().display(), e.error());
                    errors.push(ErrorRecord::new(
                        FileId::from_path_hash(e.path()),
                        e.path().to_path_buf(),
                        ErrorKind::Io,
                        e.error().to_string(),
                    ));
                }
            }
        }

        files.sort();
        files.dedup();
        Ok((files, errors))
    }

    fn index_file(&self, path: &Path) -> Outcome {
        if self.is_cancelled() {
            return Outcome::Cancelled;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if self.config.is_skipped(&name) {
            log::debug!("Skipping marked file {}", path.display());
            return Outcome::Skipped;
        }

        let entities = match self.codec.decode(path) {
            Ok(entities) => entities,
            Err(e) => return reject(path, ErrorKind::Decode, e.to_string()),
        };

        if let Err(e) = self.validator.validate(path) {
            return reject(path, ErrorKind::Validation, e.to_string());
        }

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => return reject(path, ErrorKind::Io, e.to_string()),
        };
        let times = match FileTimes::from_metadata(&metadata) {
            Ok(times) => times,
            Err(e) => return reject(path, ErrorKind::Io, e.to_string()),
        };

        Outcome::Indexed(FileRecord::new(
            FileId::from_metadata(path, &metadata),
            path.to_path_buf(),
            entities,
            times,
        ))
    }
}

fn reject(path: &Path, kind: ErrorKind, message: String) -> Outcome {
    log::warn!("Rejected {} ({}): {}", path.display(), kind, message);
    Outcome::Rejected(ErrorRecord::new(
        FileId::for_path(path),
        path.to_path_buf(),
        kind,
        message,
    ))
}

/// Existing, readable, canonical root directory.
fn check_root(root: &Path) -> Result<PathBuf> {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CatalogError::RootNotFound(root.to_path_buf()))
        }
        Err(source) => {
            return Err(CatalogError::RootUnreadable {
                root: root.to_path_buf(),
                source,
            })
        }
    };
    if !metadata.is_dir() {
        return Err(CatalogError::RootNotADirectory(root.to_path_buf()));
    }

    let unreadable = |source| CatalogError::RootUnreadable {
        root: root.to_path_buf(),
        source,
    };
    std::fs::read_dir(root).map_err(unreadable)?;
    root.canonicalize().map_err(unreadable)
}
