//! The in-memory dataset table.
//!
//! A [`Catalog`] is a view (a sorted list of row positions) over a shared,
//! immutable record table. Filtering and set operations build new views;
//! records themselves are never copied or mutated.

use crate::config::CatalogConfig;
use crate::entity::{Entity, EntityRecord};
use crate::error::Result;
use crate::scan::Scanner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stable identity of a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileId {
    Inode { device: u64, inode: u64 },
    /// Used where the platform has no inode numbers or metadata is unreadable
    PathHash { hash: u64 },
}

impl FileId {
    #[cfg(unix)]
    pub fn from_metadata(_path: &Path, metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        FileId::Inode {
            device: metadata.dev(),
            inode: metadata.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(path: &Path, _metadata: &Metadata) -> Self {
        Self::from_path_hash(path)
    }

    /// Identity of `path`, falling back to a path hash when it cannot be stat'ed.
    pub fn for_path(path: &Path) -> Self {
        match std::fs::metadata(path) {
            Ok(metadata) => Self::from_metadata(path, &metadata),
            Err(_) => Self::from_path_hash(path),
        }
    }

    pub fn from_path_hash(path: &Path) -> Self {
        let digest = blake3::hash(path.to_string_lossy().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        FileId::PathHash {
            hash: u64::from_le_bytes(bytes),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileId::Inode { device, inode } => write!(f, "{device}:{inode}"),
            FileId::PathHash { hash } => write!(f, "#{hash:016x}"),
        }
    }
}

/// Filesystem timestamps of an indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    pub accessed: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// Inode change time on Unix, creation time elsewhere
    pub changed: DateTime<Utc>,
}

impl FileTimes {
    pub fn from_metadata(metadata: &Metadata) -> std::io::Result<Self> {
        let accessed: DateTime<Utc> = metadata.accessed()?.into();
        let modified: DateTime<Utc> = metadata.modified()?.into();

        #[cfg(unix)]
        let changed = {
            use std::os::unix::fs::MetadataExt;
            DateTime::<Utc>::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32)
                .unwrap_or(modified)
        };
        #[cfg(not(unix))]
        let changed = metadata
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified);

        Ok(Self {
            accessed,
            modified,
            changed,
        })
    }
}

/// One valid, indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    id: FileId,
    path: PathBuf,
    entities: EntityRecord,
    times: FileTimes,
}

impl FileRecord {
    pub(crate) fn new(id: FileId, path: PathBuf, entities: EntityRecord, times: FileTimes) -> Self {
        Self {
            id,
            path,
            entities,
            times,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    /// Absolute path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entities(&self) -> &EntityRecord {
        &self.entities
    }

    pub fn times(&self) -> &FileTimes {
        &self.times
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Decode,
    Validation,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Decode => "decode",
            ErrorKind::Validation => "validation",
            ErrorKind::Io => "io",
        })
    }
}

/// A file the scan could not index, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    id: FileId,
    path: PathBuf,
    kind: ErrorKind,
    message: String,
}

impl ErrorRecord {
    pub(crate) fn new(id: FileId, path: PathBuf, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id,
            path,
            kind,
            message: message.into(),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path.display(), self.message)
    }
}

/// Rows sorted by path, indexed by identity.
#[derive(Debug, Default)]
pub(crate) struct RecordTable {
    records: Vec<FileRecord>,
    index: HashMap<FileId, usize>,
}

impl RecordTable {
    /// Sort by path and drop later rows that repeat an identity (hard links).
    pub(crate) fn new(mut records: Vec<FileRecord>) -> Self {
        records.sort_by(|a, b| a.path.cmp(&b.path));

        let mut index = HashMap::with_capacity(records.len());
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if index.contains_key(&record.id) {
                log::debug!(
                    "Skipping {}: same file as an indexed path",
                    record.path.display()
                );
                continue;
            }
            index.insert(record.id, kept.len());
            kept.push(record);
        }

        Self {
            records: kept,
            index,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn row(&self, row: usize) -> &FileRecord {
        &self.records[row]
    }

    pub(crate) fn position(&self, id: &FileId) -> Option<usize> {
        self.index.get(id).copied()
    }
}

/// Valid records plus the error log of one scan.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: Arc<PathBuf>,
    table: Arc<RecordTable>,
    rows: Vec<usize>,
    errors: Arc<Vec<ErrorRecord>>,
}

impl Catalog {
    /// Scan `root` for files matching the fields set in `query`.
    pub fn new(root: impl AsRef<Path>, query: &EntityRecord) -> Result<Self> {
        Scanner::new(CatalogConfig::default()).scan_query(root, query)
    }

    /// Scan every file under `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::new(root, &EntityRecord::new())
    }

    /// Scan `root` with a glob pattern relative to any dataset level below it.
    pub fn scan(root: impl AsRef<Path>, pattern: &str) -> Result<Self> {
        Scanner::new(CatalogConfig::default()).scan(root, pattern)
    }

    /// Like [`Catalog::scan`], but any rejected file is an error.
    pub fn strict_scan(root: impl AsRef<Path>, pattern: &str) -> Result<Self> {
        Scanner::new(CatalogConfig::default()).strict_scan(root, pattern)
    }

    pub(crate) fn from_records(
        root: PathBuf,
        records: Vec<FileRecord>,
        mut errors: Vec<ErrorRecord>,
    ) -> Self {
        errors.sort_by(|a, b| a.path.cmp(&b.path));
        let table = RecordTable::new(records);
        let rows = (0..table.len()).collect();
        Self {
            root: Arc::new(root),
            table: Arc::new(table),
            rows,
            errors: Arc::new(errors),
        }
    }

    pub(crate) fn from_parts(
        root: Arc<PathBuf>,
        table: Arc<RecordTable>,
        rows: Vec<usize>,
        errors: Arc<Vec<ErrorRecord>>,
    ) -> Self {
        Self {
            root,
            table,
            rows,
            errors,
        }
    }

    /// Same table and errors, different rows.
    pub(crate) fn with_rows(&self, rows: Vec<usize>) -> Self {
        Self {
            root: Arc::clone(&self.root),
            table: Arc::clone(&self.table),
            rows,
            errors: Arc::clone(&self.errors),
        }
    }

    pub(crate) fn table(&self) -> &Arc<RecordTable> {
        &self.table
    }

    pub(crate) fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub(crate) fn root_arc(&self) -> &Arc<PathBuf> {
        &self.root
    }

    pub(crate) fn errors_arc(&self) -> &Arc<Vec<ErrorRecord>> {
        &self.errors
    }

    /// Canonical dataset root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Valid records in path order.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.rows.iter().map(move |&row| self.table.row(row))
    }

    pub fn valid(&self) -> Vec<&FileRecord> {
        self.records().collect()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.records().map(FileRecord::path).collect()
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn ids(&self) -> BTreeSet<FileId> {
        self.records().map(FileRecord::id).collect()
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.table
            .position(&id)
            .is_some_and(|row| self.rows.binary_search(&row).is_ok())
    }

    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        if self.contains(id) {
            self.table.position(&id).map(|row| self.table.row(row))
        } else {
            None
        }
    }

    /// True when both catalogs hold the same files under the same root.
    pub fn same_records(&self, other: &Catalog) -> bool {
        self.root == other.root && self.ids() == other.ids()
    }

    /// Sorted distinct values of `entity` over the visible rows.
    pub fn unique(&self, entity: Entity) -> Vec<String> {
        self.records()
            .filter_map(|record| record.entities().get(entity))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.unique(Entity::Subject)
    }

    pub fn sessions(&self) -> Vec<String> {
        self.unique(Entity::Session)
    }

    pub fn datatypes(&self) -> Vec<String> {
        self.unique(Entity::Datatype)
    }

    pub fn tasks(&self) -> Vec<String> {
        self.unique(Entity::Task)
    }

    pub fn runs(&self) -> Vec<String> {
        self.unique(Entity::Run)
    }

    pub fn acquisitions(&self) -> Vec<String> {
        self.unique(Entity::Acquisition)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.unique(Entity::Description)
    }

    pub fn suffixes(&self) -> Vec<String> {
        self.unique(Entity::Suffix)
    }

    pub fn extensions(&self) -> Vec<String> {
        self.unique(Entity::Extension)
    }
}
