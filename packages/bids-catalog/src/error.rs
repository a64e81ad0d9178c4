use crate::entity::Entity;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid selection key '{key}'. Must be one of: {allowed}")]
    InvalidSelectionKey { key: String, allowed: String },

    #[error("Malformed range '{value}' for column '{column}': {reason}")]
    MalformedRange {
        column: Entity,
        value: String,
        reason: String,
    },

    #[error("Invalid prefix in '{value}' for {entity}")]
    InvalidPrefix { entity: Entity, value: String },

    #[error("Cannot build a path without a {0}")]
    MissingEntity(Entity),

    #[error("Dataset root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Dataset root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("Cannot read dataset root {root}: {source}")]
    RootUnreadable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalogs point at different roots: {left} and {right}")]
    RootMismatch { left: PathBuf, right: PathBuf },

    #[error("Scan cancelled")]
    ScanCancelled,

    #[error("Dataset has {count} invalid file(s): {summary}")]
    DirtyCatalog { count: usize, summary: String },

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Why a path could not be turned into an [`EntityRecord`](crate::EntityRecord).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("path has no file name")]
    MissingFileName,

    #[error("path is not valid UTF-8")]
    NonUtf8,

    #[error("file name has no stem")]
    EmptyStem,

    #[error("missing {0} directory token")]
    MissingDirectoryToken(Entity),

    #[error("token is not of the form key-value")]
    MalformedToken,

    #[error("unknown entity key '{0}'")]
    UnknownKey(String),

    #[error("{0} appears more than once in the file name")]
    DuplicateEntity(Entity),

    #[error("file name does not end with a suffix")]
    MissingSuffix,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot decode {}: {kind} (at '{component}')", path.display())]
pub struct DecodeError {
    pub path: PathBuf,
    pub component: String,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(path: impl Into<PathBuf>, component: impl Into<String>, kind: DecodeErrorKind) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
            kind,
        }
    }
}

/// A single naming-convention rule broken by a path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("no {0} directory above the file")]
    MissingDirectory(Entity),

    #[error("subject directory '{0}' must start with 'sub-'")]
    SubjectDirectory(String),

    #[error("session directory '{0}' must start with 'ses-'")]
    SessionDirectory(String),

    #[error("token '{0}' is not of the form key-value")]
    MalformedToken(String),

    #[error("token '{token}' uses unknown key '{key}'")]
    UnknownKey { token: String, key: String },

    #[error("subject '{filename}' in file name does not match directory subject '{directory}'")]
    SubjectMismatch { directory: String, filename: String },

    #[error("session '{filename}' in file name does not match directory session '{directory}'")]
    SessionMismatch { directory: String, filename: String },
}

/// Every rule a path breaks, collected in one pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: PathBuf,
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} breaks {} naming rule(s)",
            self.path.display(),
            self.violations.len()
        )?;
        for (i, violation) in self.violations.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, violation)?;
        }
        Ok(())
    }
}
