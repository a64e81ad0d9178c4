//! Catalog and query engine for BIDS-style dataset layouts.
//!
//! ```no_run
//! use bids_catalog::{Catalog, Criteria};
//!
//! let catalog = Catalog::open("/data/study")?;
//! let rest = catalog.select(&Criteria::new().with("task", "rest").with("run", "1-3"))?;
//! for record in rest.valid() {
//!     println!("{}", record.path().display());
//! }
//! # Ok::<(), bids_catalog::CatalogError>(())
//! ```

pub mod algebra;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod profiling;
pub mod query;
pub mod scan;
pub mod summary;
pub mod validate;

pub use catalog::{Catalog, ErrorKind, ErrorRecord, FileId, FileRecord, FileTimes};
pub use codec::PathCodec;
pub use config::CatalogConfig;
pub use entity::{normalize, Entity, EntityRecord, ENTITIES};
pub use error::{CatalogError, DecodeError, DecodeErrorKind, Result, ValidationError, Violation};
pub use query::{Criteria, Criterion};
pub use scan::Scanner;
pub use summary::{CatalogSummary, EntitySummary, ErrorCounts};
pub use validate::Validator;
