//! Set operations between catalogs of the same dataset root.
//!
//! Files are compared by [`FileId`], so two scans of the same directory
//! combine even though they built separate record tables.

use crate::catalog::{Catalog, ErrorRecord, FileId, FileRecord, RecordTable};
use crate::error::{CatalogError, Result};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

impl Catalog {
    /// Files in either catalog.
    pub fn union(&self, other: &Catalog) -> Result<Catalog> {
        self.combine(other, |a, b| a.union(b).copied().collect())
    }

    /// Files in both catalogs.
    pub fn intersect(&self, other: &Catalog) -> Result<Catalog> {
        self.combine(other, |a, b| a.intersection(b).copied().collect())
    }

    /// Files in `self` but not in `other`.
    pub fn difference(&self, other: &Catalog) -> Result<Catalog> {
        self.combine(other, |a, b| a.difference(b).copied().collect())
    }

    /// Files in exactly one of the two catalogs.
    pub fn symmetric_difference(&self, other: &Catalog) -> Result<Catalog> {
        self.combine(other, |a, b| a.symmetric_difference(b).copied().collect())
    }

    fn combine(
        &self,
        other: &Catalog,
        op: impl FnOnce(&BTreeSet<FileId>, &BTreeSet<FileId>) -> BTreeSet<FileId>,
    ) -> Result<Catalog> {
        if self.root() != other.root() {
            return Err(CatalogError::RootMismatch {
                left: self.root().to_path_buf(),
                right: other.root().to_path_buf(),
            });
        }

        let ids = op(&self.ids(), &other.ids());
        let errors = merge_errors(self, other);

        if Arc::ptr_eq(self.table(), other.table()) {
            let table = Arc::clone(self.table());
            let mut rows: Vec<usize> = ids.iter().filter_map(|id| table.position(id)).collect();
            rows.sort_unstable();
            return Ok(Catalog::from_parts(
                Arc::clone(self.root_arc()),
                table,
                rows,
                errors,
            ));
        }

        let records: Vec<FileRecord> = ids
            .iter()
            .filter_map(|&id| self.get(id).or_else(|| other.get(id)))
            .cloned()
            .collect();
        let table = RecordTable::new(records);
        let rows = (0..table.len()).collect();
        Ok(Catalog::from_parts(
            Arc::clone(self.root_arc()),
            Arc::new(table),
            rows,
            errors,
        ))
    }
}

/// Both error tables, each file once, sorted by path.
fn merge_errors(left: &Catalog, right: &Catalog) -> Arc<Vec<ErrorRecord>> {
    if Arc::ptr_eq(left.errors_arc(), right.errors_arc()) {
        return Arc::clone(left.errors_arc());
    }

    let mut seen = HashSet::new();
    let mut merged: Vec<ErrorRecord> = left
        .errors()
        .iter()
        .chain(right.errors())
        .filter(|e| seen.insert((e.id(), e.path().to_path_buf())))
        .cloned()
        .collect();
    merged.sort_by(|a, b| a.path().cmp(b.path()));
    Arc::new(merged)
}
