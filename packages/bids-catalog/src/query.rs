//! Row selection over a [`Catalog`].
//!
//! A selection maps column names to one or more literals. Literals of one
//! column are OR-ed, columns are AND-ed. Each literal is read as:
//!
//! 1. a range `start-stop` when the column is numeric (`start <= v < stop`,
//!    either bound may be `*`),
//! 2. a glob pattern when it contains `*`, `?` or `[`,
//! 3. an exact value otherwise.

use crate::catalog::{Catalog, FileRecord};
use crate::entity::{normalize, Entity, EntityRecord, ENTITIES, KEY_SEPARATOR};
use crate::error::{CatalogError, Result};
use std::collections::BTreeMap;

const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// One or more literals for a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criterion(Vec<String>);

impl Criterion {
    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push_unique(&mut self, value: String) {
        if !self.0.contains(&value) {
            self.0.push(value);
        }
    }
}

/// `"001"` is one literal; `"001,002"` and `"[001, 002]"` are two.
impl From<&str> for Criterion {
    fn from(value: &str) -> Self {
        let value = value.trim();
        let inner = value
            .strip_prefix('[')
            .and_then(|v| v.strip_suffix(']'))
            .unwrap_or(value);
        Criterion(
            inner
                .split(',')
                .map(|v| v.trim().trim_matches(|c| c == '\'' || c == '"'))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<String> for Criterion {
    fn from(value: String) -> Self {
        Criterion::from(value.as_str())
    }
}

impl<T: Into<String>> From<Vec<T>> for Criterion {
    fn from(values: Vec<T>) -> Self {
        Criterion(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<String>, const N: usize> From<[T; N]> for Criterion {
    fn from(values: [T; N]) -> Self {
        Criterion(values.into_iter().map(Into::into).collect())
    }
}

/// Column name -> criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria(BTreeMap<String, Criterion>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        self.insert(column, criterion);
        self
    }

    /// Set the criterion of `column`, replacing any previous one.
    pub fn insert(&mut self, column: impl Into<String>, criterion: impl Into<Criterion>) {
        self.0.insert(column.into(), criterion.into());
    }

    /// Per-column union of both literal lists.
    pub fn merge(mut self, other: Criteria) -> Self {
        for (column, criterion) in other.0 {
            let entry = self.0.entry(column).or_default();
            for value in criterion.0 {
                entry.push_unique(value);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Criterion> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> + '_ {
        self.0.iter().map(|(column, criterion)| (column.as_str(), criterion))
    }

    /// One exact literal per populated field of `record`.
    pub fn from_record(record: &EntityRecord) -> Self {
        record
            .iter()
            .filter_map(|(entity, value)| value.map(|v| (entity, v)))
            .fold(Self::new(), |criteria, (entity, value)| {
                criteria.with(entity.name(), vec![value])
            })
    }
}

impl std::ops::Add for Criteria {
    type Output = Criteria;

    fn add(self, rhs: Criteria) -> Criteria {
        self.merge(rhs)
    }
}

#[derive(Debug)]
enum Predicate {
    Exact(String),
    Wildcard(glob::Pattern),
    Range { start: Option<u64>, stop: Option<u64> },
}

impl Predicate {
    fn matches(&self, value: &str) -> bool {
        match self {
            Predicate::Exact(expected) => value == expected,
            Predicate::Wildcard(pattern) => pattern.matches(value),
            Predicate::Range { start, stop } => match value.parse::<u64>() {
                Ok(v) => start.map_or(true, |s| s <= v) && stop.map_or(true, |s| v < s),
                Err(_) => false,
            },
        }
    }
}

/// Compiled criterion for one column.
#[derive(Debug)]
struct ColumnFilter {
    entity: Entity,
    predicates: Vec<Predicate>,
}

impl ColumnFilter {
    fn matches(&self, record: &FileRecord) -> bool {
        match record.entities().get(self.entity) {
            Some(value) => self.predicates.iter().any(|p| p.matches(value)),
            None => false,
        }
    }
}

impl Catalog {
    /// Rows matching every column of `criteria`.
    ///
    /// Empty criteria select every row. The receiver is left untouched; the
    /// result shares its record and error tables.
    pub fn select(&self, criteria: &Criteria) -> Result<Catalog> {
        let filters = self.compile(criteria)?;
        let rows = self
            .rows()
            .iter()
            .copied()
            .filter(|&row| {
                let record = self.table().row(row);
                filters.iter().all(|filter| filter.matches(record))
            })
            .collect();
        Ok(self.with_rows(rows))
    }

    /// Rows not matched by [`Catalog::select`] with the same criteria.
    pub fn remove(&self, criteria: &Criteria) -> Result<Catalog> {
        let selected = self.select(criteria)?;
        let keep = selected.rows();
        let rows = self
            .rows()
            .iter()
            .copied()
            .filter(|row| keep.binary_search(row).is_err())
            .collect();
        Ok(self.with_rows(rows))
    }

    /// True when every populated value of `entity` in this view is all digits.
    pub fn is_numeric(&self, entity: Entity) -> bool {
        let mut seen = false;
        for value in self.records().filter_map(|r| r.entities().get(entity)) {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
            seen = true;
        }
        seen
    }

    fn compile(&self, criteria: &Criteria) -> Result<Vec<ColumnFilter>> {
        let mut columns = Vec::with_capacity(criteria.0.len());
        for (column, criterion) in criteria.iter() {
            let entity = Entity::from_name(column).ok_or_else(|| CatalogError::InvalidSelectionKey {
                key: column.to_string(),
                allowed: ENTITIES.map(Entity::name).join(", "),
            })?;
            columns.push((entity, criterion));
        }

        let mut filters = Vec::with_capacity(columns.len());
        for (entity, criterion) in columns {
            if criterion.is_empty() {
                continue;
            }
            let numeric = self.is_numeric(entity);
            let predicates = criterion
                .values()
                .iter()
                .map(|literal| predicate(entity, literal, numeric))
                .collect::<Result<Vec<_>>>()?;
            filters.push(ColumnFilter { entity, predicates });
        }
        Ok(filters)
    }
}

fn predicate(entity: Entity, literal: &str, numeric: bool) -> Result<Predicate> {
    let value = normalize(entity, literal)?;

    if numeric && value.contains(KEY_SEPARATOR) {
        return range(entity, &value);
    }
    if value.contains(GLOB_CHARS) {
        return Ok(Predicate::Wildcard(glob::Pattern::new(&value)?));
    }
    Ok(Predicate::Exact(value))
}

fn range(column: Entity, value: &str) -> Result<Predicate> {
    let malformed = |reason: &str| CatalogError::MalformedRange {
        column,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (start, stop) = value
        .split_once(KEY_SEPARATOR)
        .ok_or_else(|| malformed("expected start-stop"))?;
    let start = bound(start).ok_or_else(|| {
        malformed("bounds must be digits or '*' separated by a single '-'")
    })?;
    let stop = bound(stop).ok_or_else(|| {
        malformed("bounds must be digits or '*' separated by a single '-'")
    })?;

    if let (Some(start), Some(stop)) = (start, stop) {
        if start >= stop {
            return Err(malformed("start must be lower than stop"));
        }
    }
    Ok(Predicate::Range { start, stop })
}

/// `Some(None)` for `*`, `Some(Some(n))` for digits, `None` when malformed.
fn bound(text: &str) -> Option<Option<u64>> {
    if text == "*" {
        return Some(None);
    }
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().map(Some)
}
