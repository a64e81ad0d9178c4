use crate::catalog::{Catalog, ErrorKind};
use crate::entity::{Entity, ENTITIES};
use serde::Serialize;
use std::fmt;

/// Values listed in full up to this many; longer lists show first ... last.
const MAX_LISTED_VALUES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    pub entity: Entity,
    pub count: usize,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCounts {
    pub decode: usize,
    pub validation: usize,
    pub io: usize,
}

impl ErrorCounts {
    pub fn total(&self) -> usize {
        self.decode + self.validation + self.io
    }
}

/// Unique values per entity plus file and error counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub root: String,
    pub entities: Vec<EntitySummary>,
    pub files: usize,
    pub errors: ErrorCounts,
}

impl Catalog {
    pub fn summary(&self) -> CatalogSummary {
        let entities = ENTITIES
            .into_iter()
            .map(|entity| {
                let values = self.unique(entity);
                EntitySummary {
                    entity,
                    count: values.len(),
                    values,
                }
            })
            .collect();

        let mut errors = ErrorCounts::default();
        for error in self.errors() {
            match error.kind() {
                ErrorKind::Decode => errors.decode += 1,
                ErrorKind::Validation => errors.validation += 1,
                ErrorKind::Io => errors.io += 1,
            }
        }

        CatalogSummary {
            root: self.root().display().to_string(),
            entities,
            files: self.len(),
            errors,
        }
    }
}

impl fmt::Display for EntitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity.plural(), self.count)?;
        match self.values.as_slice() {
            [] => Ok(()),
            values if values.len() <= MAX_LISTED_VALUES => write!(f, " ({})", values.join(", ")),
            [first, .., last] => write!(f, " ({first} ... {last})"),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entity in &self.entities {
            writeln!(f, "{entity}")?;
        }
        write!(f, "Files: {}", self.files)?;
        if self.errors.total() > 0 {
            write!(
                f,
                "\nErrors: {} (decode: {}, validation: {}, io: {})",
                self.errors.total(),
                self.errors.decode,
                self.errors.validation,
                self.errors.io
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(entity: Entity, values: &[&str]) -> EntitySummary {
        EntitySummary {
            entity,
            count: values.len(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_short_list_in_full() {
        assert_eq!(
            summary(Entity::Subject, &["001", "002", "003"]).to_string(),
            "Subjects: 3 (001, 002, 003)"
        );
    }

    #[test]
    fn test_long_list_abbreviated() {
        assert_eq!(
            summary(Entity::Run, &["01", "02", "03", "04", "05"]).to_string(),
            "Runs: 5 (01 ... 05)"
        );
    }

    #[test]
    fn test_empty_column() {
        assert_eq!(summary(Entity::Task, &[]).to_string(), "Tasks: 0");
    }

    #[test]
    fn test_error_line_only_when_errors() {
        let mut catalog_summary = CatalogSummary {
            root: "/d".to_string(),
            entities: vec![summary(Entity::Subject, &["01"])],
            files: 1,
            errors: ErrorCounts::default(),
        };
        assert_eq!(catalog_summary.to_string(), "Subjects: 1 (01)\nFiles: 1");

        catalog_summary.errors.validation = 2;
        assert!(catalog_summary
            .to_string()
            .ends_with("Files: 1\nErrors: 2 (decode: 0, validation: 2, io: 0)"));
    }
}
