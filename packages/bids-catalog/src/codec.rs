//! Conversion between paths and [`EntityRecord`]s.
//!
//! Layout handled here:
//!
//! ```text
//! <root>/sub-<label>/ses-<label>/<datatype>/sub-<label>_ses-<label>[_<key>-<value>...]_<suffix><extension>
//! ```

use crate::entity::{Entity, EntityRecord, FILENAME_ENTITIES, KEY_SEPARATOR};
use crate::error::{CatalogError, DecodeError, DecodeErrorKind, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Separator between file name tokens
pub const DELIMITER: &str = "_";

pub const WILDCARD: &str = "*";

/// Stateless path encoder/decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathCodec;

impl PathCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode a dataset path into its entities.
    ///
    /// Subject and session come from the directories, the datatype from the
    /// parent directory, everything else from the file name.
    pub fn decode(&self, path: &Path) -> std::result::Result<EntityRecord, DecodeError> {
        let fail = |component: &str, kind| DecodeError::new(path, component, kind);

        let name = path
            .file_name()
            .ok_or_else(|| fail(&path.display().to_string(), DecodeErrorKind::MissingFileName))?;
        let name = name
            .to_str()
            .ok_or_else(|| fail(&name.to_string_lossy(), DecodeErrorKind::NonUtf8))?;

        let (stem, extension) = split_extension(name);
        if stem.is_empty() {
            return Err(fail(name, DecodeErrorKind::EmptyStem));
        }

        let subject = directory_value(path, 3, Entity::Subject)?;
        let session = directory_value(path, 2, Entity::Session)?;
        let datatype = ancestor_name(path, 1)
            .ok_or_else(|| {
                fail(
                    &path.display().to_string(),
                    DecodeErrorKind::MissingDirectoryToken(Entity::Datatype),
                )
            })?
            .to_str()
            .ok_or_else(|| fail(name, DecodeErrorKind::NonUtf8))?;

        let tokens: Vec<&str> = stem.split(DELIMITER).collect();
        let (suffix, pairs) = match tokens.split_last() {
            Some((suffix, pairs)) => (*suffix, pairs),
            None => return Err(fail(stem, DecodeErrorKind::EmptyStem)),
        };
        if suffix.is_empty() || suffix.contains(KEY_SEPARATOR) {
            return Err(fail(suffix, DecodeErrorKind::MissingSuffix));
        }

        let mut record = EntityRecord::new();
        record.put(Entity::Subject, subject);
        record.put(Entity::Session, session);
        record.put(Entity::Datatype, datatype);

        let mut seen: Vec<Entity> = Vec::with_capacity(pairs.len());
        for &token in pairs {
            let (key, value) =
                split_token(token).ok_or_else(|| fail(token, DecodeErrorKind::MalformedToken))?;
            let entity = Entity::from_key(key)
                .ok_or_else(|| fail(token, DecodeErrorKind::UnknownKey(key.to_string())))?;
            if seen.contains(&entity) {
                return Err(fail(token, DecodeErrorKind::DuplicateEntity(entity)));
            }
            seen.push(entity);

            // Directories are authoritative for subject/session; the
            // validator reports disagreement.
            if !matches!(entity, Entity::Subject | Entity::Session) {
                record.put(entity, value);
            }
        }

        record.put(Entity::Suffix, suffix);
        if let Some(extension) = extension {
            record.put(Entity::Extension, extension);
        }

        Ok(record)
    }

    /// Build a glob pattern, relative to a dataset root, matching every file
    /// whose entities agree with the fields set in `query`.
    ///
    /// Unset fields become `*`; runs of wildcards are collapsed so that
    /// optional tokens missing from a file name still match.
    pub fn encode_pattern(&self, query: &EntityRecord) -> String {
        let directory = |entity: Entity| {
            format!(
                "{}{}{}",
                entity.key_pattern(),
                KEY_SEPARATOR,
                query.get(entity).unwrap_or(WILDCARD)
            )
        };

        let mut segments: Vec<String> = FILENAME_ENTITIES
            .into_iter()
            .map(|entity| match query.get(entity) {
                Some(value) => format!("{}{}{}", entity.key_pattern(), KEY_SEPARATOR, value),
                None => WILDCARD.to_string(),
            })
            .collect();
        segments.push(query.get(Entity::Suffix).unwrap_or(WILDCARD).to_string());

        let mut filename = segments.join(DELIMITER);
        filename.push_str(query.get(Entity::Extension).unwrap_or(".*"));

        format!(
            "{}/{}/{}/{}",
            directory(Entity::Subject),
            directory(Entity::Session),
            query.get(Entity::Datatype).unwrap_or(WILDCARD),
            collapse_wildcards(filename)
        )
    }

    /// `sub-001_ses-01_task-rest_run-01_eeg`
    pub fn basename(&self, record: &EntityRecord) -> Result<String> {
        require(record, Entity::Subject)?;
        require(record, Entity::Session)?;
        let suffix = require(record, Entity::Suffix)?;

        let mut tokens: Vec<String> = FILENAME_ENTITIES
            .into_iter()
            .filter_map(|entity| {
                let key = entity.key()?;
                record
                    .get(entity)
                    .map(|value| format!("{key}{KEY_SEPARATOR}{value}"))
            })
            .collect();
        tokens.push(suffix.to_string());
        Ok(tokens.join(DELIMITER))
    }

    pub fn filename(&self, record: &EntityRecord) -> Result<String> {
        let mut name = self.basename(record)?;
        if let Some(extension) = record.get(Entity::Extension) {
            name.push_str(extension);
        }
        Ok(name)
    }

    /// `sub-001/ses-01/eeg/<filename>`
    pub fn relative_path(&self, record: &EntityRecord) -> Result<PathBuf> {
        let subject = require(record, Entity::Subject)?;
        let session = require(record, Entity::Session)?;
        let datatype = require(record, Entity::Datatype)?;
        let filename = self.filename(record)?;

        Ok(PathBuf::from(format!("sub{KEY_SEPARATOR}{subject}"))
            .join(format!("ses{KEY_SEPARATOR}{session}"))
            .join(datatype)
            .join(filename))
    }

    pub fn absolute_path(&self, root: &Path, record: &EntityRecord) -> Result<PathBuf> {
        Ok(root.join(self.relative_path(record)?))
    }
}

/// Split `key-value` into its two non-empty halves.
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once(KEY_SEPARATOR)?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Split a file name at its first dot: `x_eeg.nii.gz` -> (`x_eeg`, `.nii.gz`).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.find('.') {
        Some(idx) => (&name[..idx], Some(&name[idx..])),
        None => (name, None),
    }
}

pub(crate) fn ancestor_name(path: &Path, level: usize) -> Option<&OsStr> {
    path.ancestors().nth(level).and_then(Path::file_name)
}

fn directory_value(
    path: &Path,
    level: usize,
    entity: Entity,
) -> std::result::Result<&str, DecodeError> {
    let missing = |component: String| {
        DecodeError::new(path, component, DecodeErrorKind::MissingDirectoryToken(entity))
    };

    let name = ancestor_name(path, level).ok_or_else(|| missing(path.display().to_string()))?;
    let name = name
        .to_str()
        .ok_or_else(|| DecodeError::new(path, name.to_string_lossy(), DecodeErrorKind::NonUtf8))?;

    match split_token(name) {
        Some((key, value)) if entity.aliases().contains(&key) => Ok(value),
        _ => Err(missing(name.to_string())),
    }
}

fn require(record: &EntityRecord, entity: Entity) -> Result<&str> {
    record
        .get(entity)
        .ok_or(CatalogError::MissingEntity(entity))
}

fn collapse_wildcards(mut pattern: String) -> String {
    const RUNS: [&str; 3] = ["*_*", "**", "*.*"];
    loop {
        let before = pattern.len();
        for run in RUNS {
            pattern = pattern.replace(run, WILDCARD);
        }
        if pattern.len() == before {
            return pattern;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> PathCodec {
        PathCodec::new()
    }

    #[test]
    fn test_decode_full_path() {
        let path = Path::new("/data/sub-001/ses-01/eeg/sub-001_ses-01_task-rest_acq-alt_run-02_desc-clean_eeg.vhdr");
        let record = codec().decode(path).unwrap();

        assert_eq!(record.get(Entity::Subject), Some("001"));
        assert_eq!(record.get(Entity::Session), Some("01"));
        assert_eq!(record.get(Entity::Datatype), Some("eeg"));
        assert_eq!(record.get(Entity::Task), Some("rest"));
        assert_eq!(record.get(Entity::Acquisition), Some("alt"));
        assert_eq!(record.get(Entity::Run), Some("02"));
        assert_eq!(record.get(Entity::Description), Some("clean"));
        assert_eq!(record.get(Entity::Suffix), Some("eeg"));
        assert_eq!(record.get(Entity::Extension), Some(".vhdr"));
    }

    #[test]
    fn test_decode_long_keys() {
        let path = Path::new("subject-001/session-01/eeg/subject-001_session-01_task-rest_run-01_eeg.edf");
        let record = codec().decode(path).unwrap();
        assert_eq!(record.get(Entity::Subject), Some("001"));
        assert_eq!(record.get(Entity::Session), Some("01"));
        assert_eq!(record.get(Entity::Run), Some("01"));
    }

    #[test]
    fn test_decode_compound_extension() {
        let path = Path::new("sub-01/ses-01/func/sub-01_ses-01_task-rest_bold.nii.gz");
        let record = codec().decode(path).unwrap();
        assert_eq!(record.get(Entity::Suffix), Some("bold"));
        assert_eq!(record.get(Entity::Extension), Some(".nii.gz"));
    }

    #[test]
    fn test_decode_missing_subject_directory() {
        let path = Path::new("data/ses-01/eeg/sub-01_ses-01_eeg.vhdr");
        let err = codec().decode(path).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MissingDirectoryToken(Entity::Subject));
        assert_eq!(err.component, "data");
    }

    #[test]
    fn test_decode_too_shallow() {
        let err = codec().decode(Path::new("eeg/sub-01_eeg.vhdr")).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::MissingDirectoryToken(_)));
    }

    #[test]
    fn test_decode_rejects_unknown_key() {
        let path = Path::new("sub-01/ses-01/eeg/sub-01_ses-01_echo-1_eeg.vhdr");
        let err = codec().decode(path).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownKey("echo".to_string()));
        assert_eq!(err.component, "echo-1");
    }

    #[test]
    fn test_decode_rejects_malformed_token() {
        let path = Path::new("sub-01/ses-01/eeg/sub-01_ses-01_rest_eeg.vhdr");
        let err = codec().decode(path).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MalformedToken);
        assert_eq!(err.component, "rest");
    }

    #[test]
    fn test_decode_rejects_duplicates_and_missing_suffix() {
        let dup = Path::new("sub-01/ses-01/eeg/sub-01_ses-01_run-1_run-2_eeg.vhdr");
        assert_eq!(
            codec().decode(dup).unwrap_err().kind,
            DecodeErrorKind::DuplicateEntity(Entity::Run)
        );

        let no_suffix = Path::new("sub-01/ses-01/eeg/sub-01_ses-01_task-rest.vhdr");
        assert_eq!(
            codec().decode(no_suffix).unwrap_err().kind,
            DecodeErrorKind::MissingSuffix
        );
    }

    #[test]
    fn test_encode_pattern_empty_query() {
        assert_eq!(codec().encode_pattern(&EntityRecord::new()), "sub*-*/ses*-*/*/*");
    }

    #[test]
    fn test_encode_pattern_collapses_wildcards() {
        let query = EntityRecord::from_pairs([(Entity::Subject, "001"), (Entity::Run, "01")]).unwrap();
        assert_eq!(
            codec().encode_pattern(&query),
            "sub*-001/ses*-*/*/sub*-001_*_run-01_*"
        );
    }

    #[test]
    fn test_encode_pattern_suffix_and_extension() {
        let query = EntityRecord::from_pairs([
            (Entity::Datatype, "eeg"),
            (Entity::Suffix, "eeg"),
            (Entity::Extension, "vhdr"),
        ])
        .unwrap();
        assert_eq!(codec().encode_pattern(&query), "sub*-*/ses*-*/eeg/*_eeg.vhdr");
    }

    #[test]
    fn test_encoded_pattern_matches_files() {
        let query = EntityRecord::from_pairs([(Entity::Subject, "001"), (Entity::Task, "rest")]).unwrap();
        let pattern = glob::Pattern::new(&codec().encode_pattern(&query)).unwrap();

        assert!(pattern.matches("sub-001/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr"));
        assert!(pattern.matches("sub-001/ses-01/eeg/sub-001_ses-01_task-rest_run-01_eeg.vhdr"));
        assert!(!pattern.matches("sub-002/ses-01/eeg/sub-002_ses-01_task-rest_eeg.vhdr"));
        assert!(!pattern.matches("sub-001/ses-01/eeg/sub-001_ses-01_task-nback_eeg.vhdr"));
    }

    #[test]
    fn test_build_paths() {
        let record = EntityRecord::from_pairs([
            (Entity::Subject, "001"),
            (Entity::Session, "01"),
            (Entity::Datatype, "eeg"),
            (Entity::Task, "rest"),
            (Entity::Suffix, "eeg"),
            (Entity::Extension, ".vhdr"),
        ])
        .unwrap();

        assert_eq!(codec().basename(&record).unwrap(), "sub-001_ses-01_task-rest_eeg");
        assert_eq!(codec().filename(&record).unwrap(), "sub-001_ses-01_task-rest_eeg.vhdr");
        assert_eq!(
            codec().absolute_path(Path::new("/data"), &record).unwrap(),
            PathBuf::from("/data/sub-001/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr")
        );
    }

    #[test]
    fn test_build_requires_entities() {
        let record = EntityRecord::from_pairs([(Entity::Subject, "001")]).unwrap();
        assert!(matches!(
            codec().relative_path(&record),
            Err(CatalogError::MissingEntity(Entity::Session))
        ));
    }

    #[test]
    fn test_round_trip() {
        let records = [
            EntityRecord::from_pairs([
                (Entity::Subject, "001"),
                (Entity::Session, "01"),
                (Entity::Datatype, "eeg"),
                (Entity::Suffix, "eeg"),
                (Entity::Extension, ".vhdr"),
            ])
            .unwrap(),
            EntityRecord::from_pairs([
                (Entity::Subject, "42"),
                (Entity::Session, "pre"),
                (Entity::Datatype, "eyetracking"),
                (Entity::Task, "checker"),
                (Entity::Acquisition, "alt"),
                (Entity::Run, "03"),
                (Entity::Description, "clean"),
                (Entity::Suffix, "physio"),
                (Entity::Extension, ".tsv.gz"),
            ])
            .unwrap(),
        ];

        for record in records {
            let path = codec().absolute_path(Path::new("/root/ds"), &record).unwrap();
            assert_eq!(codec().decode(&path).unwrap(), record);
        }
    }
}
