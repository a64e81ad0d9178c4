use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the key and the value of a `key-value` token
pub const KEY_SEPARATOR: char = '-';

/// One named component of a file's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Subject,
    Session,
    Datatype,
    Task,
    Run,
    Acquisition,
    Description,
    Suffix,
    Extension,
}

/// Every entity, in column order.
pub const ENTITIES: [Entity; 9] = [
    Entity::Subject,
    Entity::Session,
    Entity::Datatype,
    Entity::Task,
    Entity::Run,
    Entity::Acquisition,
    Entity::Description,
    Entity::Suffix,
    Entity::Extension,
];

/// Entities written as `key-value` tokens, in file name order.
pub const FILENAME_ENTITIES: [Entity; 6] = [
    Entity::Subject,
    Entity::Session,
    Entity::Task,
    Entity::Acquisition,
    Entity::Run,
    Entity::Description,
];

impl Entity {
    /// Column name used in selections.
    pub const fn name(self) -> &'static str {
        match self {
            Entity::Subject => "subject",
            Entity::Session => "session",
            Entity::Datatype => "datatype",
            Entity::Task => "task",
            Entity::Run => "run",
            Entity::Acquisition => "acquisition",
            Entity::Description => "description",
            Entity::Suffix => "suffix",
            Entity::Extension => "extension",
        }
    }

    pub const fn plural(self) -> &'static str {
        match self {
            Entity::Subject => "Subjects",
            Entity::Session => "Sessions",
            Entity::Datatype => "Datatypes",
            Entity::Task => "Tasks",
            Entity::Run => "Runs",
            Entity::Acquisition => "Acquisitions",
            Entity::Description => "Descriptions",
            Entity::Suffix => "Suffixes",
            Entity::Extension => "Extensions",
        }
    }

    /// Canonical token key. Positional entities (datatype, suffix, extension) have none.
    pub const fn key(self) -> Option<&'static str> {
        match self {
            Entity::Subject => Some("sub"),
            Entity::Session => Some("ses"),
            Entity::Task => Some("task"),
            Entity::Run => Some("run"),
            Entity::Acquisition => Some("acq"),
            Entity::Description => Some("desc"),
            Entity::Datatype | Entity::Suffix | Entity::Extension => None,
        }
    }

    /// Every key accepted when reading a token, canonical first.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Entity::Subject => &["sub", "subject"],
            Entity::Session => &["ses", "session"],
            Entity::Task => &["task"],
            Entity::Run => &["run"],
            Entity::Acquisition => &["acq", "acquisition"],
            Entity::Description => &["desc", "description"],
            Entity::Datatype | Entity::Suffix | Entity::Extension => &[],
        }
    }

    /// Glob fragment matching any accepted key (`sub*` covers `sub` and `subject`).
    pub(crate) fn key_pattern(self) -> String {
        match self.aliases() {
            [] => String::new(),
            [only] => (*only).to_string(),
            [canonical, ..] => format!("{canonical}*"),
        }
    }

    pub fn from_name(name: &str) -> Option<Entity> {
        ENTITIES.into_iter().find(|e| e.name() == name)
    }

    pub fn from_key(key: &str) -> Option<Entity> {
        FILENAME_ENTITIES
            .into_iter()
            .find(|e| e.aliases().contains(&key))
    }

    /// Strip this entity's own prefix from a value, if present.
    fn strip_own_prefix(self, value: &str) -> &str {
        for alias in self.aliases() {
            if let Some(rest) = value
                .strip_prefix(alias)
                .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
            {
                return rest;
            }
        }
        value
    }

    fn foreign_prefix(self, value: &str) -> bool {
        FILENAME_ENTITIES
            .into_iter()
            .filter(|e| *e != self)
            .flat_map(|e| e.aliases().iter())
            .any(|alias| {
                value
                    .strip_prefix(alias)
                    .is_some_and(|rest| rest.starts_with(KEY_SEPARATOR))
            })
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize a user-facing value for `entity`: drop the entity's own prefix
/// (`sub-001` -> `001`) and give extensions a leading dot.
///
/// A value carrying another entity's prefix (`session = "sub-01"`) is rejected.
pub fn normalize(entity: Entity, raw: &str) -> Result<String> {
    let value = raw.trim();

    if entity == Entity::Extension {
        if value.is_empty() || value.starts_with('.') || value.starts_with('*') {
            return Ok(value.to_string());
        }
        return Ok(format!(".{value}"));
    }

    let stripped = entity.strip_own_prefix(value);
    if stripped.len() == value.len() && entity.foreign_prefix(value) {
        return Err(CatalogError::InvalidPrefix {
            entity,
            value: raw.to_string(),
        });
    }
    Ok(stripped.to_string())
}

/// The structured identity of one file: entity -> optional value.
///
/// Values are always stored normalized, see [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    acquisition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extension: Option<String>,
}

impl EntityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: Entity) -> Option<&str> {
        self.slot(entity).as_deref()
    }

    /// Normalize and store a value.
    pub fn set(&mut self, entity: Entity, value: impl AsRef<str>) -> Result<&mut Self> {
        let value = normalize(entity, value.as_ref())?;
        *self.slot_mut(entity) = Some(value);
        Ok(self)
    }

    /// Builder form of [`EntityRecord::set`].
    pub fn with(mut self, entity: Entity, value: impl AsRef<str>) -> Result<Self> {
        self.set(entity, value)?;
        Ok(self)
    }

    pub fn clear(&mut self, entity: Entity) {
        *self.slot_mut(entity) = None;
    }

    /// Store a value that is already in normalized form.
    pub(crate) fn put(&mut self, entity: Entity, value: &str) {
        *self.slot_mut(entity) = Some(value.to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, Option<&str>)> + '_ {
        ENTITIES.into_iter().map(move |e| (e, self.get(e)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, v)| v.is_none())
    }

    /// Build a record from `(entity, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (Entity, &'a str)>) -> Result<Self> {
        let mut record = Self::new();
        for (entity, value) in pairs {
            record.set(entity, value)?;
        }
        Ok(record)
    }

    fn slot(&self, entity: Entity) -> &Option<String> {
        match entity {
            Entity::Subject => &self.subject,
            Entity::Session => &self.session,
            Entity::Datatype => &self.datatype,
            Entity::Task => &self.task,
            Entity::Run => &self.run,
            Entity::Acquisition => &self.acquisition,
            Entity::Description => &self.description,
            Entity::Suffix => &self.suffix,
            Entity::Extension => &self.extension,
        }
    }

    fn slot_mut(&mut self, entity: Entity) -> &mut Option<String> {
        match entity {
            Entity::Subject => &mut self.subject,
            Entity::Session => &mut self.session,
            Entity::Datatype => &mut self.datatype,
            Entity::Task => &mut self.task,
            Entity::Run => &mut self.run,
            Entity::Acquisition => &mut self.acquisition,
            Entity::Description => &mut self.description,
            Entity::Suffix => &mut self.suffix,
            Entity::Extension => &mut self.extension,
        }
    }
}

impl fmt::Display for EntityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .iter()
            .map(|(entity, value)| format!("{}: {}", entity, value.unwrap_or("-")))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}
