use crate::codec::{ancestor_name, split_extension, DELIMITER};
use crate::entity::Entity;
use crate::error::{ValidationError, Violation};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static GLOBAL_VALIDATOR: OnceLock<Validator> = OnceLock::new();

/// Naming-convention checker.
///
/// Holds one compiled rule set. Every rule is evaluated for every path so a
/// single call reports all problems at once.
#[derive(Debug, Clone)]
pub struct Validator {
    subject_dir: Regex,
    session_dir: Regex,
    token: Regex,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        // Built-in patterns; compiling them cannot fail.
        Self {
            subject_dir: Regex::new(r"^(?:sub|subject)-(.+)$").expect("subject directory rule"),
            session_dir: Regex::new(r"^(?:ses|session)-(.+)$").expect("session directory rule"),
            token: Regex::new(r"^([A-Za-z]+)-([A-Za-z0-9]+)$").expect("token rule"),
        }
    }

    /// Process-wide instance, compiled on first use.
    pub fn global() -> &'static Validator {
        GLOBAL_VALIDATOR.get_or_init(Validator::new)
    }

    /// Check `path` against the naming convention.
    pub fn validate(&self, path: &Path) -> Result<(), ValidationError> {
        let violations = self.violations(path);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                path: path.to_path_buf(),
                violations,
            })
        }
    }

    pub fn is_valid(&self, path: &Path) -> bool {
        self.violations(path).is_empty()
    }

    /// All violations found in `path`, in check order.
    pub fn violations(&self, path: &Path) -> Vec<Violation> {
        let mut violations = Vec::new();

        let subject = self.directory_label(path, 3, Entity::Subject, &mut violations);
        let session = self.directory_label(path, 2, Entity::Session, &mut violations);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, _) = split_extension(&name);
        let tokens: Vec<&str> = stem.split(DELIMITER).collect();

        let mut filename_subject = None;
        let mut filename_session = None;

        for &token in tokens.iter().take(tokens.len().saturating_sub(1)) {
            let Some(captures) = self.token.captures(token) else {
                violations.push(Violation::MalformedToken(token.to_string()));
                continue;
            };
            let key = &captures[1];
            let value = captures[2].to_string();
            match Entity::from_key(key) {
                Some(Entity::Subject) => filename_subject = Some(value),
                Some(Entity::Session) => filename_session = Some(value),
                Some(_) => {}
                None => violations.push(Violation::UnknownKey {
                    token: token.to_string(),
                    key: key.to_string(),
                }),
            }
        }

        if let (Some(directory), Some(filename)) = (subject, filename_subject) {
            if directory != filename {
                violations.push(Violation::SubjectMismatch { directory, filename });
            }
        }
        if let (Some(directory), Some(filename)) = (session, filename_session) {
            if directory != filename {
                violations.push(Violation::SessionMismatch { directory, filename });
            }
        }

        violations
    }

    /// Label of the subject/session directory `level` steps above the file.
    fn directory_label(
        &self,
        path: &Path,
        level: usize,
        entity: Entity,
        violations: &mut Vec<Violation>,
    ) -> Option<String> {
        let Some(name) = ancestor_name(path, level) else {
            violations.push(Violation::MissingDirectory(entity));
            return None;
        };
        let name = name.to_string_lossy();

        let rule = match entity {
            Entity::Session => &self.session_dir,
            _ => &self.subject_dir,
        };
        match rule.captures(&name) {
            Some(captures) => Some(captures[1].to_string()),
            None => {
                violations.push(match entity {
                    Entity::Session => Violation::SessionDirectory(name.to_string()),
                    _ => Violation::SubjectDirectory(name.to_string()),
                });
                None
            }
        }
    }
}
