//! Repository error taxonomy.
//!
//! # Responsibility
//! - Translate SQLite failures into semantic repository errors.
//! - Surface the violated constraint's stable name to callers.
//!
//! # Invariants
//! - A constraint failure is never reported as a generic DB error.
//! - `Display` of a constraint violation always contains the constraint name.

use crate::db::DbError;
use crate::model::EntityId;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{ffi, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

static CONSTRAINT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"constraint failed: ([A-Za-z0-9_.]+)").expect("valid constraint name regex")
});

pub type RepoResult<T> = Result<T, RepoError>;

/// Category of a storage-enforced rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Check,
    NotNull,
    ForeignKey,
    Unique,
    Other,
}

impl ConstraintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::NotNull => "not_null",
            Self::ForeignKey => "foreign_key",
            Self::Unique => "unique",
            Self::Other => "other",
        }
    }

    fn from_extended_code(code: i32) -> Self {
        match code {
            ffi::SQLITE_CONSTRAINT_CHECK => Self::Check,
            ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNull,
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKey,
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Self::Unique,
            _ => Self::Other,
        }
    }
}

/// A write rejected by a storage-enforced rule.
///
/// `name` is the declared constraint name for check constraints
/// (e.g. `chk_items_quantity`), `table.column` for not-null and unique
/// failures, and the kind label when the engine reports no name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub name: String,
    pub message: String,
}

impl ConstraintViolation {
    /// Classifies a SQLite error. Returns `None` for non-constraint failures.
    pub fn from_sqlite(err: &rusqlite::Error) -> Option<Self> {
        let rusqlite::Error::SqliteFailure(failure, message) = err else {
            return None;
        };
        if failure.code != ErrorCode::ConstraintViolation {
            return None;
        }

        let kind = ConstraintKind::from_extended_code(failure.extended_code);
        let message = message
            .clone()
            .unwrap_or_else(|| "constraint failed".to_string());
        let name = parse_constraint_name(&message)
            .unwrap_or_else(|| kind.as_str())
            .to_string();

        Some(Self {
            kind,
            name,
            message,
        })
    }
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "constraint `{}` violated ({}): {}",
            self.name,
            self.kind.as_str(),
            self.message
        )
    }
}

impl Error for ConstraintViolation {}

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Write rejected by a named storage constraint.
    ConstraintViolation(ConstraintViolation),
    /// Target row does not exist or is soft-deleted.
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Table exists but its stored definition lacks a declared check.
    MissingRequiredConstraint {
        table: &'static str,
        constraint: &'static str,
    },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl RepoError {
    /// Name of the violated constraint, when this is a constraint failure.
    pub fn constraint_name(&self) -> Option<&str> {
        match self {
            Self::ConstraintViolation(violation) => Some(violation.name.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation(violation) => write!(f, "{violation}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::MissingRequiredConstraint { table, constraint } => write!(
                f,
                "repository requires constraint `{constraint}` on table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::ConstraintViolation(violation) => Some(violation),
            Self::NotFound { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::MissingRequiredConstraint { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match ConstraintViolation::from_sqlite(&value) {
            Some(violation) => Self::ConstraintViolation(violation),
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

fn parse_constraint_name(message: &str) -> Option<&str> {
    CONSTRAINT_NAME_RE
        .captures(message)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

#[cfg(test)]
mod tests {
    use super::{parse_constraint_name, ConstraintKind, ConstraintViolation, RepoError};
    use rusqlite::{ffi, ErrorCode};

    fn constraint_error(extended_code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: ErrorCode::ConstraintViolation,
                extended_code,
            },
            Some(message.to_string()),
        )
    }

    #[test]
    fn parses_check_and_not_null_names() {
        assert_eq!(
            parse_constraint_name("CHECK constraint failed: chk_items_quantity"),
            Some("chk_items_quantity")
        );
        assert_eq!(
            parse_constraint_name("NOT NULL constraint failed: items.name"),
            Some("items.name")
        );
        assert_eq!(parse_constraint_name("FOREIGN KEY constraint failed"), None);
    }

    #[test]
    fn classifies_check_violation_with_name() {
        let err = RepoError::from(constraint_error(
            ffi::SQLITE_CONSTRAINT_CHECK,
            "CHECK constraint failed: chk_shopping_lists_name",
        ));
        assert_eq!(err.constraint_name(), Some("chk_shopping_lists_name"));
        assert!(err.to_string().contains("chk_shopping_lists_name"));
    }

    #[test]
    fn foreign_key_violation_falls_back_to_kind_label() {
        let violation = ConstraintViolation::from_sqlite(&constraint_error(
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            "FOREIGN KEY constraint failed",
        ))
        .unwrap();
        assert_eq!(violation.kind, ConstraintKind::ForeignKey);
        assert_eq!(violation.name, "foreign_key");
    }

    #[test]
    fn non_constraint_errors_stay_db_errors() {
        let err = RepoError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, RepoError::Db(_)));
        assert_eq!(err.constraint_name(), None);
    }
}
