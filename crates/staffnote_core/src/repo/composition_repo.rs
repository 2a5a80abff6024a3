//! Composition repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist whole compositions (voices, ledgers, chords, palette state).
//! - Expose summary listings without decoding composition bodies.
//!
//! # Invariants
//! - Write paths must call `CompositionData::validate()` before SQL mutations.
//! - Metadata columns mirror the JSON body; reads reject bodies whose id does
//!   not match the row.
//! - Summaries are ordered by `date_created DESC, uuid ASC`.

use crate::db::DbError;
use crate::model::composition::{Clef, CompositionData, CompositionValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const COMPOSITIONS_DEFAULT_LIMIT: u32 = 20;
const COMPOSITIONS_LIMIT_MAX: u32 = 100;

const SUMMARY_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    date_created,
    tempo,
    clef,
    key_signature,
    time_signature,
    note_count,
    updated_at
FROM compositions";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for composition persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(CompositionValidationError),
    Db(DbError),
    NotFound(String),
    InvalidData(String),
    Encoding(serde_json::Error),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "composition not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted composition data: {message}")
            }
            Self::Encoding(err) => write!(f, "composition body encoding failed: {err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table is missing: {table}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<CompositionValidationError> for RepoError {
    fn from(value: CompositionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

/// Listing row; carries metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionSummary {
    pub id: String,
    pub name: String,
    /// Epoch milliseconds, as stored in the composition.
    pub date_created: i64,
    pub tempo: u32,
    pub clef: Clef,
    pub key_signature: String,
    pub time_signature: Option<String>,
    /// Entries across all voices at save time.
    pub note_count: u32,
    /// Last write time in epoch milliseconds.
    pub updated_at: i64,
}

/// Pagination options for composition listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionListQuery {
    /// Maximum rows to return. Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for saved compositions.
pub trait CompositionRepository {
    /// Inserts or fully replaces one composition by id.
    fn save_composition(&self, composition: &CompositionData) -> RepoResult<()>;
    fn get_composition(&self, id: &str) -> RepoResult<Option<CompositionData>>;
    fn get_summary(&self, id: &str) -> RepoResult<Option<CompositionSummary>>;
    fn list_compositions(&self, query: &CompositionListQuery)
        -> RepoResult<Vec<CompositionSummary>>;
    /// Hard-deletes one composition. Missing ids yield `NotFound`.
    fn delete_composition(&self, id: &str) -> RepoResult<()>;
}

/// SQLite-backed composition repository.
pub struct SqliteCompositionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCompositionRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, "compositions")? {
            return Err(RepoError::MissingRequiredTable("compositions"));
        }
        Ok(Self { conn })
    }
}

impl CompositionRepository for SqliteCompositionRepository<'_> {
    fn save_composition(&self, composition: &CompositionData) -> RepoResult<()> {
        composition.validate()?;
        let body = serde_json::to_string(composition)?;
        let note_count = u32::try_from(composition.note_count()).map_err(|_| {
            RepoError::InvalidData(format!(
                "composition `{}` holds too many notes",
                composition.id
            ))
        })?;

        self.conn.execute(
            "INSERT INTO compositions (
                uuid,
                name,
                date_created,
                tempo,
                clef,
                key_signature,
                time_signature,
                body,
                note_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(uuid) DO UPDATE SET
                name = excluded.name,
                date_created = excluded.date_created,
                tempo = excluded.tempo,
                clef = excluded.clef,
                key_signature = excluded.key_signature,
                time_signature = excluded.time_signature,
                body = excluded.body,
                note_count = excluded.note_count,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                composition.id.as_str(),
                composition.name.as_str(),
                composition.date_created,
                composition.tempo,
                composition.clef.as_str(),
                composition.key_signature.as_str(),
                composition.time_signature.as_deref(),
                body,
                note_count,
            ],
        )?;

        Ok(())
    }

    fn get_composition(&self, id: &str) -> RepoResult<Option<CompositionData>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, body FROM compositions WHERE uuid = ?1;")?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let uuid: String = row.get("uuid")?;
        let body: String = row.get("body")?;
        let composition: CompositionData = serde_json::from_str(&body).map_err(|err| {
            RepoError::InvalidData(format!("undecodable body for composition `{uuid}`: {err}"))
        })?;
        if composition.id != uuid {
            return Err(RepoError::InvalidData(format!(
                "body id `{}` does not match row id `{uuid}`",
                composition.id
            )));
        }
        composition.validate()?;
        Ok(Some(composition))
    }

    fn get_summary(&self, id: &str) -> RepoResult<Option<CompositionSummary>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUMMARY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_summary_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_compositions(
        &self,
        query: &CompositionListQuery,
    ) -> RepoResult<Vec<CompositionSummary>> {
        let mut sql = format!("{SUMMARY_SELECT_SQL} ORDER BY date_created DESC, uuid ASC LIMIT ?");
        let mut bind_values = vec![Value::Integer(i64::from(normalize_composition_limit(
            query.limit,
        )))];
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(parse_summary_row(row)?);
        }
        Ok(summaries)
    }

    fn delete_composition(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM compositions WHERE uuid = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Normalizes list limit according to the composition listing contract.
pub fn normalize_composition_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => COMPOSITIONS_DEFAULT_LIMIT,
        Some(value) if value > COMPOSITIONS_LIMIT_MAX => COMPOSITIONS_LIMIT_MAX,
        Some(value) => value,
    }
}

fn parse_summary_row(row: &Row<'_>) -> RepoResult<CompositionSummary> {
    let id: String = row.get("uuid")?;
    let clef_text: String = row.get("clef")?;
    let clef = Clef::parse(&clef_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid clef `{clef_text}` in compositions.clef"))
    })?;

    Ok(CompositionSummary {
        id,
        name: row.get("name")?,
        date_created: row.get("date_created")?,
        tempo: row.get("tempo")?,
        clef,
        key_signature: row.get("key_signature")?,
        time_signature: row.get("time_signature")?,
        note_count: row.get("note_count")?,
        updated_at: row.get("updated_at")?,
    })
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::normalize_composition_limit;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(normalize_composition_limit(None), 20);
        assert_eq!(normalize_composition_limit(Some(0)), 20);
        assert_eq!(normalize_composition_limit(Some(7)), 7);
        assert_eq!(normalize_composition_limit(Some(5_000)), 100);
    }
}
