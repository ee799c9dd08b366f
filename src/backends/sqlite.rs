use super::{BackendError, Note, NoteBackend, NoteContent, NoteError, NoteId, NoteSummary, NoteType, Result};
use crate::clock::{format_timestamp, parse_timestamp, Clock, SystemClock};

use log::{debug, trace};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, Error as SqliteError, ErrorCode, OptionalExtension, Row, ToSql};
use std::path::{Path, PathBuf};

const CREATE_NOTES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS notes (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        title      TEXT NOT NULL,
        content    BLOB NOT NULL,
        note_type  TEXT NOT NULL DEFAULT 'text',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

const SUMMARY_COLUMNS: &str = "id, title, note_type, created_at, updated_at";

/// Note store in a single `SQLite` file.
///
/// Every operation opens its own connection and drops it before returning,
/// so no handle outlives a call. Each connection creates the `notes` table if it
/// is missing, so a database file removed while running is recreated.
pub struct SqliteBackend {
    path: PathBuf,
    clock: Box<dyn Clock>,
}

impl SqliteBackend {
    /// Creates a backend for the database file at `path`. Nothing is opened yet
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_clock(path, Box::new(SystemClock))
    }

    /// Like [`SqliteBackend::new`], but timestamps come from `clock`
    #[must_use]
    pub fn with_clock(path: impl AsRef<Path>, clock: Box<dyn Clock>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock,
        }
    }

    /// Opens a connection and creates the `notes` table if it is missing.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `BackendError::DatabaseCreationError` if the file can't be opened or created.
    /// - `BackendError::TableCreationError` if the table can't be created.
    fn connect(&self) -> Result<Connection> {
        let connection = Connection::open(&self.path).map_err(|e| {
            debug!("Failed opening DB at '{}': {e}", self.path.display());
            NoteError::Backend(BackendError::DatabaseCreationError)
        })?;

        connection.execute(CREATE_NOTES_TABLE, []).map_err(|e| {
            debug!("Failed creating notes table: {e}");
            NoteError::Backend(BackendError::TableCreationError)
        })?;

        Ok(connection)
    }

    fn now(&self) -> String {
        format_timestamp(self.clock.now())
    }

    fn query_summaries(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<NoteSummary>> {
        let connection = self.connect()?;
        let mut stmt = connection.prepare(sql).map_err(map_sqlite_error)?;

        let notes_iter = stmt
            .query_map(params, summary_from_row)
            .map_err(map_sqlite_error)?;

        notes_iter
            .collect::<std::result::Result<_, _>>()
            .map_err(map_sqlite_error)
    }
}

/// Maps a `rusqlite::Error` into a `NoteError`, wrapping known SQLite-specific codes into domain-specific variants.
///
/// This function is used internally by all database operations.
///
/// # Errors
///
/// Always returns a `NoteError::Backend` variant. Specific known `SQLite` error codes
/// are converted to more descriptive errors; all others are wrapped in `BackendError::Other`.
fn map_sqlite_error(e: SqliteError) -> NoteError {
    let backend_error = match e {
        SqliteError::SqliteFailure(code, _) => match code.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => BackendError::DatabaseBusy,
            ErrorCode::PermissionDenied | ErrorCode::ReadOnly => BackendError::PermissionDenied,
            ErrorCode::NotADatabase => BackendError::NotADatabase,
            ErrorCode::SchemaChanged => BackendError::SchemaChanged,
            ErrorCode::CannotOpen => BackendError::DatabaseCreationError,
            ErrorCode::DatabaseCorrupt | ErrorCode::SystemIoFailure => {
                BackendError::DatabaseCorruptOrIo
            }
            _ => BackendError::Other(anyhow::anyhow!("SQLite error: {:?}", code)),
        },
        SqliteError::FromSqlConversionFailure(..) | SqliteError::InvalidColumnType(..) => {
            BackendError::NoteCorrupted
        }
        other => BackendError::Other(anyhow::Error::new(other)),
    };
    NoteError::Backend(backend_error)
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<NoteSummary> {
    Ok(NoteSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        note_type: note_type_at(row, 2)?,
        created_at: timestamp_at(row, 3)?,
        updated_at: timestamp_at(row, 4)?,
    })
}

fn note_type_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NoteType> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| SqliteError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| SqliteError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// Content may have been written as TEXT or BLOB. The note type decides how it is read
fn content_at(row: &Row<'_>, idx: usize, note_type: NoteType) -> rusqlite::Result<NoteContent> {
    let bytes = match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
        ValueRef::Null => Vec::new(),
        other => {
            return Err(SqliteError::FromSqlConversionFailure(
                idx,
                other.data_type(),
                "content is neither text nor a blob".into(),
            ));
        }
    };

    Ok(match note_type {
        NoteType::Text => NoteContent::Text(decode_text(bytes)),
        NoteType::Image => NoteContent::Image(bytes),
    })
}

/// Decodes stored text, replacing invalid UTF-8 instead of failing
#[must_use]
pub fn decode_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

// Text goes in as TEXT and images as BLOB
fn content_param(content: &NoteContent) -> &dyn ToSql {
    match content {
        NoteContent::Text(text) => text,
        NoteContent::Image(bytes) => bytes,
    }
}

impl NoteBackend for SqliteBackend {
    /// Inserts a new note into the `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `BackendError::DatabaseBusy`, `PermissionDenied`, `NotADatabase`, or other mapped SQLite-specific errors.
    /// - `BackendError::Other` if an unknown `SQLite` error occurs.
    fn create(&self, title: &str, content: &NoteContent) -> Result<NoteId> {
        let connection = self.connect()?;
        let now = self.now();
        let note_type = content.note_type();

        connection
            .execute(
                "INSERT INTO notes (title, content, note_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![title, content_param(content), note_type.as_str(), now],
            )
            .map_err(map_sqlite_error)?;

        let id = connection.last_insert_rowid();
        debug!("Inserted {note_type} note #{id} ({} bytes)", content.len());
        Ok(id)
    }

    /// Returns metadata for every note, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the query fails or a row can't be decoded.
    fn list(&self) -> Result<Vec<NoteSummary>> {
        self.query_summaries(
            &format!("SELECT {SUMMARY_COLUMNS} FROM notes ORDER BY updated_at DESC, id DESC"),
            &[],
        )
    }

    /// Reads a note by ID, decoding the content according to its type.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `BackendError::NoteCorrupted` if the stored type or content can't be decoded.
    /// - Other mapped `SQLite` errors for query failure.
    fn read(&self, id: NoteId) -> Result<Option<Note>> {
        let connection = self.connect()?;
        connection
            .query_row(
                "SELECT id, title, note_type, content FROM notes WHERE id = ?1",
                [id],
                |row| {
                    let note_type = note_type_at(row, 2)?;
                    Ok(Note {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        content: content_at(row, 3, note_type)?,
                    })
                },
            )
            .optional()
            .map_err(map_sqlite_error)
    }

    /// Updates an existing note's title and content and refreshes `updated_at`.
    /// The `note_type` column is never written.
    ///
    /// # Errors
    ///
    /// Returns backend errors if the update fails due to `SQLite` issues.
    fn update(&self, id: NoteId, title: &str, content: &NoteContent) -> Result<()> {
        let connection = self.connect()?;
        let rows = connection
            .execute(
                "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![title, content_param(content), self.now(), id],
            )
            .map_err(map_sqlite_error)?;

        if rows == 0 {
            trace!("No note with ID {id}, nothing updated");
        } else {
            debug!("Updated note #{id}");
        }
        Ok(())
    }

    /// Deletes a note by ID from the database.
    ///
    /// # Errors
    ///
    /// Returns backend errors if the deletion operation fails.
    fn delete(&self, id: NoteId) -> Result<()> {
        let connection = self.connect()?;
        let rows = connection
            .execute("DELETE FROM notes WHERE id = ?1", [id])
            .map_err(map_sqlite_error)?;

        if rows == 0 {
            trace!("No note with ID {id}, nothing deleted");
        } else {
            debug!("Deleted note #{id}");
        }
        Ok(())
    }

    /// Returns notes whose title contains `needle`, ignoring ASCII case.
    /// `%` and `_` in `needle` are ordinary characters.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the query fails or a row can't be decoded.
    fn search_by_title(&self, needle: &str) -> Result<Vec<NoteSummary>> {
        self.query_summaries(
            &format!(
                "SELECT {SUMMARY_COLUMNS} FROM notes
                 WHERE instr(lower(title), lower(?1)) > 0
                 ORDER BY updated_at DESC, id DESC"
            ),
            &[&needle],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_decodes_lossily() {
        assert_eq!(decode_text(b"plain".to_vec()), "plain");
        assert_eq!(decode_text(vec![b'o', b'k', 0xff]), "ok\u{fffd}");
    }

    #[test]
    fn unknown_sqlite_errors_fall_back_to_other() {
        let err = map_sqlite_error(SqliteError::QueryReturnedNoRows);
        assert!(matches!(err, NoteError::Backend(BackendError::Other(_))));
    }

    #[test]
    fn busy_database_maps_to_busy() {
        let failure = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY);
        let err = map_sqlite_error(SqliteError::SqliteFailure(failure, None));
        assert!(matches!(err, NoteError::Backend(BackendError::DatabaseBusy)));
    }
}
