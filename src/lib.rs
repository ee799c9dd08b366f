#![deny(clippy::cargo)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::nursery)]
#![deny(clippy::perf)]
#![deny(clippy::style)]
#![deny(clippy::suspicious)]
#![deny(clippy::pedantic)]

use chrono::NaiveDateTime;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tabled::Tabled;
use thiserror::Error;

pub mod app;
pub mod backends;
pub mod capture;
pub mod clock;
pub mod setup;
pub mod ui;

// More convenient Result type
pub type Result<T> = std::result::Result<T, NoteError>;

/// Row identifier assigned by the store
pub type NoteId = i64;

/// Discriminates how the stored content is interpreted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteType {
    #[default]
    Text,
    Image,
}

impl NoteType {
    /// Name stored in the `note_type` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = NoteTypeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(NoteTypeParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown note type: '{0}'")]
pub struct NoteTypeParseError(pub String);

/// Note body. The variant decides the note type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteContent {
    Text(String),
    Image(Vec<u8>),
}

impl NoteContent {
    #[must_use]
    pub const fn note_type(&self) -> NoteType {
        match self {
            Self::Text(_) => NoteType::Text,
            Self::Image(_) => NoteType::Image,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Image(bytes) => bytes,
        }
    }

    /// Size of the content in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Full note, as returned by a single read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: NoteContent,
}

impl Note {
    #[must_use]
    pub const fn note_type(&self) -> NoteType {
        self.content.note_type()
    }
}

// Note metadata without content. Displayed in lists and search results
#[derive(Tabled, Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    #[tabled(rename = "ID")]
    pub id: NoteId,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Type")]
    pub note_type: NoteType,
    #[tabled(rename = "Created")]
    pub created_at: NaiveDateTime,
    #[tabled(rename = "Updated")]
    pub updated_at: NaiveDateTime,
}

/// Trait to be implemented by all backends that store and retrieve notes
pub trait NoteBackend {
    /// Stores a new note and returns the ID the backend assigned to it.
    /// Both timestamps are set to the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the note could not be inserted
    fn create(&self, title: &str, content: &NoteContent) -> Result<NoteId>;

    /// Lists all notes, most recently updated first. Content is not included
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    fn list(&self) -> Result<Vec<NoteSummary>>;

    /// Fetches the full note, or `None` if no note has this ID
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored row is unreadable
    fn read(&self, id: NoteId) -> Result<Option<Note>>;

    /// Replaces title and content and refreshes `updated_at`.
    /// The note type never changes. Unknown IDs are ignored
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    fn update(&self, id: NoteId, title: &str, content: &NoteContent) -> Result<()>;

    /// Deletes a note. Unknown IDs are ignored
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails
    fn delete(&self, id: NoteId) -> Result<()>;

    /// Lists notes whose title contains `needle`, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    fn search_by_title(&self, needle: &str) -> Result<Vec<NoteSummary>>;
}

// Enum for all possible validation, backend, capture or menu errors
#[derive(Debug, Error)]
pub enum NoteError {
    #[error(transparent)]
    Validation(#[from] NoteValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Menu(#[from] MenuError),
}

// Enum for all possible menu input errors
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Failed to read from stdin: {0}")]
    StdinReadError(io::Error),

    #[error("Input closed")]
    InputClosed,

    #[error("Couldn't convert '{0}' to a number. Please enter a number 0-9")]
    ParseError(String),

    #[error("There is no menu option {0}. Please enter a number 0-9")]
    InvalidOption(u8),

    #[error("Failed writing to stdout")]
    StdoutWriteError(io::Error),
}

// Enum for all possible data and input validation errors
#[derive(Debug, Error)]
pub enum NoteValidationError {
    #[error("Title is empty")]
    TitleEmpty,

    #[error("Content is empty")]
    ContentEmpty,

    #[error("Title is too large. Max: {max}, Got: {got}")]
    TitleTooLarge { max: u16, got: usize },

    #[error("Content is too large. Max: {max}, Got: {got}")]
    ContentTooLarge { max: usize, got: usize },

    #[error("Content is not a supported image (PNG, JPEG, GIF, BMP or WebP)")]
    UnsupportedImage,

    #[error("Note not found with ID: {0}")]
    NoteNotFound(NoteId),

    #[error("Note with ID {0} is an image and can't be edited")]
    ImageReadOnly(NoteId),
}

// Enum for all possible capture errors. These are reported and then treated as "no content"
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Failed reading image file '{path}'")]
    ImageReadError { path: PathBuf, source: io::Error },

    #[error("File '{0}' is not a supported image")]
    UnsupportedImage(PathBuf),

    #[error("Failed writing note to '{path}'")]
    ExportWriteError { path: PathBuf, source: io::Error },
}

// Enum for all possible repository/backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database file could not be opened or created")]
    DatabaseCreationError,

    #[error("Failed creating `notes` table in database")]
    TableCreationError,

    #[error("Note is improperly formatted. Failed reading all fields")]
    NoteCorrupted,

    #[error("Database is locked or busy")]
    DatabaseBusy,

    #[error("Database corruption or file I/O error")]
    DatabaseCorruptOrIo,

    #[error("Database file is not a valid SQLite database")]
    NotADatabase,

    #[error("Database schema has changed unexpectedly")]
    SchemaChanged,

    #[error("Insufficient permissions")]
    PermissionDenied,

    #[error(transparent)]
    Other(#[from] anyhow::Error), // Used as fallback
}
