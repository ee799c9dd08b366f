use crate::capture::{self, image_format};
use crate::{
    Note, NoteBackend, NoteContent, NoteId, NoteSummary, NoteType, NoteValidationError, Result,
};
use log::{debug, trace};
use std::path::Path;

pub struct NoteService {
    pub repo: Box<dyn NoteBackend>,
    pub max_title_size: u16,
    pub max_content_size: usize,
}

impl NoteService {
    pub fn new(repo: Box<dyn NoteBackend>, max_title_size: u16, max_content_size: usize) -> Self {
        Self {
            repo,
            max_title_size,
            max_content_size,
        }
    }

    // All notes (without content), most recently updated first
    pub fn list_notes(&self) -> Result<Vec<NoteSummary>> {
        self.repo.list()
    }

    // Title search. A blank query lists everything
    pub fn search_notes(&self, query: &str) -> Result<Vec<NoteSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_notes();
        }
        let found = self.repo.search_by_title(query)?;
        trace!("Search for '{query}' matched {} notes", found.len());
        Ok(found)
    }

    // Create a text note after validation
    pub fn add_text_note(&self, title: &str, content: String) -> Result<NoteId> {
        let title = title.trim();
        Self::validate_title(title, self.max_title_size)?;
        Self::validate_text(&content, self.max_content_size)?;

        self.repo.create(title, &NoteContent::Text(content))
    }

    // Create an image note. The bytes must be a recognized image
    pub fn add_image_note(&self, title: &str, bytes: Vec<u8>) -> Result<NoteId> {
        let title = title.trim();
        Self::validate_title(title, self.max_title_size)?;
        Self::validate_image(&bytes, self.max_content_size)?;

        self.repo.create(title, &NoteContent::Image(bytes))
    }

    pub fn read_note(&self, id: NoteId) -> Result<Note> {
        self.repo
            .read(id)?
            .ok_or_else(|| NoteValidationError::NoteNotFound(id).into())
    }

    // Replace title and content of a text note
    // Image notes are read-only once saved
    pub fn update_note(&self, id: NoteId, title: &str, content: String) -> Result<()> {
        let title = title.trim();
        Self::validate_title(title, self.max_title_size)?;
        Self::validate_text(&content, self.max_content_size)?;

        let existing = self.read_note(id)?;
        if existing.note_type() == NoteType::Image {
            return Err(NoteValidationError::ImageReadOnly(id).into());
        }

        self.repo.update(id, title, &NoteContent::Text(content))
    }

    // Delete note by ID. Deleting a missing note is not an error
    pub fn delete_note(&self, id: NoteId) -> Result<()> {
        self.repo.delete(id)
    }

    // Write the note content to a file
    pub fn export_note(&self, id: NoteId, path: &Path) -> Result<Note> {
        let note = self.read_note(id)?;
        capture::write_content(path, &note.content)?;
        debug!("Exported note #{id} to '{}'", path.display());
        Ok(note)
    }

    // --- small helpers ---

    // Validate note title
    pub fn validate_title(title: &str, max: u16) -> Result<()> {
        if title.trim().is_empty() {
            Err(NoteValidationError::TitleEmpty.into())
        } else if title.len() > max as usize {
            Err(NoteValidationError::TitleTooLarge {
                max,
                got: title.len(),
            }
            .into())
        } else {
            Ok(())
        }
    }

    // Validate text note content
    pub fn validate_text(content: &str, max: usize) -> Result<()> {
        if content.trim().is_empty() {
            Err(NoteValidationError::ContentEmpty.into())
        } else {
            Self::validate_size(content.len(), max)
        }
    }

    // Validate image note content
    pub fn validate_image(bytes: &[u8], max: usize) -> Result<()> {
        if bytes.is_empty() {
            Err(NoteValidationError::ContentEmpty.into())
        } else if image_format(bytes).is_none() {
            Err(NoteValidationError::UnsupportedImage.into())
        } else {
            Self::validate_size(bytes.len(), max)
        }
    }

    fn validate_size(got: usize, max: usize) -> Result<()> {
        if got > max {
            Err(NoteValidationError::ContentTooLarge { max, got }.into())
        } else {
            Ok(())
        }
    }
}
