use super::{Note, NoteBackend, NoteContent, NoteId, NoteSummary, Result};
use crate::clock::{Clock, SystemClock};

use chrono::NaiveDateTime;
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct StoredNote {
    title: String,
    content: NoteContent,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Notes kept in process memory. Lost on exit
pub struct MemoryBackend {
    notes: RefCell<BTreeMap<NoteId, StoredNote>>,
    last_id: Cell<NoteId>,
    clock: Box<dyn Clock>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            notes: RefCell::new(BTreeMap::new()),
            last_id: Cell::new(0),
            clock,
        }
    }

    fn summaries(&self, keep: impl Fn(&StoredNote) -> bool) -> Vec<NoteSummary> {
        let mut summaries: Vec<NoteSummary> = self
            .notes
            .borrow()
            .iter()
            .filter(|(_, note)| keep(note))
            .map(|(&id, note)| NoteSummary {
                id,
                title: note.title.clone(),
                note_type: note.content.note_type(),
                created_at: note.created_at,
                updated_at: note.updated_at,
            })
            .collect();

        // Same order as the SQLite backend: newest update first, then highest ID
        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        summaries
    }
}

impl NoteBackend for MemoryBackend {
    fn create(&self, title: &str, content: &NoteContent) -> Result<NoteId> {
        // IDs only grow, so deleted IDs are never handed out again
        let id = self.last_id.get() + 1;
        self.last_id.set(id);

        let now = self.clock.now();
        self.notes.borrow_mut().insert(
            id,
            StoredNote {
                title: title.to_string(),
                content: content.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        debug!("Inserted {} note #{id} in memory", content.note_type());
        Ok(id)
    }

    fn list(&self) -> Result<Vec<NoteSummary>> {
        Ok(self.summaries(|_| true))
    }

    fn read(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self.notes.borrow().get(&id).map(|note| Note {
            id,
            title: note.title.clone(),
            content: note.content.clone(),
        }))
    }

    fn update(&self, id: NoteId, title: &str, content: &NoteContent) -> Result<()> {
        let now = self.clock.now();
        if let Some(note) = self.notes.borrow_mut().get_mut(&id) {
            note.title = title.to_string();
            // The stored variant is the note type, so only the payload is replaced
            note.content = match (&note.content, content) {
                (NoteContent::Text(_), new) => {
                    NoteContent::Text(String::from_utf8_lossy(new.as_bytes()).into_owned())
                }
                (NoteContent::Image(_), new) => NoteContent::Image(new.as_bytes().to_vec()),
            };
            note.updated_at = now;
            debug!("Updated note #{id} in memory");
        }
        Ok(())
    }

    fn delete(&self, id: NoteId) -> Result<()> {
        if self.notes.borrow_mut().remove(&id).is_some() {
            debug!("Deleted note #{id} from memory");
        }
        Ok(())
    }

    fn search_by_title(&self, needle: &str) -> Result<Vec<NoteSummary>> {
        // ASCII-only case folding, same as SQLite's lower()
        let needle = needle.to_ascii_lowercase();
        Ok(self.summaries(|note| note.title.to_ascii_lowercase().contains(&needle)))
    }
}
