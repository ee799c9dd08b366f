use super::{MenuError, NoteError, NoteSummary, Result};
use crate::app::NoteService;
use crate::capture::{self, ClipboardSource, SystemClipboard, image_format};
use crate::setup::{arguments, logging};
use crate::ui::cli;
use crate::{Note, NoteContent, NoteId, NoteType, NoteValidationError};

use clap::Parser;
use log::{error, info, trace, warn};
use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;

/// Abstraction for input/output
pub trait IO {
    /// Read a trimmed line of input ending at newline
    fn get_input(&self) -> Result<String>;
    /// Read multiple lines until a trimmed line equals `stop_at`
    fn get_input_until(&self, stop_at: &str) -> Result<String>;
    /// Display a list of selectable options
    fn show_menu(&self, options: &[impl std::fmt::Display]);
    /// Display a bolded title
    fn show_title(&self, title: &str);
    /// Render a table of note summaries
    fn show_notes_list(&self, notes: Vec<NoteSummary>);
    /// Print a plain text message
    fn show_text(&self, msg: &str);
}

/// Actions available in the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Quit = 0,
    NewText = 1,
    FromClipboard = 2,
    FromImage = 3,
    Preview = 4,
    Edit = 5,
    Delete = 6,
    List = 7,
    Search = 8,
    Export = 9,
}

/// All menu options in display order
pub const ALL_MENU_OPTIONS: [MenuOption; 10] = [
    MenuOption::NewText,
    MenuOption::FromClipboard,
    MenuOption::FromImage,
    MenuOption::Preview,
    MenuOption::Edit,
    MenuOption::Delete,
    MenuOption::List,
    MenuOption::Search,
    MenuOption::Export,
    MenuOption::Quit,
];

/// Convert a numeric choice into a `MenuOption`
///
/// # Errors
///
/// Returns `Err(())` if the value does not map to a valid variant
impl TryFrom<u8> for MenuOption {
    type Error = ();

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        match n {
            0 => Ok(Self::Quit),
            1 => Ok(Self::NewText),
            2 => Ok(Self::FromClipboard),
            3 => Ok(Self::FromImage),
            4 => Ok(Self::Preview),
            5 => Ok(Self::Edit),
            6 => Ok(Self::Delete),
            7 => Ok(Self::List),
            8 => Ok(Self::Search),
            9 => Ok(Self::Export),
            _ => Err(()),
        }
    }
}

/// Show the option number and label, e.g. `(1) New text note`
impl fmt::Display for MenuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Quit => "Quit",
            Self::NewText => "New text note",
            Self::FromClipboard => "New note from clipboard",
            Self::FromImage => "New image note from file",
            Self::Preview => "Preview note",
            Self::Edit => "Edit note",
            Self::Delete => "Delete note",
            Self::List => "List notes",
            Self::Search => "Search notes by title",
            Self::Export => "Export note to file",
        };
        write!(f, "({}) {}", *self as u8, label)
    }
}

/// State kept between menu actions
pub struct Session {
    previewed: Cell<Option<NoteId>>,
    clipboard: Box<dyn ClipboardSource>,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_clipboard(Box::new(SystemClipboard))
    }
}

impl Session {
    #[must_use]
    pub fn with_clipboard(clipboard: Box<dyn ClipboardSource>) -> Self {
        Self {
            previewed: Cell::new(None),
            clipboard,
        }
    }

    /// The note shown by the last preview, if it still exists
    #[must_use]
    pub fn previewed(&self) -> Option<NoteId> {
        self.previewed.get()
    }

    fn set_previewed(&self, id: Option<NoteId>) {
        self.previewed.set(id);
    }
}

/// Parse args, initialize logging, and run the menu until the user quits
///
/// # Errors
///
/// Returns an error if stdin or stdout fails
pub fn run() -> Result<()> {
    let args = arguments::Args::parse();
    logging::setup_log(args.log_level);
    let service = arguments::build_service(&args);
    let io = cli::Cli;

    run_menu(&io, &service)
}

/// Menu loop. Returns when the user quits or input ends
///
/// # Errors
///
/// Returns an error if reading input or writing output fails
pub fn run_menu(io: &impl IO, service: &NoteService) -> Result<()> {
    let session = Session::default();

    loop {
        io.show_menu(&ALL_MENU_OPTIONS);
        let outcome = match get_menu_input(io) {
            Ok(MenuOption::Quit) => return Ok(()),
            Ok(opt) => handle_menu_option(io, service, &session, opt),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {}
            Err(NoteError::Menu(MenuError::InputClosed)) => {
                trace!("Input closed, leaving menu");
                return Ok(());
            }
            Err(NoteError::Menu(
                e @ (MenuError::ParseError(_) | MenuError::InvalidOption(_)),
            )) => error!("{e}"),
            Err(e) => return Err(e),
        }
    }
}

/// Try parsing input as `MenuOption` or return an error
///
/// # Errors
///
/// Returns `NoteError::Menu(MenuError::ParseError)` if input is not an integer
/// Returns `NoteError::Menu(MenuError::InvalidOption)` if integer is out of range
fn get_menu_input(io: &impl IO) -> Result<MenuOption> {
    let input = io.get_input()?;

    match input.parse::<u8>() {
        Ok(n) => MenuOption::try_from(n).map_err(|()| MenuError::InvalidOption(n).into()),
        Err(_) => Err(MenuError::ParseError(input).into()),
    }
}

/// Dispatch chosen `MenuOption` to its handler
///
/// # Errors
///
/// Only input and output failures are returned. Note errors are logged by the handlers
pub fn handle_menu_option(
    io: &impl IO,
    service: &NoteService,
    session: &Session,
    option: MenuOption,
) -> Result<()> {
    match option {
        MenuOption::Quit => Ok(()),
        MenuOption::NewText => handle_new_text(io, service),
        MenuOption::FromClipboard => handle_from_clipboard(io, service, session),
        MenuOption::FromImage => handle_from_image(io, service),
        MenuOption::Preview => handle_preview(io, service, session),
        MenuOption::Edit => handle_edit(io, service, session),
        MenuOption::Delete => handle_delete(io, service, session),
        MenuOption::List => handle_list(io, service),
        MenuOption::Search => handle_search(io, service),
        MenuOption::Export => handle_export(io, service, session),
    }
}

// Ask for a title until it passes validation
fn prompt_title(io: &impl IO, service: &NoteService) -> Result<String> {
    loop {
        io.show_text("Title:");
        let input = io.get_input()?;
        match NoteService::validate_title(&input, service.max_title_size) {
            Ok(()) => {
                trace!("Got valid title: {input}");
                return Ok(input);
            }
            Err(e) => error!("{e}"),
        }
    }
}

// Ask for multi-line text until it passes validation
fn prompt_text(io: &impl IO, service: &NoteService) -> Result<String> {
    loop {
        // Stop when getting a "." alone on a line
        io.show_text("Content (end with '.' on last line):");
        let input = io.get_input_until(".")?;
        match NoteService::validate_text(&input, service.max_content_size) {
            Ok(()) => {
                trace!("Got valid content: {} bytes", input.len());
                return Ok(input);
            }
            Err(e) => error!("Got invalid content: {e}"),
        }
    }
}

// Ask for a note ID. A blank answer picks `default` when there is one
fn prompt_id(io: &impl IO, default: Option<NoteId>) -> Result<NoteId> {
    loop {
        match default {
            Some(id) => io.show_text(&format!("ID (blank for #{id}):")),
            None => io.show_text("ID:"),
        }
        let input = io.get_input()?;
        if input.is_empty() {
            if let Some(id) = default {
                return Ok(id);
            }
            continue;
        }
        match input.parse::<NoteId>() {
            Ok(id) => return Ok(id),
            Err(e) => error!("Got invalid ID: {e}"),
        }
    }
}

fn confirm(io: &impl IO, question: &str) -> Result<bool> {
    loop {
        io.show_text(&format!("{question} (y/n):"));
        match io.get_input()?.to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => warn!("Invalid input. Please enter 'y' or 'n'"),
        }
    }
}

fn report_saved(result: Result<NoteId>) {
    match result {
        Ok(id) => info!("Note saved with ID: {id}"),
        Err(e) => error!("{e}"),
    }
}

/// Direct text entry
fn handle_new_text(io: &impl IO, service: &NoteService) -> Result<()> {
    io.show_title("New text note");

    let title = prompt_title(io, service)?;
    let content = prompt_text(io, service)?;
    report_saved(service.add_text_note(&title, content));
    Ok(())
}

/// Save the current clipboard text as a note. No text or no clipboard means nothing is saved
fn handle_from_clipboard(io: &impl IO, service: &NoteService, session: &Session) -> Result<()> {
    io.show_title("New note from clipboard");

    let text = match session.clipboard.text() {
        Ok(Some(text)) => text,
        Ok(None) => {
            warn!("Clipboard has no text to save");
            return Ok(());
        }
        Err(e) => {
            warn!("{e}");
            return Ok(());
        }
    };

    io.show_text(&excerpt(&text, 5));
    let title = prompt_title(io, service)?;
    report_saved(service.add_text_note(&title, text));
    Ok(())
}

/// Save an image file as an image note
fn handle_from_image(io: &impl IO, service: &NoteService) -> Result<()> {
    io.show_title("New image note");

    io.show_text("Image file path:");
    let path = PathBuf::from(io.get_input()?);
    let bytes = match capture::image_file(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("{e}");
            return Ok(());
        }
    };

    io.show_text(&describe_image(&bytes));
    let title = prompt_title(io, service)?;
    report_saved(service.add_image_note(&title, bytes));
    Ok(())
}

/// Show a note and remember it as the previewed one
fn handle_preview(io: &impl IO, service: &NoteService, session: &Session) -> Result<()> {
    io.show_title("Preview note");

    let id = prompt_id(io, session.previewed())?;
    match service.read_note(id) {
        Ok(note) => {
            show_note(io, &note);
            session.set_previewed(Some(note.id));
        }
        Err(e) => error!("{e}"),
    }
    Ok(())
}

/// Replace title and content of a text note
fn handle_edit(io: &impl IO, service: &NoteService, session: &Session) -> Result<()> {
    io.show_title("Edit note");

    let id = prompt_id(io, session.previewed())?;
    let note = match service.read_note(id) {
        Ok(note) => note,
        Err(e) => {
            error!("{e}");
            return Ok(());
        }
    };
    if note.note_type() == NoteType::Image {
        error!("{}", NoteValidationError::ImageReadOnly(id));
        return Ok(());
    }

    io.show_text(&format!("Title (blank keeps '{}'):", note.title));
    let input = io.get_input()?;
    let title = if input.is_empty() {
        note.title
    } else {
        input
    };
    let content = prompt_text(io, service)?;

    match service.update_note(id, &title, content) {
        Ok(()) => info!("Successfully updated note with ID: {id}"),
        Err(e) => error!("{e}"),
    }
    Ok(())
}

/// Delete a note after confirmation. Clears the preview if it showed that note
fn handle_delete(io: &impl IO, service: &NoteService, session: &Session) -> Result<()> {
    io.show_title("Delete note");

    let id = prompt_id(io, session.previewed())?;
    if !confirm(io, &format!("Delete note #{id}? This can't be undone"))? {
        info!("Not deleting note with ID: {id}");
        return Ok(());
    }

    match service.delete_note(id) {
        Ok(()) => {
            info!("Deleted note with ID: {id}");
            if session.previewed() == Some(id) {
                session.set_previewed(None);
                trace!("Cleared preview of note #{id}");
            }
        }
        Err(e) => error!("{e}"),
    }
    Ok(())
}

/// Fetch all notes and display in a table
fn handle_list(io: &impl IO, service: &NoteService) -> Result<()> {
    match service.list_notes() {
        Ok(notes) => io.show_notes_list(notes),
        Err(e) => error!("{e}"),
    }
    Ok(())
}

fn handle_search(io: &impl IO, service: &NoteService) -> Result<()> {
    io.show_title("Search notes");

    io.show_text("Title contains (blank lists all):");
    let query = io.get_input()?;
    match service.search_notes(&query) {
        Ok(notes) => io.show_notes_list(notes),
        Err(e) => error!("{e}"),
    }
    Ok(())
}

fn handle_export(io: &impl IO, service: &NoteService, session: &Session) -> Result<()> {
    io.show_title("Export note");

    let id = prompt_id(io, session.previewed())?;
    let note = match service.read_note(id) {
        Ok(note) => note,
        Err(e) => {
            error!("{e}");
            return Ok(());
        }
    };

    let suggested = capture::suggested_file_name(&note);
    io.show_text(&format!("File path (blank for '{suggested}'):"));
    let input = io.get_input()?;
    let path = PathBuf::from(if input.is_empty() { suggested } else { input });

    match service.export_note(id, &path) {
        Ok(_) => info!("Exported note #{id} to '{}'", path.display()),
        Err(e) => error!("{e}"),
    }
    Ok(())
}

fn show_note(io: &impl IO, note: &Note) {
    io.show_text(&"-".repeat(20));
    io.show_text(&format!("#{}: {} [{}]\n", note.id, note.title, note.note_type()));
    match &note.content {
        NoteContent::Text(text) => io.show_text(text),
        NoteContent::Image(bytes) => {
            io.show_text(&describe_image(bytes));
            io.show_text("Use 'Export note to file' to view it");
        }
    }
    io.show_text(&"-".repeat(20));
}

fn describe_image(bytes: &[u8]) -> String {
    match image_format(bytes) {
        Some(format) => format!("{format} image, {} bytes", bytes.len()),
        None => format!("Unrecognized image data, {} bytes", bytes.len()),
    }
}

// First `max_lines` lines of `text`, marking anything cut off
fn excerpt(text: &str, max_lines: usize) -> String {
    let mut lines = text.lines();
    let shown: Vec<&str> = lines.by_ref().take(max_lines).collect();
    let mut excerpt = shown.join("\n");
    if lines.next().is_some() {
        excerpt.push_str("\n...");
    }
    excerpt
}
