use super::{MenuError, NoteError, NoteSummary, Result};

use crate::ui::io::IO;
use colored::Colorize;
use log::trace;
use std::io::{self, Write};
use tabled::{Table, settings::Style};

pub struct Cli;

impl Cli {
    // Prints the prompt marker and reads one raw line. End of input is an error
    fn read_line() -> Result<String> {
        print!("> ");
        io::stdout()
            .flush()
            .map_err(|e| NoteError::Menu(MenuError::StdoutWriteError(e)))?;

        let mut line = String::new();
        let read = io::stdin()
            .read_line(&mut line)
            .map_err(|e| NoteError::Menu(MenuError::StdinReadError(e)))?;
        if read == 0 {
            return Err(MenuError::InputClosed.into());
        }
        Ok(line)
    }
}

impl IO for Cli {
    /// Reads a single line of text, trims surrounding whitespace, and
    /// returns the resulting string.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout or reading from stdin fails,
    /// or `MenuError::InputClosed` at end of input.
    fn get_input(&self) -> Result<String> {
        let input = Self::read_line()?.trim().to_string();
        println!();
        trace!("Got input: {input}");
        Ok(input)
    }

    /// Reads lines from stdin until a line exactly matching `stop_at` (trimmed) is entered,
    /// and returns the preceding lines without the final line break.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout or reading from stdin fails,
    /// or `MenuError::InputClosed` at end of input.
    fn get_input_until(&self, stop_at: &str) -> Result<String> {
        let mut input = String::new();
        loop {
            let line = Self::read_line()?;
            trace!("Got input: {}", line.trim_end());

            if line.trim() == stop_at {
                break;
            }
            input += &line;
        }
        println!();
        Ok(input.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Displays a numbered menu prompt with the given options.
    fn show_menu(&self, options: &[impl std::fmt::Display]) {
        self.show_title("Choose an option");
        for o in options {
            println!("{o}");
        }
        println!();
    }

    /// Renders a table of note summaries in `psql` style to stdout.
    fn show_notes_list(&self, notes: Vec<NoteSummary>) {
        if notes.is_empty() {
            println!("{}", "No notes".dimmed());
            return;
        }
        let mut table = Table::new(notes);
        table.with(Style::psql());
        println!("{table}");
    }

    /// Prints a bolded title followed by a blank line.
    fn show_title(&self, title: &str) {
        println!("\n{}\n", title.bold());
    }

    /// Prints plain text to stdout.
    fn show_text(&self, msg: &str) {
        println!("{msg}");
    }
}
