use crate::model::{Note, NoteBook};
use crate::storage::{Store, StoreError};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;

/// Day notes kept in memory and mirrored to the store. Every write hits the
/// store first; memory only changes after the store accepted it.
#[derive(Debug, Default)]
pub struct NotesManager {
    book: NoteBook,
}

impl NotesManager {
    pub fn load(store: Option<&Store>) -> Self {
        let book = store
            .map(|s| NoteBook::from_notes(s.get_all_notes()))
            .unwrap_or_default();
        debug!("loaded {} notes", book.len());
        NotesManager { book }
    }

    /// Returns the stored note, or `None` when the input was blank and
    /// nothing changed.
    pub fn add_or_update_note(
        &mut self,
        store: Option<&mut Store>,
        day: &str,
        content: &str,
    ) -> Result<Option<Note>, StoreError> {
        let Some(content) = normalize_content(content) else {
            return Ok(None);
        };
        let note = Note::new(day, content);
        match store {
            Some(store) => {
                store.put_note(&note)?;
                self.sync(store);
            }
            None => self.book.upsert(note.clone()),
        }
        info!("saved note for {}", note.date);
        Ok(Some(note))
    }

    pub fn list_notes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.book
            .iter()
            .map(|n| (n.date.as_str(), n.content.as_str()))
    }

    pub fn get(&self, day: &str) -> Option<&str> {
        self.book.get(day)
    }

    pub fn book(&self) -> &NoteBook {
        &self.book
    }

    pub fn reset_all(&mut self, store: Option<&mut Store>) -> Result<(), StoreError> {
        match store {
            Some(store) => {
                store.clear_notes()?;
                self.sync(store);
            }
            None => self.book.clear(),
        }
        info!("cleared all notes");
        Ok(())
    }

    // Mirror what the store holds after a write, including notes another
    // handle wrote since this one loaded.
    fn sync(&mut self, store: &Store) {
        self.book = NoteBook::from_notes(store.get_all_notes());
    }

    /// `day: content` lines, one per note, in insertion order.
    pub fn print_view(&self) -> String {
        self.list_notes()
            .map(|(day, content)| format!("{}: {}", day, content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn write_print_view(&self, path: &Path) -> io::Result<()> {
        let mut text = self.print_view();
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(path, text)
    }
}

/// Blank or whitespace-only input counts as a cancelled prompt.
pub fn normalize_content(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

pub fn note_prompt(day: &str) -> String {
    format!("Ingrese una nota para el {}:", day)
}
