use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub type DayKey = String;

pub const PRESET_DATE: &str = "2024-10-11T05:35:00";
pub const PRESET_MESSAGE: &str = "¡¡Para que llegue Alana!!";

const DAY_KEY_FORMAT: &str = "%a %b %d %Y";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub date: NaiveDateTime,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Note {
    pub date: DayKey,
    pub content: String,
}

/// The notes table, keyed by day. Keeps first-insertion order; an
/// overwrite leaves the entry where it was.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct NoteBook {
    entries: Vec<Note>,
}

impl TargetConfig {
    pub fn new(date: NaiveDateTime, message: impl Into<String>) -> Self {
        TargetConfig {
            date,
            message: message.into(),
        }
    }

    pub fn preset() -> Self {
        let date = NaiveDateTime::parse_from_str(PRESET_DATE, "%Y-%m-%dT%H:%M:%S")
            .unwrap_or_default();
        TargetConfig::new(date, PRESET_MESSAGE)
    }
}

impl Note {
    pub fn new(date: impl Into<DayKey>, content: impl Into<String>) -> Self {
        Note {
            date: date.into(),
            content: content.into(),
        }
    }
}

impl NoteBook {
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let mut book = NoteBook::default();
        for note in notes {
            book.upsert(note);
        }
        book
    }

    pub fn upsert(&mut self, note: Note) {
        match self.entries.iter_mut().find(|n| n.date == note.date) {
            Some(existing) => existing.content = note.content,
            None => self.entries.push(note),
        }
    }

    pub fn get(&self, day: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|n| n.date == day)
            .map(|n| n.content.as_str())
    }

    pub fn contains(&self, day: &str) -> bool {
        self.get(day).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Canonical lookup key for a calendar day, e.g. `Thu Oct 10 2024`.
pub fn day_key(date: NaiveDate) -> DayKey {
    date.format(DAY_KEY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_values() {
        let preset = TargetConfig::preset();
        assert_eq!(
            preset.date,
            NaiveDate::from_ymd_opt(2024, 10, 11)
                .unwrap()
                .and_hms_opt(5, 35, 0)
                .unwrap()
        );
        assert_eq!(preset.message, PRESET_MESSAGE);
    }

    #[test]
    fn test_day_key_format() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 10).unwrap();
        assert_eq!(day_key(date), "Thu Oct 10 2024");
        let padded = NaiveDate::from_ymd_opt(2024, 10, 3).unwrap();
        assert_eq!(day_key(padded), "Thu Oct 03 2024");
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut book = NoteBook::default();
        book.upsert(Note::new("Thu Oct 10 2024", "first"));
        book.upsert(Note::new("Fri Oct 11 2024", "second"));
        book.upsert(Note::new("Thu Oct 10 2024", "replaced"));

        let entries: Vec<_> = book
            .iter()
            .map(|n| (n.date.as_str(), n.content.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![("Thu Oct 10 2024", "replaced"), ("Fri Oct 11 2024", "second")]
        );
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut book = NoteBook::from_notes(vec![Note::new("Thu Oct 10 2024", "x")]);
        assert!(book.contains("Thu Oct 10 2024"));
        book.clear();
        assert!(book.is_empty());
    }
}
