use crate::calendar::{self, MonthGrid};
use crate::countdown::{self, Remaining};
use crate::form::{self, FormError};
use crate::model::{day_key, Note, NoteBook, TargetConfig};
use crate::notes::NotesManager;
use crate::storage::{Store, StoreError, StoreLocation};
use chrono::{NaiveDate, NaiveDateTime};
use log::{error, info, warn};

/// A state change requested by the user. Each one is persisted before the
/// in-memory state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetTarget(TargetConfig),
    PutNote(Note),
    ClearNotes,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// All application state: the store handle (if it opened), the current
/// target and the notes.
#[derive(Debug)]
pub struct Session {
    store: Option<Store>,
    location: StoreLocation,
    target: TargetConfig,
    target_is_preset: bool,
    notes: NotesManager,
    log: Vec<Mutation>,
}

impl Session {
    /// Opens the store, then loads the target and the notes, in that order.
    /// A store that fails to open is logged and the session runs on
    /// in-memory defaults.
    pub fn start(location: StoreLocation) -> Session {
        let store = match Store::open(&location) {
            Ok(store) => Some(store),
            Err(err) => {
                error!("could not open store {}: {}", location.path.display(), err);
                None
            }
        };
        Session::from_store(store, location)
    }

    pub fn from_store(store: Option<Store>, location: StoreLocation) -> Session {
        let (target, target_is_preset) = match store.as_ref().and_then(Store::get_target_config) {
            Some(cfg) => (cfg, false),
            None => {
                info!("no saved target, using preset");
                (TargetConfig::preset(), true)
            }
        };
        let notes = NotesManager::load(store.as_ref());
        Session {
            store,
            location,
            target,
            target_is_preset,
            notes,
            log: Vec::new(),
        }
    }

    pub fn apply(&mut self, mutation: Mutation) -> Result<bool, StoreError> {
        let changed = match &mutation {
            Mutation::SetTarget(cfg) => {
                if let Some(store) = self.store.as_mut() {
                    store.put_target_config(cfg)?;
                }
                self.target = cfg.clone();
                self.target_is_preset = false;
                true
            }
            Mutation::PutNote(note) => self
                .notes
                .add_or_update_note(self.store.as_mut(), &note.date, &note.content)?
                .is_some(),
            Mutation::ClearNotes => {
                self.notes.reset_all(self.store.as_mut())?;
                true
            }
        };
        if changed {
            if self.store.is_none() {
                warn!("store unavailable, {:?} kept in memory only", mutation);
            }
            self.log.push(mutation);
        }
        Ok(changed)
    }

    pub fn submit_form(
        &mut self,
        date: &str,
        time: &str,
        message: &str,
    ) -> Result<TargetConfig, SessionError> {
        let cfg = form::parse_submission(date, time, message)?;
        self.apply(Mutation::SetTarget(cfg.clone()))?;
        Ok(cfg)
    }

    /// Returns `false` when the content was blank and nothing changed.
    pub fn add_note(&mut self, day: NaiveDate, content: &str) -> Result<bool, StoreError> {
        self.apply(Mutation::PutNote(Note::new(day_key(day), content)))
    }

    pub fn reset_notes(&mut self) -> Result<(), StoreError> {
        self.apply(Mutation::ClearNotes).map(|_| ())
    }

    pub fn remaining(&self, now: NaiveDateTime) -> Remaining {
        countdown::tick(self.target.date, now)
    }

    pub fn calendar(&self, now: NaiveDateTime) -> Vec<MonthGrid> {
        calendar::render(now, self.target.date)
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    pub fn target_is_preset(&self) -> bool {
        self.target_is_preset
    }

    pub fn notes(&self) -> &NotesManager {
        &self.notes
    }

    pub fn note_book(&self) -> &NoteBook {
        self.notes.book()
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn log(&self) -> &[Mutation] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn location(dir: &tempfile::TempDir) -> StoreLocation {
        StoreLocation::explicit(dir.path().join("store.yml"))
    }

    #[test]
    fn test_empty_store_uses_preset_without_saving_it() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::start(location(&dir));
        assert!(session.is_persistent());
        assert!(session.target_is_preset());
        assert_eq!(session.target(), &TargetConfig::preset());

        let store = Store::open(&location(&dir)).unwrap();
        assert!(store.get_target_config().is_none());
    }

    #[test]
    fn test_submit_persists_and_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(location(&dir));
        session.submit_form("2030-01-01", "00:00", "").unwrap();
        assert!(!session.target_is_preset());

        let restarted = Session::start(location(&dir));
        assert_eq!(
            restarted.target().date.format("%Y-%m-%d %H:%M").to_string(),
            "2030-01-01 00:00"
        );
        assert_eq!(restarted.target().message, "");
    }

    #[test]
    fn test_rejected_form_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(location(&dir));
        let err = session.submit_form("2030-01-01", "", "x").unwrap_err();
        assert!(matches!(err, SessionError::Form(FormError::MissingDateTime)));
        assert_eq!(session.target(), &TargetConfig::preset());
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_note_write_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(location(&dir));
        let day = NaiveDate::from_ymd_opt(2024, 10, 10).unwrap();
        assert!(session.add_note(day, "Comprar regalo").unwrap());
        assert!(!session.add_note(day, "").unwrap());
        assert_eq!(session.notes().print_view(), "Thu Oct 10 2024: Comprar regalo");

        let restarted = Session::start(location(&dir));
        assert_eq!(restarted.note_book(), session.note_book());
    }

    #[test]
    fn test_reset_then_restart_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(location(&dir));
        let day = NaiveDate::from_ymd_opt(2024, 10, 10).unwrap();
        session.add_note(day, "a").unwrap();
        session.reset_notes().unwrap();
        assert!(session.note_book().is_empty());
        assert!(Session::start(location(&dir)).note_book().is_empty());
        assert_eq!(
            session.log(),
            &[
                Mutation::PutNote(Note::new("Thu Oct 10 2024", "a")),
                Mutation::ClearNotes
            ]
        );
    }

    #[test]
    fn test_open_failure_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.yml");
        fs::write(&path, "version: 99\n").unwrap();
        let mut session = Session::start(StoreLocation::explicit(&path));
        assert!(!session.is_persistent());
        assert_eq!(session.target(), &TargetConfig::preset());

        let day = NaiveDate::from_ymd_opt(2024, 10, 10).unwrap();
        assert!(session.add_note(day, "solo memoria").unwrap());
        assert_eq!(session.note_book().len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "version: 99\n");
    }

    #[test]
    fn test_countdown_and_calendar_follow_target() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::start(location(&dir));
        let now = NaiveDate::from_ymd_opt(2024, 10, 9)
            .unwrap()
            .and_hms_opt(5, 35, 0)
            .unwrap();
        assert_eq!(session.remaining(now).days, 2);
        let grids = session.calendar(now);
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].label, "October 2024");
    }
}
