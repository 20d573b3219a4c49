use crate::model::{Note, NoteBook, TargetConfig};
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PROJECT_DIR: &str = ".countcal";
const STORE_FILE: &str = "store.yml";
const SCHEMA_VERSION: u32 = 1;
const TARGET_ID: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Explicit,
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("could not locate a data directory")]
    NoDataDir,
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed store {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("serializing store: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("unsupported store version {0}")]
    Version(u32),
}

/// Handle to an opened store. Every write goes straight to disk and is
/// applied on top of the file's current contents, so several handles (the
/// TUI and one-shot commands) can share a store.
#[derive(Debug)]
pub struct Store {
    location: StoreLocation,
    tables: Tables,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct Tables {
    #[serde(default = "schema_version")]
    version: u32,
    #[serde(default)]
    target_date: Vec<TargetRecord>,
    #[serde(default)]
    notes: NoteBook,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct TargetRecord {
    id: u32,
    #[serde(flatten)]
    config: TargetConfig,
}

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

impl StoreLocation {
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        StoreLocation {
            path: path.into(),
            scope: StoreScope::Explicit,
        }
    }

    pub fn scope_label(&self) -> &'static str {
        match self.scope {
            StoreScope::Explicit => "explicit",
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Store {
    /// Opens the store, creating an empty one on disk if none exists yet.
    pub fn open(location: &StoreLocation) -> Result<Store, StoreError> {
        let tables = match read_tables(&location.path)? {
            Some(tables) => {
                debug!(
                    "opened store {} ({} notes)",
                    location.path.display(),
                    tables.notes.len()
                );
                tables
            }
            None => {
                info!("creating store at {}", location.path.display());
                let tables = Tables::empty();
                write_tables(&location.path, &tables)?;
                tables
            }
        };
        Ok(Store {
            location: location.clone(),
            tables,
        })
    }

    pub fn get_target_config(&self) -> Option<TargetConfig> {
        self.tables
            .target_date
            .iter()
            .find(|r| r.id == TARGET_ID)
            .map(|r| r.config.clone())
    }

    pub fn put_target_config(&mut self, config: &TargetConfig) -> Result<(), StoreError> {
        let record = TargetRecord {
            id: TARGET_ID,
            config: config.clone(),
        };
        self.commit(|tables| {
            tables.target_date.retain(|r| r.id != TARGET_ID);
            tables.target_date.push(record);
        })
    }

    pub fn get_all_notes(&self) -> Vec<Note> {
        self.tables.notes.iter().cloned().collect()
    }

    pub fn put_note(&mut self, note: &Note) -> Result<(), StoreError> {
        let note = note.clone();
        self.commit(|tables| tables.notes.upsert(note))
    }

    pub fn clear_notes(&mut self) -> Result<(), StoreError> {
        self.commit(|tables| tables.notes.clear())
    }

    // Re-read, apply one change, write. The cached tables only change once
    // the write landed.
    fn commit(&mut self, change: impl FnOnce(&mut Tables)) -> Result<(), StoreError> {
        let mut next = read_tables(&self.location.path)?.unwrap_or_else(Tables::empty);
        change(&mut next);
        write_tables(&self.location.path, &next)?;
        self.tables = next;
        Ok(())
    }
}

impl Tables {
    fn empty() -> Self {
        Tables {
            version: SCHEMA_VERSION,
            target_date: Vec::new(),
            notes: NoteBook::default(),
        }
    }
}

/// `None` when the file does not exist yet. An empty file counts as empty
/// tables.
fn read_tables(path: &Path) -> Result<Option<Tables>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tables: Tables = if data.trim().is_empty() {
        Tables::empty()
    } else {
        serde_yaml::from_str(&data).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    if tables.version != SCHEMA_VERSION {
        return Err(StoreError::Version(tables.version));
    }
    Ok(Some(tables))
}

fn write_tables(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_err)?;
    let serialized = serde_yaml::to_string(tables).map_err(StoreError::Serialize)?;
    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    temp.write_all(serialized.as_bytes()).map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    temp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

pub fn init_project_store() -> Result<StoreLocation, StoreError> {
    let cwd = env::current_dir().map_err(|source| StoreError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    let location = StoreLocation {
        path: cwd.join(PROJECT_DIR).join(STORE_FILE),
        scope: StoreScope::Project,
    };
    if !location.path.exists() {
        Store::open(&location)?;
    }
    Ok(location)
}

/// Explicit path first, then the nearest project store walking up from
/// `start`, then the per-user store.
pub fn locate_store(explicit: Option<&Path>, start: &Path) -> Result<StoreLocation, StoreError> {
    if let Some(path) = explicit {
        return Ok(StoreLocation::explicit(path));
    }
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        path: data_dir()?.join(STORE_FILE),
        scope: StoreScope::Global,
    })
}

pub fn data_dir() -> Result<PathBuf, StoreError> {
    let dirs = ProjectDirs::from("", "", "countcal").ok_or(StoreError::NoDataDir)?;
    Ok(dirs.data_dir().to_path_buf())
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(STORE_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}
