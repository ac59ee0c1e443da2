//! Save/restore boundary.
//!
//! A game is kept under three string keys: the grid as comma-joined decimal
//! values in row-major order, the running score and the highest score.
//! Restoring is lenient: missing or unparseable entries read as `0`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::grid::{Grid, Value};
use crate::session::GameState;

pub const GRID_KEY: &str = "grid";
pub const SCORE_KEY: &str = "score";
pub const HIGHEST_SCORE_KEY: &str = "highest_score";

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key/value backing store.
pub trait Store {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

/// In-memory store, handy for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a JSON object on disk, rewritten on every `set`.
///
/// Each rewrite goes to a temporary file next to the target and is renamed
/// over it, so a crash mid-save leaves the previous contents in place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("opened store {} ({} keys)", path.display(), entries.len());
        Ok(FileStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        let text = serde_json::to_string_pretty(&self.entries)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Persisted form of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Row-major cell values; `None` when nothing was stored.
    pub cells: Option<Vec<Value>>,
    pub score: u64,
    pub highest_score: u64,
}

impl Snapshot {
    pub fn capture(grid: &Grid, state: &GameState) -> Self {
        Snapshot {
            cells: Some(grid.values().to_vec()),
            score: state.score,
            highest_score: state.highest_score,
        }
    }

    pub fn write<S: Store + ?Sized>(&self, store: &mut S) -> Result<(), PersistError> {
        if let Some(cells) = &self.cells {
            store.set(GRID_KEY, &encode_cells(cells))?;
        }
        store.set(SCORE_KEY, &self.score.to_string())?;
        store.set(HIGHEST_SCORE_KEY, &self.highest_score.to_string())?;
        Ok(())
    }

    pub fn read<S: Store + ?Sized>(store: &S) -> Self {
        let number = |key: &str| {
            store
                .get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0)
        };
        Snapshot {
            cells: store.get(GRID_KEY).map(|text| decode_cells(&text)),
            score: number(SCORE_KEY),
            highest_score: number(HIGHEST_SCORE_KEY),
        }
    }
}

/// Comma-joined decimal values.
pub fn encode_cells(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of `encode_cells`; entries that do not parse become `0`.
pub fn decode_cells(text: &str) -> Vec<Value> {
    text.split(',')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect()
}
