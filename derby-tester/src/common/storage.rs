//! Player records persisted as one JSON file per player.
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use derby_game::{Player, PlayerStorage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed player record {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("player name {name:?} has no usable file name")]
    InvalidName { name: String },
}

/// Stores each player as `<dir>/<name>.json`.
///
/// A storage without a directory keeps nothing: saves are dropped and loads
/// find no record.
#[derive(Debug, Clone, Default)]
pub struct JsonPlayerStorage {
    dir: Option<PathBuf>,
}

impl JsonPlayerStorage {
    /// Storage rooted at `dir`, created if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir: Some(dir) })
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { dir: None }
    }

    fn record_path(&self, name: &str) -> Result<Option<PathBuf>, StorageError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let stem: String = name
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if stem.is_empty() {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Some(dir.join(format!("{stem}.json"))))
    }
}

impl PlayerStorage for JsonPlayerStorage {
    type Error = StorageError;

    fn save_player(&self, player: &Player) -> Result<(), Self::Error> {
        let Some(path) = self.record_path(&player.name)? else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(player).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StorageError::Io { path, source })
    }

    fn load_player(&self, name: &str) -> Result<Option<Player>, Self::Error> {
        let Some(path) = self.record_path(name)? else {
            return Ok(None);
        };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Json { path, source })
    }

    fn delete_player(&self, name: &str) -> Result<(), Self::Error> {
        let Some(path) = self.record_path(name)? else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}
