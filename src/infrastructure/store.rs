//! JSON file store: one document per indicator system

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::Indicator;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::traits::{FileSystem, TreeStore};

const EXTENSION: &str = "json";

/// On-disk envelope. `tree` matches the object form of the import format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSystem {
    pub system_id: String,
    /// RFC 3339 timestamp of the last save
    pub saved_at: String,
    pub tree: Vec<Indicator>,
}

/// Letters, digits, `-` and `_` only, so an id is always a plain file name.
pub fn is_valid_system_id(system_id: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid system id regex"))
        .is_match(system_id)
}

pub struct JsonFileStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, system_id: &str) -> io::Result<PathBuf> {
        if !is_valid_system_id(system_id) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid system id: {:?}", system_id),
            ));
        }
        Ok(self.dir.join(format!("{}.{}", system_id, EXTENSION)))
    }
}

impl TreeStore for JsonFileStore {
    #[instrument(level = "debug", skip(self, tree))]
    fn save(&self, system_id: &str, tree: &[Indicator]) -> io::Result<()> {
        let path = self.path_for(system_id)?;
        let stored = StoredSystem {
            system_id: system_id.to_string(),
            saved_at: Utc::now().to_rfc3339(),
            tree: tree.to_vec(),
        };
        let content = serde_json::to_string_pretty(&stored)
            .map_err(|e| io::Error::other(InfraError::json("serialize stored system", e)))?;
        self.fs.create_dir_all(&self.dir).map_err(|e| {
            let kind = e.kind();
            io::Error::new(
                kind,
                InfraError::io(format!("create store directory {}", self.dir.display()), e),
            )
        })?;
        self.fs.write_atomic(&path, &content)?;
        debug!("save: {} roots to {}", tree.len(), path.display());
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn load(&self, system_id: &str) -> io::Result<Vec<Indicator>> {
        let path = self.path_for(system_id)?;
        if !self.fs.is_file(&path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no stored system at {}", path.display()),
            ));
        }
        let content = self.fs.read_to_string(&path)?;
        let stored: StoredSystem = serde_json::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                InfraError::json(format!("parse {}", path.display()), e),
            )
        })?;
        Ok(stored.tree)
    }

    fn list(&self) -> io::Result<Vec<String>> {
        if !self.fs.is_dir(&self.dir) {
            return Ok(Vec::new());
        }
        let ids = self
            .fs
            .list_files(&self.dir, EXTENSION)?
            .iter()
            .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()))
            .filter(|stem| is_valid_system_id(stem))
            .map(str::to_string)
            .collect();
        Ok(ids)
    }
}
