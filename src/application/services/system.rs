//! Indicator system service: import/export documents and persistence hand-off
//!
//! Everything that enters the engine from disk or the store passes through
//! the import normalizer; everything handed to the store has passed the
//! invariant checker.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument, warn};

use crate::application::error_ext::JsonResultExt;
use crate::application::services::TreeEditor;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{normalize, normalize_str, IdGenerator, IndicatorTree};
use crate::infrastructure::store::is_valid_system_id;
use crate::infrastructure::traits::{FileSystem, TreeStore};

pub struct IndicatorSystemService {
    fs: Arc<dyn FileSystem>,
    store: Arc<dyn TreeStore>,
    settings: Arc<Settings>,
    ids: Mutex<Box<dyn IdGenerator>>,
}

impl IndicatorSystemService {
    pub fn new(fs: Arc<dyn FileSystem>, store: Arc<dyn TreeStore>, settings: Arc<Settings>) -> Self {
        let ids = settings.id_strategy.generator();
        Self::with_ids(fs, store, settings, ids)
    }

    /// Same as `new` with an explicit id generator.
    pub fn with_ids(
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn TreeStore>,
        settings: Arc<Settings>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        Self {
            fs,
            store,
            settings,
            ids: Mutex::new(ids),
        }
    }

    fn normalize_json(&self, json: &str) -> ApplicationResult<IndicatorTree> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        Ok(normalize_str(json, ids.as_mut(), &self.settings.defaults)?)
    }

    /// Read and normalize an import document.
    #[instrument(level = "debug", skip(self))]
    pub fn import_file(&self, path: &Path) -> ApplicationResult<IndicatorTree> {
        let json = self
            .fs
            .read_to_string(path)
            .with_path_context("read import document", path)?;
        let tree = self.normalize_json(&json)?;
        debug!("import_file: {} indicators from {}", tree.len(), path.display());
        Ok(tree)
    }

    /// Normalize a document held in memory.
    pub fn import_str(&self, json: &str) -> ApplicationResult<IndicatorTree> {
        self.normalize_json(json)
    }

    /// Write the export document for `tree`.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn export_file(&self, tree: &IndicatorTree, path: &Path) -> ApplicationResult<()> {
        let json = tree.to_json().with_json_context("serialize export document")?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;
        self.fs
            .write_atomic(path, &json)
            .with_path_context("write export document", path)?;
        Ok(())
    }

    /// Hand `tree` to the store. Refuses trees that break an invariant.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save(&self, system_id: &str, tree: &IndicatorTree) -> ApplicationResult<()> {
        if !is_valid_system_id(system_id) {
            return Err(ApplicationError::InvalidSystemId(system_id.to_string()));
        }
        if let Err(violations) = tree.check_invariants() {
            warn!("save: {} rejected with {} violations", system_id, violations.len());
            return Err(violations.into());
        }
        self.store
            .save(system_id, &tree.to_document())
            .map_err(|e| ApplicationError::OperationFailed {
                context: format!("save indicator system {}", system_id),
                source: Box::new(e),
            })
    }

    /// Load a stored system, re-normalized before it becomes a snapshot.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, system_id: &str) -> ApplicationResult<IndicatorTree> {
        if !is_valid_system_id(system_id) {
            return Err(ApplicationError::InvalidSystemId(system_id.to_string()));
        }
        let document = self.store.load(system_id).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ApplicationError::SystemNotFound(system_id.to_string()),
            _ => ApplicationError::OperationFailed {
                context: format!("load indicator system {}", system_id),
                source: Box::new(e),
            },
        })?;
        let raw = serde_json::to_value(&document).with_json_context("re-read stored tree")?;
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        Ok(normalize(&raw, ids.as_mut(), &self.settings.defaults)?)
    }

    pub fn list(&self) -> ApplicationResult<Vec<String>> {
        self.store
            .list()
            .map_err(|e| ApplicationError::OperationFailed {
                context: "list indicator systems".to_string(),
                source: Box::new(e),
            })
    }

    /// Open an editing session on `tree` using the configured id strategy and defaults.
    pub fn editor(&self, tree: IndicatorTree) -> TreeEditor {
        TreeEditor::with_tree(
            tree,
            self.settings.id_strategy.generator(),
            self.settings.defaults.clone(),
        )
    }
}
