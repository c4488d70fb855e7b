use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use tempfile::Builder;

use crate::error::FactoryError;
use crate::record::Record;
use crate::selection::IndexFormat;

pub const DEFAULT_CONFIG_FILE: &str = "cms_reco/cms-reco-config.json";
pub const TEMPLATE_SUBDIR: &str = "templates/workflow_factory";

/// Layout of the working directory an invocation operates in.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Result<Self, FactoryError> {
        let cwd =
            std::env::current_dir().map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| FactoryError::Filesystem("invalid working directory".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn index_path(&self, format: IndexFormat) -> Utf8PathBuf {
        self.root.join(format!("index.{}", format.extension()))
    }

    /// Template directory for a workflow engine. Falls back to the templates
    /// shipped with the crate when the working directory has none.
    pub fn template_dir(&self, template_root: Option<&Utf8Path>, engine: &str) -> Utf8PathBuf {
        if let Some(root) = template_root {
            return self.resolve(root).join(engine);
        }
        let local = self.root.join(TEMPLATE_SUBDIR).join(engine);
        if local.as_std_path().exists() {
            return local;
        }
        Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .join(TEMPLATE_SUBDIR)
            .join(engine)
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    pub fn read_record(&self, path: &Utf8Path) -> Result<Record, FactoryError> {
        let path = self.resolve(path);
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| FactoryError::ConfigRead(path.clone().into_std_path_buf()))?;
        Record::from_json(&content)
    }

    pub fn write_record(
        &self,
        path: &Utf8Path,
        metadata: &Value,
    ) -> Result<Utf8PathBuf, FactoryError> {
        let path = self.resolve(path);
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(&path, &content)?;
        Ok(path)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), FactoryError> {
        let parent = path
            .parent()
            .ok_or_else(|| FactoryError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix(".cms-reco")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn remove_file(&self, path: &Utf8Path) -> Result<(), FactoryError> {
        if path.as_std_path().is_file() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }
}
