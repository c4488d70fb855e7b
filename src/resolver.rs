use std::collections::BTreeMap;
use std::fs;

use serde::Serialize;
use tracing::{debug, warn};

use crate::correction::{global_tag_suffix, normalize_global_tag, normalize_release};
use crate::error::{ConfigError, FactoryError};
use crate::opendata::OpenDataClient;
use crate::record::Record;
use crate::selection::{IndexFile, IndexFormat, choose_dataset};
use crate::store::Workspace;

pub const DIRECTORY_NAME: &str = "directory_name";
pub const YEAR: &str = "year";
pub const CMSSW_VERSION: &str = "cmssw_version";
pub const GLOBAL_TAG: &str = "global_tag";
pub const GLOBAL_TAG_SUFFIX: &str = "global_tag_suffix";
pub const DATASET_FILE: &str = "dataset_file";
pub const COMPUTE_BACKEND: &str = "compute_backend";
pub const CONTAINER_IMAGE: &str = "container_image";
pub const NEVENTS: &str = "nevents";
pub const RUN_FILTER: &str = "run_filter";

const CONTAINER_REGISTRY: &str = "docker.io/cmsopendata";

/// Flat string map handed to the workflow renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WorkflowConfig {
    values: BTreeMap<String, String>,
}

impl WorkflowConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn directory_name(&self) -> &str {
        self.get(DIRECTORY_NAME).unwrap_or_default()
    }

    /// Applies command-line overrides on top of the resolved values. The order
    /// matters: the default container image depends on the final release.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        self.set(COMPUTE_BACKEND, overrides.compute_backend.as_str());

        if let Some(version) = present(&overrides.cmssw_version) {
            self.set(CMSSW_VERSION, version);
        }
        if let Some(tag) = present(&overrides.global_tag) {
            self.set(GLOBAL_TAG, tag);
            self.set(GLOBAL_TAG_SUFFIX, global_tag_suffix(tag));
        }

        let image = match present(&overrides.container_image) {
            Some(image) => image.to_string(),
            None => format!(
                "{CONTAINER_REGISTRY}/cmssw_{}",
                self.get(CMSSW_VERSION).unwrap_or_default()
            ),
        };
        self.set(CONTAINER_IMAGE, image);

        if let Some(nevents) = present(&overrides.nevents) {
            self.set(NEVENTS, nevents);
        }
        if let Some(directory) = present(&overrides.directory) {
            self.set(DIRECTORY_NAME, directory);
        }
        if let Some(run_filter) = present(&overrides.run_filter) {
            self.set(RUN_FILTER, run_filter);
        }
    }
}

/// Values supplied on the command line. Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub compute_backend: String,
    pub cmssw_version: Option<String>,
    pub global_tag: Option<String>,
    pub container_image: Option<String>,
    pub nevents: Option<String>,
    pub directory: Option<String>,
    pub run_filter: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

pub struct ConfigResolver<'a, C: OpenDataClient> {
    client: &'a C,
    workspace: &'a Workspace,
}

impl<'a, C: OpenDataClient> ConfigResolver<'a, C> {
    pub fn new(client: &'a C, workspace: &'a Workspace) -> Self {
        Self { client, workspace }
    }

    /// Turns a record into the base configuration. Any failing step aborts
    /// the resolution and is reported through [`ConfigError`].
    pub fn resolve(
        &self,
        record: &Record,
        selection: &str,
        format: IndexFormat,
    ) -> Result<WorkflowConfig, ConfigError> {
        self.try_resolve(record, selection, format).map_err(|err| {
            warn!("config resolution failed: {err}");
            ConfigError::from(err)
        })
    }

    fn try_resolve(
        &self,
        record: &Record,
        selection: &str,
        format: IndexFormat,
    ) -> Result<WorkflowConfig, FactoryError> {
        let mut config = WorkflowConfig::default();
        config.set(DIRECTORY_NAME, record.directory_name()?);
        config.set(YEAR, record.year()?);
        config.set(CMSSW_VERSION, normalize_release(record.release()?));
        let (tag, suffix) = normalize_global_tag(record.global_tag()?);
        config.set(GLOBAL_TAG, tag);
        config.set(GLOBAL_TAG_SUFFIX, suffix);
        config.set(DATASET_FILE, self.resolve_dataset(record, selection, format)?);
        config.set(RUN_FILTER, "");
        Ok(config)
    }

    fn resolve_dataset(
        &self,
        record: &Record,
        selection: &str,
        format: IndexFormat,
    ) -> Result<String, FactoryError> {
        let local = self.workspace.index_path(format);
        debug!("fetching data set as {local}");

        if self.workspace.exists(&local) {
            debug!("reusing cached index file {local}");
        } else {
            let recid = record.recid()?.to_string();
            let index_key = record.index_key(format)?;
            self.client
                .download_index(&recid, index_key, local.as_std_path())?;
        }

        let content = fs::read_to_string(local.as_std_path())
            .map_err(|err| FactoryError::Filesystem(format!("read {local}: {err}")))?;
        let index = IndexFile::parse(format, &content)?;
        let dataset = choose_dataset(&index, selection, &mut rand::thread_rng())?
            .ok_or_else(|| FactoryError::NoSelection(selection.to_string()))?;

        self.workspace.remove_file(&local)?;
        Ok(dataset)
    }
}
