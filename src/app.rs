use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::FactoryError;
use crate::opendata::OpenDataClient;
use crate::render::WorkflowRenderer;
use crate::resolver::{ConfigResolver, Overrides, WorkflowConfig};
use crate::selection::IndexFormat;
use crate::store::Workspace;

#[derive(Debug, Clone, Serialize)]
pub struct LoadConfigResult {
    pub recid: String,
    pub config_file: String,
}

#[derive(Debug, Clone)]
pub struct CreateWorkflowRequest {
    pub config_file: Utf8PathBuf,
    pub recid: Option<String>,
    pub file_selection: String,
    pub index_format: IndexFormat,
    pub workflow_engine: String,
    pub template_root: Option<Utf8PathBuf>,
    pub overrides: Overrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    Created,
    AlreadyExists,
    ConfigError,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWorkflowResult {
    pub status: WorkflowStatus,
    pub directory: Option<String>,
    pub template: String,
    pub config: Option<WorkflowConfig>,
    pub warnings: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: OpenDataClient, W: WorkflowRenderer> {
    workspace: Workspace,
    client: C,
    renderer: W,
}

impl<C: OpenDataClient, W: WorkflowRenderer> App<C, W> {
    pub fn new(workspace: Workspace, client: C, renderer: W) -> Self {
        Self {
            workspace,
            client,
            renderer,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Downloads the record metadata and stores it as the local config file.
    pub fn load_config(
        &self,
        recid: &str,
        config_file: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<LoadConfigResult, FactoryError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; record {recid}"),
            elapsed: None,
        });
        let metadata = self.client.fetch_record(recid)?;
        let path = self.workspace.write_record(config_file, &metadata)?;
        info!("downloaded config file from record {recid} as {path}");
        sink.event(ProgressEvent {
            message: format!("phase=Store; wrote {path}"),
            elapsed: Some(started.elapsed()),
        });
        Ok(LoadConfigResult {
            recid: recid.to_string(),
            config_file: path.to_string(),
        })
    }

    pub fn create_workflow(
        &self,
        request: CreateWorkflowRequest,
        sink: &dyn ProgressSink,
    ) -> Result<CreateWorkflowResult, FactoryError> {
        let started = Instant::now();
        if let Some(recid) = &request.recid {
            self.load_config(recid, &request.config_file, sink)?;
        }

        sink.event(ProgressEvent {
            message: format!("phase=Resolve; reading {}", request.config_file),
            elapsed: None,
        });
        let record = self.workspace.read_record(&request.config_file)?;
        let template_dir = self
            .workspace
            .template_dir(request.template_root.as_deref(), &request.workflow_engine);

        let resolver = ConfigResolver::new(&self.client, &self.workspace);
        let mut config =
            match resolver.resolve(&record, &request.file_selection, request.index_format) {
                Ok(config) => config,
                Err(err) => {
                    warn!("{err}");
                    return Ok(CreateWorkflowResult {
                        status: WorkflowStatus::ConfigError,
                        directory: None,
                        template: template_dir.to_string(),
                        config: None,
                        warnings: vec![err.to_string()],
                        created_at: Utc::now().to_rfc3339(),
                    });
                }
            };
        config.apply_overrides(&request.overrides);

        sink.event(ProgressEvent {
            message: format!("phase=Render; template {template_dir}"),
            elapsed: Some(started.elapsed()),
        });
        let mut warnings = Vec::new();
        let status = match self
            .renderer
            .render(&template_dir, self.workspace.root(), true, &config)
        {
            Ok(path) => {
                info!("rendered workflow into {path}");
                WorkflowStatus::Created
            }
            Err(FactoryError::OutputConflict(path)) => {
                let message = format!(
                    "Output directory {} already exists, please choose a different name or rename the existing one.",
                    path.display()
                );
                warn!("{message}");
                warnings.push(message);
                WorkflowStatus::AlreadyExists
            }
            Err(err) => return Err(err),
        };

        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(started.elapsed()),
        });
        Ok(CreateWorkflowResult {
            status,
            directory: Some(config.directory_name().to_string()),
            template: template_dir.to_string(),
            config: Some(config),
            warnings,
            created_at: Utc::now().to_rfc3339(),
        })
    }
}
