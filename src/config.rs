use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FactoryError;

const BUNDLED_VALIDATION: &str = include_str!("../cms_reco/cod-validation.json");

/// Allowed values for the enumerated command-line options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationData {
    pub years: Vec<String>,
    pub workflow_engines: Vec<String>,
    pub compute_backends: Vec<String>,
    pub file_selection: Vec<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the validation data from `path`, or the copy bundled with the
    /// binary when no path is given.
    pub fn load_validation(path: Option<&Path>) -> Result<ValidationData, FactoryError> {
        match path {
            Some(path) => {
                debug!("fetching validation data from {}", path.display());
                let content = fs::read_to_string(path)
                    .map_err(|_| FactoryError::ConfigRead(PathBuf::from(path)))?;
                Self::parse_validation(&content)
            }
            None => Self::parse_validation(BUNDLED_VALIDATION),
        }
    }

    pub fn parse_validation(content: &str) -> Result<ValidationData, FactoryError> {
        let data: ValidationData = serde_json::from_str(content)
            .map_err(|err| FactoryError::ConfigParse(err.to_string()))?;
        for (name, values) in [
            ("years", &data.years),
            ("workflow_engines", &data.workflow_engines),
            ("compute_backends", &data.compute_backends),
            ("file_selection", &data.file_selection),
        ] {
            if values.is_empty() {
                return Err(FactoryError::ConfigParse(format!(
                    "validation list '{name}' is empty"
                )));
            }
        }
        Ok(data)
    }
}
