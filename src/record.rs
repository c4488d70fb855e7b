use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::FactoryError;
use crate::selection::IndexFormat;

/// Dataset record as published by the open data portal.
///
/// Every consumed field is optional at parse time; accessors turn absence
/// into [`FactoryError::MissingField`] naming the path that was queried.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Record {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date_created: Option<Vec<String>>,
    #[serde(default)]
    pub system_details: Option<SystemDetails>,
    #[serde(default)]
    pub recid: Option<RecordId>,
    #[serde(default, rename = "_file_indices")]
    pub file_indices: Option<Vec<FileIndexDescriptor>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SystemDetails {
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub global_tag: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileIndexDescriptor {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(value) => write!(f, "{value}"),
            RecordId::Text(value) => write!(f, "{value}"),
        }
    }
}

impl Record {
    pub fn from_json(content: &str) -> Result<Self, FactoryError> {
        serde_json::from_str(content).map_err(|err| FactoryError::ConfigParse(err.to_string()))
    }

    pub fn title(&self) -> Result<&str, FactoryError> {
        self.title.as_deref().ok_or_else(|| missing(".title"))
    }

    /// Year part of the first `date_created` entry (`"2012-03-01"` → `"2012"`).
    pub fn year(&self) -> Result<&str, FactoryError> {
        let created = self
            .date_created
            .as_ref()
            .and_then(|dates| dates.first())
            .ok_or_else(|| missing(".date_created[0]"))?;
        Ok(created
            .split_once('-')
            .map_or(created.as_str(), |(year, _)| year))
    }

    pub fn release(&self) -> Result<&str, FactoryError> {
        self.system_details
            .as_ref()
            .and_then(|details| details.release.as_deref())
            .ok_or_else(|| missing(".system_details.release"))
    }

    pub fn global_tag(&self) -> Result<&str, FactoryError> {
        self.system_details
            .as_ref()
            .and_then(|details| details.global_tag.as_deref())
            .ok_or_else(|| missing(".system_details.global_tag"))
    }

    pub fn recid(&self) -> Result<&RecordId, FactoryError> {
        self.recid.as_ref().ok_or_else(|| missing(".recid"))
    }

    /// Index descriptors are positional: the JSON index comes first, the
    /// plain-text one second.
    pub fn index_key(&self, format: IndexFormat) -> Result<&str, FactoryError> {
        let position = match format {
            IndexFormat::Json => 0,
            IndexFormat::Txt => 1,
        };
        self.file_indices
            .as_ref()
            .and_then(|indices| indices.get(position))
            .and_then(|descriptor| descriptor.key.as_deref())
            .ok_or_else(|| missing(&format!("._file_indices[{position}].key")))
    }

    pub fn dataset_name(&self) -> Result<String, FactoryError> {
        dataset_name_from_title(self.title()?)
    }

    pub fn directory_name(&self) -> Result<String, FactoryError> {
        Ok(format!("cms-reco-{}-{}", self.dataset_name()?, self.year()?))
    }
}

/// Titles look like `/<primary>/<processing>/<tier>`; the dataset name is the
/// grandparent component.
pub fn dataset_name_from_title(title: &str) -> Result<String, FactoryError> {
    Utf8Path::new(title)
        .parent()
        .and_then(Utf8Path::parent)
        .and_then(Utf8Path::file_name)
        .map(str::to_string)
        .ok_or_else(|| FactoryError::MalformedTitle(title.to_string()))
}

fn missing(path: &str) -> FactoryError {
    FactoryError::MissingField(path.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn dataset_name_uses_grandparent_component() {
        assert_eq!(
            dataset_name_from_title("/DoubleElectron/Run2011A-12Oct2013-v1/AOD").unwrap(),
            "DoubleElectron"
        );
        assert_eq!(dataset_name_from_title("/X/Y/DatasetName/Z").unwrap(), "Y");
    }

    #[test]
    fn dataset_name_requires_enough_components() {
        let err = dataset_name_from_title("AOD").unwrap_err();
        assert_matches!(err, FactoryError::MalformedTitle(_));
        let err = dataset_name_from_title("/AOD").unwrap_err();
        assert_matches!(err, FactoryError::MalformedTitle(_));
    }

    #[test]
    fn recid_accepts_numbers_and_strings() {
        let numeric = serde_json::from_value::<Record>(json!({"recid": 6004})).unwrap();
        assert_eq!(numeric.recid().unwrap().to_string(), "6004");
        let text = serde_json::from_value::<Record>(json!({"recid": "6004"})).unwrap();
        assert_eq!(text.recid().unwrap().to_string(), "6004");
    }
}
