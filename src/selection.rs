use std::fmt;

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FactoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileSelection {
    First,
    Smallest,
    Largest,
    Random,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    Json,
    Txt,
}

impl IndexFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            IndexFormat::Json => "json",
            IndexFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub uri: String,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonIndexDocument {
    Wrapped { files: Vec<IndexEntry> },
    Bare(Vec<IndexEntry>),
}

/// Parsed content of a downloaded index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexFile {
    Json(Vec<IndexEntry>),
    /// First line of a one-URI-per-line file, without its terminator.
    Text(String),
}

impl IndexFile {
    pub fn parse(format: IndexFormat, content: &str) -> Result<Self, FactoryError> {
        match format {
            IndexFormat::Json => {
                let document: JsonIndexDocument =
                    serde_json::from_str(content).map_err(|err| FactoryError::MalformedIndex {
                        format,
                        message: err.to_string(),
                    })?;
                let entries = match document {
                    JsonIndexDocument::Wrapped { files } => files,
                    JsonIndexDocument::Bare(files) => files,
                };
                if entries.iter().any(|entry| entry.uri.is_empty()) {
                    return Err(FactoryError::MalformedIndex {
                        format,
                        message: "entry with empty uri".to_string(),
                    });
                }
                Ok(IndexFile::Json(entries))
            }
            IndexFormat::Txt => Ok(IndexFile::Text(
                content.lines().next().unwrap_or_default().to_string(),
            )),
        }
    }
}

/// Picks one dataset URI out of the index entries.
pub fn select<R: Rng + ?Sized>(
    entries: &[IndexEntry],
    policy: FileSelection,
    rng: &mut R,
) -> Result<String, FactoryError> {
    let chosen = match policy {
        FileSelection::All => return Err(FactoryError::UnsupportedPolicy(policy)),
        _ if entries.is_empty() => return Err(FactoryError::EmptyIndex(IndexFormat::Json)),
        FileSelection::First => &entries[0],
        FileSelection::Smallest | FileSelection::Largest => {
            let mut by_size: Vec<&IndexEntry> = entries.iter().collect();
            by_size.sort_by_key(|entry| entry.size);
            if policy == FileSelection::Smallest {
                by_size[0]
            } else {
                by_size[by_size.len() - 1]
            }
        }
        FileSelection::Random => &entries[rng.gen_range(0..entries.len())],
    };
    Ok(chosen.uri.clone())
}

/// Applies `selection` to a parsed index. Plain-text indices carry no sizes,
/// so they always yield their first line. An unknown selection yields `None`.
pub fn choose_dataset<R: Rng + ?Sized>(
    index: &IndexFile,
    selection: &str,
    rng: &mut R,
) -> Result<Option<String>, FactoryError> {
    match index {
        IndexFile::Text(line) => {
            debug!("text index, ignoring file selection '{selection}'");
            if line.trim().is_empty() {
                return Err(FactoryError::EmptyIndex(IndexFormat::Txt));
            }
            Ok(Some(line.clone()))
        }
        IndexFile::Json(entries) => {
            debug!("file selection is: {selection}");
            match FileSelection::from_str(selection, false) {
                Ok(policy) => select(entries, policy, rng).map(Some),
                Err(_) => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn entries() -> Vec<IndexEntry> {
        vec![
            IndexEntry {
                uri: "a".to_string(),
                size: 10,
            },
            IndexEntry {
                uri: "b".to_string(),
                size: 5,
            },
            IndexEntry {
                uri: "c".to_string(),
                size: 10,
            },
        ]
    }

    #[test]
    fn ties_keep_index_order() {
        let mut rng = rand::thread_rng();
        assert_eq!(
            select(&entries(), FileSelection::Largest, &mut rng).unwrap(),
            "c"
        );
        assert_eq!(
            select(&entries(), FileSelection::Smallest, &mut rng).unwrap(),
            "b"
        );
    }

    #[test]
    fn empty_index_is_an_error() {
        let mut rng = rand::thread_rng();
        let err = select(&[], FileSelection::First, &mut rng).unwrap_err();
        assert_matches!(err, FactoryError::EmptyIndex(IndexFormat::Json));
    }

    #[test]
    fn parse_rejects_empty_uri() {
        let err = IndexFile::parse(IndexFormat::Json, r#"{"files":[{"uri":"","size":1}]}"#)
            .unwrap_err();
        assert_matches!(err, FactoryError::MalformedIndex { .. });
    }

    #[test]
    fn text_index_keeps_only_first_line() {
        let index = IndexFile::parse(IndexFormat::Txt, "root://eos/a.root\r\nroot://eos/b.root\n")
            .unwrap();
        assert_eq!(index, IndexFile::Text("root://eos/a.root".to_string()));
    }

    #[test]
    fn parse_accepts_bare_array() {
        let index =
            IndexFile::parse(IndexFormat::Json, r#"[{"uri":"root://x/1.root","size":3}]"#).unwrap();
        assert_matches!(index, IndexFile::Json(entries) if entries.len() == 1);
    }
}
