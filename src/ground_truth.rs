use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroundTruthError {
    #[error("failed to read ground truth {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Covers both JSON syntax errors and missing `images`/`file_name`/`id`.
    #[error("malformed ground truth {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One entry of the COCO `images` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroundTruthRecord {
    pub file_name: String,
    pub id: i64,
}

/// The slice of a COCO annotation file the merger needs.
///
/// Everything besides `images` (annotations, categories, info, licenses) is
/// owned by the evaluator and skipped here.
#[derive(Debug, Clone, Deserialize)]
pub struct GroundTruth {
    pub images: Vec<GroundTruthRecord>,
}

impl GroundTruth {
    pub fn from_path(path: &Path) -> Result<Self, GroundTruthError> {
        let file = File::open(path).map_err(|source| GroundTruthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            GroundTruthError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn from_json_str(path: &Path, json: &str) -> Result<Self, GroundTruthError> {
        serde_json::from_str(json).map_err(|source| GroundTruthError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the filename lookup. Duplicate filenames keep the last id seen.
    pub fn filename_index(&self) -> FilenameIndex {
        let mut by_name = HashMap::with_capacity(self.images.len());
        for record in &self.images {
            by_name.insert(record.file_name.clone(), record.id);
        }
        FilenameIndex { by_name }
    }
}

/// Image filename (suffix included) to COCO image id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameIndex {
    by_name: HashMap<String, i64>,
}

impl FilenameIndex {
    pub fn get(&self, file_name: &str) -> Option<i64> {
        self.by_name.get(file_name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<(String, i64)> for FilenameIndex {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            by_name: iter.into_iter().collect(),
        }
    }
}
