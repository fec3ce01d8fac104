use crate::detection::{MergedDetection, RawDetection};
use crate::ground_truth::FilenameIndex;
use crate::label_map;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Extension of the per-image detection files.
pub const DETECTION_EXTENSION: &str = ".json";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read detection folder {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read detection file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed detection file {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("label {label} in {path} is outside the COCO label map (expected 0..80)")]
    LabelOutOfRange { path: PathBuf, label: i64 },
    #[error("failed to write merged detections to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult {
    pub detections: Vec<MergedDetection>,
    pub unmatched_count: usize,
    pub matched_files: usize,
    /// One entry per matched file that held an array (even an empty one);
    /// not deduplicated.
    pub image_ids: Vec<i64>,
}

/// Merge every `*.json` detection file in `det_folder` into COCO results.
///
/// Files whose derived image name (`<stem><img_suffix>`) is missing from
/// `index` are skipped with a warning. Everything else that goes wrong aborts
/// the merge.
pub fn merge_detections(
    det_folder: &Path,
    index: &FilenameIndex,
    img_suffix: &str,
) -> Result<MergeResult, MergeError> {
    let mut result = MergeResult::default();

    for (stem, path) in detection_files(det_folder)? {
        let img_name = format!("{stem}{img_suffix}");

        let Some(image_id) = index.get(&img_name) else {
            warn!("{} not found in GT. Skipped.", img_name);
            result.unmatched_count += 1;
            continue;
        };

        result.matched_files += 1;
        // `null` or blank: matched, but the image is not scored.
        let Some(boxes) = read_raw_detections(&path)? else {
            debug!("{} holds no result; image_id {} not scored", path.display(), image_id);
            continue;
        };
        debug!(
            "{} detections from {} (image_id {})",
            boxes.len(),
            path.display(),
            image_id
        );

        result.detections.reserve(boxes.len());
        for raw in &boxes {
            let category_id =
                label_map::category_id(raw.label).ok_or_else(|| MergeError::LabelOutOfRange {
                    path: path.clone(),
                    label: raw.label,
                })?;
            result
                .detections
                .push(MergedDetection::from_raw(raw, image_id, category_id));
        }

        result.image_ids.push(image_id);
    }

    Ok(result)
}

/// Regular files ending in `.json` with their stems, sorted by name so runs
/// are reproducible.
fn detection_files(det_folder: &Path) -> Result<Vec<(String, PathBuf)>, MergeError> {
    let read_dir_err = |source| MergeError::ReadDir {
        path: det_folder.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(det_folder).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();

        let stem = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_suffix(DETECTION_EXTENSION))
            .map(str::to_owned);
        let Some(stem) = stem else {
            debug!("skipping non-detection entry {}", path.display());
            continue;
        };
        // Follows symlinks, so a linked detection file still counts.
        if !path.is_file() {
            debug!("skipping non-file entry {}", path.display());
            continue;
        }
        files.push((stem, path));
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// `None` for `null` or a blank file; `Some` (possibly empty) for an array.
fn read_raw_detections(path: &Path) -> Result<Option<Vec<RawDetection>>, MergeError> {
    let content = fs::read_to_string(path).map_err(|source| MergeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content).map_err(|source| MergeError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `detections` as a JSON array, replacing `path` atomically.
pub fn write_detections(path: &Path, detections: &[MergedDetection]) -> Result<(), MergeError> {
    let write_err = |source| MergeError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir).map_err(write_err)?;

    let temp_file = NamedTempFile::new_in(parent_dir).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        serde_json::to_writer(&mut writer, detections)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        writer.flush().map_err(write_err)?;
    }
    temp_file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

pub fn read_detections(path: &Path) -> Result<Vec<MergedDetection>, MergeError> {
    let file = File::open(path).map_err(|source| MergeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| MergeError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
