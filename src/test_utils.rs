use crate::ground_truth::FilenameIndex;
use std::fs;
use tempfile::TempDir;

/// Create a temporary detection folder holding the given `(file name, content)`
/// pairs. The folder is removed when the returned guard is dropped.
///
/// # Example
///
/// ```rust,ignore
/// let dir = create_det_folder(&[
///     ("000001.json", r#"[{"x1":0,"y1":0,"x2":1,"y2":1,"label":0,"conf":0.5}]"#),
///     ("000002.json", "null"),
/// ]);
/// ```
pub fn create_det_folder(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

/// Build a filename index directly from `(file_name, id)` pairs.
pub fn create_index(entries: &[(&str, i64)]) -> FilenameIndex {
    entries
        .iter()
        .map(|(name, id)| (name.to_string(), *id))
        .collect()
}

/// Minimal COCO ground truth JSON with one image per entry.
pub fn ground_truth_json(entries: &[(&str, i64)]) -> String {
    let images: Vec<serde_json::Value> = entries
        .iter()
        .map(|(name, id)| serde_json::json!({ "file_name": name, "id": id }))
        .collect();
    serde_json::json!({
        "images": images,
        "annotations": [],
        "categories": [{ "id": 1, "name": "person" }]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground_truth::GroundTruth;
    use std::path::Path;

    #[test]
    fn test_create_det_folder() {
        let dir = create_det_folder(&[("a.json", "[]"), ("b.txt", "x")]);
        assert_eq!(fs::read_to_string(dir.path().join("a.json")).unwrap(), "[]");
        assert!(dir.path().join("b.txt").is_file());
    }

    #[test]
    fn test_ground_truth_json_parses() {
        let json = ground_truth_json(&[("a.jpg", 1), ("b.jpg", 2)]);
        let index = GroundTruth::from_json_str(Path::new("gt.json"), &json)
            .unwrap()
            .filename_index();
        assert_eq!(index, create_index(&[("a.jpg", 1), ("b.jpg", 2)]));
    }
}
