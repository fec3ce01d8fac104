use serde::{Deserialize, Deserializer, Serialize};

/// One box as written by the inference side, in corner form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(deserialize_with = "deserialize_label")]
    pub label: i64,
    pub conf: f64,
}

/// Class ids are sometimes serialized as floats; truncate like an integer cast.
fn deserialize_label<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Int(i64),
        Float(f64),
    }

    Ok(match Label::deserialize(deserializer)? {
        Label::Int(v) => v,
        Label::Float(v) => v.trunc() as i64,
    })
}

/// One record of the COCO results format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDetection {
    pub image_id: i64,
    pub category_id: u32,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub score: f64,
}

impl MergedDetection {
    /// Width and height are taken as-is, so inverted corners yield negative
    /// extents.
    pub fn from_raw(raw: &RawDetection, image_id: i64, category_id: u32) -> Self {
        Self {
            image_id,
            category_id,
            bbox: [raw.x1, raw.y1, raw.x2 - raw.x1, raw.y2 - raw.y1],
            score: raw.conf,
        }
    }
}
