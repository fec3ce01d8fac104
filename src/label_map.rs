//! Detector class index to COCO category id.
//!
//! Detectors trained on COCO emit a contiguous class index in `0..80`, while the
//! annotation files number categories `1..=90` with gaps.

/// COCO category ids in detector class order.
pub const COCO_LABEL_MAP: [u32; 80] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, //
    11, 13, 14, 15, 16, 17, 18, 19, 20, 21, //
    22, 23, 24, 25, 27, 28, 31, 32, 33, 34, //
    35, 36, 37, 38, 39, 40, 41, 42, 43, 44, //
    46, 47, 48, 49, 50, 51, 52, 53, 54, 55, //
    56, 57, 58, 59, 60, 61, 62, 63, 64, 65, //
    67, 70, 72, 73, 74, 75, 76, 77, 78, 79, //
    80, 81, 82, 84, 85, 86, 87, 88, 89, 90,
];

/// Category ids that exist in the 1..=90 range but were never used by COCO.
pub const UNUSED_CATEGORY_IDS: [u32; 10] = [12, 26, 29, 30, 45, 66, 68, 69, 71, 83];

pub fn category_id(label: i64) -> Option<u32> {
    usize::try_from(label)
        .ok()
        .and_then(|index| COCO_LABEL_MAP.get(index))
        .copied()
}
