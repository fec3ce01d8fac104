pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod ground_truth;
pub mod label_map;
pub mod merge;
#[cfg(test)]
pub(crate) mod test_utils;

pub use engine::EvaluationEngine;
pub use error::Error;
pub use merge::{MergeResult, merge_detections};
