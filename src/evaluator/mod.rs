use std::path::PathBuf;
use thiserror::Error;

pub mod pycocotools;
pub mod summary;

pub use pycocotools::PycocotoolsEvaluator;
pub use summary::{EvalSummary, MetricKind, SummaryMetric, parse_summary};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{evaluator} is not available: {reason}")]
    MissingDependency {
        evaluator: &'static str,
        reason: String,
    },
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{evaluator} failed ({status}); see its error output above")]
    EvaluatorFailed {
        evaluator: &'static str,
        status: std::process::ExitStatus,
    },
    #[error("no detections were merged; nothing to evaluate")]
    NoDetections,
}

/// Which geometry the evaluator matches on. Only boxes are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IouType {
    #[default]
    Bbox,
}

impl IouType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IouType::Bbox => "bbox",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalRequest {
    pub gt_json: PathBuf,
    pub detections_json: PathBuf,
    /// Scoring is restricted to exactly these images.
    pub image_ids: Vec<i64>,
    pub iou_type: IouType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    /// The evaluator's printed output, verbatim.
    pub report: String,
    pub summary: EvalSummary,
}

pub trait Evaluator {
    fn name(&self) -> &'static str;

    /// Check that the backing library can be reached, without evaluating
    /// anything.
    fn probe(&self) -> Result<(), EvalError>;

    fn evaluate(&self, request: &EvalRequest) -> Result<EvalOutcome, EvalError>;
}
