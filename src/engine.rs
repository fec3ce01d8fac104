use crate::error::Error;
use crate::evaluator::{EvalError, EvalOutcome, EvalRequest, Evaluator, IouType};
use crate::ground_truth::{FilenameIndex, GroundTruth};
use crate::merge::{self, MergeResult};
use log::info;
use std::path::Path;

/// Ground truth → merged detections → evaluation, one stage per call.
pub struct EvaluationEngine {
    evaluator: Box<dyn Evaluator>,
    iou_type: IouType,
}

impl EvaluationEngine {
    pub fn new<E: Evaluator + 'static>(evaluator: E) -> Self {
        Self {
            evaluator: Box::new(evaluator),
            iou_type: IouType::Bbox,
        }
    }

    pub fn evaluator_name(&self) -> &'static str {
        self.evaluator.name()
    }

    /// Fails with [`EvalError::MissingDependency`] when the evaluator's
    /// backing library can't be reached.
    pub fn probe(&self) -> Result<(), EvalError> {
        self.evaluator.probe()
    }

    pub fn load_index(&self, gt_json: &Path) -> Result<FilenameIndex, Error> {
        let index = GroundTruth::from_path(gt_json)?.filename_index();
        info!("indexed {} ground truth images", index.len());
        Ok(index)
    }

    pub fn merge(
        &self,
        det_folder: &Path,
        index: &FilenameIndex,
        img_suffix: &str,
    ) -> Result<MergeResult, Error> {
        Ok(merge::merge_detections(det_folder, index, img_suffix)?)
    }

    pub fn save(&self, output_json: &Path, merged: &MergeResult) -> Result<(), Error> {
        merge::write_detections(output_json, &merged.detections)?;
        Ok(())
    }

    /// Score the detections already saved at `output_json`, restricted to the
    /// images that had a detection file.
    pub fn evaluate(
        &self,
        gt_json: &Path,
        output_json: &Path,
        merged: &MergeResult,
    ) -> Result<EvalOutcome, Error> {
        if merged.detections.is_empty() {
            return Err(EvalError::NoDetections.into());
        }

        let request = EvalRequest {
            gt_json: gt_json.to_path_buf(),
            detections_json: output_json.to_path_buf(),
            image_ids: merged.image_ids.clone(),
            iou_type: self.iou_type,
        };
        Ok(self.evaluator.evaluate(&request)?)
    }
}
