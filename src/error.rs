use crate::evaluator::EvalError;
use crate::ground_truth::GroundTruthError;
use crate::merge::MergeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    GroundTruth(#[from] GroundTruthError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
