use super::{EvalError, EvalOutcome, EvalRequest, Evaluator, parse_summary};
use log::debug;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

/// Imports everything the driver needs; exit status 0 means usable.
const PROBE_SCRIPT: &str = "import pycocotools.coco, pycocotools.cocoeval";

/// Loads ground truth and results, restricts scoring to the image ids given on
/// stdin, and prints the COCOeval summary.
const DRIVER_SCRIPT: &str = include_str!("coco_eval.py");

pub const DEFAULT_PYTHON: &str = "python3";

/// Runs pycocotools' `COCOeval` in a Python child process.
#[derive(Debug, Clone)]
pub struct PycocotoolsEvaluator {
    python: String,
}

impl PycocotoolsEvaluator {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    fn spawn_err(&self, source: std::io::Error) -> EvalError {
        EvalError::Spawn {
            program: self.python.clone(),
            source,
        }
    }
}

impl Default for PycocotoolsEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_PYTHON)
    }
}

impl Evaluator for PycocotoolsEvaluator {
    fn name(&self) -> &'static str {
        "pycocotools"
    }

    fn probe(&self) -> Result<(), EvalError> {
        let output = Command::new(&self.python)
            .args(["-c", PROBE_SCRIPT])
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = stderr
                    .lines()
                    .rev()
                    .find(|line| !line.trim().is_empty())
                    .unwrap_or("import failed")
                    .trim()
                    .to_string();
                Err(EvalError::MissingDependency {
                    evaluator: self.name(),
                    reason,
                })
            }
            Err(e) => Err(EvalError::MissingDependency {
                evaluator: self.name(),
                reason: format!("cannot run {}: {}", self.python, e),
            }),
        }
    }

    fn evaluate(&self, request: &EvalRequest) -> Result<EvalOutcome, EvalError> {
        debug!(
            "running {} on {} images ({})",
            self.python,
            request.image_ids.len(),
            request.iou_type.as_str()
        );

        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(DRIVER_SCRIPT)
            .arg(&request.gt_json)
            .arg(&request.detections_json)
            .arg(request.iou_type.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_err(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            let ids = serde_json::to_vec(&request.image_ids)
                .map_err(|e| self.spawn_err(std::io::Error::other(e)))?;
            // A child that exits without reading is judged by its exit status.
            match stdin.write_all(&ids) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(self.spawn_err(e)),
                _ => {}
            }
        }

        let output = child.wait_with_output().map_err(|e| self.spawn_err(e))?;
        if !output.status.success() {
            return Err(EvalError::EvaluatorFailed {
                evaluator: self.name(),
                status: output.status,
            });
        }

        let report = String::from_utf8_lossy(&output.stdout).into_owned();
        let summary = parse_summary(&report);
        Ok(EvalOutcome { report, summary })
    }
}
