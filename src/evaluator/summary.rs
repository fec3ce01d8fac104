//! Parsing of the summary table pycocotools prints after `summarize()`.
//!
//! ```text
//!  Average Precision  (AP) @[ IoU=0.50:0.95 | area=   all | maxDets=100 ] = 0.373
//!  Average Recall     (AR) @[ IoU=0.50:0.95 | area= small | maxDets=100 ] = 0.224
//! ```

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*Average (?:Precision|Recall)\s+\((AP|AR)\)\s+@\[\s*IoU=(\S+)\s*\|\s*area=\s*(\w+)\s*\|\s*maxDets=\s*(\d+)\s*\]\s*=\s*(-?\d+(?:\.\d+)?)",
    )
    .expect("summary line pattern is valid")
});

const IOU_ALL: &str = "0.50:0.95";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricKind {
    #[serde(rename = "AP")]
    AveragePrecision,
    #[serde(rename = "AR")]
    AverageRecall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetric {
    pub kind: MetricKind,
    /// A single threshold such as `0.50`, or the `0.50:0.95` sweep.
    pub iou: String,
    /// `all`, `small`, `medium` or `large`.
    pub area: String,
    pub max_dets: u32,
    /// `-1.0` when the bucket has no ground truth.
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalSummary {
    pub metrics: Vec<SummaryMetric>,
}

impl EvalSummary {
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn find(&self, kind: MetricKind, iou: &str, area: &str, max_dets: u32) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.kind == kind && m.iou == iou && m.area == area && m.max_dets == max_dets)
            .map(|m| m.value)
    }

    fn ap_at(&self, iou: &str, area: &str) -> Option<f64> {
        self.find(MetricKind::AveragePrecision, iou, area, 100)
    }

    fn ar_at(&self, area: &str, max_dets: u32) -> Option<f64> {
        self.find(MetricKind::AverageRecall, IOU_ALL, area, max_dets)
    }

    /// mAP over IoU 0.50:0.95, the headline COCO number.
    pub fn ap(&self) -> Option<f64> {
        self.ap_at(IOU_ALL, "all")
    }

    pub fn ap50(&self) -> Option<f64> {
        self.ap_at("0.50", "all")
    }

    pub fn ap75(&self) -> Option<f64> {
        self.ap_at("0.75", "all")
    }

    pub fn ap_small(&self) -> Option<f64> {
        self.ap_at(IOU_ALL, "small")
    }

    pub fn ap_medium(&self) -> Option<f64> {
        self.ap_at(IOU_ALL, "medium")
    }

    pub fn ap_large(&self) -> Option<f64> {
        self.ap_at(IOU_ALL, "large")
    }

    pub fn ar1(&self) -> Option<f64> {
        self.ar_at("all", 1)
    }

    pub fn ar10(&self) -> Option<f64> {
        self.ar_at("all", 10)
    }

    pub fn ar100(&self) -> Option<f64> {
        self.ar_at("all", 100)
    }

    pub fn ar_small(&self) -> Option<f64> {
        self.ar_at("small", 100)
    }

    pub fn ar_medium(&self) -> Option<f64> {
        self.ar_at("medium", 100)
    }

    pub fn ar_large(&self) -> Option<f64> {
        self.ar_at("large", 100)
    }
}

/// Pull every metric line out of an evaluator report. Other lines (loading
/// messages, timing) are ignored.
pub fn parse_summary(report: &str) -> EvalSummary {
    let metrics = report
        .lines()
        .filter_map(|line| {
            let caps = SUMMARY_LINE.captures(line)?;
            let kind = match &caps[1] {
                "AP" => MetricKind::AveragePrecision,
                _ => MetricKind::AverageRecall,
            };
            Some(SummaryMetric {
                kind,
                iou: caps[2].to_string(),
                area: caps[3].to_string(),
                max_dets: caps[4].parse().ok()?,
                value: caps[5].parse().ok()?,
            })
        })
        .collect();
    EvalSummary { metrics }
}
