use serde::{Deserialize, Serialize};

use crate::dvh::{CurvePoint, CurveWarning, HistogramKind, OriginAnchor};
use crate::stencil::DoseThreshold;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseMeta {
    pub id: String,
    pub dims: [usize; 3],
    pub spacing: [f64; 3],
    pub dose_unit_name: Option<String>,
    pub dose_unit_value: Option<f64>,
    pub histogram_kind: HistogramKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub bins: usize,
    pub anchor: OriginAnchor,
    pub threshold: DoseThreshold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricValue {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureReport {
    pub name: String,
    pub index: usize,
    pub color: String,
    pub voxel_count: u64,
    pub total_volume_cc: f64,
    pub mean_dose: f64,
    pub min_dose: f64,
    pub max_dose: f64,
    pub anchored: bool,
    pub warnings: Vec<CurveWarning>,
    pub metrics: Vec<MetricValue>,
    pub curve: Vec<CurvePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub name: String,
    pub index: Option<usize>,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DvhReportV1 {
    pub tool: String,
    pub version: String,
    pub schema_version: String,
    pub dose: Option<DoseMeta>,
    pub settings: Settings,
    pub structures: Vec<StructureReport>,
    pub failures: Vec<FailureReport>,
}

impl DvhReportV1 {
    pub fn empty(tool_version: &str, settings: Settings) -> Self {
        Self {
            tool: "kira-dvh".to_string(),
            version: tool_version.to_string(),
            schema_version: "v1".to_string(),
            dose: None,
            settings,
            structures: Vec::new(),
            failures: Vec::new(),
        }
    }
}
