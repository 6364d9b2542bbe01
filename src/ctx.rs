use std::path::PathBuf;

use crate::dvh::metrics::MetricQuery;
use crate::dvh::registry::{DvhRegistry, MetricTable, PlotCollection};
use crate::dvh::{HistogramOptions, StructureFailure};
use crate::io::csv_writer::CsvLocale;
use crate::model::{DoseGrid, StructureSet};
use crate::schema::v1::{DvhReportV1, Settings};
use crate::transform::TransformTree;

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub out_dir: PathBuf,
    pub metrics_path: PathBuf,
    pub curves_path: PathBuf,
    pub json_path: PathBuf,
}

impl OutputPaths {
    pub fn new(out_dir: PathBuf, locale: CsvLocale) -> Self {
        let ext = match locale {
            CsvLocale::Comma => "csv",
            CsvLocale::Tab => "tsv",
        };
        Self {
            metrics_path: out_dir.join(format!("dvh_metrics.{}", ext)),
            curves_path: out_dir.join(format!("dvh_curves.{}", ext)),
            json_path: out_dir.join("dvh_report.json"),
            out_dir,
        }
    }
}

#[derive(Debug)]
pub struct Ctx {
    pub plan_path: PathBuf,
    pub options: HistogramOptions,
    pub queries: Vec<MetricQuery>,
    pub locale: CsvLocale,
    pub write_curves: bool,
    pub write_json: bool,
    pub dose: Option<DoseGrid>,
    pub transforms: TransformTree,
    pub structures: Option<StructureSet>,
    pub resolved_structures: usize,
    pub registry: DvhRegistry,
    pub plots: PlotCollection,
    pub failures: Vec<StructureFailure>,
    pub metric_table: Option<MetricTable>,
    pub warnings: Vec<String>,
    pub output: OutputPaths,
    pub report: DvhReportV1,
}

impl Ctx {
    pub fn new(
        plan_path: PathBuf,
        out_dir: PathBuf,
        options: HistogramOptions,
        locale: CsvLocale,
        tool_version: &str,
    ) -> Self {
        let report = DvhReportV1::empty(
            tool_version,
            Settings {
                bins: options.bins,
                anchor: options.anchor,
                threshold: options.threshold,
            },
        );
        Self {
            plan_path,
            options,
            queries: Vec::new(),
            locale,
            write_curves: false,
            write_json: false,
            dose: None,
            transforms: TransformTree::new(),
            structures: None,
            resolved_structures: 0,
            registry: DvhRegistry::new(),
            plots: PlotCollection::new(),
            failures: Vec::new(),
            metric_table: None,
            warnings: Vec::new(),
            output: OutputPaths::new(out_dir, locale),
            report,
        }
    }

    pub fn dose(&self) -> anyhow::Result<&DoseGrid> {
        self.dose
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("dose grid not loaded"))
    }

    pub fn structures(&self) -> anyhow::Result<&StructureSet> {
        self.structures
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("structure set not loaded"))
    }
}
