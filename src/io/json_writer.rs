use std::path::Path;

use anyhow::{Context, Result};

use crate::ctx::Ctx;
use crate::dvh::metrics::{self, MetricRecord};
use crate::schema::v1::{
    DoseMeta, DvhReportV1, FailureReport, MetricValue, Settings, StructureReport,
};

pub fn build_report(ctx: &Ctx) -> Result<DvhReportV1> {
    let dose = ctx.dose.as_ref().map(|d| DoseMeta {
        id: d.id.clone(),
        dims: d.geometry.dims,
        spacing: d.geometry.spacing,
        dose_unit_name: d.dose_unit_name.clone(),
        dose_unit_value: d.dose_unit_value,
        histogram_kind: d.histogram_kind(),
    });

    let unit = ctx.registry.unit_label();
    let mut structures = Vec::with_capacity(ctx.registry.len());
    for curve in ctx.registry.curves() {
        // Rows skipped by the metric table keep their canonical statistics;
        // the failure itself is listed under `failures`.
        let row = ctx
            .metric_table
            .as_ref()
            .and_then(|t| t.rows.iter().find(|r| r.curve == curve.key));
        let record = match row {
            Some(row) => row.record.clone(),
            None => MetricRecord {
                canonical: metrics::canonical(curve),
                queries: Vec::new(),
            },
        };
        let metric_values = record
            .canonical
            .iter()
            .map(|(k, v)| MetricValue {
                label: k.label(&unit),
                value: *v,
            })
            .chain(record.queries.iter().map(|(q, v)| MetricValue {
                label: q.label(&unit),
                value: *v,
            }))
            .collect();

        structures.push(StructureReport {
            name: curve.structure_name().to_string(),
            index: curve.key.structure.index,
            color: curve.color_hex.clone(),
            voxel_count: curve.voxel_count,
            total_volume_cc: curve.total_volume_cc,
            mean_dose: curve.mean_dose,
            min_dose: curve.min_dose,
            max_dose: curve.max_dose,
            anchored: curve.anchored,
            warnings: curve.warnings.clone(),
            metrics: metric_values,
            curve: curve.points.clone(),
        });
    }

    let mut failures: Vec<FailureReport> = ctx
        .failures
        .iter()
        .map(|f| FailureReport {
            name: f.structure.name.clone(),
            index: Some(f.structure.index),
            kind: f.error.kind().to_string(),
            message: f.error.to_string(),
        })
        .collect();
    if let Some(table) = &ctx.metric_table {
        failures.extend(table.skipped.iter().map(|(name, err)| FailureReport {
            name: name.clone(),
            index: None,
            kind: err.kind().to_string(),
            message: err.to_string(),
        }));
    }

    Ok(DvhReportV1 {
        tool: "kira-dvh".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: "v1".to_string(),
        dose,
        settings: Settings {
            bins: ctx.options.bins,
            anchor: ctx.options.anchor,
            threshold: ctx.options.threshold,
        },
        structures,
        failures,
    })
}

pub fn write_json(path: &Path, report: &DvhReportV1) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
