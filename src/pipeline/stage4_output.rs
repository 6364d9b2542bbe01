use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::error::DvhError;
use crate::io::{csv_writer, json_writer};
use crate::pipeline::Stage;

pub struct Stage4Output;

impl Stage4Output {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage4Output {
    fn name(&self) -> &'static str {
        "stage4_output"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let table = ctx
            .metric_table
            .as_ref()
            .context("metric table not computed")?;
        csv_writer::export_metrics_csv(&ctx.output.metrics_path, table, ctx.locale)?;

        if ctx.write_curves {
            match csv_writer::export_curves_csv(
                &ctx.output.curves_path,
                &ctx.plots,
                &ctx.registry,
                ctx.locale,
            ) {
                Ok(()) => {}
                Err(err @ DvhError::InconsistentCurveLength { .. }) => {
                    warn!(error = %err, "curves_csv_skipped");
                    ctx.warnings.push(format!("curve export skipped: {}", err));
                }
                Err(err) => return Err(err.into()),
            }
        }

        ctx.report = json_writer::build_report(ctx)?;
        if ctx.write_json {
            json_writer::write_json(&ctx.output.json_path, &ctx.report)?;
        }

        info!("stage4_output_ready");
        Ok(())
    }
}
