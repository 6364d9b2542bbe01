use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::pipeline::Stage;

pub struct Stage3Metrics;

impl Stage3Metrics {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage3Metrics {
    fn name(&self) -> &'static str {
        "stage3_metrics"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let table = ctx.registry.metric_table(&ctx.queries);
        for (name, error) in &table.skipped {
            ctx.warnings
                .push(format!("{}: metrics skipped: {}", name, error));
        }
        info!(
            rows = table.rows.len(),
            columns = table.columns.len(),
            skipped = table.skipped.len(),
            "metric_table_ready"
        );
        ctx.metric_table = Some(table);
        Ok(())
    }
}
