use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::dvh::{self, registry::SceneEvent};
use crate::pipeline::Stage;
use crate::stencil::VoxelRasterizer;

pub struct Stage2Dvh;

impl Stage2Dvh {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage2Dvh {
    fn name(&self) -> &'static str {
        "stage2_dvh"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let outcome = dvh::compute_structure_set(
            &ctx.transforms,
            ctx.dose()?,
            ctx.structures()?,
            &VoxelRasterizer,
            &ctx.options,
        )?;

        for curve in outcome.curves {
            for warning in &curve.warnings {
                ctx.warnings
                    .push(format!("{}: {}", curve.structure_name(), warning.message()));
            }
            ctx.plots.add(&curve);
            ctx.registry
                .handle(SceneEvent::CurveAdded(curve), &mut ctx.plots);
        }
        ctx.failures.extend(outcome.failures);

        info!(
            curves = ctx.registry.len(),
            failures = ctx.failures.len(),
            "dvh_batch_done"
        );
        Ok(())
    }
}
