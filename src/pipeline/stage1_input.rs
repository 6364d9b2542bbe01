use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::io::plan;
use crate::pipeline::Stage;

pub struct Stage1Input;

impl Stage1Input {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Input {
    fn name(&self) -> &'static str {
        "stage1_input"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let loaded = plan::load_plan(&ctx.plan_path)
            .with_context(|| format!("failed to load plan {}", ctx.plan_path.display()))?;

        info!(
            dose = %loaded.dose.id,
            voxels = loaded.dose.geometry.voxel_count(),
            transforms = loaded.transforms.len(),
            structure_set = %loaded.structures.name(),
            "input_ready"
        );

        ctx.dose = Some(loaded.dose);
        ctx.transforms = loaded.transforms;
        ctx.structures = Some(loaded.structures);
        Ok(())
    }
}
