use anyhow::Result;
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::dvh::StructureFailure;
use crate::pipeline::Stage;
use crate::transform;

/// Checks every structure's geometry and transform chain without rasterizing.
pub struct Stage2Resolve;

impl Stage2Resolve {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage2Resolve {
    fn name(&self) -> &'static str {
        "stage2_resolve"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let dose = ctx.dose()?;
        let mut resolved = 0usize;
        let mut failures = Vec::new();
        for (key, structure) in ctx.structures()?.collect()? {
            let checked = structure
                .geometry
                .validate(&structure.name)
                .and_then(|_| {
                    transform::resolve_structure_to_dose_ijk(&ctx.transforms, structure, dose)
                });
            match checked {
                Ok(_) => resolved += 1,
                Err(error) => {
                    warn!(structure = %key, error = %error, "structure_unresolved");
                    failures.push(StructureFailure {
                        structure: key,
                        error,
                    });
                }
            }
        }
        info!(resolved, failures = failures.len(), "resolve_done");
        ctx.resolved_structures = resolved;
        ctx.failures.extend(failures);
        Ok(())
    }
}
