pub mod rasterize;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DvhResult;
use crate::model::{DoseGrid, Labelmap, Structure};

pub use rasterize::{Rasterizer, VoxelRasterizer};

/// Which dose values count as inside a labelled voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoseThreshold {
    /// Keep voxels whose dose is at least half a scale increment.
    #[default]
    HalfScale,
    /// Keep every labelled voxel (intensity volumes may be negative).
    Disabled,
}

/// Dose values inside one structure. Never outlives a single DVH computation.
#[derive(Debug, Clone)]
pub struct StenciledSample {
    pub values: Vec<f64>,
    pub voxel_volume_mm3: f64,
    pub default_scale: bool,
}

impl StenciledSample {
    pub fn voxel_count(&self) -> usize {
        self.values.len()
    }
}

/// Rasterizes `structure` into the dose grid lattice.
pub fn structure_labelmap(
    rasterizer: &dyn Rasterizer,
    structure_set_name: &str,
    structure: &Structure,
    local_to_ijk: &Matrix4<f64>,
    dose: &DoseGrid,
) -> DvhResult<Labelmap> {
    let name = format!("{}_Labelmap", structure_set_name);
    let labelmap = rasterizer.rasterize(&name, &structure.geometry, local_to_ijk, dose)?;
    rasterize::ensure_same_lattice(&labelmap, dose)?;
    debug!(
        structure = %structure.name,
        labelled = labelmap.labelled_count(),
        "labelmap_ready"
    );
    Ok(labelmap)
}

/// Masks the dose grid with the labelmap.
pub fn stencil_dose(
    dose: &DoseGrid,
    labelmap: &Labelmap,
    threshold: DoseThreshold,
) -> DvhResult<StenciledSample> {
    rasterize::ensure_same_lattice(labelmap, dose)?;
    let (scale, default_scale) = dose.scale_or_default();
    if default_scale {
        warn!(
            dose = %dose.id,
            "dose grid scaling is not set, assuming scaling = 1"
        );
    }
    let cutoff = 0.5 * scale;

    let values = labelmap
        .labels
        .iter()
        .zip(dose.values.iter())
        .filter(|(label, _)| **label != 0)
        .map(|(_, &v)| v as f64)
        .filter(|&v| match threshold {
            DoseThreshold::HalfScale => v >= cutoff,
            DoseThreshold::Disabled => true,
        })
        .collect();

    Ok(StenciledSample {
        values,
        voxel_volume_mm3: dose.geometry.voxel_volume_mm3(),
        default_scale,
    })
}
