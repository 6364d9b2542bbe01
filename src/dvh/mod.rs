//! Cumulative dose-volume histograms.
//!
//! A curve point `(dose, percent)` states that `percent` of the structure
//! volume receives at least `dose`. Points are ordered by non-decreasing dose
//! and non-increasing percent.

pub mod metrics;
pub mod registry;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DvhError, DvhResult};
use crate::math::stats;
use crate::model::{DoseGrid, Structure, StructureKey, StructureSet};
use crate::stencil::{self, DoseThreshold, Rasterizer, StenciledSample};
use crate::transform::{self, TransformTree};

pub const DEFAULT_BIN_COUNT: usize = 100;
pub const CC_PER_CUBIC_MM: f64 = 0.001;

/// Whether a synthetic `(0.0, 100.0)` point leads the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginAnchor {
    /// Anchor only when every included value is non-negative.
    #[default]
    Auto,
    /// Curve starts at the lowest bin edge.
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramOptions {
    pub bins: usize,
    pub anchor: OriginAnchor,
    pub threshold: DoseThreshold,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BIN_COUNT,
            anchor: OriginAnchor::Auto,
            threshold: DoseThreshold::HalfScale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramKind {
    DoseVolume,
    IntensityVolume,
}

impl HistogramKind {
    /// Data with a dose unit is dose; anything else is treated as intensity.
    pub fn for_unit(dose_unit: Option<&str>) -> Self {
        if dose_unit.is_some() {
            Self::DoseVolume
        } else {
            Self::IntensityVolume
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::DoseVolume => "Dose Volume Histogram",
            Self::IntensityVolume => "Intensity Volume Histogram",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveWarning {
    /// The dose grid had no scale factor; 1.0 was used for the stencil threshold.
    DefaultDoseScale,
    /// Negative values present, origin anchor omitted.
    NegativeValuesNoAnchor,
}

impl CurveWarning {
    pub fn message(&self) -> &'static str {
        match self {
            Self::DefaultDoseScale => "dose grid scaling not set, assumed 1",
            Self::NegativeValuesNoAnchor => {
                "negative values in histogram, input is probably not a dose volume"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub dose: f64,
    pub percent: f64,
}

/// Identity of a curve in the registry: one structure against one dose grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurveKey {
    pub structure: StructureKey,
    pub dose_id: String,
}

/// Where a curve came from; copied onto the curve at creation.
#[derive(Debug, Clone)]
pub struct CurveSource {
    pub structure: StructureKey,
    pub color_hex: String,
    pub dose_id: String,
    pub dose_unit: Option<String>,
}

impl CurveSource {
    pub fn new(key: StructureKey, structure: &Structure, dose: &DoseGrid) -> Self {
        Self {
            structure: key,
            color_hex: structure.color.to_hex(),
            dose_id: dose.id.clone(),
            dose_unit: dose.dose_unit_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DvhCurve {
    pub key: CurveKey,
    pub color_hex: String,
    pub dose_unit: Option<String>,
    pub voxel_count: u64,
    /// Fixed at creation: `voxel_count × voxel volume (mm³) × 0.001`.
    pub total_volume_cc: f64,
    pub mean_dose: f64,
    pub min_dose: f64,
    pub max_dose: f64,
    pub points: Vec<CurvePoint>,
    /// First point is the synthetic `(0.0, 100.0)` origin.
    pub anchored: bool,
    pub warnings: Vec<CurveWarning>,
}

impl DvhCurve {
    pub fn structure_name(&self) -> &str {
        &self.key.structure.name
    }

    pub fn kind(&self) -> HistogramKind {
        HistogramKind::for_unit(self.dose_unit.as_deref())
    }
}

/// Builds the statistics and cumulative curve for one stenciled sample.
pub fn build_curve(
    sample: &StenciledSample,
    source: CurveSource,
    options: &HistogramOptions,
) -> DvhResult<DvhCurve> {
    let acc = stats::accumulate(&sample.values).ok_or_else(|| DvhError::EmptyStructure {
        name: source.structure.name.clone(),
    })?;
    if options.bins == 0 {
        return Err(DvhError::InvalidInput("histogram bin count must be positive".into()));
    }

    let mut warnings = Vec::new();
    if sample.default_scale {
        warnings.push(CurveWarning::DefaultDoseScale);
    }

    let insert_origin = match options.anchor {
        OriginAnchor::Never => false,
        OriginAnchor::Auto => {
            if acc.min < 0.0 {
                warn!(
                    structure = %source.structure.name,
                    min = acc.min,
                    "negative values in the histogram, probably the input is not a dose volume"
                );
                warnings.push(CurveWarning::NegativeValuesNoAnchor);
                false
            } else {
                true
            }
        }
    };

    let points = cumulative_points(
        &sample.values,
        acc.min,
        acc.max,
        acc.count,
        options.bins,
        insert_origin,
    );

    let total_volume_cc = acc.count as f64 * sample.voxel_volume_mm3 * CC_PER_CUBIC_MM;

    Ok(DvhCurve {
        key: CurveKey {
            structure: source.structure,
            dose_id: source.dose_id,
        },
        color_hex: source.color_hex,
        dose_unit: source.dose_unit,
        voxel_count: acc.count,
        total_volume_cc,
        mean_dose: acc.mean,
        min_dose: acc.min,
        max_dose: acc.max,
        points,
        anchored: insert_origin,
        warnings,
    })
}

fn cumulative_points(
    values: &[f64],
    min: f64,
    max: f64,
    total: u64,
    bins: usize,
    insert_origin: bool,
) -> Vec<CurvePoint> {
    let mut points = Vec::with_capacity(bins + 1);
    if insert_origin {
        points.push(CurvePoint {
            dose: 0.0,
            percent: 100.0,
        });
    }

    let width = (max - min) / bins as f64;
    if width <= 0.0 {
        points.push(CurvePoint {
            dose: min,
            percent: 100.0,
        });
        return points;
    }

    let counts = stats::bin_counts(values, min, width, bins);
    let mut below = 0u64;
    for (i, in_bin) in counts.iter().enumerate() {
        points.push(CurvePoint {
            dose: stats::bin_edge(min, width, i),
            percent: (1.0 - below as f64 / total as f64) * 100.0,
        });
        below += in_bin;
    }
    points
}

/// Resolve, stencil and histogram one structure. Nothing is published on failure.
pub fn compute_structure_dvh(
    tree: &TransformTree,
    dose: &DoseGrid,
    structure_set_name: &str,
    key: StructureKey,
    structure: &Structure,
    rasterizer: &dyn Rasterizer,
    options: &HistogramOptions,
) -> DvhResult<DvhCurve> {
    structure.geometry.validate(&structure.name)?;
    let local_to_ijk = transform::resolve_structure_to_dose_ijk(tree, structure, dose)?;
    let labelmap =
        stencil::structure_labelmap(rasterizer, structure_set_name, structure, &local_to_ijk, dose)?;
    let sample = stencil::stencil_dose(dose, &labelmap, options.threshold)?;
    if sample.voxel_count() == 0 {
        warn!(structure = %structure.name, "no voxels in the structure, DVH computation aborted");
        return Err(DvhError::EmptyStructure {
            name: structure.name.clone(),
        });
    }
    let source = CurveSource::new(key, structure, dose);
    build_curve(&sample, source, options)
}

#[derive(Debug)]
pub struct StructureFailure {
    pub structure: StructureKey,
    pub error: DvhError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub curves: Vec<DvhCurve>,
    pub failures: Vec<StructureFailure>,
}

/// Computes every structure of the set in order; failures are isolated.
pub fn compute_structure_set(
    tree: &TransformTree,
    dose: &DoseGrid,
    set: &StructureSet,
    rasterizer: &dyn Rasterizer,
    options: &HistogramOptions,
) -> DvhResult<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for (key, structure) in set.collect()? {
        match compute_structure_dvh(
            tree,
            dose,
            set.name(),
            key.clone(),
            structure,
            rasterizer,
            options,
        ) {
            Ok(curve) => {
                info!(
                    structure = %key,
                    voxels = curve.voxel_count,
                    volume_cc = curve.total_volume_cc,
                    "dvh_computed"
                );
                outcome.curves.push(curve);
            }
            Err(error) => {
                warn!(structure = %key, error = %error, "structure_skipped");
                outcome.failures.push(StructureFailure {
                    structure: key,
                    error,
                });
            }
        }
    }
    Ok(outcome)
}
