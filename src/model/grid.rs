use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::dvh::HistogramKind;
use crate::error::{DvhError, DvhResult};
use crate::math::affine;

/// Voxel lattice placement: dimensions, spacing (mm), origin and axis directions.
/// Voxel storage order is i fastest, then j, then k.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub dims: [usize; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    #[serde(default = "identity_directions")]
    pub directions: [[f64; 3]; 3],
}

pub fn identity_directions() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

impl GridGeometry {
    pub fn new(dims: [usize; 3], spacing: [f64; 3], origin: [f64; 3]) -> Self {
        Self {
            dims,
            spacing,
            origin,
            directions: identity_directions(),
        }
    }

    pub fn validate(&self, what: &str) -> DvhResult<()> {
        if self.dims.iter().any(|&d| d == 0) {
            return Err(DvhError::InvalidInput(format!(
                "{} has a zero dimension: {:?}",
                what, self.dims
            )));
        }
        if self.checked_voxel_count().is_none() {
            return Err(DvhError::InvalidInput(format!(
                "{} dimensions {:?} overflow the voxel count",
                what, self.dims
            )));
        }
        if self.spacing.iter().any(|&s| !(s > 0.0) || !s.is_finite()) {
            return Err(DvhError::InvalidInput(format!(
                "{} spacing must be positive: {:?}",
                what, self.spacing
            )));
        }
        Ok(())
    }

    /// Saturates on overflow; `validate` rejects such grids.
    pub fn voxel_count(&self) -> usize {
        self.checked_voxel_count().unwrap_or(usize::MAX)
    }

    pub fn checked_voxel_count(&self) -> Option<usize> {
        self.dims[0]
            .checked_mul(self.dims[1])?
            .checked_mul(self.dims[2])
    }

    pub fn voxel_volume_mm3(&self) -> f64 {
        self.spacing[0] * self.spacing[1] * self.spacing[2]
    }

    #[inline]
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    pub fn ijk_to_physical(&self) -> Matrix4<f64> {
        affine::ijk_to_physical(&self.directions, &self.spacing, &self.origin)
    }

    pub fn physical_to_ijk(&self) -> DvhResult<Matrix4<f64>> {
        affine::invert(&self.ijk_to_physical(), "grid index-to-physical matrix")
    }
}

/// A 3-D dose distribution. Values are stored in dose units; `dose_unit_value`
/// is the quantisation step of the grid and drives the stencil threshold.
#[derive(Debug, Clone)]
pub struct DoseGrid {
    pub id: String,
    pub geometry: GridGeometry,
    pub values: Vec<f32>,
    pub dose_unit_value: Option<f64>,
    pub dose_unit_name: Option<String>,
    pub parent_transform: Option<String>,
}

impl DoseGrid {
    pub fn new(id: impl Into<String>, geometry: GridGeometry, values: Vec<f32>) -> DvhResult<Self> {
        let grid = Self {
            id: id.into(),
            geometry,
            values,
            dose_unit_value: None,
            dose_unit_name: None,
            parent_transform: None,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> DvhResult<()> {
        self.geometry.validate("dose grid")?;
        if self.values.len() != self.geometry.voxel_count() {
            return Err(DvhError::InvalidInput(format!(
                "dose grid '{}' has {} values, expected {}",
                self.id,
                self.values.len(),
                self.geometry.voxel_count()
            )));
        }
        if let Some(scale) = self.dose_unit_value {
            if scale == 0.0 || !scale.is_finite() {
                return Err(DvhError::InvalidInput(format!(
                    "dose grid '{}' scale factor must be finite and nonzero",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Scale factor, or `(1.0, true)` when the grid does not declare one.
    pub fn scale_or_default(&self) -> (f64, bool) {
        match self.dose_unit_value {
            Some(v) => (v, false),
            None => (1.0, true),
        }
    }

    /// A grid without a unit name holds intensity data rather than dose.
    pub fn histogram_kind(&self) -> HistogramKind {
        HistogramKind::for_unit(self.dose_unit_name.as_deref())
    }
}

/// Binary structure mask resampled onto a reference grid.
#[derive(Debug, Clone)]
pub struct Labelmap {
    pub name: String,
    pub geometry: GridGeometry,
    pub parent_transform: Option<String>,
    pub labels: Vec<u8>,
}

impl Labelmap {
    pub fn empty_like(name: impl Into<String>, reference: &DoseGrid) -> Self {
        Self {
            name: name.into(),
            geometry: reference.geometry.clone(),
            parent_transform: reference.parent_transform.clone(),
            labels: vec![0; reference.geometry.voxel_count()],
        }
    }

    pub fn labelled_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l != 0).count()
    }
}
