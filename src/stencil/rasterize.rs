use nalgebra::Matrix4;

use crate::error::{DvhError, DvhResult};
use crate::math::affine;
use crate::model::{DoseGrid, GridGeometry, Labelmap, StructureGeometry};

/// Converts a structure geometry into a labelmap aligned with a reference grid.
///
/// `local_to_ijk` maps structure-local coordinates into the reference grid's
/// continuous index space (voxel centres at integer indices).
pub trait Rasterizer {
    fn rasterize(
        &self,
        name: &str,
        geometry: &StructureGeometry,
        local_to_ijk: &Matrix4<f64>,
        reference: &DoseGrid,
    ) -> DvhResult<Labelmap>;
}

/// Nearest-neighbour mask resampling and even-odd scanline filling of closed
/// surfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoxelRasterizer;

impl Rasterizer for VoxelRasterizer {
    fn rasterize(
        &self,
        name: &str,
        geometry: &StructureGeometry,
        local_to_ijk: &Matrix4<f64>,
        reference: &DoseGrid,
    ) -> DvhResult<Labelmap> {
        let mut out = Labelmap::empty_like(name, reference);
        match geometry {
            StructureGeometry::Mask { geometry, labels } => {
                resample_mask(geometry, labels, local_to_ijk, &mut out)?
            }
            StructureGeometry::Surface {
                vertices,
                triangles,
            } => fill_surface(vertices, triangles, local_to_ijk, &mut out),
        }
        Ok(out)
    }
}

fn resample_mask(
    mask: &GridGeometry,
    labels: &[u8],
    local_to_ijk: &Matrix4<f64>,
    out: &mut Labelmap,
) -> DvhResult<()> {
    let ijk_to_local = affine::invert(local_to_ijk, "structure to dose index transform")?;
    let local_to_mask = mask.physical_to_ijk()?;
    let dose_ijk_to_mask = local_to_mask * ijk_to_local;

    let [nx, ny, nz] = out.geometry.dims;
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let p = affine::apply(&dose_ijk_to_mask, [i as f64, j as f64, k as f64]);
                let Some(idx) = nearest_index(mask, p) else {
                    continue;
                };
                if labels[idx] != 0 {
                    let dst = out.geometry.linear_index(i, j, k);
                    out.labels[dst] = 1;
                }
            }
        }
    }
    Ok(())
}

fn nearest_index(grid: &GridGeometry, p: [f64; 3]) -> Option<usize> {
    let mut ijk = [0usize; 3];
    for axis in 0..3 {
        let r = p[axis].round();
        if r < 0.0 || r >= grid.dims[axis] as f64 {
            return None;
        }
        ijk[axis] = r as usize;
    }
    Some(grid.linear_index(ijk[0], ijk[1], ijk[2]))
}

fn fill_surface(
    vertices: &[[f64; 3]],
    triangles: &[[usize; 3]],
    local_to_ijk: &Matrix4<f64>,
    out: &mut Labelmap,
) {
    let ijk: Vec<[f64; 3]> = vertices
        .iter()
        .map(|&v| affine::apply(local_to_ijk, v))
        .collect();

    let [nx, ny, nz] = out.geometry.dims;
    let mut crossings: Vec<f64> = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            crossings.clear();
            let (y, z) = (j as f64 + RAY_JITTER[0], k as f64 + RAY_JITTER[1]);
            for tri in triangles {
                if let Some(x) = ray_crossing(&ijk[tri[0]], &ijk[tri[1]], &ijk[tri[2]], y, z) {
                    crossings.push(x);
                }
            }
            if crossings.len() < 2 {
                continue;
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                let start = pair[0].ceil().max(0.0);
                let end = pair[1].min(nx as f64 - 1.0);
                if start > end {
                    continue;
                }
                for i in start as usize..=end.floor() as usize {
                    let dst = out.geometry.linear_index(i, j, k);
                    out.labels[dst] = 1;
                }
            }
        }
    }
}

/// Sub-voxel offset of every scanline so rays never graze shared edges or
/// vertices sitting on the lattice.
const RAY_JITTER: [f64; 2] = [1.234_567e-7, 7.654_321e-8];

/// x coordinate where the line (y, z) parallel to the i axis crosses the
/// triangle, if it does.
fn ray_crossing(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3], y: f64, z: f64) -> Option<f64> {
    // Barycentric coordinates of (y, z) in the triangle projected to the yz plane.
    let det = (b[1] - a[1]) * (c[2] - a[2]) - (c[1] - a[1]) * (b[2] - a[2]);
    if det.abs() < 1e-12 {
        return None;
    }
    let w1 = ((y - a[1]) * (c[2] - a[2]) - (c[1] - a[1]) * (z - a[2])) / det;
    let w2 = ((b[1] - a[1]) * (z - a[2]) - (y - a[1]) * (b[2] - a[2])) / det;
    let w0 = 1.0 - w1 - w2;
    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
        return None;
    }
    Some(w0 * a[0] + w1 * b[0] + w2 * c[0])
}

pub(crate) fn ensure_same_lattice(labelmap: &Labelmap, dose: &DoseGrid) -> DvhResult<()> {
    if labelmap.geometry != dose.geometry || labelmap.labels.len() != dose.values.len() {
        return Err(DvhError::InvalidInput(format!(
            "labelmap '{}' is not aligned with dose grid '{}'",
            labelmap.name, dose.id
        )));
    }
    Ok(())
}
