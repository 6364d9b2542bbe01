//! Accumulation and fixed-edge binning over stenciled dose samples.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulation {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Count, mean, min and max in one pass. `None` for an empty slice.
pub fn accumulate(values: &[f64]) -> Option<Accumulation> {
    if values.is_empty() {
        return None;
    }
    let mut sum = NeumaierSum::default();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        sum.add(v);
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    let count = values.len() as u64;
    Some(Accumulation {
        count,
        mean: sum.total() / count as f64,
        min,
        max,
    })
}

/// Compensated summation; plain accumulation drifts on large structures.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
}

impl NeumaierSum {
    pub fn add(&mut self, v: f64) {
        let t = self.sum + v;
        if self.sum.abs() >= v.abs() {
            self.compensation += (self.sum - t) + v;
        } else {
            self.compensation += (v - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Per-bin counts for `bins` bins of width `width` starting at `origin`.
/// Samples beyond the last edge land in the last bin. A zero width puts
/// everything in bin 0.
pub fn bin_counts(values: &[f64], origin: f64, width: f64, bins: usize) -> Vec<u64> {
    let mut counts = vec![0u64; bins];
    if bins == 0 {
        return counts;
    }
    let last = bins - 1;
    for &v in values {
        let idx = if width > 0.0 {
            let pos = ((v - origin) / width).floor();
            if pos <= 0.0 {
                0
            } else {
                (pos as usize).min(last)
            }
        } else {
            0
        };
        counts[idx] += 1;
    }
    counts
}

/// Lower edge of bin `i`, computed directly so edges never accumulate drift.
#[inline]
pub fn bin_edge(origin: f64, width: f64, i: usize) -> f64 {
    origin + i as f64 * width
}
