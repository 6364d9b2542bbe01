//! V and D metrics by linear interpolation over a cumulative curve, plus the
//! canonical per-structure statistics.

use serde::{Deserialize, Serialize};

use crate::dvh::DvhCurve;
use crate::error::{DvhError, DvhResult};

/// Volume used for the near-maximum dose baseline of every D metric.
pub const NEAR_MAX_VOLUME_CC: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    TotalVolumeCc,
    MeanDose,
    MinDose,
    MaxDose,
}

impl MetricKind {
    /// Canonical column order.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::TotalVolumeCc,
        MetricKind::MeanDose,
        MetricKind::MinDose,
        MetricKind::MaxDose,
    ];

    pub fn label(&self, unit: &str) -> String {
        match self {
            Self::TotalVolumeCc => "Volume (cc)".to_string(),
            Self::MeanDose => format!("Mean dose ({})", unit),
            Self::MinDose => format!("Min dose ({})", unit),
            Self::MaxDose => format!("Max dose ({})", unit),
        }
    }

    pub fn value(&self, curve: &DvhCurve) -> f64 {
        match self {
            Self::TotalVolumeCc => curve.total_volume_cc,
            Self::MeanDose => curve.mean_dose,
            Self::MinDose => curve.min_dose,
            Self::MaxDose => curve.max_dose,
        }
    }
}

/// A user-requested metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricQuery {
    /// Volume in cc receiving at least the given dose.
    VolumeCc(f64),
    /// Percent of volume receiving at least the given dose.
    VolumePercent(f64),
    /// D metric for a volume given in cc.
    DoseForVolumeCc(f64),
    /// D metric for a volume given as percent of the structure.
    DoseForVolumePercent(f64),
}

impl MetricQuery {
    pub fn label(&self, unit: &str) -> String {
        match self {
            Self::VolumeCc(d) => format!("V{} (cc)", d),
            Self::VolumePercent(d) => format!("V{} (%)", d),
            Self::DoseForVolumeCc(v) => format!("D{}cc ({})", v, unit),
            Self::DoseForVolumePercent(v) => format!("D{}% ({})", v, unit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeAtDose {
    pub cc: f64,
    pub percent: f64,
}

/// Canonical statistics and query results of one curve.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub canonical: Vec<(MetricKind, f64)>,
    pub queries: Vec<(MetricQuery, f64)>,
}

impl MetricRecord {
    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        self.canonical
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.canonical
            .iter()
            .map(|(_, v)| *v)
            .chain(self.queries.iter().map(|(_, v)| *v))
    }
}

fn checked_volume(curve: &DvhCurve) -> DvhResult<f64> {
    let precondition = |reason: &str| DvhError::MetricPrecondition {
        name: curve.structure_name().to_string(),
        reason: reason.to_string(),
    };
    if curve.points.is_empty() {
        return Err(precondition("curve has no points"));
    }
    let volume = curve.total_volume_cc;
    if !volume.is_finite() {
        return Err(precondition("total volume is not available"));
    }
    if volume == 0.0 {
        return Err(precondition("total volume is zero"));
    }
    Ok(volume)
}

/// Volume receiving at least each dose.
pub fn volume_at_doses(curve: &DvhCurve, doses: &[f64]) -> DvhResult<Vec<VolumeAtDose>> {
    let volume = checked_volume(curve)?;
    let points = &curve.points;
    let first = points[0].dose;
    let last = points[points.len() - 1].dose;

    let mut out = Vec::with_capacity(doses.len());
    for &dose in doses {
        if dose < first {
            out.push(VolumeAtDose {
                cc: volume,
                percent: 100.0,
            });
            continue;
        }
        if dose >= last {
            out.push(VolumeAtDose {
                cc: 0.0,
                percent: 0.0,
            });
            continue;
        }
        let percent = points
            .windows(2)
            .find(|w| w[0].dose <= dose && dose < w[1].dose)
            .map(|w| {
                let (lo, hi) = (w[0], w[1]);
                lo.percent + (hi.percent - lo.percent) * (dose - lo.dose) / (hi.dose - lo.dose)
            })
            .unwrap_or(0.0);
        out.push(VolumeAtDose {
            cc: percent * volume / 100.0,
            percent,
        });
    }
    Ok(out)
}

/// Dose for a volume in cc, before the near-maximum subtraction.
fn dose_for_volume(curve: &DvhCurve, volume: f64, volume_cc: f64) -> f64 {
    let points = &curve.points;
    let to_cc = |percent: f64| percent / 100.0 * volume;
    let last = points[points.len() - 1];

    if volume_cc >= to_cc(points[0].percent) {
        return 0.0;
    }
    if volume_cc < to_cc(last.percent) {
        return last.dose;
    }
    points
        .windows(2)
        .find_map(|w| {
            let (prev, next) = (w[0], w[1]);
            let (v_prev, v_next) = (to_cc(prev.percent), to_cc(next.percent));
            (v_prev > volume_cc && volume_cc >= v_next).then(|| {
                prev.dose + (next.dose - prev.dose) * (volume_cc - v_prev) / (v_next - v_prev)
            })
        })
        .unwrap_or(0.0)
}

/// D metrics, reported as `D0.1cc − dose(y)` for each volume `y` in cc.
pub fn dose_metrics(curve: &DvhCurve, volumes_cc: &[f64]) -> DvhResult<Vec<f64>> {
    let volume = checked_volume(curve)?;
    let maximum_dose = dose_for_volume(curve, volume, NEAR_MAX_VOLUME_CC);
    Ok(volumes_cc
        .iter()
        .map(|&y| maximum_dose - dose_for_volume(curve, volume, y))
        .collect())
}

pub fn canonical(curve: &DvhCurve) -> Vec<(MetricKind, f64)> {
    MetricKind::ALL
        .iter()
        .map(|kind| (*kind, kind.value(curve)))
        .collect()
}

/// Canonical metrics plus every query, in request order.
pub fn evaluate(curve: &DvhCurve, queries: &[MetricQuery]) -> DvhResult<MetricRecord> {
    let volume = checked_volume(curve)?;
    let mut results = Vec::with_capacity(queries.len());
    for query in queries {
        let value = match *query {
            MetricQuery::VolumeCc(d) => volume_at_doses(curve, &[d])?[0].cc,
            MetricQuery::VolumePercent(d) => volume_at_doses(curve, &[d])?[0].percent,
            MetricQuery::DoseForVolumeCc(v) => dose_metrics(curve, &[v])?[0],
            MetricQuery::DoseForVolumePercent(p) => dose_metrics(curve, &[p / 100.0 * volume])?[0],
        };
        results.push((*query, value));
    }
    Ok(MetricRecord {
        canonical: canonical(curve),
        queries: results,
    })
}

/// Parses a value list such as `"5, 10,20.5"`; blanks are ignored.
pub fn parse_value_list(text: &str) -> DvhResult<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DvhError::InvalidInput(format!("invalid metric value '{}'", t)))
        })
        .collect()
}
