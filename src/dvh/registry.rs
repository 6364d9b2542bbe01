//! Session registry of computed curves and the plot collection that mirrors it.

use tracing::{debug, info, warn};

use crate::dvh::metrics::{self, MetricKind, MetricQuery, MetricRecord};
use crate::dvh::{CurveKey, CurvePoint, DvhCurve, HistogramKind};
use crate::error::{DvhError, DvhResult};

/// Notifications from the owning scene. Assumed to arrive serialised.
#[derive(Debug)]
pub enum SceneEvent {
    CurveAdded(DvhCurve),
    CurveRemoved(CurveKey),
    SceneClosed,
}

#[derive(Debug, Default)]
pub struct DvhRegistry {
    curves: Vec<DvhCurve>,
}

impl DvhRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn curves(&self) -> &[DvhCurve] {
        &self.curves
    }

    pub fn get(&self, key: &CurveKey) -> Option<&DvhCurve> {
        self.curves.iter().find(|c| &c.key == key)
    }

    /// Registers a curve, replacing an earlier curve with the same key.
    pub fn add(&mut self, curve: DvhCurve) {
        if let Some(existing) = self.curves.iter_mut().find(|c| c.key == curve.key) {
            *existing = curve;
        } else {
            self.curves.push(curve);
        }
    }

    pub fn remove(&mut self, key: &CurveKey) -> Option<DvhCurve> {
        let pos = self.curves.iter().position(|c| &c.key == key)?;
        Some(self.curves.remove(pos))
    }

    pub fn clear(&mut self) {
        self.curves.clear();
    }

    /// Applies a scene notification; removals also purge plot series.
    pub fn handle(&mut self, event: SceneEvent, plots: &mut PlotCollection) {
        match event {
            SceneEvent::CurveAdded(curve) => {
                debug!(structure = %curve.key.structure, "curve_registered");
                self.add(curve);
            }
            SceneEvent::CurveRemoved(key) => {
                if self.remove(&key).is_some() {
                    let purged = plots.remove_curve(&key);
                    debug!(structure = %key.structure, purged, "curve_removed");
                }
            }
            SceneEvent::SceneClosed => {
                self.clear();
                plots.clear();
            }
        }
    }

    /// Dose unit label for table headers: first curve's unit, else `Gy`.
    pub fn unit_label(&self) -> String {
        self.curves
            .iter()
            .find_map(|c| c.dose_unit.clone())
            .unwrap_or_else(|| "Gy".to_string())
    }

    /// One row per curve; rows whose metrics cannot be computed are reported
    /// in `skipped` instead.
    pub fn metric_table(&self, queries: &[MetricQuery]) -> MetricTable {
        let unit = self.unit_label();
        let mut columns: Vec<String> = MetricKind::ALL.iter().map(|k| k.label(&unit)).collect();
        columns.extend(queries.iter().map(|q| q.label(&unit)));

        let mut rows = Vec::with_capacity(self.curves.len());
        let mut skipped = Vec::new();
        for curve in &self.curves {
            match metrics::evaluate(curve, queries) {
                Ok(record) => rows.push(MetricRow {
                    curve: curve.key.clone(),
                    structure: curve.structure_name().to_string(),
                    record,
                }),
                Err(err) => {
                    warn!(structure = %curve.key.structure, error = %err, "metric_row_skipped");
                    skipped.push((curve.structure_name().to_string(), err));
                }
            }
        }
        MetricTable {
            columns,
            rows,
            skipped,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricRow {
    pub curve: CurveKey,
    pub structure: String,
    pub record: MetricRecord,
}

#[derive(Debug)]
pub struct MetricTable {
    /// Value column titles, without the leading structure column.
    pub columns: Vec<String>,
    pub rows: Vec<MetricRow>,
    pub skipped: Vec<(String, DvhError)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotStyle {
    pub color: String,
    pub show_lines: bool,
    pub show_markers: bool,
}

#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub name: String,
    pub curve: CurveKey,
    pub style: PlotStyle,
}

/// Chart-side view of the registry. Passed explicitly to operations that
/// need it; there is no process-wide selected chart.
#[derive(Debug, Default)]
pub struct PlotCollection {
    pub title: String,
    pub x_axis_label: String,
    pub y_axis_label: String,
    series: Vec<PlotSeries>,
}

impl PlotCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> &[PlotSeries] {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Adds a series for `curve`. Repeated structure names cycle through
    /// markers-only, lines-and-markers, then lines-only, reusing the colour
    /// of the first series with that name.
    pub fn add(&mut self, curve: &DvhCurve) -> String {
        self.set_axes(curve);
        self.series.retain(|s| s.curve != curve.key);

        let mut same_name = 0usize;
        let mut first_color: Option<String> = None;
        for s in &self.series {
            if s.curve.structure.name.eq_ignore_ascii_case(curve.structure_name()) {
                same_name += 1;
                if same_name == 1 {
                    first_color = Some(s.style.color.clone());
                }
            }
        }

        let style = match (same_name % 3, first_color) {
            (1, Some(color)) => PlotStyle {
                color,
                show_lines: false,
                show_markers: true,
            },
            (2, Some(color)) => PlotStyle {
                color,
                show_lines: true,
                show_markers: true,
            },
            _ => PlotStyle {
                color: curve.color_hex.clone(),
                show_lines: true,
                show_markers: false,
            },
        };

        let name = self.unique_name(curve);
        self.series.push(PlotSeries {
            name: name.clone(),
            curve: curve.key.clone(),
            style,
        });
        info!(plot = %name, "plot_series_added");
        name
    }

    fn set_axes(&mut self, curve: &DvhCurve) {
        let kind = curve.kind();
        self.title = kind.title().to_string();
        self.x_axis_label = match (kind, &curve.dose_unit) {
            (HistogramKind::DoseVolume, Some(unit)) => format!("Dose [{}]", unit),
            _ => "Intensity".to_string(),
        };
        self.y_axis_label = "Fractional volume [%]".to_string();
    }

    fn unique_name(&self, curve: &DvhCurve) -> String {
        let base = curve.structure_name().to_string();
        let taken = |n: &str| self.series.iter().any(|s| s.name == n);
        if !taken(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{} ({})", base, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.clone())
    }

    /// Drops every series plotting `key`; returns how many were removed.
    pub fn remove_curve(&mut self, key: &CurveKey) -> usize {
        let before = self.series.len();
        self.series.retain(|s| &s.curve != key);
        before - self.series.len()
    }

    /// Side-by-side raw curves of every series; all must have equal length.
    pub fn curve_table(&self, registry: &DvhRegistry) -> DvhResult<CurveTable> {
        let mut columns = Vec::with_capacity(self.series.len());
        let mut expected: Option<usize> = None;
        for s in &self.series {
            let curve = registry.get(&s.curve).ok_or_else(|| {
                DvhError::InvalidInput(format!("plot '{}' references a removed curve", s.name))
            })?;
            match expected {
                None => expected = Some(curve.points.len()),
                Some(n) if n != curve.points.len() => {
                    return Err(DvhError::InconsistentCurveLength {
                        plot: s.name.clone(),
                        expected: n,
                        found: curve.points.len(),
                    });
                }
                Some(_) => {}
            }
            columns.push((s.name.clone(), curve.points.clone()));
        }
        Ok(CurveTable {
            unit: registry.unit_label(),
            columns,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CurveTable {
    pub unit: String,
    pub columns: Vec<(String, Vec<CurvePoint>)>,
}

impl CurveTable {
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |(_, p)| p.len())
    }
}
