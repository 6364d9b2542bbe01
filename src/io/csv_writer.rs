//! Delimited-text export of metric tables and raw curves.
//!
//! Delimiter and decimal mark are coupled: comma-separated files use a period
//! decimal mark, tab-separated files use a comma decimal mark.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dvh::registry::{CurveTable, DvhRegistry, MetricTable, PlotCollection};
use crate::error::{DvhError, DvhResult};

pub const DECIMALS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvLocale {
    #[default]
    Comma,
    Tab,
}

impl CsvLocale {
    pub fn delimiter(&self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
        }
    }

    pub fn decimal_mark(&self) -> char {
        match self {
            Self::Comma => '.',
            Self::Tab => ',',
        }
    }

    pub fn format(&self, value: f64) -> String {
        let s = format!("{:.*}", DECIMALS, value);
        match self.decimal_mark() {
            '.' => s,
            mark => s.replacen('.', &mark.to_string(), 1),
        }
    }

    /// Inverse of [`CsvLocale::format`].
    pub fn parse(&self, cell: &str) -> Option<f64> {
        cell.trim().replacen(self.decimal_mark(), ".", 1).parse().ok()
    }
}

/// Wraps a text cell in double quotes when it holds the delimiter, a quote or
/// a line break; embedded quotes are doubled.
pub fn quote_cell(cell: &str, locale: CsvLocale) -> String {
    let needs_quotes = cell.contains(locale.delimiter())
        || cell.contains('"')
        || cell.contains('\n')
        || cell.contains('\r');
    if needs_quotes {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn join_row<W: Write>(w: &mut W, cells: &[String], locale: CsvLocale) -> std::io::Result<()> {
    let delim = locale.delimiter().to_string();
    writeln!(w, "{}", cells.join(&delim))
}

pub fn write_metric_table<W: Write>(
    w: &mut W,
    table: &MetricTable,
    locale: CsvLocale,
) -> std::io::Result<()> {
    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push("Structure".to_string());
    header.extend(table.columns.iter().map(|c| quote_cell(c, locale)));
    join_row(w, &header, locale)?;

    for row in &table.rows {
        let mut cells = Vec::with_capacity(header.len());
        cells.push(quote_cell(&row.structure, locale));
        cells.extend(row.record.values().map(|v| locale.format(v)));
        join_row(w, &cells, locale)?;
    }
    Ok(())
}

pub fn write_curve_table<W: Write>(
    w: &mut W,
    table: &CurveTable,
    locale: CsvLocale,
) -> std::io::Result<()> {
    let mut header = Vec::with_capacity(table.columns.len() * 2);
    for (name, _) in &table.columns {
        header.push(quote_cell(&format!("{} Dose ({})", name, table.unit), locale));
        header.push(quote_cell(&format!("{} Value (%)", name), locale));
    }
    join_row(w, &header, locale)?;

    for row in 0..table.row_count() {
        let mut cells = Vec::with_capacity(header.len());
        for (_, points) in &table.columns {
            let p = points[row];
            cells.push(locale.format(p.dose));
            cells.push(locale.format(p.percent));
        }
        join_row(w, &cells, locale)?;
    }
    Ok(())
}

fn create(path: &Path) -> DvhResult<BufWriter<File>> {
    let file = File::create(path).map_err(|e| DvhError::io(path, e))?;
    Ok(BufWriter::new(file))
}

pub fn export_metrics_csv(path: &Path, table: &MetricTable, locale: CsvLocale) -> DvhResult<()> {
    let mut w = create(path)?;
    write_metric_table(&mut w, table, locale).map_err(|e| DvhError::io(path, e))?;
    w.flush().map_err(|e| DvhError::io(path, e))?;
    info!(
        path = %path.display(),
        rows = table.rows.len(),
        skipped = table.skipped.len(),
        "metrics_csv_written"
    );
    Ok(())
}

/// Validates curve lengths before the sink is opened, so a mismatch leaves no file.
pub fn export_curves_csv(
    path: &Path,
    plots: &PlotCollection,
    registry: &DvhRegistry,
    locale: CsvLocale,
) -> DvhResult<()> {
    let table = plots.curve_table(registry)?;
    let mut w = create(path)?;
    write_curve_table(&mut w, &table, locale).map_err(|e| DvhError::io(path, e))?;
    w.flush().map_err(|e| DvhError::io(path, e))?;
    info!(
        path = %path.display(),
        series = table.columns.len(),
        rows = table.row_count(),
        "curves_csv_written"
    );
    Ok(())
}
