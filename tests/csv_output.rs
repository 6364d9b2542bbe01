use kira_dvh::dvh::metrics::MetricQuery;
use kira_dvh::dvh::registry::{DvhRegistry, PlotCollection};
use kira_dvh::dvh::{CurveKey, CurvePoint, DvhCurve};
use kira_dvh::error::DvhError;
use kira_dvh::io::csv_writer::{
    CsvLocale, export_curves_csv, export_metrics_csv, quote_cell, write_curve_table,
    write_metric_table,
};
use kira_dvh::model::StructureKey;
use tempfile::TempDir;

fn curve(name: &str, index: usize, points: &[(f64, f64)]) -> DvhCurve {
    DvhCurve {
        key: CurveKey {
            structure: StructureKey {
                name: name.to_string(),
                index,
            },
            dose_id: "dose".to_string(),
        },
        color_hex: "#FF0000".to_string(),
        dose_unit: Some("Gy".to_string()),
        voxel_count: 1000,
        total_volume_cc: 1.0,
        mean_dose: 5.0,
        min_dose: 0.0,
        max_dose: 10.0,
        points: points
            .iter()
            .map(|&(dose, percent)| CurvePoint { dose, percent })
            .collect(),
        anchored: true,
        warnings: Vec::new(),
    }
}

fn session(curves: Vec<DvhCurve>) -> (DvhRegistry, PlotCollection) {
    let mut registry = DvhRegistry::new();
    let mut plots = PlotCollection::new();
    for c in curves {
        plots.add(&c);
        registry.add(c);
    }
    (registry, plots)
}

/// Splits one delimited line, honouring double-quoted cells.
fn split_quoted(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => cells.push(std::mem::take(&mut cell)),
            c => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

#[test]
fn locale_couples_delimiter_and_decimal_mark() {
    assert_eq!(CsvLocale::Comma.format(1.5), "1.500000");
    assert_eq!(CsvLocale::Tab.format(1.5), "1,500000");
    assert_eq!(CsvLocale::Tab.format(-0.25), "-0,250000");
    assert_eq!(CsvLocale::Tab.parse("1,500000"), Some(1.5));
    assert_eq!(CsvLocale::Comma.parse("2.000000"), Some(2.0));
}

#[test]
fn metric_table_comma_layout() {
    let (registry, _) = session(vec![curve("PTV", 0, &[(0.0, 100.0), (10.0, 0.0)])]);
    let table = registry.metric_table(&[MetricQuery::VolumeCc(5.0)]);
    let mut buf = Vec::new();
    write_metric_table(&mut buf, &table, CsvLocale::Comma).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "Structure,Volume (cc),Mean dose (Gy),Min dose (Gy),Max dose (Gy),V5 (cc)"
    );
    assert_eq!(lines[1], "PTV,1.000000,5.000000,0.000000,10.000000,0.500000");
    assert_eq!(lines.len(), 2);
}

#[test]
fn metric_table_tab_layout_round_trips() {
    let (registry, _) = session(vec![curve("PTV", 0, &[(0.0, 100.0), (10.0, 0.0)])]);
    let table = registry.metric_table(&[MetricQuery::VolumePercent(2.5)]);
    let mut buf = Vec::new();
    write_metric_table(&mut buf, &table, CsvLocale::Tab).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let row: Vec<&str> = text.lines().nth(1).unwrap().split('\t').collect();
    assert_eq!(row[0], "PTV");
    assert_eq!(row[5], "75,000000");
    let parsed: Vec<f64> = row[1..]
        .iter()
        .map(|c| CsvLocale::Tab.parse(c).unwrap())
        .collect();
    assert_eq!(parsed, vec![1.0, 5.0, 0.0, 10.0, 75.0]);
}

#[test]
fn curve_table_layout() {
    let (registry, plots) = session(vec![
        curve("PTV", 0, &[(0.0, 100.0), (1.0, 50.0)]),
        curve("PTV", 1, &[(0.0, 100.0), (2.0, 25.0)]),
    ]);
    let table = plots.curve_table(&registry).unwrap();
    let mut buf = Vec::new();
    write_curve_table(&mut buf, &table, CsvLocale::Comma).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "PTV Dose (Gy),PTV Value (%),PTV (2) Dose (Gy),PTV (2) Value (%)"
    );
    assert_eq!(lines[2], "1.000000,50.000000,2.000000,25.000000");
}

#[test]
fn inconsistent_curves_write_nothing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("curves.csv");
    let (registry, plots) = session(vec![
        curve("PTV", 0, &[(0.0, 100.0), (1.0, 50.0)]),
        curve("Cord", 1, &[(0.0, 100.0)]),
    ]);
    let err = export_curves_csv(&path, &plots, &registry, CsvLocale::Comma).unwrap_err();
    assert!(matches!(err, DvhError::InconsistentCurveLength { .. }));
    assert!(!path.exists());
}

#[test]
fn unwritable_destination_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing").join("metrics.csv");
    let (registry, _) = session(vec![curve("PTV", 0, &[(0.0, 100.0), (10.0, 0.0)])]);
    let table = registry.metric_table(&[]);
    let err = export_metrics_csv(&path, &table, CsvLocale::Comma).unwrap_err();
    assert!(matches!(err, DvhError::Io { .. }));
}

#[test]
fn metrics_file_written() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("metrics.tsv");
    let (registry, _) = session(vec![curve("PTV", 0, &[(0.0, 100.0), (10.0, 0.0)])]);
    let table = registry.metric_table(&[]);
    export_metrics_csv(&path, &table, CsvLocale::Tab).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Structure\tVolume (cc)\t"));
    assert!(text.contains("PTV\t1,000000\t5,000000"));
}

#[test]
fn delimiter_in_structure_name_is_quoted() {
    let (registry, plots) = session(vec![curve("PTV, boost", 0, &[(0.0, 100.0), (10.0, 0.0)])]);
    let table = registry.metric_table(&[MetricQuery::VolumeCc(5.0)]);
    let mut buf = Vec::new();
    write_metric_table(&mut buf, &table, CsvLocale::Comma).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    let header = split_quoted(lines.next().unwrap(), ',');
    let row = split_quoted(lines.next().unwrap(), ',');
    assert_eq!(header.len(), 6);
    assert_eq!(row.len(), header.len());
    assert_eq!(row[0], "PTV, boost");

    let table = plots.curve_table(&registry).unwrap();
    let mut buf = Vec::new();
    write_curve_table(&mut buf, &table, CsvLocale::Comma).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let header = split_quoted(text.lines().next().unwrap(), ',');
    assert_eq!(header.len(), 2);
    assert!(header[0].starts_with("PTV, boost Dose"));
}

#[test]
fn quote_cell_escapes_quotes_and_tabs() {
    assert_eq!(quote_cell("PTV", CsvLocale::Tab), "PTV");
    assert_eq!(quote_cell("PTV, boost", CsvLocale::Tab), "PTV, boost");
    assert_eq!(quote_cell("PTV\tboost", CsvLocale::Tab), "\"PTV\tboost\"");
    assert_eq!(quote_cell("say \"hi\"", CsvLocale::Comma), "\"say \"\"hi\"\"\"");
}
