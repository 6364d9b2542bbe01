use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::dvh::{DEFAULT_BIN_COUNT, OriginAnchor};
use crate::dvh::metrics::{self, MetricQuery};
use crate::error::DvhResult;
use crate::io::csv_writer::CsvLocale;
use crate::stencil::DoseThreshold;

#[derive(Debug, Parser)]
#[command(name = "kira-dvh", version, about = "Dose volume histograms for structure sets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute curves and metrics, write the tables.
    Run(RunArgs),
    /// Load the plan and resolve every structure transform.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, help = "Plan JSON with dose grid, transforms and structure set")]
    pub plan: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, default_value_t = DEFAULT_BIN_COUNT)]
    pub bins: usize,

    #[arg(long, default_value = "", help = "Doses for V metrics in cc, e.g. \"5,10,20\"")]
    pub v_cc: String,

    #[arg(long, default_value = "", help = "Doses for V metrics in percent")]
    pub v_percent: String,

    #[arg(long, default_value = "", help = "Volumes (cc) for D metrics")]
    pub d_cc: String,

    #[arg(long, default_value = "", help = "Volumes (percent) for D metrics")]
    pub d_percent: String,

    #[arg(long, value_enum, default_value_t = DelimiterArg::Comma)]
    pub delimiter: DelimiterArg,

    #[arg(long, default_value_t = false, help = "Also write the raw curve table")]
    pub curves: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long, value_enum, default_value_t = AnchorArg::Auto)]
    pub anchor: AnchorArg,

    #[arg(long, value_enum, default_value_t = ThresholdArg::HalfScale)]
    pub threshold: ThresholdArg,
}

impl RunArgs {
    /// Metric queries in column order: V cc, V %, D cc, D %.
    pub fn queries(&self) -> DvhResult<Vec<MetricQuery>> {
        let mut out = Vec::new();
        out.extend(
            metrics::parse_value_list(&self.v_cc)?
                .into_iter()
                .map(MetricQuery::VolumeCc),
        );
        out.extend(
            metrics::parse_value_list(&self.v_percent)?
                .into_iter()
                .map(MetricQuery::VolumePercent),
        );
        out.extend(
            metrics::parse_value_list(&self.d_cc)?
                .into_iter()
                .map(MetricQuery::DoseForVolumeCc),
        );
        out.extend(
            metrics::parse_value_list(&self.d_percent)?
                .into_iter()
                .map(MetricQuery::DoseForVolumePercent),
        );
        Ok(out)
    }
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long)]
    pub plan: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DelimiterArg {
    Comma,
    Tab,
}

impl From<DelimiterArg> for CsvLocale {
    fn from(value: DelimiterArg) -> Self {
        match value {
            DelimiterArg::Comma => CsvLocale::Comma,
            DelimiterArg::Tab => CsvLocale::Tab,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnchorArg {
    Auto,
    Never,
}

impl From<AnchorArg> for OriginAnchor {
    fn from(value: AnchorArg) -> Self {
        match value {
            AnchorArg::Auto => OriginAnchor::Auto,
            AnchorArg::Never => OriginAnchor::Never,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThresholdArg {
    HalfScale,
    Off,
}

impl From<ThresholdArg> for DoseThreshold {
    fn from(value: ThresholdArg) -> Self {
        match value {
            ThresholdArg::HalfScale => DoseThreshold::HalfScale,
            ThresholdArg::Off => DoseThreshold::Disabled,
        }
    }
}
