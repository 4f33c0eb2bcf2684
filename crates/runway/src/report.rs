//! Report serialization

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use color_eyre::eyre::WrapErr;
use runway_core::analysis::{EnsembleReport, PercentileTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Yaml,
}

impl ReportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

pub fn render(report: &EnsembleReport, format: ReportFormat) -> color_eyre::Result<String> {
    let text = match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
        ReportFormat::Yaml => serde_saphyr::to_string(report)?,
    };
    Ok(text)
}

pub fn write_report(
    path: &Path,
    report: &EnsembleReport,
    format: ReportFormat,
) -> color_eyre::Result<()> {
    let text = render(report, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)
        .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
    tracing::info!(path = %path.display(), ?format, "report written");
    Ok(())
}

/// First rows of a percentile table as aligned text
pub fn preview(title: &str, table: &PercentileTable, rows: usize) -> String {
    let mut out = format!("{title}\n");
    for row in table.head(rows) {
        out.push_str(&format!("{:>5}  {:>14.2}\n", row.percentile, row.value));
    }
    out
}
