use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::panel::Panel;
use crate::pipeline::ComparisonResults;
use crate::pipeline::stage2_comparisons::compare_controls;
use crate::report::csv::{create, write_aggregate, write_controls, write_estimates, write_quantiles};
use crate::report::json::{build_summary, render_summary_json};
use crate::report::text::render_report_text;
use crate::report::{AggLevel, ReportError, aggregate, quantile_desc};

pub const ESTIMATES_FILE: &str = "estimates.csv";
pub const DYNAMIC_FILE: &str = "aggregate_dynamic.csv";
pub const GROUP_FILE: &str = "aggregate_group.csv";
pub const CONTROLS_FILE: &str = "controls.csv";
pub const QUANTILES_FILE: &str = "quantiles_dynamic.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const REPORT_FILE: &str = "report.txt";

/// Writes every comparison table plus `summary.json` and `report.txt` to `out_dir`.
pub fn write_reports(
    panel: &Panel,
    results: &ComparisonResults<'_>,
    out_dir: &Path,
) -> Result<(), ReportError> {
    fs::create_dir_all(out_dir)?;

    write_estimates(
        create(&out_dir.join(ESTIMATES_FILE))?,
        panel,
        &results.comparison,
    )?;

    let dynamic = aggregate(&results.comparison, AggLevel::Dynamic, true);
    write_aggregate(create(&out_dir.join(DYNAMIC_FILE))?, &dynamic)?;

    let group = aggregate(&results.comparison, AggLevel::Group, true);
    write_aggregate(create(&out_dir.join(GROUP_FILE))?, &group)?;

    let counts = compare_controls(&results.comparisons);
    write_controls(create(&out_dir.join(CONTROLS_FILE))?, &counts)?;

    let quantiles = quantile_desc(&results.comparison, AggLevel::Dynamic);
    write_quantiles(create(&out_dir.join(QUANTILES_FILE))?, &quantiles)?;

    let summary = build_summary(panel, results);
    write_text(&out_dir.join(SUMMARY_FILE), &render_summary_json(&summary)?)?;

    let report = render_report_text(&summary, &counts, &dynamic);
    write_text(&out_dir.join(REPORT_FILE), &report)?;

    tracing::info!(out_dir = %out_dir.display(), "reports written");
    Ok(())
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_report.rs"]
mod tests;
