use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::model::panel::Panel;
use crate::pipeline::stage2_comparisons::ControlCount;
use crate::report::bootstrap::BootstrapSummary;
use crate::report::json::Summary;
use crate::report::{AggregateRow, Describe, format_f64_6};

/// Control-group sizes per cell: SGDD units | SWDD units and observations | gains.
pub fn overview(counts: &[ControlCount]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6} {:>4} | {:>10} | {:>10} {:>10} | {:>11} {:>10}",
        "E", "h", "SGDD units", "SWDD units", "SWDD obs", "extra units", "extra obs"
    );
    let _ = writeln!(out, "{}", "-".repeat(75));
    for c in counts {
        let _ = writeln!(
            out,
            "{:>6} {:>4} | {:>10} | {:>10} {:>10} | {:>11} {:>10}",
            c.cohort,
            c.horizon,
            opt(c.sgdd_units),
            opt(c.swdd_units),
            opt(c.swdd_obs),
            opt(c.extra_units()),
            opt(c.extra_obs()),
        );
    }
    out
}

/// Number of observed units per cohort and period. The never-treated group
/// is listed under its sentinel code.
pub fn overview_time(panel: &Panel) -> String {
    let mut counts: BTreeMap<i64, BTreeMap<i64, usize>> = BTreeMap::new();
    let mut periods: BTreeSet<i64> = BTreeSet::new();
    for o in panel.observations() {
        *counts
            .entry(panel.cohort_code(o.cohort))
            .or_default()
            .entry(o.t)
            .or_insert(0) += 1;
        periods.insert(o.t);
    }

    let mut out = String::new();
    let _ = write!(out, "{:>6}", "E\\t");
    for t in &periods {
        let _ = write!(out, " {:>6}", t);
    }
    out.push('\n');
    for (cohort, by_t) in &counts {
        let _ = write!(out, "{:>6}", cohort);
        for t in &periods {
            let _ = write!(out, " {:>6}", by_t.get(t).copied().unwrap_or(0));
        }
        out.push('\n');
    }
    out
}

pub fn render_aggregate(rows: &[AggregateRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6} {:>4} {:>12} {:>12} {:>6}",
        "E", "h", "SWDD", "SGDD", "n"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{:>6} {:>4} {:>12} {:>12} {:>6}",
            opt(r.cohort),
            opt(r.horizon),
            format_f64_6(r.swdd),
            format_f64_6(r.sgdd),
            opt(r.n),
        );
    }
    out
}

pub fn render_describe(label: &str, d: Option<&Describe>) -> String {
    let Some(d) = d else {
        return format!("{label}: no values\n");
    };
    let mut out = String::new();
    let _ = writeln!(out, "{label}");
    let _ = writeln!(out, "  count {}", d.count);
    let _ = writeln!(out, "  mean  {}", format_f64_6(d.mean));
    let _ = writeln!(out, "  std   {}", format_f64_6(d.std));
    let _ = writeln!(out, "  min   {}", format_f64_6(d.min));
    for (p, v) in &d.percentiles {
        let _ = writeln!(out, "  {:<5} {}", format!("{}%", p * 100.0), format_f64_6(*v));
    }
    let _ = writeln!(out, "  max   {}", format_f64_6(d.max));
    out
}

pub fn render_bootstrap(summary: &[BootstrapSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6} {:>4} {:>5} {:>12} {:>12} {:>12} {:>12}",
        "E", "h", "B", "SWDD mean", "SWDD sd", "SGDD mean", "SGDD sd"
    );
    for s in summary {
        let _ = writeln!(
            out,
            "{:>6} {:>4} {:>5} {:>12} {:>12} {:>12} {:>12}",
            opt(s.cohort),
            opt(s.horizon),
            s.replicates,
            format_f64_6(s.swdd_mean),
            format_f64_6(s.swdd_std),
            format_f64_6(s.sgdd_mean),
            format_f64_6(s.sgdd_std),
        );
    }
    out
}

pub fn render_report_text(summary: &Summary, counts: &[ControlCount], dynamic: &[AggregateRow]) -> String {
    let mut out = String::new();

    out.push_str("Stepwise vs Sequential DiD Comparison Report\n");
    out.push_str("============================================\n\n");

    out.push_str("1. Panel\n");
    let _ = writeln!(out, "Units: {}", summary.input.n_units);
    let _ = writeln!(out, "Observations: {}", summary.input.n_obs);
    let _ = writeln!(out, "Cohorts: {}", join(&summary.input.cohorts));
    let _ = writeln!(out, "Never-treated code: {}", summary.input.never_treated);
    let _ = writeln!(out, "Max horizon: {}\n", summary.input.max_horizon);

    out.push_str("2. Control groups\n");
    out.push_str(&overview(counts));
    out.push('\n');

    out.push_str("3. Dynamic effects\n");
    out.push_str(&render_aggregate(dynamic));
    out.push('\n');

    out.push_str("4. Estimates\n");
    let _ = writeln!(out, "Pairs: {}", summary.estimates.n_pairs);
    let _ = writeln!(out, "SWDD mean: {}", format_f64_6(summary.estimates.swdd_mean));
    let _ = writeln!(out, "SGDD mean: {}", format_f64_6(summary.estimates.sgdd_mean));
    let _ = writeln!(
        out,
        "Max |SWDD - SGDD|: {}",
        format_f64_6(summary.estimates.max_abs_diff)
    );

    out
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn join(values: &[i64]) -> String {
    values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/text.rs"]
mod tests;
