use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use ::csv::Writer;
use serde::Serialize;

use crate::model::frame::EstimationFrame;
use crate::model::panel::Panel;
use crate::pipeline::stage2_comparisons::ControlCount;
use crate::pipeline::stage4_estimates::ComparisonEstimate;
use crate::report::bootstrap::{BootstrapRow, BootstrapSummary};
use crate::report::{AggregateRow, QuantileRow, ReportError};

#[derive(Serialize)]
struct EstimateRecord<'a> {
    id: &'a str,
    #[serde(rename = "E")]
    cohort: i64,
    h: i64,
    swdd: f64,
    sgdd: f64,
    y_c_swdd: f64,
    y_c_sgdd: f64,
}

#[derive(Serialize)]
struct AggregateRecord {
    #[serde(rename = "E")]
    cohort: Option<i64>,
    h: Option<i64>,
    swdd: f64,
    sgdd: f64,
    n: Option<usize>,
}

#[derive(Serialize)]
struct ControlRecord {
    #[serde(rename = "E")]
    cohort: i64,
    h: i64,
    sgdd_units: Option<usize>,
    swdd_units: Option<usize>,
    swdd_obs: Option<usize>,
    extra_units: Option<i64>,
    extra_obs: Option<i64>,
}

#[derive(Serialize)]
struct BootstrapRecord {
    replicate: usize,
    #[serde(rename = "E")]
    cohort: Option<i64>,
    h: Option<i64>,
    swdd: f64,
    sgdd: f64,
}

#[derive(Serialize)]
struct BootstrapSummaryRecord {
    #[serde(rename = "E")]
    cohort: Option<i64>,
    h: Option<i64>,
    replicates: usize,
    swdd_mean: f64,
    swdd_std: f64,
    sgdd_mean: f64,
    sgdd_std: f64,
}

pub fn write_estimates<W: io::Write>(
    w: W,
    panel: &Panel,
    rows: &[ComparisonEstimate],
) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(w);
    for r in rows {
        wtr.serialize(EstimateRecord {
            id: panel.label(r.unit),
            cohort: r.cohort,
            h: r.horizon,
            swdd: r.swdd,
            sgdd: r.sgdd,
            y_c_swdd: r.control_swdd,
            y_c_sgdd: r.control_sgdd,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_aggregate<W: io::Write>(w: W, rows: &[AggregateRow]) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(w);
    for r in rows {
        wtr.serialize(AggregateRecord {
            cohort: r.cohort,
            h: r.horizon,
            swdd: r.swdd,
            sgdd: r.sgdd,
            n: r.n,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_controls<W: io::Write>(w: W, rows: &[ControlCount]) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(w);
    for c in rows {
        wtr.serialize(ControlRecord {
            cohort: c.cohort,
            h: c.horizon,
            sgdd_units: c.sgdd_units,
            swdd_units: c.swdd_units,
            swdd_obs: c.swdd_obs,
            extra_units: c.extra_units(),
            extra_obs: c.extra_obs(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_bootstrap<W: io::Write>(w: W, rows: &[BootstrapRow]) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(w);
    for r in rows {
        wtr.serialize(BootstrapRecord {
            replicate: r.replicate,
            cohort: r.cohort,
            h: r.horizon,
            swdd: r.swdd,
            sgdd: r.sgdd,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_bootstrap_summary<W: io::Write>(
    w: W,
    rows: &[BootstrapSummary],
) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(w);
    for s in rows {
        wtr.serialize(BootstrapSummaryRecord {
            cohort: s.cohort,
            h: s.horizon,
            replicates: s.replicates,
            swdd_mean: s.swdd_mean,
            swdd_std: s.swdd_std,
            sgdd_mean: s.sgdd_mean,
            sgdd_std: s.sgdd_std,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per (group, estimator); percentile columns named `p<percent>`.
pub fn write_quantiles<W: io::Write>(w: W, rows: &[QuantileRow]) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(w);
    let Some(first) = rows.first() else {
        wtr.flush()?;
        return Ok(());
    };

    let mut header = vec!["E".to_string(), "h".to_string(), "estimator".to_string()];
    header.extend(first.quantiles.iter().map(|(p, _)| format!("p{}", p * 100.0)));
    wtr.write_record(&header)?;

    for r in rows {
        let mut record = vec![
            r.cohort.map(|c| c.to_string()).unwrap_or_default(),
            r.horizon.map(|h| h.to_string()).unwrap_or_default(),
            r.estimator.to_string(),
        ];
        record.extend(r.quantiles.iter().map(|(_, v)| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Estimation frame with its weight columns appended after the fixed fields.
pub fn write_frame<W: io::Write>(w: W, frame: &EstimationFrame) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(w);
    let mut header: Vec<String> = ["id", "t", "E", "K", "maxK", "D", "iwtr", "dY"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(frame.column_names());
    wtr.write_record(&header)?;

    let opt = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();
    for (i, r) in frame.rows().iter().enumerate() {
        let mut record = vec![
            frame.label(r.unit).to_string(),
            r.t.to_string(),
            opt(r.cohort),
            opt(r.k),
            opt(r.max_k),
            u8::from(r.treated).to_string(),
            r.iwtr.to_string(),
            r.dy.to_string(),
        ];
        record.extend(frame.columns().iter().map(|c| c.values[i].to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn create(path: &Path) -> Result<BufWriter<File>, ReportError> {
    Ok(BufWriter::new(File::create(path)?))
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/csv.rs"]
mod tests;
