use std::collections::HashMap;
use std::io::{self, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer};

use crate::input::{InputError, open_maybe_gz};
use crate::model::ComparisonConfig;
use crate::model::panel::{Observation, Panel, PanelRecord};
use crate::pipeline::stage1_validate::{PanelError, validate_columns};

const NULL_TOKENS: [&str; 4] = ["", "NA", "NaN", "null"];

/// Validated panel plus the optional unit-constant weight, indexed by `UnitId`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPanel {
    pub panel: Panel,
    pub unit_weights: Option<Vec<f64>>,
}

pub fn load_panel(path: &Path, config: &ComparisonConfig) -> Result<LoadedPanel, InputError> {
    let reader = open_maybe_gz(path)?;
    let loaded = read_panel(reader, config)?;
    tracing::info!(
        path = %path.display(),
        units = loaded.panel.n_units(),
        observations = loaded.panel.len(),
        "loaded panel"
    );
    Ok(loaded)
}

/// Reads a comma-separated panel. Null cohorts and the never-treated code both
/// map to "never treated"; null treatment, outcome or relative time stay null.
pub fn read_panel<R: Read>(reader: R, config: &ComparisonConfig) -> Result<LoadedPanel, InputError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    validate_columns(&header, &config.columns)?;

    let cols = &config.columns;
    let position = |name: &str| header.iter().position(|h| h == name);
    // validate_columns guarantees the required names are present.
    let idx = Indices {
        unit: position(&cols.unit).unwrap_or_default(),
        time: position(&cols.time).unwrap_or_default(),
        cohort: position(&cols.cohort).unwrap_or_default(),
        treatment: position(&cols.treatment).unwrap_or_default(),
        outcome: position(&cols.outcome).unwrap_or_default(),
        relative_time: position(&cols.relative_time).unwrap_or_default(),
    };
    let weight_idx = match &cols.weight {
        Some(name) => Some(
            position(name).ok_or_else(|| PanelError::MissingColumns(vec![name.clone()]))?,
        ),
        None => None,
    };

    let mut records = Vec::new();
    let mut weights: HashMap<String, f64> = HashMap::new();
    for result in rdr.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = Field { row: &row, line, header: &header };

        let unit = field.raw(idx.unit).to_string();
        let cohort = field.int(idx.cohort)?.filter(|&e| e != config.never_treated);
        let record = PanelRecord {
            unit: unit.clone(),
            t: field.required_int(idx.time)?,
            cohort,
            treated: field.boolean(idx.treatment)?,
            y: field.float(idx.outcome)?,
            k: field.int(idx.relative_time)?,
        };
        records.push(record);

        if let Some(wi) = weight_idx {
            let w = field.required_float(wi)?;
            let prev = *weights.entry(unit.clone()).or_insert(w);
            if prev != w {
                return Err(InputError::UnitWeight {
                    unit,
                    column: header[wi].clone(),
                });
            }
        }
    }

    let panel = Panel::from_records(records, config.never_treated)?;
    let unit_weights = weight_idx.map(|_| {
        panel
            .unit_ids()
            .map(|u| weights.get(panel.label(u)).copied().unwrap_or(1.0))
            .collect()
    });

    Ok(LoadedPanel {
        panel,
        unit_weights,
    })
}

/// Writes the panel with the configured column names. Never-treated units
/// get the sentinel cohort code; null values are written as empty fields.
pub fn write_panel<W: io::Write>(w: W, panel: &Panel, config: &ComparisonConfig) -> Result<(), InputError> {
    let rows: Vec<&Observation> = panel.observations().iter().collect();
    write_observations(w, panel, &rows, config)
}

/// Writes one `id,F` row per unit; `groups` is indexed by `UnitId`.
pub fn write_groups<W: io::Write>(w: W, panel: &Panel, groups: &[bool]) -> Result<(), InputError> {
    let mut wtr = Writer::from_writer(w);
    wtr.write_record(["id", "F"])?;
    for (unit, &group) in panel.unit_ids().zip(groups) {
        wtr.write_record([panel.label(unit), if group { "1" } else { "0" }])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a subset of `panel`'s observations in the panel layout.
pub fn write_observations<W: io::Write>(
    w: W,
    panel: &Panel,
    rows: &[&Observation],
    config: &ComparisonConfig,
) -> Result<(), InputError> {
    let mut wtr = Writer::from_writer(w);
    wtr.write_record(config.columns.required())?;
    for o in rows {
        wtr.write_record([
            panel.label(o.unit).to_string(),
            o.t.to_string(),
            panel.cohort_code(o.cohort).to_string(),
            o.treated.map(|d| u8::from(d).to_string()).unwrap_or_default(),
            o.y.map(|y| y.to_string()).unwrap_or_default(),
            o.k.map(|k| k.to_string()).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

struct Indices {
    unit: usize,
    time: usize,
    cohort: usize,
    treatment: usize,
    outcome: usize,
    relative_time: usize,
}

struct Field<'a> {
    row: &'a StringRecord,
    line: u64,
    header: &'a [String],
}

impl Field<'_> {
    fn raw(&self, i: usize) -> &str {
        self.row.get(i).unwrap_or("")
    }

    fn error(&self, i: usize, expected: &'static str) -> InputError {
        InputError::Parse {
            line: self.line,
            column: self.header[i].clone(),
            value: self.raw(i).to_string(),
            expected,
        }
    }

    fn is_null(&self, i: usize) -> bool {
        NULL_TOKENS.contains(&self.raw(i))
    }

    /// Integer, also accepting whole floats such as `3.0`.
    fn int(&self, i: usize) -> Result<Option<i64>, InputError> {
        if self.is_null(i) {
            return Ok(None);
        }
        let s = self.raw(i);
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Some(v));
        }
        match s.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(Some(v as i64)),
            _ => Err(self.error(i, "integer")),
        }
    }

    fn required_int(&self, i: usize) -> Result<i64, InputError> {
        self.int(i)?.ok_or_else(|| self.error(i, "integer"))
    }

    fn float(&self, i: usize) -> Result<Option<f64>, InputError> {
        if self.is_null(i) {
            return Ok(None);
        }
        self.raw(i)
            .parse::<f64>()
            .map(Some)
            .map_err(|_| self.error(i, "number"))
    }

    fn required_float(&self, i: usize) -> Result<f64, InputError> {
        self.float(i)?.ok_or_else(|| self.error(i, "number"))
    }

    fn boolean(&self, i: usize) -> Result<Option<bool>, InputError> {
        if self.is_null(i) {
            return Ok(None);
        }
        match self.raw(i).to_ascii_lowercase().as_str() {
            "1" | "1.0" | "true" => Ok(Some(true)),
            "0" | "0.0" | "false" => Ok(Some(false)),
            _ => Err(self.error(i, "0/1 treatment indicator")),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/panel.rs"]
mod tests;
