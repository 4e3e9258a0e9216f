use crate::model::panel::UnitId;

/// One first-differenced observation ready for a weighted fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimationRow {
    pub unit: UnitId,
    pub t: i64,
    pub cohort: Option<i64>,
    pub k: Option<i64>,
    /// Largest relative time observed for the unit; `None` for never-treated units.
    pub max_k: Option<i64>,
    pub treated: bool,
    /// Unit-constant weight.
    pub iwtr: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Estimation rows plus the weight columns derived from them. Every stage
/// that adds a column consumes the frame and returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationFrame {
    labels: Vec<String>,
    rows: Vec<EstimationRow>,
    columns: Vec<WeightColumn>,
}

impl EstimationFrame {
    pub fn new(labels: Vec<String>, rows: Vec<EstimationRow>) -> Self {
        Self {
            labels,
            rows,
            columns: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[EstimationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn label(&self, unit: UnitId) -> &str {
        self.labels
            .get(unit.index())
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn columns(&self) -> &[WeightColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&WeightColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn max_k(&self) -> Option<i64> {
        self.rows.iter().filter_map(|r| r.k).max()
    }

    /// Adds `column`, replacing an existing column of the same name in place.
    pub fn with_column(mut self, column: WeightColumn) -> Self {
        debug_assert_eq!(column.values.len(), self.rows.len());
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self
    }
}
