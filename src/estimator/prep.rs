use crate::model::frame::{EstimationFrame, EstimationRow};
use crate::model::panel::Panel;

/// First-differences the panel for estimation.
///
/// `dY` is only defined between adjacent periods of the same unit with both
/// outcomes present, so each unit's first row, any row after a gap and any
/// row touching a null outcome is dropped. `maxK` is taken
/// over all of the unit's rows before dropping. `unit_weights`, when given,
/// is indexed by `UnitId`; otherwise every unit weighs 1.
pub fn prepare(panel: &Panel, unit_weights: Option<&[f64]>) -> EstimationFrame {
    let mut rows = Vec::with_capacity(panel.len());
    for unit in panel.unit_ids() {
        let obs = panel.unit_rows(unit);
        let max_k = obs.iter().filter_map(|o| o.k).max();
        let iwtr = unit_weights
            .and_then(|w| w.get(unit.index()).copied())
            .unwrap_or(1.0);

        for pair in obs.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            if cur.t - prev.t != 1 {
                continue;
            }
            let (Some(y), Some(y_prev)) = (cur.y, prev.y) else {
                continue;
            };
            rows.push(EstimationRow {
                unit,
                t: cur.t,
                cohort: cur.cohort,
                k: cur.k,
                max_k,
                treated: cur.k.is_some_and(|k| k >= 0),
                iwtr,
                dy: y - y_prev,
            });
        }
    }

    tracing::debug!(
        rows = rows.len(),
        dropped = panel.len() - rows.len(),
        "prepared estimation frame"
    );
    EstimationFrame::new(panel.labels.clone(), rows)
}

#[cfg(test)]
#[path = "../../tests/src_inline/estimator/prep.rs"]
mod tests;
