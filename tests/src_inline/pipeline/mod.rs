use approx::assert_relative_eq;

use super::*;
use crate::report::{AggLevel, aggregate};
use crate::testing::{harmon_panel, sim_panel};

#[test]
fn test_full_comparison_harmon() {
    let panel = harmon_panel();
    let results = full_comparison(&panel, 7);
    assert_eq!(results.comparison.len(), 11);
    assert_eq!(results.estimates.swdd.len(), 11);
    assert_eq!(results.outcomes.g_swdd.len(), 11);
    assert_eq!(results.comparisons.max_horizon, 7);
}

#[test]
fn test_rerun_is_identical() {
    let panel = sim_panel(42, 150);
    let first = full_comparison(&panel, 7);
    let second = full_comparison(&panel, 7);

    assert_eq!(first.comparisons.rows, second.comparisons.rows);
    assert_eq!(first.comparisons.sgdd, second.comparisons.sgdd);
    assert_eq!(first.comparisons.swdd, second.comparisons.swdd);
    assert_eq!(first.outcomes, second.outcomes);
    assert_eq!(first.estimates, second.estimates);
    let bits = |r: &[stage4_estimates::ComparisonEstimate]| -> Vec<(u64, u64)> {
        r.iter().map(|e| (e.swdd.to_bits(), e.sgdd.to_bits())).collect()
    };
    assert_eq!(bits(&first.comparison), bits(&second.comparison));
}

#[test]
fn test_single_adoption_date_estimators_agree() {
    let panel = sim_panel(8, 200);
    let single: Vec<_> = panel
        .to_records()
        .into_iter()
        .filter(|r| r.cohort.is_none() || r.cohort == Some(2))
        .collect();
    let panel = Panel::from_records(single, 0).unwrap();

    let rows = compare_estimators(&panel, 7);
    assert!(!rows.is_empty());
    for agg in aggregate(&rows, AggLevel::Dynamic, true) {
        assert_relative_eq!(agg.swdd, agg.sgdd, max_relative = 1e-9);
    }
}

#[test]
fn test_staggered_estimators_differ_but_recover_effect() {
    let panel = sim_panel(99, 250);
    let rows = compare_estimators(&panel, 7);
    let dynamic = aggregate(&rows, AggLevel::Dynamic, true);
    assert_eq!(dynamic.len(), 5);
    // gamma = 1 + h; noise averages out over a few hundred units.
    for agg in &dynamic {
        let h = agg.horizon.unwrap() as f64;
        assert!((agg.sgdd - (1.0 + h)).abs() < 1.5, "sgdd h={h}: {}", agg.sgdd);
        assert!((agg.swdd - (1.0 + h)).abs() < 1.5, "swdd h={h}: {}", agg.swdd);
    }
}
