use approx::assert_relative_eq;

use super::*;
use crate::model::panel::UnitId;

fn est(unit: u32, cohort: i64, horizon: i64, swdd: f64, sgdd: f64) -> ComparisonEstimate {
    ComparisonEstimate {
        unit: UnitId(unit),
        cohort,
        horizon,
        swdd,
        sgdd,
        control_swdd: 0.0,
        control_sgdd: 0.0,
    }
}

fn rows() -> Vec<ComparisonEstimate> {
    vec![
        est(0, 2, 0, 1.0, 2.0),
        est(0, 2, 1, 3.0, 4.0),
        est(1, 3, 0, 5.0, 6.0),
        est(2, 3, 0, 7.0, 8.0),
    ]
}

#[test]
fn test_agg_level_parse() {
    assert_eq!("dynamic".parse::<AggLevel>(), Ok(AggLevel::Dynamic));
    assert_eq!("Group".parse::<AggLevel>(), Ok(AggLevel::Group));
    assert_eq!("total".parse::<AggLevel>(), Ok(AggLevel::Total));
    assert!("weekly".parse::<AggLevel>().is_err());
    assert_eq!(AggLevel::Group.to_string(), "group");
}

#[test]
fn test_aggregate_dynamic() {
    let agg = aggregate(&rows(), AggLevel::Dynamic, true);
    assert_eq!(agg.len(), 2);
    assert_eq!(agg[0].horizon, Some(0));
    assert_eq!(agg[0].cohort, None);
    assert_relative_eq!(agg[0].swdd, 13.0 / 3.0);
    assert_relative_eq!(agg[0].sgdd, 16.0 / 3.0);
    assert_eq!(agg[0].n, Some(3));
    assert_eq!(agg[1].n, Some(1));
}

#[test]
fn test_aggregate_group_and_total() {
    let group = aggregate(&rows(), AggLevel::Group, false);
    let keys: Vec<_> = group.iter().map(|r| (r.cohort, r.horizon)).collect();
    assert_eq!(keys, vec![(Some(2), Some(0)), (Some(2), Some(1)), (Some(3), Some(0))]);
    assert!(group.iter().all(|r| r.n.is_none()));
    assert_relative_eq!(group[2].swdd, 6.0);

    let total = aggregate(&rows(), AggLevel::Total, true);
    assert_eq!(total.len(), 1);
    assert_relative_eq!(total[0].swdd, 4.0);
    assert_relative_eq!(total[0].sgdd, 5.0);
    assert_eq!(total[0].n, Some(4));
}

#[test]
fn test_comparison_arrays_ordered_by_horizon() {
    let mut agg = aggregate(&rows(), AggLevel::Dynamic, false);
    agg.reverse();
    let (swdd, sgdd) = comparison_arrays(&agg);
    assert_eq!(swdd.len(), 2);
    assert_relative_eq!(swdd[1], 3.0);
    assert_relative_eq!(sgdd[1], 4.0);
    assert_relative_eq!(sgdd[0], 16.0 / 3.0);
}

#[test]
fn test_describe() {
    let d = describe(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
    assert_eq!(d.count, 5);
    assert_relative_eq!(d.mean, 3.0);
    assert_relative_eq!(d.std, 2.5f64.sqrt());
    assert_relative_eq!(d.min, 1.0);
    assert_relative_eq!(d.max, 5.0);
    assert_eq!(d.percentiles.len(), PERCENTILES.len());
    let median = d.percentiles.iter().find(|(p, _)| *p == 0.5).unwrap().1;
    assert_relative_eq!(median, 3.0);
    assert!(describe(&[]).is_none());
}

#[test]
fn test_describe_estimates_order() {
    let out = describe_estimates(&rows());
    assert_eq!(out[0].0, Estimator::Sgdd);
    assert_relative_eq!(out[0].1.as_ref().unwrap().mean, 5.0);
    assert_relative_eq!(out[1].1.as_ref().unwrap().mean, 4.0);
}

#[test]
fn test_quantile_desc_per_group() {
    let q = quantile_desc(&rows(), AggLevel::Dynamic);
    assert_eq!(q.len(), 4);
    assert_eq!(q[0].horizon, Some(0));
    assert_eq!(q[0].estimator, Estimator::Sgdd);
    assert_eq!(q[1].estimator, Estimator::Swdd);
    let p99 = q[1].quantiles.last().unwrap();
    assert_relative_eq!(p99.1, 7.0);
    let p1 = q[1].quantiles.first().unwrap();
    assert_relative_eq!(p1.1, 1.0);
}

#[test]
fn test_quantile_sorted_edges() {
    let v = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_relative_eq!(quantile_sorted(&v, 0.0), 1.0);
    assert_relative_eq!(quantile_sorted(&v, 0.5), 3.0);
    assert_relative_eq!(quantile_sorted(&v, 0.9), 5.0);
    assert!(quantile_sorted(&[], 0.5).is_nan());
    assert!(std_dev(&[1.0]).is_nan());
    assert_eq!(format_f64_6(f64::NAN), "-");
    assert_eq!(format_f64_6(0.5), "0.500000");
}
