use approx::assert_relative_eq;

use super::*;
use crate::pipeline::compare_estimators;
use crate::report::{AggLevel, aggregate, mean};
use crate::testing::{FailingFit, TimeFeImputation, harmon_panel, sim_panel};

fn raw(panel: &Panel) -> EstimationData<'_> {
    EstimationData::Raw {
        panel,
        unit_weights: None,
    }
}

#[test]
fn test_event_study_on_harmon() {
    let panel = harmon_panel();
    let result = estimate(raw(&panel), &EstimateOptions::default(), &TimeFeImputation).unwrap();

    let terms: Vec<&str> = result.estimates.iter().map(|e| e.term.as_str()).collect();
    assert_eq!(terms, vec!["0", "1", "2", "3", "4", "5", "average"]);
    for h in 0..=4 {
        assert_relative_eq!(result.term(&h.to_string()).unwrap().estimate, 2.0, epsilon = 1e-12);
    }
    // Only A is observed five periods after adoption.
    assert_relative_eq!(result.term("5").unwrap().estimate, 1.0, epsilon = 1e-12);
    assert_relative_eq!(result.term("average").unwrap().estimate, 21.0 / 11.0, epsilon = 1e-12);
    assert_eq!(result.n_obs, 24);
    assert_eq!(result.names[0], "horizon0");
}

#[test]
fn test_event_study_matches_stepwise_comparison() {
    let panel = sim_panel(21, 200);
    let result = estimate(raw(&panel), &EstimateOptions::default(), &TimeFeImputation).unwrap();

    let rows = compare_estimators(&panel, 7);
    let dynamic = aggregate(&rows, AggLevel::Dynamic, false);
    assert_eq!(dynamic.len(), 5);
    for agg in &dynamic {
        let h = agg.horizon.unwrap();
        let term = result.term(&h.to_string()).unwrap();
        assert_relative_eq!(term.estimate, agg.swdd, epsilon = 1e-9);
    }

    let swdd: Vec<f64> = rows.iter().map(|r| r.swdd).collect();
    assert_relative_eq!(result.term("average").unwrap().estimate, mean(&swdd), epsilon = 1e-9);
}

#[test]
fn test_selections() {
    let panel = harmon_panel();

    let options = EstimateOptions {
        horizons: Some(HorizonSelection::Static),
        ..EstimateOptions::default()
    };
    let result = estimate(raw(&panel), &options, &TimeFeImputation).unwrap();
    assert_eq!(result.names, vec![AVERAGE_COLUMN.to_string()]);

    let options = EstimateOptions {
        horizons: Some("1, 3".parse().unwrap()),
        ..EstimateOptions::default()
    };
    let result = estimate(raw(&panel), &options, &TimeFeImputation).unwrap();
    let terms: Vec<&str> = result.estimates.iter().map(|e| e.term.as_str()).collect();
    assert_eq!(terms, vec!["1", "3"]);
    assert_relative_eq!(result.estimates[1].estimate, 2.0, epsilon = 1e-12);
}

#[test]
fn test_prepared_frame_with_given_weights() {
    let frame = assign_weights_agg(prepare(&harmon_panel(), None)).unwrap();
    let options = EstimateOptions {
        horizons: None,
        weights: vec![AVERAGE_COLUMN.to_string()],
        ..EstimateOptions::default()
    };
    let result = estimate(EstimationData::Prepared(frame), &options, &TimeFeImputation).unwrap();
    assert_eq!(result.estimates.len(), 1);
    assert_relative_eq!(result.estimates[0].estimate, 21.0 / 11.0, epsilon = 1e-12);
}

#[test]
fn test_unit_weights_shift_horizon_zero() {
    let panel = harmon_panel();
    let weights = [2.0, 1.0, 1.0, 1.0];
    let data = EstimationData::Raw {
        panel: &panel,
        unit_weights: Some(&weights[..]),
    };
    let result = estimate(data, &EstimateOptions::default(), &TimeFeImputation).unwrap();
    // A: 2/3 * 1, C: 1/3 * 3.
    assert_relative_eq!(result.term("0").unwrap().estimate, 5.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn test_estimate_errors() {
    let panel = harmon_panel();

    let options = EstimateOptions {
        aweight: Some("pop".to_string()),
        ..EstimateOptions::default()
    };
    let err = estimate(raw(&panel), &options, &TimeFeImputation).unwrap_err();
    assert!(matches!(err, EstimateError::AnalyticWeights));

    let options = EstimateOptions {
        pretrends: true,
        ..EstimateOptions::default()
    };
    let err = estimate(raw(&panel), &options, &TimeFeImputation).unwrap_err();
    assert!(matches!(err, EstimateError::Pretrends));

    let options = EstimateOptions {
        horizons: None,
        ..EstimateOptions::default()
    };
    let err = estimate(raw(&panel), &options, &TimeFeImputation).unwrap_err();
    assert!(matches!(err, EstimateError::NothingToEstimate));

    let options = EstimateOptions {
        horizons: None,
        weights: vec!["horizon0".to_string()],
        ..EstimateOptions::default()
    };
    let err = estimate(raw(&panel), &options, &TimeFeImputation).unwrap_err();
    assert!(matches!(err, EstimateError::UnknownWeight(ref w) if w == "horizon0"));

    let err = estimate(raw(&panel), &EstimateOptions::default(), &FailingFit).unwrap_err();
    assert_eq!(err.to_string(), "regression failed: singular design");
}

#[test]
fn test_never_treated_only_panel() {
    let records: Vec<_> = harmon_panel()
        .to_records()
        .into_iter()
        .filter(|r| r.cohort.is_none())
        .collect();
    let panel = Panel::from_records(records, 0).unwrap();
    let err = estimate(raw(&panel), &EstimateOptions::default(), &TimeFeImputation).unwrap_err();
    assert!(matches!(err, EstimateError::Weights(WeightError::NoRelativeTime)));
}

#[test]
fn test_horizon_selection_parse() {
    assert_eq!("event".parse::<HorizonSelection>(), Ok(HorizonSelection::Event));
    assert_eq!(" Static ".parse::<HorizonSelection>(), Ok(HorizonSelection::Static));
    assert_eq!("all".parse::<HorizonSelection>(), Ok(HorizonSelection::All));
    assert_eq!(
        "0,2".parse::<HorizonSelection>(),
        Ok(HorizonSelection::Explicit(vec![0, 2]))
    );
    assert!("0,x".parse::<HorizonSelection>().is_err());
    assert!("".parse::<HorizonSelection>().is_err());
}

#[test]
fn test_result_display() {
    let panel = harmon_panel();
    let result = estimate(raw(&panel), &EstimateOptions::default(), &TimeFeImputation).unwrap();
    let text = result.to_string();
    assert!(text.starts_with("**** Estimation results ****\n"));
    assert!(text.contains("Nobs: 24\n"));
    assert!(text.contains("average"));
}
