use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::model::panel::UnitId;

fn run(params: &SimParams, seed: u64) -> Result<Panel, SimError> {
    simulate(params, &mut StdRng::seed_from_u64(seed))
}

#[test]
fn test_simulate_is_deterministic_per_seed() {
    let params = SimParams {
        n_units: 40,
        ..SimParams::default()
    };
    assert_eq!(run(&params, 7).unwrap(), run(&params, 7).unwrap());
    assert_ne!(run(&params, 7).unwrap(), run(&params, 8).unwrap());
}

#[test]
fn test_simulate_shape() {
    let params = SimParams {
        n_units: 300,
        ..SimParams::default()
    };
    let panel = run(&params, 1).unwrap();
    assert_eq!(panel.n_units(), 300);
    assert_eq!(panel.len(), 300 * 6);
    assert_eq!(panel.periods(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(panel.cohorts(), vec![2, 3, 4, 5, 6]);
    assert_eq!(panel.label(UnitId(0)), "1");
    assert_eq!(panel.label(UnitId(299)), "300");

    for o in panel.observations() {
        assert_eq!(o.k, o.cohort.map(|e| o.t - e));
        assert_eq!(o.treated, Some(o.k.is_some_and(|k| k >= 0)));
    }
    assert!(panel.observations().iter().any(|o| o.cohort.is_none()));
}

#[test]
fn test_simulate_without_noise() {
    let params = SimParams {
        n_units: 50,
        scale: 0.0,
        ..SimParams::default()
    };
    let panel = run(&params, 3).unwrap();
    for o in panel.observations() {
        let expected = match o.cohort {
            Some(e) if o.t >= e => -e as f64 + 3.0 * o.t as f64 + (1 + o.t - e) as f64,
            Some(e) => -e as f64 + 3.0 * o.t as f64,
            None => 3.0 * o.t as f64,
        };
        assert_eq!(o.y, Some(expected));
    }
}

#[test]
fn test_simulate_noise_starts_at_zero() {
    let params = SimParams {
        n_units: 20,
        cohorts: vec![None],
        ..SimParams::default()
    };
    let panel = run(&params, 5).unwrap();
    for unit in panel.unit_ids() {
        assert_eq!(panel.unit_rows(unit)[0].y, Some(3.0));
    }
    assert!(panel.cohorts().is_empty());
}

#[test]
fn test_simulate_group_effect_shifts_treated_outcomes() {
    let params = SimParams {
        n_units: 60,
        scale: 0.0,
        group_effect: 0.5,
        ..SimParams::default()
    };
    let sim = simulate_groups(&params, &mut StdRng::seed_from_u64(9)).unwrap();
    assert_eq!(sim.groups.len(), 60);
    assert!(sim.groups.iter().any(|&f| f));
    assert!(sim.groups.iter().any(|&f| !f));

    for o in sim.panel.observations() {
        let shift = if sim.groups[o.unit.0 as usize] { 0.5 } else { 0.0 };
        let expected = match o.cohort {
            Some(e) if o.t >= e => -e as f64 + 3.0 * o.t as f64 + (1 + o.t - e) as f64 - shift,
            Some(e) => -e as f64 + 3.0 * o.t as f64,
            None => 3.0 * o.t as f64,
        };
        assert_eq!(o.y, Some(expected));
    }
}

#[test]
fn test_simulate_groups_match_plain_panel() {
    let params = SimParams {
        n_units: 25,
        ..SimParams::default()
    };
    let sim = simulate_groups(&params, &mut StdRng::seed_from_u64(4)).unwrap();
    assert_eq!(sim.panel, run(&params, 4).unwrap());
    assert_eq!(sim.panel.label(UnitId(9)), "10");
}

#[test]
fn test_simulate_errors() {
    let params = SimParams {
        scale: -1.0,
        ..SimParams::default()
    };
    assert!(matches!(run(&params, 1), Err(SimError::Scale(s)) if s == -1.0));

    let params = SimParams {
        cohorts: Vec::new(),
        ..SimParams::default()
    };
    assert!(matches!(run(&params, 1), Err(SimError::Empty)));

    let params = SimParams {
        n_units: 0,
        ..SimParams::default()
    };
    assert!(matches!(run(&params, 1), Err(SimError::Empty)));
}

#[test]
fn test_params_from_partial_json() {
    let params: SimParams = serde_json::from_str(r#"{"n_units": 10, "rho": 0.5}"#).unwrap();
    assert_eq!(params.n_units, 10);
    assert_eq!(params.rho, 0.5);
    assert_eq!(params.periods, SimParams::default().periods);
    assert_eq!(params.group_effect, 0.0);
}
