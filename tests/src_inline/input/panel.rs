use std::fs::File;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

use super::*;
use crate::testing::harmon_panel;

const SMALL: &str = "\
id,t,E,D,Y,K
1,1,2,0,1.0,-1
1,2,2,1,2.5,0
2,1,0,0,1.0,NA
2,2,0,NA,1.25,
";

#[test]
fn test_read_panel_nulls_and_sentinel() {
    let loaded = read_panel(SMALL.as_bytes(), &ComparisonConfig::default()).unwrap();
    assert!(loaded.unit_weights.is_none());

    let panel = loaded.panel;
    assert_eq!(panel.n_units(), 2);
    assert_eq!(panel.len(), 4);
    assert_eq!(panel.cohorts(), vec![2]);

    let never = panel.unit_rows(panel.unit_by_label("2").unwrap());
    assert!(never.iter().all(|o| o.cohort.is_none() && o.k.is_none()));
    assert_eq!(never[1].treated, None);
    assert_eq!(never[1].y, Some(1.25));
}

#[test]
fn test_read_panel_whole_floats_and_booleans() {
    let text = "id,t,E,D,Y,K\nu,1.0,2.0,false,0.5,-1.0\nu,2,2,true,1.5,0\n";
    let panel = read_panel(text.as_bytes(), &ComparisonConfig::default())
        .unwrap()
        .panel;
    let rows = panel.observations();
    assert_eq!(rows[0].cohort, Some(2));
    assert_eq!(rows[0].k, Some(-1));
    assert_eq!(rows[1].treated, Some(true));
}

#[test]
fn test_read_panel_missing_columns() {
    let err = read_panel("id,t,Y\n1,1,0.0\n".as_bytes(), &ComparisonConfig::default()).unwrap_err();
    match err {
        InputError::Panel(PanelError::MissingColumns(cols)) => {
            assert_eq!(cols, vec!["D", "E", "K"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_read_panel_parse_error_location() {
    let text = "id,t,E,D,Y,K\n1,1,2,0,1.0,-1\n1,two,2,1,2.5,0\n";
    let err = read_panel(text.as_bytes(), &ComparisonConfig::default()).unwrap_err();
    match err {
        InputError::Parse {
            line,
            column,
            value,
            expected,
        } => {
            assert_eq!(line, 3);
            assert_eq!(column, "t");
            assert_eq!(value, "two");
            assert_eq!(expected, "integer");
        }
        other => panic!("unexpected error: {other}"),
    }

    let text = "id,t,E,D,Y,K\n1,1,2,0,abc,-1\n";
    let err = read_panel(text.as_bytes(), &ComparisonConfig::default()).unwrap_err();
    assert!(err.to_string().contains("as number"));
}

#[test]
fn test_read_panel_null_outcome() {
    let text = "id,t,E,D,Y,K\n1,1,2,0,NA,-1\n1,2,2,1,,0\n1,3,2,1,4.5,1\n";
    let config = ComparisonConfig::default();
    let panel = read_panel(text.as_bytes(), &config).unwrap().panel;
    let ys: Vec<_> = panel.observations().iter().map(|o| o.y).collect();
    assert_eq!(ys, vec![None, None, Some(4.5)]);

    let mut out = Vec::new();
    write_panel(&mut out, &panel, &config).unwrap();
    let written = String::from_utf8(out).unwrap();
    assert!(written.contains("\n1,1,2,0,,-1\n"));
    assert_eq!(read_panel(written.as_bytes(), &config).unwrap().panel, panel);
}

#[test]
fn test_write_groups() {
    let panel = harmon_panel();
    let mut out = Vec::new();
    write_groups(&mut out, &panel, &[true, false, false, true]).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "id,F\nA,1\nB,0\nC,0\nD,1\n"
    );
}

#[test]
fn test_read_panel_validates_semantics() {
    let text = "id,t,E,D,Y,K\n1,1,2,0,1.0,-1\n1,1,2,0,1.0,-1\n";
    let err = read_panel(text.as_bytes(), &ComparisonConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        InputError::Panel(PanelError::DuplicatePeriod { .. })
    ));
}

fn weighted_config() -> ComparisonConfig {
    let mut config = ComparisonConfig::default();
    config.columns.weight = Some("w".to_string());
    config
}

#[test]
fn test_read_panel_unit_weights() {
    let text = "id,t,E,D,Y,K,w\n\
                2,1,0,0,1.0,,0.5\n\
                2,2,0,0,1.0,,0.5\n\
                1,1,2,0,1.0,-1,2\n\
                1,2,2,1,2.0,0,2\n";
    let loaded = read_panel(text.as_bytes(), &weighted_config()).unwrap();
    // Indexed by UnitId: "1" sorts before "2".
    assert_eq!(loaded.unit_weights, Some(vec![2.0, 0.5]));
}

#[test]
fn test_read_panel_weight_errors() {
    let err = read_panel(SMALL.as_bytes(), &weighted_config()).unwrap_err();
    assert!(matches!(
        err,
        InputError::Panel(PanelError::MissingColumns(ref cols)) if cols == &["w"]
    ));

    let text = "id,t,E,D,Y,K,w\n1,1,2,0,1.0,-1,1\n1,2,2,1,2.0,0,3\n";
    let err = read_panel(text.as_bytes(), &weighted_config()).unwrap_err();
    match err {
        InputError::UnitWeight { unit, column } => {
            assert_eq!(unit, "1");
            assert_eq!(column, "w");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_custom_never_treated_code() {
    let config = ComparisonConfig {
        never_treated: -1,
        ..ComparisonConfig::default()
    };
    let text = "id,t,E,D,Y,K\n1,1,-1,0,1.0,\n1,2,-1,0,1.0,\n";
    let panel = read_panel(text.as_bytes(), &config).unwrap().panel;
    assert!(panel.cohorts().is_empty());
    assert_eq!(panel.never_treated(), -1);

    let mut out = Vec::new();
    write_panel(&mut out, &panel, &config).unwrap();
    let written = String::from_utf8(out).unwrap();
    assert!(written.contains("\n1,1,-1,0,1,\n"));
}

#[test]
fn test_write_then_read_panel() {
    let panel = harmon_panel();
    let config = ComparisonConfig::default();
    let mut out = Vec::new();
    write_panel(&mut out, &panel, &config).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("id,t,E,D,Y,K\n"));
    let back = read_panel(text.as_bytes(), &config).unwrap().panel;
    assert_eq!(back, panel);
}

#[test]
fn test_load_panel_gz() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("panel.csv.gz");
    let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    enc.write_all(SMALL.as_bytes()).unwrap();
    enc.finish().unwrap();

    let loaded = load_panel(&path, &ComparisonConfig::default()).unwrap();
    assert_eq!(loaded.panel.len(), 4);

    let plain = dir.path().join("panel.csv");
    std::fs::write(&plain, SMALL).unwrap();
    assert_eq!(load_panel(&plain, &ComparisonConfig::default()).unwrap(), loaded);
}

#[test]
fn test_load_panel_missing_file() {
    let err = load_panel(Path::new("/nonexistent/panel.csv"), &ComparisonConfig::default())
        .unwrap_err();
    assert!(matches!(err, InputError::Io(_)));
}
