use super::*;
use std::io::Write;

#[test]
fn test_defaults() {
    let config = ComparisonConfig::default();
    assert_eq!(config.max_horizon, 7);
    assert_eq!(config.never_treated, 0);
    assert_eq!(config.columns.required(), ["id", "t", "E", "D", "Y", "K"]);
    assert_eq!(config.columns.weight, None);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"never_treated": -99, "columns": {{"unit": "i", "cohort": "Ei"}}}}"#
    )
    .unwrap();

    let config = ComparisonConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.never_treated, -99);
    assert_eq!(config.max_horizon, DEFAULT_MAX_HORIZON);
    assert_eq!(config.columns.unit, "i");
    assert_eq!(config.columns.cohort, "Ei");
    assert_eq!(config.columns.time, "t");
}

#[test]
fn test_invalid_json_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = ComparisonConfig::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, InputError::Json(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = ComparisonConfig::from_json_file(Path::new("/nonexistent/config.json")).unwrap_err();
    assert!(matches!(err, InputError::Io(_)));
}
