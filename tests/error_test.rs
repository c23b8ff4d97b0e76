//! Tests for error types

use cotejar::Error;

#[test]
fn test_degenerate_range_error() {
    let error = Error::DegenerateRange { min: 3.0, max: 3.0 };
    let error_str = format!("{error}");
    assert!(error_str.contains("Degenerate score range"));
    assert!(error_str.contains("divide by zero"));
}

#[test]
fn test_missing_column_error() {
    let error = Error::MissingColumn("coding".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Missing column"));
    assert!(error_str.contains("coding"));
}

#[test]
fn test_insufficient_samples_error() {
    let error = Error::InsufficientSamples {
        class: "VIS".to_string(),
        observed: 1,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Insufficient samples"));
    assert!(error_str.contains("VIS"));
    assert!(error_str.contains("at least 2"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("empty table".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("empty table"));
}

#[test]
fn test_storage_error() {
    let error = Error::Storage("file not found".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: Error = io.into();
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_arrow_error_conversion() {
    let arrow = arrow::error::ArrowError::SchemaError("bad schema".to_string());
    let error: Error = arrow.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("Arrow error"));
    assert!(error_str.contains("bad schema"));
}
