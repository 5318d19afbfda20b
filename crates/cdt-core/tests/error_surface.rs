use cdt_core::errors::{CdtError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("cell", 7)
        .with_context("reason", "example")
}

#[test]
fn simplex_error_surface() {
    let err = CdtError::Simplex(sample_info("S001", "span is not one"));
    assert_eq!(err.info().code, "S001");
    assert!(err.info().context.contains_key("cell"));
    assert!(err.is_recoverable());
}

#[test]
fn foliation_error_is_fatal() {
    let err = CdtError::Foliation(sample_info("F001", "pass budget exhausted"));
    assert_eq!(err.info().context.get("cell").map(String::as_str), Some("7"));
    assert!(!err.is_recoverable());
}

#[test]
fn precision_error_is_fatal() {
    let err = CdtError::Precision(sample_info("P001", "constants cache"));
    assert!(!err.is_recoverable());
}

#[test]
fn display_includes_context_and_hint() {
    let err = CdtError::Move(
        sample_info("delta-mismatch", "counts moved off the table").with_hint("inspect the move"),
    );
    assert_eq!(
        err.to_string(),
        "move error: [delta-mismatch] counts moved off the table cell=7 reason=example (inspect the move)"
    );
}
