use std::path::Path;

use cdt_core::errors::{CdtError, ErrorInfo};

pub(crate) fn triangulation_error(code: &str, message: &str) -> CdtError {
    CdtError::Triangulation(ErrorInfo::new(code, message))
}

pub(crate) fn simplex_error(code: &str, message: &str) -> CdtError {
    CdtError::Simplex(ErrorInfo::new(code, message))
}

pub(crate) fn foliation_error(code: &str, message: &str) -> CdtError {
    CdtError::Foliation(ErrorInfo::new(code, message))
}

pub(crate) fn io_error(code: &str, err: impl ToString, path: &Path) -> CdtError {
    CdtError::Serde(ErrorInfo::new(code, err.to_string()).with_context("path", path.display()))
}

pub(crate) trait ContextExt {
    fn with_context(self, key: &str, value: impl ToString) -> CdtError;
}

impl ContextExt for CdtError {
    fn with_context(self, key: &str, value: impl ToString) -> CdtError {
        match self {
            CdtError::Triangulation(info) => CdtError::Triangulation(info.with_context(key, value)),
            CdtError::Simplex(info) => CdtError::Simplex(info.with_context(key, value)),
            CdtError::Foliation(info) => CdtError::Foliation(info.with_context(key, value)),
            CdtError::Serde(info) => CdtError::Serde(info.with_context(key, value)),
            other => other,
        }
    }
}
