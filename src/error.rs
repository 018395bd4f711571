use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ScryError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("server returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("failed to decode catalog response: {0}")]
    Decode(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("card not found: {0}")]
    #[diagnostic(help("the lookup is fuzzy, but the name still needs to be close to a real card"))]
    CardNotFound(String),

    #[error("invalid set code: {0}")]
    InvalidSetCode(String),

    #[error("invalid image quality: {0} (expected small, normal or large)")]
    InvalidQuality(String),

    #[error("invalid worker count: {0} (expected 1-50)")]
    InvalidConcurrency(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl ScryError {
    /// A lookup that reached the catalog and came back empty.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScryError::CardNotFound(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ScryError::Network(_) | ScryError::HttpStatus { .. } | ScryError::Decode(_)
        )
    }

    /// Process exit status: 2 for not-found, 3 for remote failures, else 1.
    pub fn exit_code(&self) -> u8 {
        if self.is_not_found() {
            2
        } else if self.is_remote() {
            3
        } else {
            1
        }
    }
}

/// Exit status for a failed run. Only reports built directly from a
/// `ScryError` (`miette::Report::new`) keep their specific code.
pub fn report_exit_code(report: &miette::Report) -> u8 {
    report
        .downcast_ref::<ScryError>()
        .map_or(1, ScryError::exit_code)
}

#[cfg(test)]
mod tests {
    use miette::IntoDiagnostic;

    use super::*;

    #[test]
    fn exit_codes_by_category() {
        assert_eq!(ScryError::CardNotFound("Opt".to_string()).exit_code(), 2);
        assert_eq!(ScryError::Network("reset".to_string()).exit_code(), 3);
        let status = ScryError::HttpStatus {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(status.exit_code(), 3);
        assert_eq!(ScryError::Decode("eof".to_string()).exit_code(), 3);
        assert_eq!(ScryError::InvalidQuality("png".to_string()).exit_code(), 1);
    }

    #[test]
    fn report_keeps_error_category() {
        let failed: Result<(), ScryError> = Err(ScryError::CardNotFound("Opt".to_string()));
        let report = failed.map_err(miette::Report::new).unwrap_err();
        assert_eq!(report_exit_code(&report), 2);

        let io_failure: Result<(), std::io::Error> = Err(std::io::Error::other("closed pipe"));
        let report = io_failure.into_diagnostic().unwrap_err();
        assert_eq!(report_exit_code(&report), 1);
    }
}
