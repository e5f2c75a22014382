use thiserror::Error;

/// Failure taxonomy of one decision cycle. Nothing here is fatal to the
/// process: every variant degrades to "no decision this cycle" and the
/// scheduler moves on to the next interval.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required upstream file or field is absent (empty sensor log,
    /// incomplete pot info, no photo, forecast unavailable).
    #[error("missing data: {0}")]
    MissingData(String),

    /// Transport-level failure calling the assessment model.
    #[error("assessment unavailable: {0}")]
    AssessmentUnavailable(#[source] anyhow::Error),

    /// Model output that stayed malformed or schema-incomplete after
    /// cleanup. The cleaned text is retained for diagnostics; it is never
    /// coerced into a fabricated result.
    #[error("invalid assessment: {reason}")]
    InvalidAssessment { reason: String, raw: String },

    /// I/O failure persisting state. May leave the two logs inconsistent
    /// with each other; no rollback is attempted.
    #[error("log write failure: {0}")]
    LogWriteFailure(#[source] anyhow::Error),
}

impl PipelineError {
    pub fn invalid(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::InvalidAssessment {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Short label for log fields and cycle reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingData(_) => "missing_data",
            Self::AssessmentUnavailable(_) => "assessment_unavailable",
            Self::InvalidAssessment { .. } => "invalid_assessment",
            Self::LogWriteFailure(_) => "log_write_failure",
        }
    }
}
