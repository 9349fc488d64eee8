use thiserror::Error;

/// Error type shared by every fallible operation of the crate.
///
/// Variants fall into four classes:
/// - **Configuration**: a parameter combination that can never succeed
///   ([`SeleneError::MissingCorrectionAngles`]). Failed immediately, never retried.
/// - **Transient IO**: a data-load failure ([`SeleneError::KernelLoad`]). The session
///   retries it exactly once after a short fixed delay, then surfaces it as fatal.
/// - **Lookup**: an unknown body, frame, or time-coverage gap reported by the
///   ephemeris service. Propagated unchanged, since it indicates a caller or
///   data-provisioning mistake.
/// - **Numeric degeneracy**: a computation that would otherwise silently produce
///   NaN ([`SeleneError::DegenerateVector`], [`SeleneError::NanInput`]).
#[derive(Error, Debug)]
pub enum SeleneError {
    #[error("zenith/azimuth rotation correction requested without longitude and colatitude")]
    MissingCorrectionAngles,

    #[error("failed to load ephemeris data from {path}: {reason}")]
    KernelLoad { path: String, reason: String },

    #[error("unknown body: {0}")]
    UnknownBody(String),

    #[error("unknown reference frame: {0}")]
    UnknownFrame(String),

    #[error("no ephemeris coverage for epoch {0} (TDB seconds past J2000)")]
    EpochNotCovered(f64),

    #[error("invalid UTC time string: {0}")]
    InvalidTimeFormat(String),

    #[error("zero-length vector in {0} decomposition")]
    DegenerateVector(&'static str),

    #[error("invalid synthetic state series: {0}")]
    InvalidStateSeries(String),

    #[error("{got} observer positions supplied for {expected} epochs")]
    PositionCountMismatch { expected: usize, got: usize },

    #[error("NaN encountered in input: {0}")]
    NanInput(#[from] ordered_float::FloatIsNan),

    #[error("unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl PartialEq for SeleneError {
    fn eq(&self, other: &Self) -> bool {
        use SeleneError::*;
        match (self, other) {
            (MissingCorrectionAngles, MissingCorrectionAngles) => true,
            (
                KernelLoad { path: a, .. },
                KernelLoad { path: b, .. },
            ) => a == b,
            (UnknownBody(a), UnknownBody(b)) => a == b,
            (UnknownFrame(a), UnknownFrame(b)) => a == b,
            (EpochNotCovered(a), EpochNotCovered(b)) => a == b,
            (InvalidTimeFormat(a), InvalidTimeFormat(b)) => a == b,
            (DegenerateVector(a), DegenerateVector(b)) => a == b,
            (InvalidStateSeries(a), InvalidStateSeries(b)) => a == b,
            (
                PositionCountMismatch {
                    expected: ae,
                    got: ag,
                },
                PositionCountMismatch {
                    expected: be,
                    got: bg,
                },
            ) => ae == be && ag == bg,
            (NanInput(a), NanInput(b)) => a == b,

            // Not comparable by content, equal if same variant
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}

impl SeleneError {
    /// Whether a load-time retry is worthwhile: only transient IO failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SeleneError::KernelLoad { .. } | SeleneError::IoError(_)
        )
    }
}
