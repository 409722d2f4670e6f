use thiserror::Error;

/// Errors surfaced by the banded pair-HMM aligner.
///
/// Precondition errors (`BadDiagonal`, `BadParameters`, `BadAnchors`,
/// `SeedFinderIo`) are fatal to the call that raised them: they propagate to
/// the caller and never leave a partial aligned-pair list behind. `Internal`
/// marks an invariant violation that should be unreachable in correct code.
#[derive(Debug, Error)]
pub enum PairwiseAlignmentError {
    #[error("invalid diagonal: xay={xay} xmyL={xmy_l} xmyR={xmy_r}")]
    BadDiagonal { xay: i64, xmy_l: i64, xmy_r: i64 },

    #[error("invalid parameters: {0}")]
    BadParameters(String),

    #[error("invalid anchors: {0}")]
    BadAnchors(String),

    #[error("seed finder I/O failure: {0}")]
    SeedFinderIo(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PairwiseAlignmentError>;
