//! Tunable parameters of the banding, traceback, and anchor pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{PairwiseAlignmentError, Result};

/// Mirrors the reference implementation's `PairwiseAlignmentParameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Minimum posterior match probability an aligned pair must have to be
    /// reported.
    pub threshold: f64,
    /// Minimum number of antidiagonals the forward sweep advances between
    /// successive traceback checkpoints.
    pub min_diags_between_trace_back: i64,
    /// How many antidiagonals a checkpointed traceback looks back over.
    pub trace_back_diagonals: i64,
    /// Cells of slack added on every side of the anchor-constrained band.
    pub diagonal_expansion: i64,
    /// Cells trimmed from each end of an anchor-derived constraint diagonal.
    pub constraint_diagonal_trim: i64,
    /// Rectangles at or above this area fall back to repeat-masked anchors.
    pub anchor_matrix_bigger_than_this: i64,
    /// Rectangles at or above this area recurse into bottom-level anchors.
    pub repeat_mask_matrix_bigger_than_this: i64,
    /// Rectangles at or above this area are split by large gaps before
    /// alignment.
    pub split_matrix_bigger_than_this: i64,
    /// Whether non-ACGT bases may take part in a match (as opposed to
    /// always being treated as a gap).
    pub align_ambiguity_characters: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            threshold: 0.01,
            min_diags_between_trace_back: 1000,
            trace_back_diagonals: 40,
            diagonal_expansion: 20,
            constraint_diagonal_trim: 14,
            anchor_matrix_bigger_than_this: 500 * 500,
            repeat_mask_matrix_bigger_than_this: 500 * 500,
            split_matrix_bigger_than_this: 3000 * 3000,
            align_ambiguity_characters: false,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(PairwiseAlignmentError::BadParameters(msg.to_string()));

        if self.trace_back_diagonals < 1 {
            return bad("traceBackDiagonals must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return bad("threshold must be within [0, 1]");
        }
        if self.diagonal_expansion < 0 || self.diagonal_expansion % 2 != 0 {
            return bad("diagonalExpansion must be even and non-negative");
        }
        if self.min_diags_between_trace_back < 2 {
            return bad("minDiagsBetweenTraceBack must be >= 2");
        }
        if self.trace_back_diagonals + 1 >= self.min_diags_between_trace_back {
            return bad("traceBackDiagonals + 1 must be < minDiagsBetweenTraceBack");
        }
        if self.constraint_diagonal_trim < 0 {
            return bad("constraintDiagonalTrim must be non-negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Parameters::default().validate().unwrap();
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let mut p = Parameters::default();
        p.threshold = 1.5;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_odd_expansion() {
        let mut p = Parameters::default();
        p.diagonal_expansion = 3;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_traceback_window_too_wide_for_checkpoint_spacing() {
        let mut p = Parameters::default();
        p.trace_back_diagonals = p.min_diags_between_trace_back;
        assert!(p.validate().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let p = Parameters::default();
        let json = serde_json::to_string(&p).unwrap();
        let back: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
