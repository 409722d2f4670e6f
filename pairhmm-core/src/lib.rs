//! Anchored banded posterior-decoding pair-HMM aligner.
//!
//! Given two DNA sequences, [`align`] runs the full pipeline: an external
//! seed finder proposes anchors, anchors are filtered into a strictly
//! increasing chain, large anchor-to-anchor gaps are split into
//! independently-sized sub-problems, and each sub-problem is aligned with a
//! banded forward/backward sweep that reports every position pair whose
//! posterior match probability clears a threshold.

pub mod anchors;
pub mod band;
pub mod cigar;
pub mod diagonal;
pub mod dp_matrix;
pub mod engine;
pub mod error;
pub mod numerics;
pub mod params;
pub mod seed_finder;
pub mod split;
pub mod state;
pub mod symbol;

pub mod prelude {
    pub use crate::engine::{get_aligned_pairs_with_banding, AlignedPair};
    pub use crate::error::{PairwiseAlignmentError, Result};
    pub use crate::numerics::PROB_SCALE;
    pub use crate::params::Parameters;
    pub use crate::seed_finder::{FixedSeedFinder, LastzSeedFinder, SeedFinder};
    pub use crate::split::split_alignments_by_large_gaps;
    pub use crate::symbol::SymbolString;
}

use prelude::*;

/// Runs the full pipeline end to end: find anchors with `finder`, split on
/// large gaps, and banded-align every sub-region.
pub fn align(sx: &str, sy: &str, finder: &dyn SeedFinder, params: &Parameters) -> Result<Vec<AlignedPair>> {
    params.validate()?;
    let anchor_pairs = anchors::get_blast_pairs_for_pairwise_alignment_parameters(finder, sx, sy, params)?;
    let sx_symbols = SymbolString::new(sx);
    let sy_symbols = SymbolString::new(sy);
    split_alignments_by_large_gaps(&anchor_pairs, &sx_symbols, &sy_symbols, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_with_no_anchors_needed() {
        let finder = FixedSeedFinder::new(vec![]);
        let params = Parameters::default();
        let pairs = align("ACGTACGTACGT", "ACGTACGTACGT", &finder, &params).unwrap();
        assert!(!pairs.is_empty());
    }

    #[test]
    fn end_to_end_is_deterministic() {
        let finder = FixedSeedFinder::new(vec![]);
        let params = Parameters::default();
        let a = align("ACGTTGCATTAGCGT", "ACGTTGCATAGCGT", &finder, &params).unwrap();
        let b = align("ACGTTGCATTAGCGT", "ACGTTGCATAGCGT", &finder, &params).unwrap();
        assert_eq!(a, b);
    }
}
