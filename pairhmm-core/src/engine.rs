//! The banded forward/backward sweep with checkpointed traceback: the core
//! posterior-decoding engine behind the whole aligner.

use tracing::trace;

use crate::anchors::validate_anchor_chain;
use crate::band::{Band, BandIterator};
use crate::dp_matrix::{
    diagonal_calculation_backward, diagonal_calculation_forward, diagonal_calculation_posterior_match_probs,
    diagonal_calculation_total_probability, DpMatrix,
};
use crate::error::Result;
use crate::numerics::LOG_ZERO;
use crate::params::Parameters;
use crate::state::{end_state_prob, start_state_prob};
use crate::symbol::SymbolString;

/// One posterior-decoded match: `p` in `[0, PROB_SCALE]`, `(x, y)` 0-based
/// coordinates into `sx`/`sy`.
pub type AlignedPair = (i64, i64, i64);

/// Runs the full banded posterior-decoding sweep and returns every aligned
/// pair whose posterior match probability clears `params.threshold`.
///
/// `anchor_pairs` must be sorted by `x` (and by `y` within ties) with no
/// anchor repeating an `x` or `y` coordinate already used by an earlier one;
/// see [`crate::anchors::filter_to_remove_overlap`].
pub fn get_aligned_pairs_with_banding(
    anchor_pairs: &[(i64, i64)],
    sx: &SymbolString,
    sy: &SymbolString,
    params: &Parameters,
) -> Result<Vec<AlignedPair>> {
    params.validate()?;

    let mut aligned_pairs = Vec::new();

    let diagonal_number = sx.len() as i64 + sy.len() as i64;
    if diagonal_number == 0 {
        return Ok(aligned_pairs);
    }

    validate_anchor_chain(anchor_pairs, sx.len() as i64, sy.len() as i64)?;

    let band = Band::construct(anchor_pairs, sx.len() as i64, sy.len() as i64, params.diagonal_expansion);
    let mut forward_band_iterator = BandIterator::new(&band);
    let mut forward_matrix = DpMatrix::new(diagonal_number);
    forward_matrix
        .create(forward_band_iterator.next())?
        .initialise_values(start_state_prob);

    let mut backward_matrix = DpMatrix::new(diagonal_number);

    let mut traced_back_to = 0i64;
    let mut total_posterior_calculations = 0i64;

    loop {
        let diagonal = forward_band_iterator.next();

        forward_matrix.create(diagonal)?.zero_values();
        diagonal_calculation_forward(diagonal.xay(), &mut forward_matrix, sx, sy);

        let at_end = diagonal.xay() == diagonal_number;
        let traceback_point = diagonal.xay() >= traced_back_to + params.min_diags_between_trace_back
            && diagonal.width() <= params.diagonal_expansion * 2 + 1;

        if at_end || traceback_point {
            backward_matrix.create(diagonal)?.initialise_values(end_state_prob);
            if diagonal.xay() > traced_back_to + 1 {
                let j = forward_matrix.get(diagonal.xay() - 1).expect("forward diagonal must exist");
                backward_matrix.create(j.diagonal())?.zero_values();
            }

            let mut backward_band_iterator = forward_band_iterator.clone();
            let mut diagonal2 = backward_band_iterator.previous();
            debug_assert_eq!(diagonal2.xay(), diagonal.xay());
            let traced_back_from = diagonal.xay() - if at_end { 0 } else { params.trace_back_diagonals + 1 };
            let mut total_probability = LOG_ZERO;
            let mut total_posterior_calculations_this_traceback = 0i64;

            while diagonal2.xay() > traced_back_to {
                if diagonal2.xay() > traced_back_to + 2 {
                    let j = forward_matrix
                        .get(diagonal2.xay() - 2)
                        .expect("forward diagonal must exist");
                    backward_matrix.create(j.diagonal())?.zero_values();
                }
                if diagonal2.xay() > traced_back_to + 1 {
                    diagonal_calculation_backward(diagonal2.xay(), &mut backward_matrix, sx, sy);
                }
                if diagonal2.xay() <= traced_back_from {
                    debug_assert!(forward_matrix.get(diagonal2.xay()).is_some());
                    debug_assert!(forward_matrix.get(diagonal2.xay() - 1).is_some());
                    debug_assert!(backward_matrix.get(diagonal2.xay()).is_some());
                    if diagonal2.xay() != diagonal_number {
                        debug_assert!(backward_matrix.get(diagonal2.xay() + 1).is_some());
                    }

                    let recompute_total = total_posterior_calculations_this_traceback % 10 == 0;
                    total_posterior_calculations_this_traceback += 1;
                    if recompute_total {
                        let new_total_probability = diagonal_calculation_total_probability(
                            diagonal2.xay(),
                            &mut forward_matrix,
                            &mut backward_matrix,
                            sx,
                            sy,
                        )?;
                        if total_posterior_calculations_this_traceback != 1 {
                            debug_assert!(total_probability + 0.1 > new_total_probability);
                            debug_assert!(new_total_probability + 0.1 > new_total_probability);
                        }
                        total_probability = new_total_probability;
                    }

                    diagonal_calculation_posterior_match_probs(
                        diagonal2.xay(),
                        &forward_matrix,
                        &backward_matrix,
                        params.threshold,
                        total_probability,
                        &mut aligned_pairs,
                    );

                    if diagonal2.xay() < traced_back_from || at_end {
                        forward_matrix.delete(diagonal2.xay());
                    }
                }
                if diagonal2.xay() + 1 <= diagonal_number {
                    backward_matrix.delete(diagonal2.xay() + 1);
                }
                diagonal2 = backward_band_iterator.previous();
            }

            traced_back_to = traced_back_from;
            backward_matrix.delete(diagonal2.xay() + 1);
            forward_matrix.delete(diagonal2.xay());
            debug_assert_eq!(backward_matrix.active_count(), 0);
            total_posterior_calculations += total_posterior_calculations_this_traceback;
            if !at_end {
                debug_assert_eq!(forward_matrix.active_count(), (params.trace_back_diagonals + 2) as usize);
            }
            trace!(
                traced_back_to,
                this_traceback = total_posterior_calculations_this_traceback,
                "checkpointed traceback"
            );
        }

        if at_end {
            break;
        }
    }

    debug_assert_eq!(total_posterior_calculations, diagonal_number);
    debug_assert_eq!(traced_back_to, diagonal_number);
    debug_assert_eq!(backward_matrix.active_count(), 0);
    debug_assert_eq!(forward_matrix.active_count(), 0);

    Ok(aligned_pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequences_yield_no_pairs() {
        let sx = SymbolString::new("");
        let sy = SymbolString::new("");
        let params = Parameters::default();
        let pairs = get_aligned_pairs_with_banding(&[], &sx, &sy, &params).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn identical_short_sequences_align_every_position() {
        let sx = SymbolString::new("ACGTACGT");
        let sy = SymbolString::new("ACGTACGT");
        let params = Parameters::default();
        let pairs = get_aligned_pairs_with_banding(&[], &sx, &sy, &params).unwrap();
        assert!(!pairs.is_empty());
        for (p, x, y) in &pairs {
            assert!(*p >= 0 && *p <= crate::numerics::PROB_SCALE as i64);
            assert!(*x >= 0 && *x < sx.len() as i64);
            assert!(*y >= 0 && *y < sy.len() as i64);
        }
        // the identity diagonal should be recovered with high confidence
        let identity_hits = pairs.iter().filter(|(_, x, y)| x == y).count();
        assert!(identity_hits >= sx.len() / 2);
    }

    #[test]
    fn output_pairs_are_unique() {
        let sx = SymbolString::new("ACGTACGTACGT");
        let sy = SymbolString::new("ACGTACGTACGT");
        let params = Parameters::default();
        let pairs = get_aligned_pairs_with_banding(&[], &sx, &sy, &params).unwrap();
        let mut seen = std::collections::HashSet::new();
        for (_, x, y) in &pairs {
            assert!(seen.insert((*x, *y)), "duplicate aligned pair ({x}, {y})");
        }
    }

    #[test]
    fn deterministic_across_runs() {
        let sx = SymbolString::new("ACGTTGCATTAGCGT");
        let sy = SymbolString::new("ACGTTGCATAGCGT");
        let params = Parameters::default();
        let a = get_aligned_pairs_with_banding(&[], &sx, &sy, &params).unwrap();
        let b = get_aligned_pairs_with_banding(&[], &sx, &sy, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn checkpointing_does_not_change_the_result() {
        let sx = SymbolString::new("ACGTTGCATTAGCGTACGTTGCATTAGCGT");
        let sy = SymbolString::new("ACGTTGCATTAGCGTACGTTGCATTAGCGT");
        let mut frequent = Parameters::default();
        frequent.min_diags_between_trace_back = 3;
        frequent.trace_back_diagonals = 1;
        let coarse = Parameters::default();
        let a = get_aligned_pairs_with_banding(&[], &sx, &sy, &frequent).unwrap();
        let mut b = get_aligned_pairs_with_banding(&[], &sx, &sy, &coarse).unwrap();
        let mut a_sorted = a;
        a_sorted.sort();
        b.sort();
        assert_eq!(a_sorted, b);
    }

    #[test]
    fn anchors_guide_a_divergent_alignment() {
        let sx = SymbolString::new("ACGTACGTACGTACGTACGT");
        let sy = SymbolString::new("TTTTACGTACGTACGTACGTTTTT");
        let params = Parameters::default();
        let pairs = get_aligned_pairs_with_banding(&[(0, 4), (19, 23)], &sx, &sy, &params).unwrap();
        assert!(!pairs.is_empty());
    }
}
