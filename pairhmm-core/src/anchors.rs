//! Sorting, overlap filtering, and repeat-mask recursion that turn raw seed
//! matches into the strictly-increasing anchor chain the band is built
//! from.

use std::collections::BTreeSet;

use crate::error::{PairwiseAlignmentError, Result};
use crate::params::Parameters;
use crate::seed_finder::SeedFinder;

/// Checks the precondition the banded engine relies on: `anchor_pairs` is
/// strictly increasing in both coordinates and stays within `[0,lX) x
/// [0,lY)`. Anchors coming out of [`filter_to_remove_overlap`] always
/// satisfy this; the check exists for anchors supplied directly by a
/// caller (a custom [`SeedFinder`], or a hand-built test fixture).
pub fn validate_anchor_chain(anchor_pairs: &[(i64, i64)], l_x: i64, l_y: i64) -> Result<()> {
    let mut prev: Option<(i64, i64)> = None;
    for &(x, y) in anchor_pairs {
        if x < 0 || x >= l_x || y < 0 || y >= l_y {
            return Err(PairwiseAlignmentError::BadAnchors(format!(
                "anchor ({x},{y}) out of range [0,{l_x}) x [0,{l_y})"
            )));
        }
        if let Some((px, py)) = prev {
            if x <= px || y <= py {
                return Err(PairwiseAlignmentError::BadAnchors(format!(
                    "anchors must be strictly increasing in both coordinates: ({px},{py}) then ({x},{y})"
                )));
            }
        }
        prev = Some((x, y));
    }
    Ok(())
}

/// Greedily keeps the longest strictly-increasing (in both `x` and `y`)
/// subsequence of a list of pairs already sorted by `x+y`. A pair survives
/// only if it both dominates everything before it and is dominated by
/// nothing after it, so a backward pass (marking pairs whose suffix is
/// strictly smaller) and a forward pass (checking membership while also
/// requiring strict increase) together pick out a consistent chain.
pub fn filter_to_remove_overlap(sorted_overlapping_pairs: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut survivors: BTreeSet<(i64, i64)> = BTreeSet::new();
    let (mut px, mut py) = (i64::MAX, i64::MAX);
    for &(x, y) in sorted_overlapping_pairs.iter().rev() {
        if x < px && y < py {
            survivors.insert((x, y));
        }
        px = px.min(x);
        py = py.min(y);
    }

    let mut non_overlapping = Vec::new();
    let (mut px, mut py) = (i64::MIN, i64::MIN);
    for &(x, y) in sorted_overlapping_pairs {
        if x > px && y > py && survivors.contains(&(x, y)) {
            non_overlapping.push((x, y));
        }
        px = px.max(x);
        py = py.max(y);
    }
    non_overlapping
}

fn get_blast_pairs_for_pairwise_alignment_parameters_p(
    finder: &dyn SeedFinder,
    sx: &str,
    sy: &str,
    p_x: i64,
    p_y: i64,
    x: i64,
    y: i64,
    params: &Parameters,
    combined_anchor_pairs: &mut Vec<(i64, i64)>,
) -> Result<()> {
    let l_x2 = x - p_x;
    debug_assert!(l_x2 >= 0);
    let l_y2 = y - p_y;
    debug_assert!(l_y2 >= 0);
    let matrix_size = l_x2 * l_y2;
    if matrix_size > params.repeat_mask_matrix_bigger_than_this {
        let sx2 = &sx[p_x as usize..x as usize];
        let sy2 = &sy[p_y as usize..y as usize];
        let unfiltered = finder.find_seed_matches(sx2, sy2, params.constraint_diagonal_trim, false)?;
        let mut unfiltered = unfiltered;
        unfiltered.sort();
        let bottom_level = filter_to_remove_overlap(&unfiltered);
        tracing::debug!(
            unfiltered = unfiltered.len(),
            filtered = bottom_level.len(),
            "bottom level anchor pairs"
        );
        combined_anchor_pairs.extend(bottom_level.into_iter().map(|(x, y)| (x + p_x, y + p_y)));
    }
    Ok(())
}

/// Builds the combined anchor chain: a coarse top-level pass with repeat
/// masking on, then a finer bottom-level recursion (repeat masking off)
/// into every unanchored rectangle large enough to warrant it.
pub fn get_blast_pairs_for_pairwise_alignment_parameters(
    finder: &dyn SeedFinder,
    sx: &str,
    sy: &str,
    params: &Parameters,
) -> Result<Vec<(i64, i64)>> {
    let l_x = sx.len() as i64;
    let l_y = sy.len() as i64;
    if l_x * l_y <= params.anchor_matrix_bigger_than_this {
        return Ok(Vec::new());
    }

    let mut unfiltered_top_level = finder.find_seed_matches(sx, sy, params.constraint_diagonal_trim, true)?;
    unfiltered_top_level.sort();
    let top_level = filter_to_remove_overlap(&unfiltered_top_level);
    tracing::debug!(
        unfiltered = unfiltered_top_level.len(),
        filtered = top_level.len(),
        "top level anchor pairs"
    );

    let mut p_x = 0i64;
    let mut p_y = 0i64;
    let mut combined = Vec::new();
    for &(x, y) in &top_level {
        debug_assert!(x >= 0 && x < l_x);
        debug_assert!(y >= 0 && y < l_y);
        debug_assert!(x >= p_x);
        debug_assert!(y >= p_y);
        get_blast_pairs_for_pairwise_alignment_parameters_p(finder, sx, sy, p_x, p_y, x, y, params, &mut combined)?;
        combined.push((x, y));
        p_x = x + 1;
        p_y = y + 1;
    }
    get_blast_pairs_for_pairwise_alignment_parameters_p(finder, sx, sy, p_x, p_y, l_x, l_y, params, &mut combined)?;

    tracing::debug!(combined = combined.len(), "combined anchor pairs");
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_finder::FixedSeedFinder;

    #[test]
    fn validate_accepts_a_strictly_increasing_chain() {
        assert!(validate_anchor_chain(&[(0, 0), (2, 1), (4, 3)], 10, 10).is_ok());
    }

    #[test]
    fn validate_rejects_a_repeated_coordinate() {
        assert!(validate_anchor_chain(&[(0, 0), (0, 1)], 10, 10).is_err());
        assert!(validate_anchor_chain(&[(0, 0), (1, 0)], 10, 10).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_anchors() {
        assert!(validate_anchor_chain(&[(10, 0)], 10, 10).is_err());
        assert!(validate_anchor_chain(&[(0, -1)], 10, 10).is_err());
    }

    #[test]
    fn filter_preserves_an_already_strictly_increasing_chain() {
        let pairs = vec![(0, 0), (2, 1), (4, 3), (6, 8)];
        assert_eq!(filter_to_remove_overlap(&pairs), pairs);
    }

    #[test]
    fn filter_drops_pairs_sharing_a_coordinate() {
        // (1, 1) and (1, 5) both reuse x = 1, so only the strictly
        // increasing prefix (0, 0) survives.
        let pairs = vec![(0, 0), (1, 1), (1, 5)];
        assert_eq!(filter_to_remove_overlap(&pairs), vec![(0, 0)]);
    }

    #[test]
    fn filter_is_idempotent() {
        let pairs = vec![(0, 0), (2, 1), (4, 3), (6, 8)];
        let once = filter_to_remove_overlap(&pairs);
        let twice = filter_to_remove_overlap(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn small_matrix_needs_no_anchors() {
        let finder = FixedSeedFinder::new(vec![(10, 10)]);
        let params = Parameters::default();
        let anchors = get_blast_pairs_for_pairwise_alignment_parameters(&finder, "ACGT", "ACGT", &params).unwrap();
        assert!(anchors.is_empty());
    }

    #[test]
    fn large_matrix_recurses_into_bottom_level_anchors() {
        let finder = FixedSeedFinder::new(vec![(100, 100)]);
        let mut params = Parameters::default();
        params.anchor_matrix_bigger_than_this = 10;
        params.repeat_mask_matrix_bigger_than_this = 10;
        let sx = "A".repeat(600);
        let sy = "A".repeat(600);
        let anchors = get_blast_pairs_for_pairwise_alignment_parameters(&finder, &sx, &sy, &params).unwrap();
        assert!(!anchors.is_empty());
    }
}
