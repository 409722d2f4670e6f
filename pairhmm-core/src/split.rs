//! Partitions a pairwise alignment problem into sub-rectangles bounded by
//! `splitMatrixBiggerThanThis`, so no single banded sweep has to hold an
//! unbounded matrix in memory.

use tracing::debug;

use crate::engine::{get_aligned_pairs_with_banding, AlignedPair};
use crate::error::Result;
use crate::params::Parameters;
use crate::symbol::SymbolString;

/// An inclusive-exclusive sub-rectangle `[x1, x2) x [y1, y2)` of the full
/// problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SplitPoint {
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
}

fn get_split_points_p(x1: &mut i64, y1: &mut i64, x2: i64, y2: i64, x3: i64, y3: i64, split_points: &mut Vec<SplitPoint>, split_matrix_bigger_than_this: i64) {
    let l_x2 = x3 - x2;
    let l_y2 = y3 - y2;
    let matrix_size = l_x2 * l_y2;
    if matrix_size > split_matrix_bigger_than_this {
        debug!(x1 = x2, x2 = x3, y1 = y2, y2 = y3, "split point found");
        let max_sequence_length = (split_matrix_bigger_than_this as f64).sqrt() as i64;
        let h_x = if l_x2 / 2 > max_sequence_length { max_sequence_length } else { l_x2 / 2 };
        let h_y = if l_y2 / 2 > max_sequence_length { max_sequence_length } else { l_y2 / 2 };
        split_points.push(SplitPoint {
            x1: *x1,
            y1: *y1,
            x2: x2 + h_x,
            y2: y2 + h_y,
        });
        *x1 = x3 - h_x;
        *y1 = y3 - h_y;
    }
}

/// Builds the split rectangles that cover `0..lX x 0..lY`, breaking at
/// anchor-to-anchor gaps whose enclosing rectangle exceeds the area budget.
fn get_split_points(anchor_pairs: &[(i64, i64)], l_x: i64, l_y: i64, split_matrix_bigger_than_this: i64) -> Vec<SplitPoint> {
    debug_assert!(l_x >= 0);
    debug_assert!(l_y >= 0);
    let (mut x1, mut y1) = (0i64, 0i64);
    let (mut x2, mut y2) = (0i64, 0i64);
    let mut split_points = Vec::new();
    for &(x3, y3) in anchor_pairs {
        get_split_points_p(&mut x1, &mut y1, x2, y2, x3, y3, &mut split_points, split_matrix_bigger_than_this);
        debug_assert!(x3 >= x2);
        debug_assert!(y3 >= y2);
        debug_assert!(x3 < l_x);
        debug_assert!(y3 < l_y);
        x2 = x3 + 1;
        y2 = y3 + 1;
    }
    get_split_points_p(&mut x1, &mut y1, x2, y2, l_x, l_y, &mut split_points, split_matrix_bigger_than_this);
    split_points.push(SplitPoint { x1, y1, x2: l_x, y2: l_y });

    if split_points.len() > 1 {
        debug!(l_x, l_y, splits = split_points.len(), "split sequences into sub-regions");
    }
    split_points
}

/// Runs [`get_aligned_pairs_with_banding`] over each split rectangle in
/// turn, shifting anchors and results back into the original coordinate
/// system. This is the top-level driver: anchors come in already filtered
/// and globally sorted by `x`.
pub fn split_alignments_by_large_gaps(
    anchor_pairs: &[(i64, i64)],
    sx: &SymbolString,
    sy: &SymbolString,
    params: &Parameters,
) -> Result<Vec<AlignedPair>> {
    let l_x = sx.len() as i64;
    let l_y = sy.len() as i64;
    let split_points = get_split_points(anchor_pairs, l_x, l_y, params.split_matrix_bigger_than_this);

    let mut j = 0usize;
    let mut aligned_pairs = Vec::new();
    for region in &split_points {
        let sx2 = sx.substring(region.x1 as usize, (region.x2 - region.x1) as usize);
        let sy2 = sy.substring(region.y1 as usize, (region.y2 - region.y1) as usize);

        let mut sub_anchors = Vec::new();
        while j < anchor_pairs.len() {
            let (x, y) = anchor_pairs[j];
            let xay = x + y;
            debug_assert!(xay >= region.x1 + region.y1);
            if xay >= region.x2 + region.y2 {
                break;
            }
            debug_assert!(x >= region.x1 && x < region.x2);
            debug_assert!(y >= region.y1 && y < region.y2);
            sub_anchors.push((x - region.x1, y - region.y1));
            j += 1;
        }

        let sub_aligned_pairs = get_aligned_pairs_with_banding(&sub_anchors, &sx2, &sy2, params)?;
        aligned_pairs.extend(
            sub_aligned_pairs
                .into_iter()
                .map(|(p, x, y)| (p, x + region.x1, y + region.y1)),
        );
    }
    debug_assert_eq!(j, anchor_pairs.len());
    debug!(pairs = aligned_pairs.len(), l_x, l_y, "aligned sub-regions");
    Ok(aligned_pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_split_needed_for_small_problems() {
        let sx = SymbolString::new("ACGTACGT");
        let sy = SymbolString::new("ACGTACGT");
        let params = Parameters::default();
        let split_points = get_split_points(&[], sx.len() as i64, sy.len() as i64, params.split_matrix_bigger_than_this);
        assert_eq!(split_points.len(), 1);
        assert_eq!(split_points[0], SplitPoint { x1: 0, y1: 0, x2: 8, y2: 8 });
    }

    #[test]
    fn a_large_gap_forces_a_split() {
        let split_points = get_split_points(&[], 10_000, 10_000, 100);
        assert!(split_points.len() > 1);
        for region in split_points.windows(2) {
            assert!(region[0].x2 <= region[1].x1 + 1);
        }
    }

    #[test]
    fn split_driver_recovers_the_same_pairs_as_an_unsplit_run() {
        let sx = SymbolString::new("ACGTTGCATTAGCGTACGTTGCATTAGCGT");
        let sy = SymbolString::new("ACGTTGCATTAGCGTACGTTGCATTAGCGT");
        let params = Parameters::default();
        let mut split = split_alignments_by_large_gaps(&[], &sx, &sy, &params).unwrap();
        let mut direct = get_aligned_pairs_with_banding(&[], &sx, &sy, &params).unwrap();
        split.sort();
        direct.sort();
        assert_eq!(split, direct);
    }
}
