//! Sparse storage of antidiagonals for one direction of the DP sweep.

use crate::diagonal::Diagonal;
use crate::error::{PairwiseAlignmentError, Result};
use crate::state::{cell_calculate, cell_dot_product, zero_cell, Cell, State, Transition, STATE_NUMBER};
use crate::symbol::SymbolString;

/// One antidiagonal's worth of cells, addressed by `xmy`.
#[derive(Debug, Clone)]
pub struct DpDiagonal {
    diagonal: Diagonal,
    cells: Vec<Cell>,
}

impl DpDiagonal {
    pub fn new(diagonal: Diagonal) -> DpDiagonal {
        let width = diagonal.width();
        debug_assert!(width >= 0);
        DpDiagonal {
            diagonal,
            cells: vec![zero_cell(); width as usize],
        }
    }

    pub fn diagonal(&self) -> Diagonal {
        self.diagonal
    }

    fn index_of(&self, xmy: i64) -> Option<usize> {
        if xmy < self.diagonal.xmy_l() || xmy > self.diagonal.xmy_r() {
            return None;
        }
        debug_assert_eq!((self.diagonal.xay() + xmy) % 2, 0);
        Some(((xmy - self.diagonal.xmy_l()) / 2) as usize)
    }

    pub fn get_cell(&self, xmy: i64) -> Option<&Cell> {
        self.index_of(xmy).map(|i| &self.cells[i])
    }

    pub fn get_cell_mut(&mut self, xmy: i64) -> Option<&mut Cell> {
        self.index_of(xmy).map(move |i| &mut self.cells[i])
    }

    /// Borrows the cells at `xmy_a` and `xmy_b` simultaneously. `xmy_a` and
    /// `xmy_b` are always distinct (they differ by 2 in every caller), so
    /// this never aliases.
    pub fn get_pair_mut(&mut self, xmy_a: i64, xmy_b: i64) -> (Option<&mut Cell>, Option<&mut Cell>) {
        let ia = self.index_of(xmy_a);
        let ib = self.index_of(xmy_b);
        match (ia, ib) {
            (Some(a), Some(b)) => {
                debug_assert_ne!(a, b);
                if a < b {
                    let (left, right) = self.cells.split_at_mut(b);
                    (Some(&mut left[a]), Some(&mut right[0]))
                } else {
                    let (left, right) = self.cells.split_at_mut(a);
                    (Some(&mut right[0]), Some(&mut left[b]))
                }
            }
            (Some(a), None) => (Some(&mut self.cells[a]), None),
            (None, Some(b)) => (None, Some(&mut self.cells[b])),
            (None, None) => (None, None),
        }
    }

    pub fn zero_values(&mut self) {
        for cell in &mut self.cells {
            *cell = zero_cell();
        }
    }

    pub fn initialise_values(&mut self, f: impl Fn(State) -> f64) {
        for cell in &mut self.cells {
            for (i, state) in State::ALL.iter().enumerate() {
                cell[i] = f(*state);
            }
        }
    }

    /// Clones the diagonal's shape with every cell reset to `LOG_ZERO`.
    pub fn clone_zeroed(&self) -> DpDiagonal {
        let mut clone = DpDiagonal::new(self.diagonal);
        clone.zero_values();
        clone
    }

    pub fn dot_product(&self, other: &DpDiagonal) -> Result<f64> {
        if self.diagonal != other.diagonal {
            return Err(PairwiseAlignmentError::Internal(format!(
                "dot_product requires matching diagonals: {:?} vs {:?}",
                self.diagonal, other.diagonal
            )));
        }
        let mut total = crate::numerics::LOG_ZERO;
        let mut xmy = self.diagonal.xmy_l();
        while xmy <= self.diagonal.xmy_r() {
            let a = self.get_cell(xmy).unwrap();
            let b = other.get_cell(xmy).unwrap();
            total = crate::numerics::log_add(total, cell_dot_product(a, b));
            xmy += 2;
        }
        Ok(total)
    }
}

/// Sparse mapping from antidiagonal index to its `DpDiagonal`, tracking how
/// many are currently live.
pub struct DpMatrix {
    diagonals: Vec<Option<DpDiagonal>>,
    active: usize,
}

impl DpMatrix {
    pub fn new(diagonal_number: i64) -> DpMatrix {
        debug_assert!(diagonal_number >= 0);
        DpMatrix {
            diagonals: (0..=diagonal_number).map(|_| None).collect(),
            active: 0,
        }
    }

    pub fn get(&self, xay: i64) -> Option<&DpDiagonal> {
        if xay < 0 {
            return None;
        }
        self.diagonals.get(xay as usize).and_then(|d| d.as_ref())
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn create(&mut self, diagonal: Diagonal) -> Result<&mut DpDiagonal> {
        let xay = diagonal.xay();
        if xay < 0 || xay as usize >= self.diagonals.len() {
            return Err(PairwiseAlignmentError::Internal(format!(
                "antidiagonal {xay} out of range 0..{}",
                self.diagonals.len()
            )));
        }
        if self.diagonals[xay as usize].is_some() {
            return Err(PairwiseAlignmentError::Internal(format!(
                "antidiagonal {xay} is already live"
            )));
        }
        self.diagonals[xay as usize] = Some(DpDiagonal::new(diagonal));
        self.active += 1;
        Ok(self.diagonals[xay as usize].as_mut().unwrap())
    }

    pub fn delete(&mut self, xay: i64) {
        if xay < 0 || xay as usize >= self.diagonals.len() {
            return;
        }
        if self.diagonals[xay as usize].take().is_some() {
            self.active -= 1;
        }
    }

    /// Temporarily removes the diagonal at `xay` from storage so it can be
    /// borrowed mutably alongside its neighbors without violating aliasing
    /// rules; callers must `put` it back (this does not affect
    /// `active_count`, since the diagonal is still conceptually live).
    fn take(&mut self, xay: i64) -> Option<DpDiagonal> {
        if xay < 0 || xay as usize >= self.diagonals.len() {
            return None;
        }
        self.diagonals[xay as usize].take()
    }

    fn put(&mut self, xay: i64, diagonal: DpDiagonal) {
        self.diagonals[xay as usize] = Some(diagonal);
    }
}

/// The single traversal behind both `diagonal_calculation_forward` and
/// `diagonal_calculation_backward`: `lower_upper` supplies both the lower
/// (`xmy-1`) and upper (`xmy+1`) neighbor cells, `middle` supplies the
/// `xmy` cell two antidiagonals back.
pub fn diagonal_calculation<T: Transition>(
    current: &mut DpDiagonal,
    mut lower_upper: Option<&mut DpDiagonal>,
    mut middle: Option<&mut DpDiagonal>,
    sx: &SymbolString,
    sy: &SymbolString,
) {
    let diagonal = current.diagonal();
    let mut xmy = diagonal.xmy_l();
    while xmy <= diagonal.xmy_r() {
        let xay = diagonal.xay();
        let x = crate::diagonal::x_coord(xay, xmy);
        let y = crate::diagonal::y_coord(xay, xmy);
        let cx = sx.at_matrix_coord(x);
        let cy = sy.at_matrix_coord(y);

        let (lower, upper) = match lower_upper.as_deref_mut() {
            Some(d) => d.get_pair_mut(xmy - 1, xmy + 1),
            None => (None, None),
        };
        let middle_cell = middle.as_deref_mut().and_then(|d| d.get_cell_mut(xmy));
        let current_cell = current.get_cell_mut(xmy).unwrap();
        cell_calculate::<T>(current_cell, lower, middle_cell, upper, cx, cy);
        xmy += 2;
    }
}

pub fn diagonal_calculation_forward(
    xay: i64,
    matrix: &mut DpMatrix,
    sx: &SymbolString,
    sy: &SymbolString,
) {
    let mut current = matrix.take(xay).expect("forward diagonal must be created before use");
    let mut m1 = matrix.take(xay - 1);
    let mut m2 = matrix.take(xay - 2);
    diagonal_calculation::<crate::state::Forward>(&mut current, m1.as_mut(), m2.as_mut(), sx, sy);
    matrix.put(xay, current);
    if let Some(d) = m1 {
        matrix.put(xay - 1, d);
    }
    if let Some(d) = m2 {
        matrix.put(xay - 2, d);
    }
}

pub fn diagonal_calculation_backward(
    xay: i64,
    matrix: &mut DpMatrix,
    sx: &SymbolString,
    sy: &SymbolString,
) {
    let mut current = matrix.take(xay).expect("backward diagonal must be created before use");
    let mut m1 = matrix.take(xay - 1);
    let mut m2 = matrix.take(xay - 2);
    diagonal_calculation::<crate::state::Backward>(&mut current, m1.as_mut(), m2.as_mut(), sx, sy);
    matrix.put(xay, current);
    if let Some(d) = m1 {
        matrix.put(xay - 1, d);
    }
    if let Some(d) = m2 {
        matrix.put(xay - 2, d);
    }
}

/// Total forward*backward probability through antidiagonal `xay`, including
/// the contribution of matches passing through it (the "imaginary" match
/// diagonal stitched from `forward[xay-1]` and `backward[xay+1]`).
pub fn diagonal_calculation_total_probability(
    xay: i64,
    forward: &mut DpMatrix,
    backward: &mut DpMatrix,
    sx: &SymbolString,
    sy: &SymbolString,
) -> Result<f64> {
    let mut total = {
        let f = forward.get(xay).expect("forward diagonal missing");
        let b = backward.get(xay).expect("backward diagonal missing");
        f.dot_product(b)?
    };

    if let (Some(fwd_m1), Some(bwd_p1)) = (matrix_has(forward, xay - 1), matrix_has(backward, xay + 1)) {
        debug_assert!(fwd_m1 && bwd_p1);
        let mut match_diagonal = backward.get(xay + 1).unwrap().clone_zeroed();
        let mut fwd_m1_diag = forward.take(xay - 1).unwrap();
        diagonal_calculation::<crate::state::Forward>(
            &mut match_diagonal,
            None,
            Some(&mut fwd_m1_diag),
            sx,
            sy,
        );
        forward.put(xay - 1, fwd_m1_diag);
        let bwd_p1 = backward.get(xay + 1).unwrap();
        total = crate::numerics::log_add(total, match_diagonal.dot_product(bwd_p1)?);
    }

    Ok(total)
}

fn matrix_has(matrix: &DpMatrix, xay: i64) -> Option<bool> {
    matrix.get(xay).map(|_| true)
}

/// For every in-range cell `(x, y)` with `x > 0` and `y > 0`, the posterior
/// match probability, quantised to an integer in `[0, PROB_SCALE]` and kept
/// only when at or above `threshold`.
pub fn diagonal_calculation_posterior_match_probs(
    xay: i64,
    forward: &DpMatrix,
    backward: &DpMatrix,
    threshold: f64,
    total_probability: f64,
    out: &mut Vec<(i64, i64, i64)>,
) {
    let forward_diagonal = forward.get(xay).expect("forward diagonal missing");
    let backward_diagonal = backward.get(xay).expect("backward diagonal missing");
    let diagonal = forward_diagonal.diagonal();
    let mut xmy = diagonal.xmy_l();
    while xmy <= diagonal.xmy_r() {
        let x = crate::diagonal::x_coord(diagonal.xay(), xmy);
        let y = crate::diagonal::y_coord(diagonal.xay(), xmy);
        if x > 0 && y > 0 {
            let cell_forward = forward_diagonal.get_cell(xmy).unwrap();
            let cell_backward = backward_diagonal.get_cell(xmy).unwrap();
            let mut p = (cell_forward[State::Match as usize] + cell_backward[State::Match as usize]
                - total_probability)
                .exp();
            if p >= threshold {
                if p > 1.0 {
                    p = 1.0;
                }
                let quantised = (p * crate::numerics::PROB_SCALE).floor() as i64;
                out.push((quantised, x - 1, y - 1));
            }
        }
        xmy += 2;
    }
}

#[allow(dead_code)]
const _: usize = STATE_NUMBER;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::start_state_prob;

    fn diag(xay: i64, l: i64, r: i64) -> Diagonal {
        Diagonal::new(xay, l, r).unwrap()
    }

    #[test]
    fn create_and_delete_is_idempotent() {
        let mut m = DpMatrix::new(4);
        m.create(diag(0, 0, 0)).unwrap();
        assert_eq!(m.active_count(), 1);
        m.delete(0);
        assert_eq!(m.active_count(), 0);
        m.delete(0); // no-op
        assert_eq!(m.active_count(), 0);
    }

    #[test]
    fn create_twice_errors() {
        let mut m = DpMatrix::new(4);
        m.create(diag(0, 0, 0)).unwrap();
        assert!(m.create(diag(0, 0, 0)).is_err());
    }

    #[test]
    fn initialise_and_zero() {
        let mut d = DpDiagonal::new(diag(2, -2, 2));
        d.initialise_values(start_state_prob);
        assert_eq!(d.get_cell(0).unwrap()[State::Match as usize], 0.0);
        d.zero_values();
        assert_eq!(d.get_cell(0).unwrap()[State::Match as usize], crate::numerics::LOG_ZERO);
    }

    #[test]
    fn out_of_range_cell_is_none() {
        let d = DpDiagonal::new(diag(2, -2, 2));
        assert!(d.get_cell(4).is_none());
        assert!(d.get_cell(-4).is_none());
    }
}
