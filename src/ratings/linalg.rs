//! Small dense linear algebra for the rating systems.
//!
//! League-sized systems (a few hundred teams at most) fit comfortably in a
//! dense row-major matrix, so Gaussian elimination with partial pivoting is
//! all the solver we need.

/// Pivots smaller than this (relative to the largest entry) mark the system singular.
const PIVOT_EPS: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.cols + c] = v;
    }

    pub fn add(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.cols + c] += v;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn fill_row(&mut self, r: usize, v: f64) {
        self.data[r * self.cols..(r + 1) * self.cols].fill(v);
    }

    /// Append a row; `values` must have `cols` entries.
    pub fn push_row(&mut self, values: &[f64]) {
        debug_assert_eq!(values.len(), self.cols);
        self.data.extend_from_slice(values);
        self.rows += 1;
    }

    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.rows)
            .map(|r| self.row(r).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// (AᵀA, Aᵀb) for the normal equations.
    pub fn normal_equations(&self, b: &[f64]) -> (Matrix, Vec<f64>) {
        let n = self.cols;
        let mut ata = Matrix::zeros(n, n);
        let mut atb = vec![0.0; n];
        for r in 0..self.rows {
            let row = self.row(r);
            for i in 0..n {
                if row[i] == 0.0 {
                    continue;
                }
                atb[i] += row[i] * b[r];
                for j in 0..n {
                    ata.add(i, j, row[i] * row[j]);
                }
            }
        }
        (ata, atb)
    }

    fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }
}

/// Solve a square system `A x = b`. Returns `None` when `A` is singular or
/// the solution is not finite.
pub fn solve(a: &Matrix, b: &[f64]) -> Option<Vec<f64>> {
    let n = a.rows();
    if n == 0 || a.cols() != n || b.len() != n {
        return None;
    }
    let tolerance = PIVOT_EPS * a.max_abs().max(1.0);

    // Augmented working copy
    let mut m = a.data.clone();
    let mut rhs = b.to_vec();
    let idx = |r: usize, c: usize| r * n + c;

    for k in 0..n {
        let pivot_row = (k..n).max_by(|&x, &y| {
            m[idx(x, k)]
                .abs()
                .partial_cmp(&m[idx(y, k)].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if m[idx(pivot_row, k)].abs() < tolerance {
            return None;
        }
        if pivot_row != k {
            for c in 0..n {
                m.swap(idx(k, c), idx(pivot_row, c));
            }
            rhs.swap(k, pivot_row);
        }
        let pivot = m[idx(k, k)];
        for r in (k + 1)..n {
            let factor = m[idx(r, k)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for c in k..n {
                m[idx(r, c)] -= factor * m[idx(k, c)];
            }
            rhs[r] -= factor * rhs[k];
        }
    }

    let mut x = vec![0.0; n];
    for r in (0..n).rev() {
        let tail: f64 = ((r + 1)..n).map(|c| m[idx(r, c)] * x[c]).sum();
        x[r] = (rhs[r] - tail) / m[idx(r, r)];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Least-squares solution of an overdetermined `A x ≈ b` via the normal
/// equations. `None` when AᵀA is singular.
pub fn least_squares(a: &Matrix, b: &[f64]) -> Option<Vec<f64>> {
    if a.rows() != b.len() {
        return None;
    }
    let (ata, atb) = a.normal_equations(b);
    solve(&ata, &atb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[&[f64]]) -> Matrix {
        let mut m = Matrix::zeros(0, rows[0].len());
        for r in rows {
            m.push_row(r);
        }
        m
    }

    #[test]
    fn test_solve_2x2() {
        // 2x + y = 5, x - y = 1 -> x = 2, y = 1
        let a = from_rows(&[&[2.0, 1.0], &[1.0, -1.0]]);
        let x = solve(&a, &[5.0, 1.0]).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        // Zero in the leading position forces a row swap
        let a = from_rows(&[&[0.0, 1.0], &[1.0, 0.0]]);
        let x = solve(&a, &[3.0, 4.0]).unwrap();
        assert_eq!(x, vec![4.0, 3.0]);
    }

    #[test]
    fn test_singular_returns_none() {
        let a = from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]);
        assert!(solve(&a, &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_non_square_returns_none() {
        let a = from_rows(&[&[1.0, 2.0]]);
        assert!(solve(&a, &[1.0]).is_none());
        assert!(solve(&Matrix::zeros(0, 0), &[]).is_none());
    }

    #[test]
    fn test_least_squares_line_fit() {
        // Fit y = c0 + c1 x through (0,1), (1,3), (2,5): exact line 1 + 2x
        let a = from_rows(&[&[1.0, 0.0], &[1.0, 1.0], &[1.0, 2.0]]);
        let x = least_squares(&a, &[1.0, 3.0, 5.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_mul_vec() {
        let a = from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(a.mul_vec(&[1.0, 1.0]), vec![3.0, 7.0]);
    }
}
