//! Dense matrix-vector kernels used by the layers.
//!
//! Matrices are row-major with shape `(rows, cols)`. Callers validate lengths;
//! these helpers only `debug_assert!` them to stay inlineable.

/// `out = a * x + bias`.
#[inline]
pub(crate) fn matvec_add(
    rows: usize,
    cols: usize,
    a: &[f64],
    x: &[f64],
    bias: &[f64],
    out: &mut [f64],
) {
    debug_assert_eq!(a.len(), rows * cols);
    debug_assert_eq!(x.len(), cols);
    debug_assert_eq!(bias.len(), rows);
    debug_assert_eq!(out.len(), rows);

    for r in 0..rows {
        let row = &a[r * cols..(r + 1) * cols];
        let mut acc = bias[r];
        for (w, v) in row.iter().zip(x) {
            acc = w.mul_add(*v, acc);
        }
        out[r] = acc;
    }
}

/// `out = a^T * y`.
#[inline]
pub(crate) fn matvec_transposed(rows: usize, cols: usize, a: &[f64], y: &[f64], out: &mut [f64]) {
    debug_assert_eq!(a.len(), rows * cols);
    debug_assert_eq!(y.len(), rows);
    debug_assert_eq!(out.len(), cols);

    out.fill(0.0);
    for r in 0..rows {
        let row = &a[r * cols..(r + 1) * cols];
        let g = y[r];
        for (o, w) in out.iter_mut().zip(row) {
            *o = w.mul_add(g, *o);
        }
    }
}

/// Rank-1 update `a += alpha * u v^T`.
#[inline]
pub(crate) fn rank1_update(rows: usize, cols: usize, a: &mut [f64], alpha: f64, u: &[f64], v: &[f64]) {
    debug_assert_eq!(a.len(), rows * cols);
    debug_assert_eq!(u.len(), rows);
    debug_assert_eq!(v.len(), cols);

    for r in 0..rows {
        let scale = alpha * u[r];
        let row = &mut a[r * cols..(r + 1) * cols];
        for (w, x) in row.iter_mut().zip(v) {
            *w = scale.mul_add(*x, *w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matvec_add_matches_hand_computation() {
        // [[1, 2], [3, 4], [5, 6]] * [1, -1] + [0.5, 0, -0.5]
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut out = [0.0; 3];
        matvec_add(3, 2, &a, &[1.0, -1.0], &[0.5, 0.0, -0.5], &mut out);
        assert_eq!(out, [-0.5, -1.0, -1.5]);
    }

    #[test]
    fn transposed_and_rank1() {
        let mut a = vec![1.0, 2.0, 3.0, 4.0];
        let mut out = [0.0; 2];
        matvec_transposed(2, 2, &a, &[1.0, 1.0], &mut out);
        assert_eq!(out, [4.0, 6.0]);

        rank1_update(2, 2, &mut a, -1.0, &[1.0, 2.0], &[1.0, 0.5]);
        assert_eq!(a, vec![0.0, 1.5, 1.0, 3.0]);
    }
}
