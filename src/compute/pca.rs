//! Principal component analysis over attribute vectors.
//!
//! The fit is mean-centred and unscaled. Components come from the symmetric
//! eigen-decomposition of the sample covariance matrix, computed with cyclic
//! Jacobi rotations. Attribute widths are small (a handful of columns), so the
//! `O(d^3)` sweeps are negligible next to the `O(n d^2)` covariance pass.

/// Maximum number of Jacobi sweeps before giving up on convergence.
const MAX_SWEEPS: usize = 64;

/// Relative off-diagonal mass at which a sweep counts as converged.
const CONVERGENCE_EPS: f64 = 1e-24;

/// PCA fitting errors.
#[derive(Debug, thiserror::Error)]
pub enum PcaError {
    #[error("Cannot fit PCA on an empty corpus")]
    Empty,
    #[error("Cannot fit PCA on zero-width vectors")]
    ZeroWidth,
    #[error("Row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// A fitted principal-component projection.
#[derive(Debug, Clone)]
pub struct Pca {
    /// Per-dimension mean of the corpus.
    mean: Vec<f64>,
    /// Unit eigenvectors, one per row, by descending eigenvalue.
    components: Vec<Vec<f64>>,
    /// Variance along each component.
    eigenvalues: Vec<f64>,
    /// Number of rows the fit saw.
    samples: usize,
}

impl Pca {
    /// Fit on a corpus of equal-width rows.
    ///
    /// The iterator is walked twice (mean, then covariance), so it must be
    /// cheap to clone.
    pub fn fit<'a, I>(rows: I) -> Result<Self, PcaError>
    where
        I: Iterator<Item = &'a [f64]> + Clone,
    {
        let mut first = rows.clone();
        let width = first.next().ok_or(PcaError::Empty)?.len();
        if width == 0 {
            return Err(PcaError::ZeroWidth);
        }

        let mut mean = vec![0.0f64; width];
        let mut samples = 0usize;
        for (row_idx, row) in rows.clone().enumerate() {
            if row.len() != width {
                return Err(PcaError::RaggedRow {
                    row: row_idx,
                    expected: width,
                    found: row.len(),
                });
            }
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v;
            }
            samples += 1;
        }
        for m in &mut mean {
            *m /= samples as f64;
        }

        // Upper triangle only; mirrored afterwards.
        let mut cov = vec![vec![0.0f64; width]; width];
        let mut centered = vec![0.0f64; width];
        for row in rows {
            for ((c, &v), &m) in centered.iter_mut().zip(row).zip(&mean) {
                *c = v - m;
            }
            for i in 0..width {
                let ci = centered[i];
                for j in i..width {
                    cov[i][j] += ci * centered[j];
                }
            }
        }
        let denom = if samples > 1 { (samples - 1) as f64 } else { 1.0 };
        for i in 0..width {
            for j in i..width {
                cov[i][j] /= denom;
                cov[j][i] = cov[i][j];
            }
        }

        let (values, vectors) = symmetric_eigen(cov);

        let mut order: Vec<usize> = (0..width).collect();
        order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

        let mut components = Vec::with_capacity(width);
        let mut eigenvalues = Vec::with_capacity(width);
        for &k in &order {
            let mut component: Vec<f64> = (0..width).map(|row| vectors[row][k]).collect();
            fix_sign(&mut component);
            components.push(component);
            // Round-off can leave tiny negative variances.
            eigenvalues.push(values[k].max(0.0));
        }

        Ok(Self {
            mean,
            components,
            eigenvalues,
            samples,
        })
    }

    /// Input dimensionality.
    #[inline]
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Number of rows seen by the fit.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Corpus mean.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Unit component vectors by descending variance.
    pub fn components(&self) -> &[Vec<f64>] {
        &self.components
    }

    /// Variance along each component.
    pub fn explained_variance(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Fraction of total variance along each component.
    ///
    /// All zeros when the corpus has no variance at all.
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        let total: f64 = self.eigenvalues.iter().sum();
        if total > 0.0 {
            self.eigenvalues.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; self.eigenvalues.len()]
        }
    }

    /// Summed explained-variance ratio of the first `k` components.
    pub fn explained_variance_top(&self, k: usize) -> f64 {
        self.explained_variance_ratio().iter().take(k).sum()
    }

    /// Project `row` onto the leading `out.len()` components.
    ///
    /// Slots beyond the available components are set to zero.
    pub fn project_into(&self, row: &[f64], out: &mut [f64]) {
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = self.components.get(k).map_or(0.0, |c| {
                c.iter()
                    .zip(row)
                    .zip(&self.mean)
                    .map(|((w, v), m)| w * (v - m))
                    .sum()
            });
        }
    }
}

/// Flip `v` so its largest-magnitude entry is positive.
///
/// Eigenvectors are only defined up to sign; pinning it keeps projections
/// stable across runs.
fn fix_sign(v: &mut [f64]) {
    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotation.
///
/// Returns `(eigenvalues, eigenvectors)` where eigenvector `k` is column `k`
/// of the returned matrix. Order is unspecified.
pub fn symmetric_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let total: f64 = a.iter().flatten().map(|x| x * x).sum();

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[p][q] * a[p][q];
            }
        }
        if off <= CONVERGENCE_EPS * total {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for row in a.iter_mut() {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let values = (0..n).map(|i| a[i][i]).collect();
    (values, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(rows: &[Vec<f64>]) -> Pca {
        Pca::fit(rows.iter().map(Vec::as_slice)).unwrap()
    }

    #[test]
    fn test_eigen_2x2() {
        let (values, vectors) = symmetric_eigen(vec![vec![2.0, 1.0], vec![1.0, 2.0]]);
        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        assert!((sorted[0] - 1.0).abs() < 1e-12);
        assert!((sorted[1] - 3.0).abs() < 1e-12);

        // A v = lambda v for each column
        let a = [[2.0, 1.0], [1.0, 2.0]];
        for k in 0..2 {
            for i in 0..2 {
                let av: f64 = (0..2).map(|j| a[i][j] * vectors[j][k]).sum();
                assert!((av - values[k] * vectors[i][k]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_eigen_orthonormal() {
        let m = vec![
            vec![4.0, 1.0, -2.0, 0.5],
            vec![1.0, 3.0, 0.0, 1.5],
            vec![-2.0, 0.0, 5.0, -1.0],
            vec![0.5, 1.5, -1.0, 2.0],
        ];
        let (_, v) = symmetric_eigen(m);
        for a in 0..4 {
            for b in 0..4 {
                let dot: f64 = (0..4).map(|i| v[i][a] * v[i][b]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_fit_collinear() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let pca = fit(&rows);
        let ratio = pca.explained_variance_ratio();
        assert!((ratio[0] - 1.0).abs() < 1e-9);
        assert!(ratio[1].abs() < 1e-9);

        // First component points along (1, 2) with positive sign
        let c = &pca.components()[0];
        let norm = 5.0f64.sqrt();
        assert!((c[0] - 1.0 / norm).abs() < 1e-9);
        assert!((c[1] - 2.0 / norm).abs() < 1e-9);
    }

    #[test]
    fn test_sorted_by_variance() {
        let rows = vec![
            vec![0.0, 0.0, 10.0],
            vec![1.0, 0.1, -10.0],
            vec![-1.0, -0.1, 10.0],
            vec![0.5, 0.0, -10.0],
        ];
        let pca = fit(&rows);
        let var = pca.explained_variance();
        assert!(var.windows(2).all(|w| w[0] >= w[1]));
        assert!(pca.components()[0][2].abs() > 0.99);
    }

    #[test]
    fn test_project_mean_is_origin() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 0.0], vec![2.0, 4.0]];
        let pca = fit(&rows);
        let mut out = [1.0; 3];
        pca.project_into(&pca.mean().to_vec(), &mut out);
        assert!(out[0].abs() < 1e-12);
        assert!(out[1].abs() < 1e-12);
        // No third component for 2-wide data
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_constant_corpus() {
        let rows = vec![vec![1.0, 1.0]; 4];
        let pca = fit(&rows);
        assert_eq!(pca.explained_variance_ratio(), vec![0.0, 0.0]);
        assert_eq!(pca.explained_variance_top(3), 0.0);
    }

    #[test]
    fn test_errors() {
        let empty: Vec<Vec<f64>> = vec![];
        assert!(matches!(
            Pca::fit(empty.iter().map(Vec::as_slice)),
            Err(PcaError::Empty)
        ));

        let zero = vec![vec![], vec![]];
        assert!(matches!(
            Pca::fit(zero.iter().map(Vec::as_slice)),
            Err(PcaError::ZeroWidth)
        ));

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            Pca::fit(ragged.iter().map(Vec::as_slice)),
            Err(PcaError::RaggedRow { row: 1, .. })
        ));
    }
}
