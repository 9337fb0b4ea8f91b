//! Binning of phase pairs by a scalar value.
//!
//! `N` strictly increasing edges define `N - 1` bins, with bin `k` holding the values
//! `edges[k] <= v < edges[k + 1]`. Values outside `[edges[0], edges[N - 1])` fall in
//! no bin. The value representing a bin is its midpoint.

use crate::errors::{CipherError, CipherResult, PhasePair};
use ndarray::Array2;

#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    pub fn new(edges: Vec<f64>) -> CipherResult<Self> {
        if edges.len() < 2 {
            return Err(CipherError::InvalidBinEdges {
                details: format!("at least two edges are required, but {} given", edges.len()),
            });
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(CipherError::InvalidBinEdges {
                details: "edges must be finite".to_string(),
            });
        }
        if edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CipherError::InvalidBinEdges {
                details: format!("edges must be strictly increasing: {edges:?}"),
            });
        }
        Ok(Self(edges))
    }

    /// Bins of width `width` covering `[min, max]`.
    ///
    /// The lowest edge is `min` rounded down to a multiple of `width`; the highest is
    /// `max` rounded up to a multiple of `width`, plus one more width.
    pub fn fixed_width(min: f64, max: f64, width: f64) -> CipherResult<Self> {
        if !(width > 0.0) || !min.is_finite() || !max.is_finite() || max < min {
            return Err(CipherError::InvalidBinEdges {
                details: format!("cannot cover [{min}, {max}] with bins of width {width}"),
            });
        }
        let lo = (min / width).floor() * width;
        let hi = (max / width).ceil() * width + width;
        let num_bins = ((hi - lo) / width).round() as usize;
        Self::new((0..=num_bins).map(|k| lo + k as f64 * width).collect())
    }

    pub fn edges(&self) -> &[f64] {
        &self.0
    }

    pub fn num_bins(&self) -> usize {
        self.0.len() - 1
    }

    /// The bin holding `value`, if any.
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        let edges = &self.0;
        if !(value >= edges[0] && value < edges[edges.len() - 1]) {
            return None;
        }
        Some(edges.partition_point(|&e| e <= value) - 1)
    }

    pub fn midpoint(&self, bin: usize) -> f64 {
        (self.0[bin] + self.0[bin + 1]) / 2.0
    }

    pub fn midpoints(&self) -> Vec<f64> {
        self.0.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }
}

/// Check a property matrix has one row and column per phase.
pub fn check_property_matrix(values: &Array2<f64>, num_phases: usize) -> CipherResult<()> {
    if values.shape() != [num_phases, num_phases] {
        return Err(CipherError::PropertyMatrixShape {
            expected: [num_phases, num_phases],
            actual: values.shape().to_vec(),
        });
    }
    Ok(())
}

/// Group phase pairs into bins by their entry in `values`.
///
/// Returns the populated bins in increasing order, each with its pairs in input order.
/// Fails, listing the pairs and values, if any pair falls in no bin.
pub fn bin_phase_pairs(
    pairs: &[PhasePair],
    values: &Array2<f64>,
    edges: &BinEdges,
) -> CipherResult<Vec<(usize, Vec<PhasePair>)>> {
    let mut bins: Vec<Vec<PhasePair>> = vec![Vec::new(); edges.num_bins()];
    let mut missing = Vec::new();
    for &pair in pairs {
        let value = values[pair];
        match edges.bin_of(value) {
            Some(bin) => bins[bin].push(pair),
            None => missing.push((pair, value)),
        }
    }
    if !missing.is_empty() {
        return Err(CipherError::UnbinnedPhasePairs {
            missing,
            total: pairs.len(),
        });
    }
    Ok(bins
        .into_iter()
        .enumerate()
        .filter(|(_, pairs)| !pairs.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_edge_validation() {
        assert!(BinEdges::new(vec![1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, 1.0, 1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, f64::NAN]).is_err());
        assert!(BinEdges::new(vec![0.0, 1.0, 2.5]).is_ok());
    }

    #[test]
    fn test_right_edge_exclusive() {
        let edges = BinEdges::new(vec![0.0, 10.0, 20.0]).unwrap();
        assert_eq!(edges.bin_of(0.0), Some(0));
        assert_eq!(edges.bin_of(9.999), Some(0));
        assert_eq!(edges.bin_of(10.0), Some(1));
        assert_eq!(edges.bin_of(19.999), Some(1));
        assert_eq!(edges.bin_of(20.0), None);
        assert_eq!(edges.bin_of(-0.001), None);
        assert_eq!(edges.bin_of(f64::NAN), None);
    }

    #[test]
    fn test_fixed_width() {
        let edges = BinEdges::fixed_width(3.2, 41.0, 5.0).unwrap();
        assert_eq!(edges.edges().first(), Some(&0.0));
        assert_eq!(edges.edges().last(), Some(&50.0));
        assert_eq!(edges.num_bins(), 10);
        assert_eq!(edges.bin_of(41.0), Some(8));

        // A maximum on a multiple of the width is still covered
        let edges = BinEdges::fixed_width(0.0, 45.0, 5.0).unwrap();
        assert_eq!(edges.bin_of(45.0), Some(9));
    }

    #[test]
    fn test_midpoints() {
        let edges = BinEdges::new(vec![0.0, 1.0, 3.0]).unwrap();
        assert_eq!(edges.midpoints(), vec![0.5, 2.0]);
        assert_relative_eq!(edges.midpoint(1), 2.0);
    }

    fn values() -> Array2<f64> {
        array![
            [0.0, 1.5, 7.0, 0.0],
            [1.5, 0.0, 0.0, 4.0],
            [7.0, 0.0, 0.0, 2.5],
            [0.0, 4.0, 2.5, 0.0]
        ]
    }

    #[test]
    fn test_all_pairs_inside_bins() {
        let pairs = [[0, 1], [0, 2], [1, 3], [2, 3]];
        let edges = BinEdges::new(vec![0.0, 3.0, 6.0, 9.0]).unwrap();
        let bins = bin_phase_pairs(&pairs, &values(), &edges).unwrap();
        assert_eq!(
            bins,
            vec![
                (0, vec![[0, 1], [2, 3]]),
                (1, vec![[1, 3]]),
                (2, vec![[0, 2]])
            ]
        );
    }

    #[test]
    fn test_value_on_edge() {
        let pairs = [[0, 1], [0, 2], [1, 3], [2, 3]];
        let mut values = values();
        values[[1, 3]] = 6.0;

        // On an interior edge the value belongs to the upper bin
        let edges = BinEdges::new(vec![0.0, 3.0, 6.0, 9.0]).unwrap();
        let bins = bin_phase_pairs(&pairs, &values, &edges).unwrap();
        assert_eq!(bins[1], (2, vec![[0, 2], [1, 3]]));

        // On the last edge it is not captured
        let edges = BinEdges::new(vec![0.0, 3.0, 6.0]).unwrap();
        let err = bin_phase_pairs(&pairs, &values, &edges).unwrap_err();
        match err {
            CipherError::UnbinnedPhasePairs { missing, total } => {
                assert_eq!(total, 4);
                assert_eq!(missing, vec![([0, 2], 7.0), ([1, 3], 6.0)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_property_matrix_shape() {
        assert!(check_property_matrix(&values(), 4).is_ok());
        let err = check_property_matrix(&values(), 3).unwrap_err();
        assert!(matches!(err, CipherError::PropertyMatrixShape { .. }));
    }
}
