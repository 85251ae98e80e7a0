//! # Spectrum Downsampling
//!
//! Reduces an ordered 1-D point sequence to a display-sized subset using a
//! hybrid policy: part of the budget buys even x-axis coverage (uniform
//! stride with both endpoints kept), the rest buys the highest-intensity
//! points not already covered. The blend keeps low-abundance structure
//! visible across the full mass range while guaranteeing that dominant peaks
//! are never dropped.
//!
//! The function is pure and deterministic: identical input and parameters
//! always select the identical index set.

/// Errors from invalid downsampling parameters
#[derive(Debug, thiserror::Error)]
pub enum DownsampleError {
    /// A zero budget can never produce a meaningful selection
    #[error("max_count must be >= 1, got 0")]
    InvalidMaxCount,

    /// Coverage fraction outside [0, 1]
    #[error("coverage_fraction must be within [0, 1], got {0}")]
    InvalidCoverageFraction(f64),

    /// The two input columns differ in length
    #[error("Column length mismatch: {mz} m/z values vs {intensity} intensities")]
    LengthMismatch {
        /// Length of the m/z column
        mz: usize,
        /// Length of the intensity column
        intensity: usize,
    },
}

/// Downsampling policy parameters
#[derive(Debug, Clone, Copy)]
pub struct DownsampleConfig {
    /// Maximum number of points in the selection
    pub max_count: usize,
    /// Fraction of the budget reserved for uniform x-axis coverage; the
    /// remainder goes to top-intensity points
    pub coverage_fraction: f64,
}

impl Default for DownsampleConfig {
    fn default() -> Self {
        Self {
            max_count: 5000,
            coverage_fraction: 0.7,
        }
    }
}

impl DownsampleConfig {
    fn validate(&self) -> Result<(), DownsampleError> {
        if self.max_count == 0 {
            return Err(DownsampleError::InvalidMaxCount);
        }
        if !(0.0..=1.0).contains(&self.coverage_fraction) || self.coverage_fraction.is_nan() {
            return Err(DownsampleError::InvalidCoverageFraction(
                self.coverage_fraction,
            ));
        }
        Ok(())
    }
}

/// Select a display subset of a spectrum, returning ascending indices into
/// the input columns.
///
/// Input points must already be ordered by m/z ascending (the natural order
/// of a centroided spectrum). The output size is exactly
/// `min(max_count, len)`:
///
/// - `len <= max_count`: identity, every index in order.
/// - otherwise: `round(max_count * coverage_fraction)` indices via an
///   endpoint-inclusive linspace over the index range, then the
///   highest-intensity unselected indices until the budget is full.
///   Intensity ties resolve to the lower index.
pub fn downsample(
    mz: &[f64],
    intensity: &[f64],
    config: &DownsampleConfig,
) -> Result<Vec<usize>, DownsampleError> {
    config.validate()?;

    if mz.len() != intensity.len() {
        return Err(DownsampleError::LengthMismatch {
            mz: mz.len(),
            intensity: intensity.len(),
        });
    }

    let n = mz.len();
    if n <= config.max_count {
        return Ok((0..n).collect());
    }

    let coverage_budget =
        ((config.max_count as f64 * config.coverage_fraction).round() as usize).min(config.max_count);
    let intensity_budget = config.max_count - coverage_budget;

    // Uniform stride across the index range, endpoints included. With
    // n > max_count the spacing exceeds one index, so the rounded positions
    // are distinct and the mask ends up with exactly coverage_budget bits.
    let mut selected = vec![false; n];
    match coverage_budget {
        0 => {}
        1 => selected[0] = true,
        budget => {
            let step = (n - 1) as f64 / (budget - 1) as f64;
            for k in 0..budget {
                let idx = (k as f64 * step).round() as usize;
                selected[idx.min(n - 1)] = true;
            }
        }
    }

    if intensity_budget > 0 {
        let mut candidates: Vec<usize> = (0..n).filter(|&i| !selected[i]).collect();
        candidates.sort_by(|&a, &b| intensity[b].total_cmp(&intensity[a]).then(a.cmp(&b)));
        for &idx in candidates.iter().take(intensity_budget) {
            selected[idx] = true;
        }
    }

    let indices: Vec<usize> = (0..n).filter(|&i| selected[i]).collect();
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_spectrum(n: usize) -> (Vec<f64>, Vec<f64>) {
        let mz: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 0.1).collect();
        let intensity: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin().abs() * 1e5).collect();
        (mz, intensity)
    }

    #[test]
    fn test_identity_when_under_budget() {
        let (mz, intensity) = synthetic_spectrum(100);
        let config = DownsampleConfig::default();
        let indices = downsample(&mz, &intensity, &config).unwrap();
        assert_eq!(indices, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_identity_at_exact_budget() {
        let (mz, intensity) = synthetic_spectrum(5000);
        let config = DownsampleConfig::default();
        let indices = downsample(&mz, &intensity, &config).unwrap();
        assert_eq!(indices.len(), 5000);
    }

    #[test]
    fn test_output_size_is_exact() {
        let (mz, intensity) = synthetic_spectrum(12_345);
        for max_count in [1, 2, 10, 999, 5000] {
            let config = DownsampleConfig {
                max_count,
                coverage_fraction: 0.7,
            };
            let indices = downsample(&mz, &intensity, &config).unwrap();
            assert_eq!(indices.len(), max_count, "max_count={}", max_count);
        }
    }

    #[test]
    fn test_budget_partition_scenario() {
        // 10k points, budget 5000 at 70% coverage: 3500 coverage + 1500 intensity
        let n = 10_000;
        let mz: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 0.1).collect();
        // Flat floor with 1500 dominant peaks in a contiguous block
        let mut intensity = vec![1.0; n];
        for value in intensity.iter_mut().skip(7001).take(1500) {
            *value = 100.0;
        }

        let config = DownsampleConfig {
            max_count: 5000,
            coverage_fraction: 0.7,
        };
        let indices = downsample(&mz, &intensity, &config).unwrap();

        assert_eq!(indices.len(), 5000);
        assert!(indices.windows(2).all(|w| w[0] < w[1]), "ascending order");
        assert_eq!(indices[0], 0, "first point kept for coverage");
        assert_eq!(*indices.last().unwrap(), n - 1, "last point kept for coverage");

        // Every dominant peak survives, whether picked by coverage or intensity
        for i in 7001..8501 {
            assert!(indices.binary_search(&i).is_ok(), "peak {} dropped", i);
        }
    }

    #[test]
    fn test_intensity_ties_resolve_to_lower_index() {
        let mz = vec![1.0, 2.0, 3.0, 4.0];
        let intensity = vec![5.0, 5.0, 5.0, 5.0];
        let config = DownsampleConfig {
            max_count: 2,
            coverage_fraction: 0.0,
        };
        let indices = downsample(&mz, &intensity, &config).unwrap();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_pure_coverage_keeps_endpoints() {
        let (mz, intensity) = synthetic_spectrum(1000);
        let config = DownsampleConfig {
            max_count: 10,
            coverage_fraction: 1.0,
        };
        let indices = downsample(&mz, &intensity, &config).unwrap();
        assert_eq!(indices.len(), 10);
        assert_eq!(indices[0], 0);
        assert_eq!(*indices.last().unwrap(), 999);
    }

    #[test]
    fn test_zero_max_count_fails_fast() {
        let (mz, intensity) = synthetic_spectrum(10);
        let config = DownsampleConfig {
            max_count: 0,
            coverage_fraction: 0.7,
        };
        assert!(matches!(
            downsample(&mz, &intensity, &config),
            Err(DownsampleError::InvalidMaxCount)
        ));
    }

    #[test]
    fn test_invalid_coverage_fraction() {
        let (mz, intensity) = synthetic_spectrum(10);
        for fraction in [-0.1, 1.5, f64::NAN] {
            let config = DownsampleConfig {
                max_count: 5,
                coverage_fraction: fraction,
            };
            assert!(matches!(
                downsample(&mz, &intensity, &config),
                Err(DownsampleError::InvalidCoverageFraction(_))
            ));
        }
    }

    #[test]
    fn test_length_mismatch() {
        let config = DownsampleConfig::default();
        assert!(matches!(
            downsample(&[1.0, 2.0], &[1.0], &config),
            Err(DownsampleError::LengthMismatch { mz: 2, intensity: 1 })
        ));
    }

    #[test]
    fn test_deterministic() {
        let (mz, intensity) = synthetic_spectrum(20_000);
        let config = DownsampleConfig::default();
        let first = downsample(&mz, &intensity, &config).unwrap();
        let second = downsample(&mz, &intensity, &config).unwrap();
        assert_eq!(first, second);
    }
}
