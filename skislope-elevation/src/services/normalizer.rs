//! Raw elevation to unit-interval normalization

/// Result of normalizing a sample sequence
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Nothing usable to normalize; callers treat this as a failed fetch
    NoData,
    /// Samples mapped to `[0, 1]`, same length as the input
    Grid(Vec<f32>),
}

/// Map raw elevations (meters) onto `[0, 1]`
///
/// Flat input maps to `0.5` everywhere. Non-finite samples are treated as
/// missing and take the minimum of the finite ones; input without any finite
/// sample is `NoData`. Ranges too wide for `f64` are scaled at half
/// magnitude so extreme finite input still lands in `[0, 1]`.
pub fn normalize(samples: &[f64]) -> Normalized {
    let (min, max) = samples
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s), hi.max(s)));

    if min > max {
        return Normalized::NoData;
    }

    if min == max {
        return Normalized::Grid(vec![0.5; samples.len()]);
    }

    // max - min overflows when the inputs straddle most of the f64 range
    let scale = if (max - min).is_finite() { 1.0 } else { 0.5 };
    let range = max * scale - min * scale;

    Normalized::Grid(
        samples
            .iter()
            .map(|&s| {
                let s = if s.is_finite() { s } else { min };
                ((s * scale - min * scale) / range).clamp(0.0, 1.0) as f32
            })
            .collect(),
    )
}
