//! Beat-relative time warping between two recordings of the same piece.
//!
//! Beat `i` in the source corresponds to beat `i` in the target. An offset
//! is located inside its source inter-beat interval and linearly mapped onto
//! the matching target interval.

use serde::{Deserialize, Serialize};

/// Widening applied past the extrapolated final interval (seconds).
pub const EPSILON: f64 = 0.01;

/// Map `offset` from the `source` time base into the `target` time base.
///
/// Both lists must be index-aligned, strictly increasing and hold at least
/// two beats; [`TimeWarper::new`] enforces this. Offsets are non-negative.
pub fn warp(offset: f64, source: &[f64], target: &[f64]) -> f64 {
    let n = source.len().min(target.len());
    if n < 2 {
        return offset;
    }
    let (source, target) = (&source[..n], &target[..n]);

    let (a, b, a_prime, b_prime) = match source.iter().position(|&beat| beat > offset) {
        Some(i) => {
            let a = if i == 0 { 0.0 } else { source[i - 1] };
            let a_prime = if i == 0 { 0.0 } else { target[i - 1] };
            (a, source[i], a_prime, target[i])
        }
        None => {
            // One synthetic interval as wide as the last real one
            let a = source[n - 1];
            let a_prime = target[n - 1];
            let width = a - source[n - 2];
            let width_prime = a_prime - target[n - 2];
            let mut b = a + width;
            let mut b_prime = a_prime + width_prime;
            if offset > b && width > 0.0 {
                b = offset + EPSILON;
                b_prime = a_prime + (b - a) * width_prime / width;
            }
            (a, b, a_prime, b_prime)
        }
    };

    if b - a <= 0.0 {
        return a_prime;
    }
    (b_prime - a_prime) / (b - a) * (offset - a) + a_prime
}

/// Validated pair of index-aligned beat lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWarper {
    source: Vec<f64>,
    target: Vec<f64>,
}

impl TimeWarper {
    /// Build a warper from `source` (performance) to `target` (score) beats.
    pub fn new(source: Vec<f64>, target: Vec<f64>) -> crate::Result<Self> {
        check_beats("source", &source)?;
        check_beats("target", &target)?;
        if source.len() != target.len() {
            return Err(crate::Error::InvalidBeats(format!(
                "source has {} beats but target has {}",
                source.len(),
                target.len()
            )));
        }
        Ok(Self { source, target })
    }

    /// A warper that leaves every offset unchanged.
    pub fn identity(beats: Vec<f64>) -> crate::Result<Self> {
        Self::new(beats.clone(), beats)
    }

    pub fn warp(&self, offset: f64) -> f64 {
        warp(offset, &self.source, &self.target)
    }

    pub fn source(&self) -> &[f64] {
        &self.source
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

fn check_beats(side: &str, beats: &[f64]) -> crate::Result<()> {
    if beats.len() < 2 {
        return Err(crate::Error::InvalidBeats(format!(
            "{side} needs at least 2 beats, got {}",
            beats.len()
        )));
    }
    if let Some(bad) = beats.iter().find(|b| !b.is_finite() || **b < 0.0) {
        return Err(crate::Error::InvalidBeats(format!(
            "{side} beat {bad} is negative or not finite"
        )));
    }
    if let Some(i) = beats.windows(2).position(|w| w[1] <= w[0]) {
        return Err(crate::Error::InvalidBeats(format!(
            "{side} beats not strictly increasing at index {}",
            i + 1
        )));
    }
    Ok(())
}
