//! Cubic smoothing spline fitting
//!
//! Elevation samples are approximated by a uniform cubic B-spline whose coefficients
//! minimize the squared residuals plus a second-difference penalty (a P-spline). Each
//! sample touches four basis functions, so the normal equations are banded and are
//! solved in linear time by a banded Cholesky decomposition.

use geo::Coord;

/// Half bandwidth of the normal equations (four overlapping basis functions)
const BAND: usize = 3;

/// Reasons a fit can not produce a spline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("no samples to fit")]
    Empty,

    #[error("{x} distances but {y} elevations")]
    LengthMismatch { x: usize, y: usize },

    #[error("sample {index} is not a finite number")]
    NonFinite { index: usize },

    #[error("fewer than two knots requested ({0})")]
    TooFewKnots(usize),

    #[error("normal equations are not positive definite at row {row}")]
    NotPositiveDefinite { row: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    /// All samples share one distance
    Constant(f64),
    /// Uniform cubic B-spline on `[origin, origin + step * intervals]`
    Uniform {
        origin: f64,
        step: f64,
        coefficients: Vec<f64>,
    },
}

/// A fitted cubic spline
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    knots: usize,
    shape: Shape,
}

/// Fit a smoothing cubic spline with `knots` equidistant knots through `(x, y)`
///
/// The knots span the range of `x`. `smoothing` weights the penalty on the second
/// differences of the coefficients; with zero smoothing, a knot interval without
/// samples makes the system singular and the fit fails.
pub fn fit_cubic(x: &[f64], y: &[f64], knots: usize, smoothing: f64) -> Result<CubicSpline, FitError> {
    profiling::scope!("spline::fit_cubic");

    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.is_empty() {
        return Err(FitError::Empty);
    }
    if knots < 2 {
        return Err(FitError::TooFewKnots(knots));
    }
    if let Some(index) = x
        .iter()
        .zip(y)
        .position(|(a, b)| !a.is_finite() || !b.is_finite())
    {
        return Err(FitError::NonFinite { index });
    }

    let (min, max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max <= min {
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        return Ok(CubicSpline {
            knots,
            shape: Shape::Constant(mean),
        });
    }

    let intervals = knots - 1;
    let step = (max - min) / intervals as f64;
    let size = intervals + BAND;

    // Upper band of the symmetric normal matrix: normal[i][k] = N(i, i + k)
    let mut normal = vec![[0.0; BAND + 1]; size];
    let mut rhs = vec![0.0; size];

    for (&xi, &yi) in x.iter().zip(y) {
        let (first, weights) = basis(min, step, intervals, xi);
        for a in 0..=BAND {
            rhs[first + a] += weights[a] * yi;
            for b in a..=BAND {
                normal[first + a][b - a] += weights[a] * weights[b];
            }
        }
    }

    if smoothing > 0.0 {
        const SECOND_DIFF: [f64; 3] = [1.0, -2.0, 1.0];
        for r in 0..size - 2 {
            for a in 0..3 {
                for b in a..3 {
                    normal[r + a][b - a] += smoothing * SECOND_DIFF[a] * SECOND_DIFF[b];
                }
            }
        }
    }

    let coefficients = solve_banded(normal, rhs)?;
    tracing::trace!("Fitted {} samples with {knots} knots", x.len());

    Ok(CubicSpline {
        knots,
        shape: Shape::Uniform {
            origin: min,
            step,
            coefficients,
        },
    })
}

/// First coefficient index and the four basis weights at `x`
///
/// Positions outside the knot range use the boundary interval, so evaluation
/// extrapolates with the boundary polynomial.
#[inline]
fn basis(origin: f64, step: f64, intervals: usize, x: f64) -> (usize, [f64; 4]) {
    let u = (x - origin) / step;
    let interval = (u.floor().max(0.0) as usize).min(intervals - 1);
    let t = u - interval as f64;
    let t2 = t * t;
    let t3 = t2 * t;
    let s = 1.0 - t;
    (
        interval,
        [
            s * s * s / 6.0,
            (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
            (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
            t3 / 6.0,
        ],
    )
}

/// Solve the symmetric banded system given by its upper band
fn solve_banded(normal: Vec<[f64; BAND + 1]>, mut rhs: Vec<f64>) -> Result<Vec<f64>, FitError> {
    let n = normal.len();
    // Lower Cholesky factor: lower[i][d] = L(i, i - d)
    let mut lower = vec![[0.0; BAND + 1]; n];

    for i in 0..n {
        let start = i.saturating_sub(BAND);
        for j in start..=i {
            let mut sum = normal[j][i - j];
            for k in start.max(j.saturating_sub(BAND))..j {
                sum -= lower[i][i - k] * lower[j][j - k];
            }
            if i == j {
                // Relative tolerance against the diagonal keeps rounding noise out
                if !(sum > normal[i][0] * 1e-12) {
                    return Err(FitError::NotPositiveDefinite { row: i });
                }
                lower[i][0] = sum.sqrt();
            } else {
                lower[i][i - j] = sum / lower[j][0];
            }
        }
    }

    // Forward substitution: L z = rhs
    for i in 0..n {
        let mut sum = rhs[i];
        for k in i.saturating_sub(BAND)..i {
            sum -= lower[i][i - k] * rhs[k];
        }
        rhs[i] = sum / lower[i][0];
    }
    // Back substitution: L^T c = z
    for i in (0..n).rev() {
        let mut sum = rhs[i];
        for k in i + 1..n.min(i + BAND + 1) {
            sum -= lower[k][k - i] * rhs[k];
        }
        rhs[i] = sum / lower[i][0];
    }
    Ok(rhs)
}

impl CubicSpline {
    /// Number of knots the spline was fitted with
    #[inline]
    pub fn knots(&self) -> usize {
        self.knots
    }

    /// Evaluate the spline at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        match &self.shape {
            Shape::Constant(value) => *value,
            Shape::Uniform {
                origin,
                step,
                coefficients,
            } => {
                let intervals = coefficients.len() - BAND;
                let (first, weights) = basis(*origin, *step, intervals, x);
                weights
                    .iter()
                    .zip(&coefficients[first..first + BAND + 1])
                    .map(|(w, c)| w * c)
                    .sum()
            }
        }
    }

    /// Sample the spline every `total_distance / sample_count` from zero
    ///
    /// Only distances strictly below `total_distance` are sampled: the end of the
    /// track itself is never evaluated, so at most `sample_count` points are returned.
    pub fn resample(&self, total_distance: f64, sample_count: usize) -> Vec<Coord<f64>> {
        if sample_count == 0 || !(total_distance > 0.0) {
            return Vec::new();
        }
        let delta = total_distance / sample_count as f64;
        (0..sample_count)
            .map(|i| i as f64 * delta)
            .take_while(|&d| d < total_distance)
            .map(|d| Coord {
                x: d,
                y: self.evaluate(d),
            })
            .collect()
    }
}
