//! Series primitives shared by indicators and feature builders.
//!
//! Rolling functions need a full window: any NaN inside the window makes the
//! output NaN, and the first `window - 1` outputs are always NaN.

/// `v[t] / v[t-periods] - 1`.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    lagged(values, periods, |cur, prev| cur / prev - 1.0)
}

/// `v[t] - v[t-periods]`.
pub fn diff(values: &[f64], periods: usize) -> Vec<f64> {
    lagged(values, periods, |cur, prev| cur - prev)
}

/// `ln(v[t] / v[t-1])`.
pub fn log_returns(values: &[f64]) -> Vec<f64> {
    lagged(values, 1, |cur, prev| (cur / prev).ln())
}

fn lagged(values: &[f64], periods: usize, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return f64::NAN;
            }
            let (cur, prev) = (values[i], values[i - periods]);
            if cur.is_nan() || prev.is_nan() {
                f64::NAN
            } else {
                f(cur, prev)
            }
        })
        .collect()
}

/// Shift by `k` rows: positive `k` lags (value from `t-k`), negative `k`
/// leads (value from `t+|k|`). Vacated rows are NaN.
pub fn shift(values: &[f64], k: isize) -> Vec<f64> {
    let n = values.len() as isize;
    (0..n)
        .map(|i| {
            let src = i - k;
            if (0..n).contains(&src) {
                values[src as usize]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Element-wise `a / b`.
pub fn ratio(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x / y).collect()
}

/// Apply `f` to every full window; NaN where the window is short or holds a NaN.
pub fn rolling_apply(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for (end, w) in values.windows(window).enumerate() {
        if w.iter().all(|v| !v.is_nan()) {
            out[end + window - 1] = f(w);
        }
    }
    out
}

pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().sum())
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Rolling standard deviation with `ddof` degrees of freedom removed
/// (1 = sample, 0 = population).
pub fn rolling_std(values: &[f64], window: usize, ddof: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        if w.len() <= ddof {
            return f64::NAN;
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let ss: f64 = w.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (w.len() - ddof) as f64).sqrt()
    })
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().copied().fold(f64::MIN, f64::max))
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().copied().fold(f64::MAX, f64::min))
}

/// Rolling Pearson correlation. NaN when either window holds a NaN or has
/// zero variance.
pub fn rolling_corr(a: &[f64], b: &[f64], window: usize) -> Vec<f64> {
    let n = a.len().min(b.len());
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < window {
        return out;
    }
    for end in (window - 1)..n {
        let xs = &a[end + 1 - window..=end];
        let ys = &b[end + 1 - window..=end];
        if xs.iter().chain(ys).any(|v| v.is_nan()) {
            continue;
        }
        let mx = xs.iter().sum::<f64>() / window as f64;
        let my = ys.iter().sum::<f64>() / window as f64;
        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (x, y) in xs.iter().zip(ys) {
            let (dx, dy) = (x - mx, y - my);
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }
        if sxx > 0.0 && syy > 0.0 {
            out[end] = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
        }
    }
    out
}

/// Index where the first run of `period` consecutive non-NaN values starts.
pub(crate) fn seed_start(values: &[f64], period: usize) -> Option<usize> {
    if period == 0 {
        return None;
    }
    let mut run = 0;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            if run == period {
                return Some(i + 1 - period);
            }
        }
    }
    None
}

/// Recursive smoothing seeded with the mean of the first full window of
/// valid values. A NaN after the seed blanks the rest of the series.
fn seeded_recursive(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    let Some(start) = seed_start(values, period) else {
        return result;
    };
    let seed_end = start + period;
    let seed = values[start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// EMA with `alpha = 2 / (period + 1)`, seeded with an SMA. Leading NaNs are
/// skipped, so an EMA of an EMA-derived series works.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    seeded_recursive(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder smoothing (`alpha = 1 / period`), seeded with an SMA.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    seeded_recursive(values, period, 1.0 / period as f64)
}

/// Replace ±inf with NaN.
pub fn sanitize(values: &mut [f64]) {
    for v in values.iter_mut() {
        if v.is_infinite() {
            *v = f64::NAN;
        }
    }
}

/// Index of the first non-NaN value.
pub fn first_valid(values: &[f64]) -> Option<usize> {
    values.iter().position(|v| !v.is_nan())
}
