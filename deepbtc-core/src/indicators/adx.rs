//! ADX: Average Directional Index (Wilder), with the two directional lines.
//!
//! 1. +DM / -DM from consecutive highs and lows
//! 2. Wilder-smooth +DM, -DM and TR
//! 3. ±DI = 100 × smoothed(±DM) / smoothed(TR)
//! 4. DX = 100 × |+DI − −DI| / (+DI + −DI); ADX = Wilder-smoothed DX
//!
//! Lines, in column order: `adx_N`, `plus_di_N`, `minus_di_N`.
//! Lookback: 2 × period − 1 for ADX, period for the DI lines.

use super::atr::true_range;
use super::series::wilder_smooth;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }

    /// (+DI, −DI).
    fn directional_indices(&self, bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
        let (plus_dm, minus_dm) = directional_movement(bars);
        let smooth_tr = wilder_smooth(&true_range(bars), self.period);

        let di = |dm: &[f64]| -> Vec<f64> {
            wilder_smooth(dm, self.period)
                .iter()
                .zip(&smooth_tr)
                .map(|(&dm, &tr)| if tr == 0.0 { f64::NAN } else { 100.0 * dm / tr })
                .collect()
        };
        (di(&plus_dm), di(&minus_dm))
    }

    fn adx_line(&self, plus_di: &[f64], minus_di: &[f64]) -> Vec<f64> {
        let dx: Vec<f64> = plus_di
            .iter()
            .zip(minus_di)
            .map(|(&p, &m)| {
                let sum = p + m;
                if sum == 0.0 {
                    0.0
                } else {
                    100.0 * (p - m).abs() / sum
                }
            })
            .collect();
        wilder_smooth(&dx, self.period)
    }
}

fn directional_movement(bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let n = bars.len();
    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];

    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up.is_nan() || down.is_nan() {
            continue;
        }
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }
    (plus_dm, minus_dm)
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (plus_di, minus_di) = self.directional_indices(bars);
        self.adx_line(&plus_di, &minus_di)
    }

    fn lines(&self) -> Vec<(String, usize)> {
        vec![
            (self.name.clone(), self.lookback()),
            (format!("plus_di_{}", self.period), self.period),
            (format!("minus_di_{}", self.period), self.period),
        ]
    }

    fn compute_lines(&self, bars: &[Bar]) -> Vec<Vec<f64>> {
        let (plus_di, minus_di) = self.directional_indices(bars);
        let adx = self.adx_line(&plus_di, &minus_di);
        vec![adx, plus_di, minus_di]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn trending(n: usize) -> Vec<Bar> {
        make_bars(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    #[test]
    fn warmup_matches_lookback() {
        let bars = trending(40);
        let adx = Adx::new(5);
        for ((name, lookback), out) in adx.lines().into_iter().zip(adx.compute_lines(&bars)) {
            let first = out.iter().position(|v| !v.is_nan()).unwrap();
            assert_eq!(first, lookback, "{name}");
        }
    }

    #[test]
    fn uptrend_has_dominant_plus_di() {
        let bars = trending(40);
        let lines = Adx::new(5).compute_lines(&bars);
        let (adx, plus, minus) = (&lines[0], &lines[1], &lines[2]);
        assert!(plus[39] > minus[39]);
        assert!(adx[39] > 50.0 && adx[39] <= 100.0 + 1e-9);
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&Adx::new(5).compute(&bars)[..]), bits(&adx[..]));
    }

    #[test]
    fn names() {
        let names: Vec<String> = Adx::new(14).lines().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["adx_14", "plus_di_14", "minus_di_14"]);
        assert_eq!(Adx::new(14).name(), "adx_14");
    }
}
